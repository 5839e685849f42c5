use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::channel::SystemSettings;
use crate::decision::decide;
use crate::error::SchedulerError;
use crate::service::StreamService;

/// What one scan cycle did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Enabled channels with refresh turned on.
    pub considered: usize,
    pub attempted: usize,
    pub refreshed: usize,
    pub failed: usize,
}

pub struct SchedulerHandle {
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Stops the loop between channels or while sleeping, and waits for it.
    pub async fn stop(self) -> Result<(), SchedulerError> {
        self.cancel.cancel();
        self.join.await.map_err(SchedulerError::from)
    }

    pub fn token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

/// Spawns the refresh loop. It runs until `cancel` (or the returned handle) is cancelled.
pub fn spawn_scheduler(service: StreamService, cancel: CancellationToken) -> SchedulerHandle {
    let token = cancel.clone();
    let join = tokio::spawn(async move {
        info!("refresh scheduler started");
        let mut interval = Duration::from_secs(SystemSettings::default().scan_interval_seconds);

        loop {
            match service.store().settings().await {
                Ok(settings) => {
                    interval = Duration::from_secs(settings.scan_interval_seconds.max(1));
                    let report = run_cycle(&service, &settings, Local::now(), &token).await;
                    if report.attempted > 0 {
                        info!(
                            considered = report.considered,
                            attempted = report.attempted,
                            refreshed = report.refreshed,
                            failed = report.failed,
                            "scan cycle finished"
                        );
                    }
                }
                Err(e) => error!(error = %e, "failed to read settings, skipping cycle"),
            }

            tokio::select! {
                () = token.cancelled() => break,
                () = tokio::time::sleep(interval) => {}
            }
        }
        info!("refresh scheduler shutdown requested");
    });

    SchedulerHandle { cancel, join }
}

/// One scheduler cycle under `settings`: nothing happens when automatic
/// refresh is switched off globally.
pub async fn run_cycle(
    service: &StreamService,
    settings: &SystemSettings,
    now: DateTime<Local>,
    cancel: &CancellationToken,
) -> CycleReport {
    if !settings.refresh_enabled {
        debug!("automatic refresh disabled, skipping cycle");
        return CycleReport::default();
    }
    scan_once(service, now, cancel).await
}

/// Scans the registry at `now`, ignoring the global switch. Never fails:
/// registry errors yield an empty report and per-channel errors are counted
/// and logged.
pub async fn scan_once(
    service: &StreamService,
    now: DateTime<Local>,
    cancel: &CancellationToken,
) -> CycleReport {
    let mut report = CycleReport::default();
    let store = service.store();

    let channels = match store.list_channels().await {
        Ok(channels) => channels,
        Err(e) => {
            error!(error = %e, "failed to read channel registry");
            return report;
        }
    };

    for channel in channels.into_iter().filter(|c| c.is_schedulable()) {
        if cancel.is_cancelled() {
            debug!("cycle interrupted by shutdown");
            break;
        }
        report.considered += 1;

        let state = match store.channel_state(&channel.id).await {
            Ok(state) => state,
            Err(e) => {
                warn!(channel = %channel.id, error = %e, "failed to read channel state");
                continue;
            }
        };

        let decision = decide(&channel, &state, &now);
        debug!(channel = %channel.id, evaluation = ?decision.evaluation, "refresh evaluated");
        if !decision.refresh {
            continue;
        }

        info!(channel = %channel.id, reason = %decision.reason, "refreshing");
        report.attempted += 1;

        match service.refresh(&channel.page_url).await {
            Ok(resolution) => {
                let at: DateTime<Utc> = now.with_timezone(&Utc);
                match store.record_refresh(&channel.id, at).await {
                    Ok(()) => {
                        report.refreshed += 1;
                        info!(channel = %channel.id, stream = %resolution.stream_url, "refresh committed");
                    }
                    Err(e) => {
                        report.failed += 1;
                        error!(channel = %channel.id, error = %e, "stream cached but channel state not updated");
                    }
                }
            }
            Err(e) => {
                report.failed += 1;
                warn!(channel = %channel.id, error = %e, "refresh failed, keeping previous cache");
            }
        }
    }

    report
}
