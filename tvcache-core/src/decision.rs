//! Refresh decision engine.
//!
//! Pure functions of `(channel, state, now)`. Wall-clock schedule slots are
//! interpreted in the timezone carried by `now`, so the scheduler passes local
//! time and tests can pin any offset.

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use serde::Serialize;

use crate::channel::{Channel, ChannelState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshReason {
    Manual,
    Scheduled,
    Interval,
    None,
}

impl std::fmt::Display for RefreshReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Manual => "manual",
            Self::Scheduled => "scheduled",
            Self::Interval => "interval",
            Self::None => "none",
        })
    }
}

/// Outcome of each rule, evaluated independently.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Evaluation {
    pub manual: bool,
    pub scheduled: bool,
    pub interval: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub refresh: bool,
    pub reason: RefreshReason,
    pub evaluation: Evaluation,
}

impl Decision {
    fn from_evaluation(evaluation: Evaluation) -> Self {
        let reason = if evaluation.manual {
            RefreshReason::Manual
        } else if evaluation.scheduled {
            RefreshReason::Scheduled
        } else if evaluation.interval {
            RefreshReason::Interval
        } else {
            RefreshReason::None
        };
        Self {
            refresh: reason != RefreshReason::None,
            reason,
            evaluation,
        }
    }
}

/// Decides whether `channel` must be re-resolved at `now`.
///
/// Priority is manual, then scheduled, then interval. Disabled channels and
/// channels with refresh turned off always get `none`.
pub fn decide<Tz: TimeZone>(channel: &Channel, state: &ChannelState, now: &DateTime<Tz>) -> Decision {
    Decision::from_evaluation(evaluate(channel, state, now))
}

pub fn evaluate<Tz: TimeZone>(
    channel: &Channel,
    state: &ChannelState,
    now: &DateTime<Tz>,
) -> Evaluation {
    if !channel.is_schedulable() {
        return Evaluation::default();
    }
    Evaluation {
        manual: manual_due(channel, now),
        scheduled: schedule_due(channel, state, now),
        interval: interval_due(channel, state, now),
    }
}

fn manual_due<Tz: TimeZone>(channel: &Channel, now: &DateTime<Tz>) -> bool {
    channel
        .manual_refresh_at
        .is_some_and(|requested| now.with_timezone(&Utc) >= requested)
}

/// A slot is due once today's instant for it has passed and no refresh has
/// been committed since that instant. An earlier slot already covered today
/// stays quiet; a later slot fires when reached.
fn schedule_due<Tz: TimeZone>(channel: &Channel, state: &ChannelState, now: &DateTime<Tz>) -> bool {
    if !channel.refresh_mode.uses_schedule() {
        return false;
    }
    let tz = now.timezone();
    let today = now.date_naive();

    channel.schedule().into_iter().any(|slot| {
        // Slots falling in a DST gap do not exist today.
        let Some(instant) = tz.from_local_datetime(&today.and_time(slot)).earliest() else {
            return false;
        };
        *now >= instant
            && state
                .last_refresh_at
                .map_or(true, |last| last < instant.with_timezone(&Utc))
    })
}

fn interval_due<Tz: TimeZone>(channel: &Channel, state: &ChannelState, now: &DateTime<Tz>) -> bool {
    if !channel.refresh_mode.uses_interval() || channel.refresh_interval_hours == 0 {
        return false;
    }
    let Some(opened) = state.last_open_at else {
        return false;
    };
    // Past the representable range: never due.
    let Some(due_at) = TimeDelta::try_hours(i64::from(channel.refresh_interval_hours))
        .and_then(|interval| opened.checked_add_signed(interval))
    else {
        return false;
    };
    now.with_timezone(&Utc) >= due_at && state.last_refresh_at.map_or(true, |last| last < opened)
}
