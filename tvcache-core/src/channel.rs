use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// One resolved page, keyed by `page_url`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheEntry {
    pub page_url: String,
    pub stream_url: String,
    /// Unix seconds of the last successful resolution.
    pub updated_at: i64,
}

impl CacheEntry {
    pub fn age_secs(&self, now: i64) -> i64 {
        now - self.updated_at
    }

    pub fn is_fresh(&self, now: i64, ttl_secs: u64) -> bool {
        let ttl = i64::try_from(ttl_secs).unwrap_or(i64::MAX);
        self.age_secs(now) < ttl
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RefreshMode {
    #[default]
    None,
    Time,
    Interval,
    Both,
}

impl RefreshMode {
    pub fn uses_schedule(self) -> bool {
        matches!(self, Self::Time | Self::Both)
    }

    pub fn uses_interval(self) -> bool {
        matches!(self, Self::Interval | Self::Both)
    }
}

/// A tracked page together with its refresh policy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Channel {
    pub id: String,
    pub page_url: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub refresh_enabled: bool,
    #[serde(default)]
    pub refresh_mode: RefreshMode,
    /// Wall-clock `HH:MM` slots, kept as written so a bad entry never hides the others.
    #[serde(default)]
    pub refresh_times: Vec<String>,
    #[serde(default)]
    pub refresh_interval_hours: u32,
    #[serde(default)]
    pub manual_refresh_at: Option<DateTime<Utc>>,
}

/// Ten years.
pub const MAX_INTERVAL_HOURS: u32 = 24 * 366 * 10;

fn default_true() -> bool {
    true
}

impl Channel {
    pub fn new(id: impl Into<String>, page_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            page_url: page_url.into(),
            name: None,
            enabled: true,
            refresh_enabled: true,
            refresh_mode: RefreshMode::None,
            refresh_times: Vec::new(),
            refresh_interval_hours: 0,
            manual_refresh_at: None,
        }
    }

    /// Checks the policy invariants enforced on every registry write.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for raw in &self.refresh_times {
            parse_clock(raw)?;
        }
        if self.refresh_mode.uses_interval() && self.refresh_interval_hours == 0 {
            return Err(ConfigError::InvalidInterval);
        }
        if self.refresh_interval_hours > MAX_INTERVAL_HOURS {
            return Err(ConfigError::IntervalTooLong(self.refresh_interval_hours));
        }
        Ok(())
    }

    /// Parsed refresh slots; malformed entries are skipped.
    pub fn schedule(&self) -> Vec<NaiveTime> {
        self.refresh_times
            .iter()
            .filter_map(|raw| parse_clock(raw).ok())
            .collect()
    }

    pub fn is_schedulable(&self) -> bool {
        self.enabled && self.refresh_enabled
    }
}

/// Parses a strict 24h `HH:MM` value.
pub fn parse_clock(raw: &str) -> Result<NaiveTime, ConfigError> {
    let invalid = || ConfigError::InvalidClock(raw.to_owned());
    let (h, m) = raw.trim().split_once(':').ok_or_else(invalid)?;
    if h.is_empty() || h.len() > 2 || m.len() != 2 {
        return Err(invalid());
    }
    let hour: u32 = h.parse().map_err(|_| invalid())?;
    let minute: u32 = m.parse().map_err(|_| invalid())?;
    NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(invalid)
}

/// Mutable per-channel bookkeeping, stored apart from the policy record.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChannelState {
    pub last_refresh_at: Option<DateTime<Utc>>,
    pub last_open_at: Option<DateTime<Utc>>,
}

/// Process-wide switches, re-read at the top of every scan cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SystemSettings {
    #[serde(default = "default_true")]
    pub refresh_enabled: bool,
    #[serde(default = "default_scan_interval")]
    pub scan_interval_seconds: u64,
}

fn default_scan_interval() -> u64 {
    60
}

impl Default for SystemSettings {
    fn default() -> Self {
        Self {
            refresh_enabled: true,
            scan_interval_seconds: default_scan_interval(),
        }
    }
}

/// A channel with its current state, as listed by the registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChannelView {
    #[serde(flatten)]
    pub channel: Channel,
    pub state: ChannelState,
}
