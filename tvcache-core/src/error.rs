use thiserror::Error;

/// Why a single resolution attempt produced no stream.
///
/// These never cross the resolver boundary: callers only see `None`.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("network error: {0}")]
    Fetch(#[from] reqwest::Error),
    #[error("page answered with HTTP {0}")]
    Status(u16),
    #[error("page body is empty")]
    EmptyBody,
    #[error("invalid page url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("no media url found in document")]
    ParseMiss,
    #[error("frame depth {depth} exceeds limit {max}")]
    DepthExceeded { depth: usize, max: usize },
    #[error("failed to launch browser: {0}")]
    BrowserLaunch(String),
    #[error("navigation failed: {0}")]
    Navigation(String),
    #[error("navigation timed out")]
    NavigationTimeout,
    #[error("no media request observed before capture deadline")]
    CaptureTimeout,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("unknown channel: {0}")]
    UnknownChannel(String),
    #[error("invalid channel: {0}")]
    InvalidChannel(#[from] ConfigError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid refresh time {0:?}, expected HH:MM")]
    InvalidClock(String),
    #[error("refresh interval must be greater than zero when interval mode is active")]
    InvalidInterval,
    #[error("refresh interval of {0} hours is too long")]
    IntervalTooLong(u32),
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("stream not found")]
    NotFound,
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("scheduler task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
