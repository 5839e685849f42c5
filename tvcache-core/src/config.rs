use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ConfigError;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Fetch the document and pattern-match its text, following iframes.
    #[default]
    Static,
    /// Run the page in a headless browser and watch its network traffic.
    Dynamic,
}

impl std::str::FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "static" => Ok(Self::Static),
            "dynamic" => Ok(Self::Dynamic),
            other => Err(format!("unknown strategy {other:?}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub strategy: Strategy,
    pub max_depth: usize,
    pub request_timeout_secs: u64,
    pub navigation_timeout_secs: u64,
    pub capture_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::Static,
            max_depth: 2,
            request_timeout_secs: 12,
            navigation_timeout_secs: 20,
            capture_timeout_secs: 25,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }
}

/// Timeouts are whole seconds, never below one.
impl ResolverConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs.max(1))
    }

    pub fn capture_timeout(&self) -> Duration {
        Duration::from_secs(self.capture_timeout_secs.max(1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub bind_address: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub cache_ttl_secs: u64,
    /// Script loaded by the playback page for browsers without native HLS.
    pub player_script_url: String,
    pub resolver: ResolverConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_owned(),
            port: 19841,
            data_dir: default_config_dir(),
            cache_ttl_secs: 6 * 60 * 60,
            player_script_url: "https://cdn.jsdelivr.net/npm/hls.js@1/dist/hls.min.js".to_owned(),
            resolver: ResolverConfig::default(),
        }
    }
}

/// `~/.config/tvcache` on Linux, falling back to the working directory.
pub fn default_config_dir() -> PathBuf {
    let mut dir = dirs::config_dir()
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_default();
    dir.push("tvcache");
    dir
}

impl ServiceConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let bytes = std::fs::read(path.as_ref())?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Loads the config file named by `TVCACHE_CONFIG` (or the default location),
    /// falling back to defaults, then applies environment overrides.
    pub fn load() -> Self {
        let path = std::env::var_os("TVCACHE_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|| default_config_dir().join("config.json"));

        let mut config = if path.exists() {
            match Self::from_file(&path) {
                Ok(config) => {
                    info!(path = %path.display(), "loaded configuration");
                    config
                }
                Err(e) => {
                    warn!(error = %e, path = %path.display(), "failed to load configuration, using defaults");
                    Self::default()
                }
            }
        } else {
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// Applies `TVCACHE_*` overrides read through `lookup`. Unparseable values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        fn parsed<T: std::str::FromStr>(
            lookup: &impl Fn(&str) -> Option<String>,
            key: &str,
        ) -> Option<T> {
            let raw = lookup(key)?;
            match raw.trim().parse() {
                Ok(v) => Some(v),
                Err(_) => {
                    warn!(key, value = %raw, "ignoring malformed environment override");
                    None
                }
            }
        }

        if let Some(v) = lookup("TVCACHE_BIND") {
            self.bind_address = v;
        }
        if let Some(v) = parsed(&lookup, "TVCACHE_PORT") {
            self.port = v;
        }
        if let Some(v) = lookup("TVCACHE_DATA_DIR") {
            self.data_dir = PathBuf::from(v);
        }
        if let Some(v) = parsed(&lookup, "TVCACHE_CACHE_TTL") {
            self.cache_ttl_secs = v;
        }
        if let Some(v) = parsed(&lookup, "TVCACHE_STRATEGY") {
            self.resolver.strategy = v;
        }
        if let Some(v) = parsed(&lookup, "TVCACHE_MAX_DEPTH") {
            self.resolver.max_depth = v;
        }
        if let Some(v) = parsed(&lookup, "TVCACHE_REQUEST_TIMEOUT") {
            self.resolver.request_timeout_secs = v;
        }
    }
}
