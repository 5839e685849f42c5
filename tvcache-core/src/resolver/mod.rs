//! Page URL → stream URL resolution.
//!
//! Two interchangeable strategies sit behind [`Resolver`], picked once from
//! configuration. Whatever went wrong inside a strategy, callers only see
//! `None`; the cause is logged here.

#[cfg(feature = "headless")]
mod capture;
pub mod patterns;
mod scan;

#[cfg(feature = "headless")]
pub use capture::BrowserCapture;
pub use scan::StaticScanner;

use tracing::{info, warn};

use crate::config::{ResolverConfig, Strategy};
use crate::error::ResolveError;

#[derive(Debug, Clone)]
pub enum Resolver {
    Static(StaticScanner),
    #[cfg(feature = "headless")]
    Dynamic(BrowserCapture),
}

impl Resolver {
    pub fn from_config(config: &ResolverConfig) -> Result<Self, ResolveError> {
        match config.strategy {
            Strategy::Static => Ok(Self::Static(StaticScanner::new(config)?)),
            #[cfg(feature = "headless")]
            Strategy::Dynamic => Ok(Self::Dynamic(BrowserCapture::new(config))),
            #[cfg(not(feature = "headless"))]
            Strategy::Dynamic => {
                warn!("dynamic strategy requires the `headless` feature, falling back to static scan");
                Ok(Self::Static(StaticScanner::new(config)?))
            }
        }
    }

    pub fn strategy(&self) -> Strategy {
        match self {
            Self::Static(_) => Strategy::Static,
            #[cfg(feature = "headless")]
            Self::Dynamic(_) => Strategy::Dynamic,
        }
    }

    /// Resolves `page_url` to a stream URL, or `None` when nothing was found.
    ///
    /// Never touches the cache.
    pub async fn resolve(&self, page_url: &str) -> Option<String> {
        let outcome = match self {
            Self::Static(scanner) => scanner.resolve(page_url).await,
            #[cfg(feature = "headless")]
            Self::Dynamic(capture) => capture.resolve(page_url).await,
        };

        match outcome {
            Ok(stream) => {
                info!(page = %page_url, stream = %stream, "stream resolved");
                Some(stream)
            }
            Err(e @ (ResolveError::ParseMiss | ResolveError::DepthExceeded { .. })) => {
                info!(page = %page_url, reason = %e, "no stream in page");
                None
            }
            Err(e) => {
                warn!(page = %page_url, error = %e, "stream resolution failed");
                None
            }
        }
    }
}
