use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use crate::channel::CacheEntry;
use crate::error::ServiceError;
use crate::resolver::Resolver;
use crate::store::StreamStore;

/// Where a served stream came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Cache,
    Resolved,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub stream_url: String,
    pub updated_at: i64,
    pub source: Source,
}

/// Resolver and cache store composed into the operations consumers use.
#[derive(Debug, Clone)]
pub struct StreamService {
    resolver: Resolver,
    store: StreamStore,
    ttl_secs: u64,
}

impl StreamService {
    pub fn new(resolver: Resolver, store: StreamStore, ttl_secs: u64) -> Self {
        Self {
            resolver,
            store,
            ttl_secs,
        }
    }

    pub fn store(&self) -> &StreamStore {
        &self.store
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    /// Serves a cached stream younger than the TTL without touching the
    /// resolver; otherwise resolves and writes through.
    ///
    /// A failed resolution leaves any stale entry in place: it is only ever
    /// replaced by a later successful resolution.
    #[instrument(skip(self))]
    pub async fn resolve_and_cache(&self, page_url: &str) -> Result<Resolution, ServiceError> {
        let now = Utc::now().timestamp();
        if let Some(entry) = self.store.get(page_url).await {
            if entry.is_fresh(now, self.ttl_secs) {
                debug!(age_secs = entry.age_secs(now), "serving cached stream");
                return Ok(cached(entry));
            }
            debug!(age_secs = entry.age_secs(now), "cached stream expired");
        }
        self.refresh(page_url).await
    }

    /// Resolves bypassing the cache and writes the result through on success.
    #[instrument(skip(self))]
    pub async fn refresh(&self, page_url: &str) -> Result<Resolution, ServiceError> {
        let Some(stream_url) = self.resolver.resolve(page_url).await else {
            if self.store.get(page_url).await.is_some() {
                info!("resolution failed, keeping previous cached stream");
            }
            return Err(ServiceError::NotFound);
        };
        let updated_at = self.store.set(page_url, &stream_url).await.map_err(|e| {
            warn!(error = %e, "failed to persist resolved stream");
            e
        })?;
        Ok(Resolution {
            stream_url,
            updated_at,
            source: Source::Resolved,
        })
    }

    /// Notes a consumer access for channels tracking `page_url`. Failures are
    /// logged only: they must not fail the request being served.
    pub async fn record_open(&self, page_url: &str) {
        if let Err(e) = self.store.record_open(page_url, Utc::now()).await {
            warn!(page = %page_url, error = %e, "failed to record channel access");
        }
    }
}

fn cached(entry: CacheEntry) -> Resolution {
    Resolution {
        stream_url: entry.stream_url,
        updated_at: entry.updated_at,
        source: Source::Cache,
    }
}
