use chrono::Utc;
use tracing::debug;

use super::StreamStore;
use crate::channel::CacheEntry;
use crate::error::StoreError;

impl StreamStore {
    pub async fn get(&self, page_url: &str) -> Option<CacheEntry> {
        self.cache.data.read().await.get(page_url).cloned()
    }

    /// Upserts the stream for `page_url` and returns the stored `updated_at`.
    ///
    /// `updated_at` never moves backward for a key, even if the wall clock does.
    pub async fn set(&self, page_url: &str, stream_url: &str) -> Result<i64, StoreError> {
        let now = Utc::now().timestamp();
        self.cache
            .update(|entries| {
                let updated_at = entries
                    .get(page_url)
                    .map_or(now, |previous| previous.updated_at.max(now));
                entries.insert(
                    page_url.to_owned(),
                    CacheEntry {
                        page_url: page_url.to_owned(),
                        stream_url: stream_url.to_owned(),
                        updated_at,
                    },
                );
                debug!(page = %page_url, stream = %stream_url, updated_at, "cache entry written");
                updated_at
            })
            .await
    }

    /// All cached entries, most recently updated first.
    pub async fn entries(&self) -> Vec<CacheEntry> {
        let mut all: Vec<CacheEntry> = self.cache.data.read().await.values().cloned().collect();
        all.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        all
    }
}
