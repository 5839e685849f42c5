//! Embedded JSON store: one document per collection inside a data directory.
//!
//! Each collection lives behind its own lock. Mutations hold the collection's
//! persist lock from snapshot to rename, so the file on disk never goes back to
//! an older snapshot when two writers race.

mod cache;
mod registry;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::channel::{CacheEntry, Channel, ChannelState, SystemSettings};
use crate::error::StoreError;

const CACHE_FILE: &str = "stream_cache.json";
const CHANNELS_FILE: &str = "channels.json";
const STATE_FILE: &str = "channel_state.json";
const SETTINGS_FILE: &str = "settings.json";

/// A JSON-backed collection.
#[derive(Debug)]
struct Collection<T> {
    data: RwLock<T>,
    persist_lock: Mutex<()>,
    path: PathBuf,
}

impl<T> Collection<T>
where
    T: Serialize + DeserializeOwned + Default + Clone,
{
    async fn load(path: PathBuf) -> Self {
        let data = read_json_with_tmp_fallback(&path).await;
        Self {
            data: RwLock::new(data),
            persist_lock: Mutex::new(()),
            path,
        }
    }

    /// Applies `f` to a copy, writes it atomically, and only then publishes it.
    /// A failed write leaves memory as it was on disk.
    async fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R, StoreError> {
        let _persist = self.persist_lock.lock().await;
        let mut next = self.data.read().await.clone();
        let out = f(&mut next);
        let bytes = serde_json::to_vec_pretty(&next)?;
        write_atomic(&self.path, &bytes).await?;
        *self.data.write().await = next;
        Ok(out)
    }
}

/// Reads JSON, falling back to the `.json.tmp` sibling (left by an interrupted
/// write) when the main file is corrupted, and to `T::default()` otherwise.
async fn read_json_with_tmp_fallback<T: DeserializeOwned + Default>(path: &Path) -> T {
    match tokio::fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice::<T>(&bytes) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, path = %path.display(), "failed to parse JSON, trying tmp fallback");
                let tmp = path.with_extension("json.tmp");
                match tokio::fs::read(&tmp).await {
                    Ok(tmp_bytes) => serde_json::from_slice::<T>(&tmp_bytes).unwrap_or_default(),
                    Err(_) => Default::default(),
                }
            }
        },
        Err(e) => {
            debug!(error = %e, path = %path.display(), "collection not found, starting empty");
            Default::default()
        }
    }
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    // Ecriture atomique
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

/// Cache store and channel registry over a single data directory.
///
/// Cloning is cheap; clones share the same in-memory collections.
#[derive(Debug, Clone)]
pub struct StreamStore {
    cache: Arc<Collection<HashMap<String, CacheEntry>>>,
    channels: Arc<Collection<Vec<Channel>>>,
    states: Arc<Collection<HashMap<String, ChannelState>>>,
    settings: Arc<Collection<SystemSettings>>,
    dir: PathBuf,
}

impl StreamStore {
    /// Opens (or initializes) the store in `dir`. Existing documents are kept;
    /// missing ones start empty and are only written on the first mutation.
    pub async fn open(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref().to_path_buf();
        if let Err(e) = tokio::fs::create_dir_all(&dir).await {
            warn!(error = %e, path = %dir.display(), "failed to create data dir");
        }

        Self {
            cache: Arc::new(Collection::load(dir.join(CACHE_FILE)).await),
            channels: Arc::new(Collection::load(dir.join(CHANNELS_FILE)).await),
            states: Arc::new(Collection::load(dir.join(STATE_FILE)).await),
            settings: Arc::new(Collection::load(dir.join(SETTINGS_FILE)).await),
            dir,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Reads the settings document from disk so out-of-band edits apply on the
    /// next scan cycle. A missing document yields the defaults.
    pub async fn settings(&self) -> Result<SystemSettings, StoreError> {
        let _persist = self.settings.persist_lock.lock().await;
        let fresh = match tokio::fs::read(&self.settings.path).await {
            Ok(bytes) => serde_json::from_slice::<SystemSettings>(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                self.settings.data.read().await.clone()
            }
            Err(e) => return Err(e.into()),
        };
        *self.settings.data.write().await = fresh.clone();
        Ok(fresh)
    }

    pub async fn update_settings(&self, settings: SystemSettings) -> Result<(), StoreError> {
        self.settings.update(|current| *current = settings).await
    }
}
