use chrono::{DateTime, Utc};
use tracing::debug;

use super::StreamStore;
use crate::channel::{Channel, ChannelState, ChannelView};
use crate::error::StoreError;

impl StreamStore {
    pub async fn list_channels(&self) -> Result<Vec<Channel>, StoreError> {
        Ok(self.channels.data.read().await.clone())
    }

    pub async fn channel(&self, id: &str) -> Option<Channel> {
        self.channels
            .data
            .read()
            .await
            .iter()
            .find(|c| c.id == id)
            .cloned()
    }

    /// Channels joined with their state, in registry order.
    pub async fn channel_views(&self) -> Result<Vec<ChannelView>, StoreError> {
        let channels = self.list_channels().await?;
        let states = self.states.data.read().await;
        Ok(channels
            .into_iter()
            .map(|channel| {
                let state = states.get(&channel.id).cloned().unwrap_or_default();
                ChannelView { channel, state }
            })
            .collect())
    }

    /// Validates and inserts or replaces a channel by id.
    pub async fn upsert_channel(&self, channel: Channel) -> Result<(), StoreError> {
        channel.validate()?;
        self.channels
            .update(|channels| {
                if let Some(slot) = channels.iter_mut().find(|c| c.id == channel.id) {
                    *slot = channel;
                } else {
                    channels.push(channel);
                }
            })
            .await
    }

    /// Removes a channel and its state. Returns whether it existed.
    pub async fn remove_channel(&self, id: &str) -> Result<bool, StoreError> {
        let existed = self
            .channels
            .update(|channels| {
                let before = channels.len();
                channels.retain(|c| c.id != id);
                channels.len() != before
            })
            .await?;
        if existed {
            self.states
                .update(|states| {
                    states.remove(id);
                })
                .await?;
        }
        Ok(existed)
    }

    /// State for `id`; a channel seen for the first time gets an empty state.
    pub async fn channel_state(&self, id: &str) -> Result<ChannelState, StoreError> {
        Ok(self
            .states
            .data
            .read()
            .await
            .get(id)
            .cloned()
            .unwrap_or_default())
    }

    /// Requests a one-shot refresh at or after `at`.
    pub async fn request_manual_refresh(
        &self,
        id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let found = self
            .channels
            .update(|channels| match channels.iter_mut().find(|c| c.id == id) {
                Some(channel) => {
                    channel.manual_refresh_at = Some(at);
                    true
                }
                None => false,
            })
            .await?;
        if found {
            Ok(())
        } else {
            Err(StoreError::UnknownChannel(id.to_owned()))
        }
    }

    /// Records a successful refresh and clears a manual request that is now consumed.
    pub async fn record_refresh(&self, id: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.states
            .update(|states| {
                states.entry(id.to_owned()).or_default().last_refresh_at = Some(at);
            })
            .await?;
        self.channels
            .update(|channels| {
                if let Some(channel) = channels.iter_mut().find(|c| c.id == id) {
                    if channel.manual_refresh_at.is_some_and(|requested| requested <= at) {
                        channel.manual_refresh_at = None;
                    }
                }
            })
            .await
    }

    /// Marks every channel tracking `page_url` as opened at `at`. Returns how many matched.
    pub async fn record_open(&self, page_url: &str, at: DateTime<Utc>) -> Result<usize, StoreError> {
        let ids: Vec<String> = self
            .channels
            .data
            .read()
            .await
            .iter()
            .filter(|c| c.page_url == page_url)
            .map(|c| c.id.clone())
            .collect();
        if ids.is_empty() {
            return Ok(0);
        }
        self.states
            .update(|states| {
                for id in &ids {
                    states.entry(id.clone()).or_default().last_open_at = Some(at);
                }
            })
            .await?;
        debug!(page = %page_url, channels = ids.len(), "recorded channel access");
        Ok(ids.len())
    }
}
