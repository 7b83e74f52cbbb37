//! Channel naming and outbound publishing.
//!
//! DESIGN
//! ======
//! Every room fans out over four broker channels, one per topic, named
//! `study-room:{roomId}:{topic}`, plus the bare `study-room:{roomId}`
//! channel carrying presence. The router owns the naming scheme so no
//! other module ever formats a channel string.
//!
//! Publishing is fire-and-forget: the caller's state is already updated
//! locally, so the publish runs on a spawned task with bounded retries
//! and doubling backoff. Exhausting the retries logs a warning and drops
//! the message; local state is never rolled back.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::broker::{Broker, Inbound};
use crate::config::Config;
use crate::error::TransportError;
use crate::event::{RoomEvent, RoomId, Topic};

/// Per-room publish/subscribe front end over the broker.
pub struct ChannelRouter {
    broker: Arc<dyn Broker>,
    room_id: RoomId,
    retry_limit: u32,
    backoff_initial: Duration,
    backoff_max: Duration,
}

impl ChannelRouter {
    #[must_use]
    pub fn new(broker: Arc<dyn Broker>, room_id: RoomId, config: &Config) -> Self {
        Self {
            broker,
            room_id,
            retry_limit: config.publish_retry_limit,
            backoff_initial: config.publish_backoff_initial,
            backoff_max: config.publish_backoff_max,
        }
    }

    /// Topic channel name, `study-room:{roomId}:{topic}`.
    #[must_use]
    pub fn channel_name(room_id: RoomId, topic: Topic) -> String {
        format!("study-room:{room_id}:{topic}")
    }

    /// Presence channel name, `study-room:{roomId}`.
    #[must_use]
    pub fn presence_channel(room_id: RoomId) -> String {
        format!("study-room:{room_id}")
    }

    #[must_use]
    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    /// Subscribe `tx` to all four topic channels.
    ///
    /// # Errors
    ///
    /// Returns the first [`TransportError::Subscribe`] encountered; the
    /// caller abandons the join in that case.
    pub async fn subscribe_all(&self, tx: &mpsc::Sender<Inbound>) -> Result<(), TransportError> {
        for topic in Topic::ALL {
            let channel = Self::channel_name(self.room_id, topic);
            self.broker.subscribe(&channel, topic, tx.clone()).await?;
        }
        Ok(())
    }

    /// Drop the subscriptions on all four topic channels.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the broker rejects an unsubscribe.
    pub async fn unsubscribe_all(&self) -> Result<(), TransportError> {
        for topic in Topic::ALL {
            let channel = Self::channel_name(self.room_id, topic);
            self.broker.unsubscribe(&channel).await?;
        }
        Ok(())
    }

    /// Publish an event on its topic channel, fire-and-forget. Retries
    /// with doubling backoff up to the configured limit, then logs and
    /// drops.
    pub fn publish(&self, event: &RoomEvent) {
        let channel = Self::channel_name(self.room_id, event.topic());
        let kind = event.kind();
        let payload = event.payload();
        let broker = Arc::clone(&self.broker);
        let retry_limit = self.retry_limit;
        let backoff_max = self.backoff_max;
        let mut backoff = self.backoff_initial;

        tokio::spawn(async move {
            let mut attempt = 0u32;
            loop {
                match broker.publish(&channel, kind, payload.clone()).await {
                    Ok(()) => return,
                    Err(err) => {
                        attempt += 1;
                        if attempt > retry_limit {
                            warn!(%channel, kind, %err, "publish retries exhausted, dropping message");
                            return;
                        }
                        debug!(%channel, kind, attempt, %err, "publish failed, retrying");
                        tokio::time::sleep(backoff).await;
                        backoff = (backoff * 2).min(backoff_max);
                    }
                }
            }
        });
    }
}

#[cfg(test)]
#[path = "channel_test.rs"]
mod tests;
