//! Message broker abstraction.
//!
//! DESIGN
//! ======
//! Everything the engines coordinate through travels over a pub/sub
//! broker with presence support. The broker is behind a dyn-safe async
//! trait so the session layer never touches a concrete transport and
//! tests run against an in-memory fan-out.
//!
//! Delivery contract assumed from the transport: per-publisher FIFO per
//! channel, at-least-once, and the publisher receives its own messages
//! back. The engines are built for exactly that — every one of them
//! tolerates own echoes and duplicates.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::TransportError;
use crate::event::{ParticipantId, Topic};

// =============================================================================
// PRESENCE TYPES
// =============================================================================

/// A room member as carried in presence data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub audio_on: bool,
    pub video_on: bool,
    pub screen_sharing: bool,
    pub is_host: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceAction {
    Enter,
    Leave,
}

/// One presence change on the room channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceUpdate {
    pub action: PresenceAction,
    pub participant: Participant,
}

// =============================================================================
// INBOUND QUEUE ITEM
// =============================================================================

/// One item on a subscriber's inbound queue: either a topic message or a
/// presence change. Payloads stay as raw JSON until the dispatch path
/// decodes them.
#[derive(Debug, Clone)]
pub enum Inbound {
    Event { topic: Topic, kind: String, payload: Value },
    Presence(PresenceUpdate),
}

// =============================================================================
// BROKER TRAIT
// =============================================================================

/// Pub/sub transport with presence. Dyn-safe for mocking in tests.
#[async_trait::async_trait]
pub trait Broker: Send + Sync {
    /// Publish one message on a channel.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Publish`] when the transport rejects the
    /// message; callers decide whether to retry.
    async fn publish(&self, channel: &str, kind: &str, payload: Value) -> Result<(), TransportError>;

    /// Subscribe `tx` to a channel; deliveries arrive tagged with `topic`.
    async fn subscribe(
        &self,
        channel: &str,
        topic: Topic,
        tx: mpsc::Sender<Inbound>,
    ) -> Result<(), TransportError>;

    /// Drop all subscriptions on a channel for this client.
    async fn unsubscribe(&self, channel: &str) -> Result<(), TransportError>;

    /// Enter presence on the room channel and return the current roster,
    /// self included. Subsequent changes arrive on `tx` as
    /// [`Inbound::Presence`].
    async fn presence_enter(
        &self,
        channel: &str,
        participant: Participant,
        tx: mpsc::Sender<Inbound>,
    ) -> Result<Vec<Participant>, TransportError>;

    /// Leave presence on the room channel.
    async fn presence_leave(&self, channel: &str, participant_id: ParticipantId) -> Result<(), TransportError>;
}

// =============================================================================
// TEST HELPERS
// =============================================================================


#[cfg(test)]
#[path = "broker_test.rs"]
mod tests;
