//! Chat stream and typing presence.
//!
//! DESIGN
//! ======
//! Messages append in arrival order with a locally assigned sequence —
//! the broker guarantees per-publisher FIFO but no total order across
//! publishers, and the stream does not pretend otherwise.
//!
//! Typing presence is a TTL map: each typing event stamps an expiry, and
//! entries vanish on explicit stop-typing or on the sweep at read time,
//! whichever comes first. The upstream protocol had no TTL and leaked
//! entries when a client crashed mid-typing; the sweep is the fix. Reads
//! take an explicit `now` in the `_at` variants so tests inject clocks.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::event::{ChatMessageEvent, ParticipantId, TypingEvent, now_ms};

/// A chat message as stored locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub sender_id: ParticipantId,
    pub content: String,
    /// Sender's client timestamp, milliseconds since epoch.
    pub ts: i64,
    /// Room-scoped arrival sequence assigned by this client.
    pub seq: u64,
}

/// Per-room chat replica with ephemeral typing presence.
pub struct ChatStream {
    self_id: ParticipantId,
    messages: Vec<ChatMessage>,
    next_seq: u64,
    typing: HashMap<ParticipantId, Instant>,
    ttl: Duration,
}

impl ChatStream {
    #[must_use]
    pub fn new(self_id: ParticipantId, config: &Config) -> Self {
        Self { self_id, messages: Vec::new(), next_seq: 1, typing: HashMap::new(), ttl: config.typing_ttl }
    }

    // =========================================================================
    // MESSAGES
    // =========================================================================

    /// Append a local message and return the event to publish. Sending
    /// clears this client's own typing flag; the caller publishes the
    /// accompanying stop-typing event.
    pub fn send(&mut self, content: &str) -> ChatMessageEvent {
        let event = ChatMessageEvent { sender_id: self.self_id, content: content.to_owned(), timestamp: now_ms() };
        self.append(&event);
        self.typing.remove(&self.self_id);
        event
    }

    /// Append a remote message in arrival order. Own echoes are dropped —
    /// the local copy was appended at `send` time.
    pub fn receive(&mut self, event: &ChatMessageEvent) -> bool {
        if event.sender_id == self.self_id {
            return false;
        }
        self.append(event);
        // A message implies the sender stopped typing.
        self.typing.remove(&event.sender_id);
        true
    }

    fn append(&mut self, event: &ChatMessageEvent) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.messages.push(ChatMessage {
            sender_id: event.sender_id,
            content: event.content.clone(),
            ts: event.timestamp,
            seq,
        });
    }

    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    // =========================================================================
    // TYPING PRESENCE
    // =========================================================================

    /// Add or refresh a typing entry; it expires TTL from now unless
    /// refreshed or explicitly cleared.
    pub fn set_typing(&mut self, event: &TypingEvent) {
        self.set_typing_at(event.participant_id, Instant::now());
    }

    pub(crate) fn set_typing_at(&mut self, participant: ParticipantId, now: Instant) {
        self.typing.insert(participant, now + self.ttl);
    }

    /// Remove a typing entry on explicit stop-typing.
    pub fn clear_typing(&mut self, event: &TypingEvent) {
        self.typing.remove(&event.participant_id);
    }

    /// Participants currently typing, with expired entries swept out.
    #[must_use]
    pub fn typing(&mut self) -> Vec<ParticipantId> {
        self.typing_at(Instant::now())
    }

    pub(crate) fn typing_at(&mut self, now: Instant) -> Vec<ParticipantId> {
        self.typing.retain(|_, expiry| *expiry > now);
        let mut ids: Vec<ParticipantId> = self.typing.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

#[cfg(test)]
#[path = "chat_test.rs"]
mod tests;
