//! Typed wire events — the universal message shapes for a room session.
//!
//! ARCHITECTURE
//! ============
//! Every room is carried over four topics, and every event on a topic is
//! one of a small set of kinds. The broker moves `(kind, payload)` pairs;
//! this module is the single boundary where untyped payloads become typed
//! variants. Nothing past [`RoomEvent::decode`] ever touches raw JSON.
//!
//! The camelCase field names below are the authoritative wire contract —
//! they interoperate with the other platform clients and must not change.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Unique identifier for a participant.
pub type ParticipantId = Uuid;

/// Unique identifier for a room.
pub type RoomId = Uuid;

/// Current time as milliseconds since Unix epoch.
#[must_use]
pub fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

// =============================================================================
// TOPICS
// =============================================================================

/// The four logical topics scoping one room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    Whiteboard,
    Chat,
    Files,
    Signaling,
}

impl Topic {
    /// All topics, in subscription order.
    pub const ALL: [Topic; 4] = [Topic::Whiteboard, Topic::Chat, Topic::Files, Topic::Signaling];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Whiteboard => "whiteboard",
            Self::Chat => "chat",
            Self::Files => "files",
            Self::Signaling => "signaling",
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// PAYLOADS
// =============================================================================

/// Drawing tool for a stroke segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    Pen,
    Eraser,
}

/// One stroke segment. Immutable once published.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawEvent {
    pub author_id: ParticipantId,
    /// Monotonically increasing per-author sequence number.
    pub seq: u64,
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    /// CSS hex color, e.g. `"#ff0000"`.
    pub color: String,
    pub width: f64,
    pub tool: ToolKind,
    /// Logical timestamp, milliseconds since epoch.
    pub ts: i64,
}

/// Canvas clear marker. Truncates visual state, never the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearEvent {
    pub author_id: ParticipantId,
    pub seq: u64,
}

/// A chat message as published.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessageEvent {
    pub sender_id: ParticipantId,
    pub content: String,
    /// Sender's client timestamp, milliseconds since epoch.
    pub timestamp: i64,
}

/// Typing / stop-typing presence marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingEvent {
    pub participant_id: ParticipantId,
}

/// Shared-file announcement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSharedEvent {
    /// Generated per upload; unique even when filenames collide.
    pub id: Uuid,
    pub filename: String,
    pub url: String,
    pub size: u64,
    pub uploader_id: ParticipantId,
    pub timestamp: i64,
}

/// WebRTC offer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferEvent {
    pub from_id: ParticipantId,
    pub to_id: ParticipantId,
    pub sdp: String,
}

/// WebRTC answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerEvent {
    pub from_id: ParticipantId,
    pub to_id: ParticipantId,
    pub sdp: String,
}

/// ICE connectivity candidate, applied after the remote description is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidateEvent {
    pub from_id: ParticipantId,
    pub to_id: ParticipantId,
    pub candidate: String,
}

// =============================================================================
// TAGGED VARIANTS
// =============================================================================

/// Events on the whiteboard topic.
#[derive(Debug, Clone, PartialEq)]
pub enum WhiteboardEvent {
    Draw(DrawEvent),
    Clear(ClearEvent),
}

/// Events on the chat topic.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    Message(ChatMessageEvent),
    Typing(TypingEvent),
    StopTyping(TypingEvent),
}

/// Events on the files topic.
#[derive(Debug, Clone, PartialEq)]
pub enum FileEvent {
    FileShared(FileSharedEvent),
}

/// Events on the signaling topic.
#[derive(Debug, Clone, PartialEq)]
pub enum SignalEvent {
    Offer(OfferEvent),
    Answer(AnswerEvent),
    IceCandidate(IceCandidateEvent),
}

/// A fully typed room event: topic + kind + payload in one value.
#[derive(Debug, Clone, PartialEq)]
pub enum RoomEvent {
    Whiteboard(WhiteboardEvent),
    Chat(ChatEvent),
    Files(FileEvent),
    Signaling(SignalEvent),
}

/// Decode failure at the router boundary.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("unknown kind {kind:?} on topic {topic}")]
    UnknownKind { topic: Topic, kind: String },
    #[error("malformed {kind} payload: {source}")]
    BadPayload {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl crate::error::ErrorCode for DecodeError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownKind { .. } => "E_UNKNOWN_KIND",
            Self::BadPayload { .. } => "E_BAD_PAYLOAD",
        }
    }
}

fn parse<T: serde::de::DeserializeOwned>(kind: &'static str, payload: &Value) -> Result<T, DecodeError> {
    serde_json::from_value(payload.clone()).map_err(|source| DecodeError::BadPayload { kind, source })
}

impl RoomEvent {
    /// Topic this event belongs on.
    #[must_use]
    pub fn topic(&self) -> Topic {
        match self {
            Self::Whiteboard(_) => Topic::Whiteboard,
            Self::Chat(_) => Topic::Chat,
            Self::Files(_) => Topic::Files,
            Self::Signaling(_) => Topic::Signaling,
        }
    }

    /// Wire event-kind string.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Whiteboard(WhiteboardEvent::Draw(_)) => "draw",
            Self::Whiteboard(WhiteboardEvent::Clear(_)) => "clear",
            Self::Chat(ChatEvent::Message(_)) => "message",
            Self::Chat(ChatEvent::Typing(_)) => "typing",
            Self::Chat(ChatEvent::StopTyping(_)) => "stop-typing",
            Self::Files(FileEvent::FileShared(_)) => "file-shared",
            Self::Signaling(SignalEvent::Offer(_)) => "offer",
            Self::Signaling(SignalEvent::Answer(_)) => "answer",
            Self::Signaling(SignalEvent::IceCandidate(_)) => "ice-candidate",
        }
    }

    /// Serialize the payload for publication.
    #[must_use]
    pub fn payload(&self) -> Value {
        let encoded = match self {
            Self::Whiteboard(WhiteboardEvent::Draw(e)) => serde_json::to_value(e),
            Self::Whiteboard(WhiteboardEvent::Clear(e)) => serde_json::to_value(e),
            Self::Chat(ChatEvent::Message(e)) => serde_json::to_value(e),
            Self::Chat(ChatEvent::Typing(e) | ChatEvent::StopTyping(e)) => serde_json::to_value(e),
            Self::Files(FileEvent::FileShared(e)) => serde_json::to_value(e),
            Self::Signaling(SignalEvent::Offer(e)) => serde_json::to_value(e),
            Self::Signaling(SignalEvent::Answer(e)) => serde_json::to_value(e),
            Self::Signaling(SignalEvent::IceCandidate(e)) => serde_json::to_value(e),
        };
        encoded.unwrap_or_else(|_| serde_json::json!({}))
    }

    /// Validate and decode an inbound `(topic, kind, payload)` triple.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] when the kind is unknown for the topic or
    /// the payload does not match the kind's wire shape.
    pub fn decode(topic: Topic, kind: &str, payload: &Value) -> Result<Self, DecodeError> {
        match (topic, kind) {
            (Topic::Whiteboard, "draw") => Ok(Self::Whiteboard(WhiteboardEvent::Draw(parse("draw", payload)?))),
            (Topic::Whiteboard, "clear") => Ok(Self::Whiteboard(WhiteboardEvent::Clear(parse("clear", payload)?))),
            (Topic::Chat, "message") => Ok(Self::Chat(ChatEvent::Message(parse("message", payload)?))),
            (Topic::Chat, "typing") => Ok(Self::Chat(ChatEvent::Typing(parse("typing", payload)?))),
            (Topic::Chat, "stop-typing") => Ok(Self::Chat(ChatEvent::StopTyping(parse("stop-typing", payload)?))),
            (Topic::Files, "file-shared") => Ok(Self::Files(FileEvent::FileShared(parse("file-shared", payload)?))),
            (Topic::Signaling, "offer") => Ok(Self::Signaling(SignalEvent::Offer(parse("offer", payload)?))),
            (Topic::Signaling, "answer") => Ok(Self::Signaling(SignalEvent::Answer(parse("answer", payload)?))),
            (Topic::Signaling, "ice-candidate") => {
                Ok(Self::Signaling(SignalEvent::IceCandidate(parse("ice-candidate", payload)?)))
            }
            _ => Err(DecodeError::UnknownKind { topic, kind: kind.to_owned() }),
        }
    }
}

#[cfg(test)]
#[path = "event_test.rs"]
mod tests;
