//! Crate-wide error taxonomy.
//!
//! DESIGN
//! ======
//! Four failure families, none of them fatal to the session:
//! - [`TransportError`] — broker publish/subscribe failures. Retried with
//!   backoff by the channel router, never surfaced per-event to engines.
//! - [`StateViolation`] — an event that is invalid for the current state
//!   machine state. Logged and discarded; must never corrupt state.
//! - [`ResourceDenied`] — camera/microphone/screen permission refused.
//!   Surfaced to the caller of the toggle, other engines unaffected.
//! - [`UploadFailure`] — file upload failed; no partial registry entry.
//!
//! Every error carries a stable grepable code via [`ErrorCode`] so logs
//! and client-facing payloads can be matched without parsing messages.

use uuid::Uuid;

/// Grepable error code and retryable flag for structured errors.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

/// Broker-level publish/subscribe/presence failure.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("publish to {channel} failed: {reason}")]
    Publish { channel: String, reason: String },
    #[error("subscribe to {channel} failed: {reason}")]
    Subscribe { channel: String, reason: String },
    #[error("presence operation failed: {reason}")]
    Presence { reason: String },
}

impl ErrorCode for TransportError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Publish { .. } => "E_PUBLISH",
            Self::Subscribe { .. } => "E_SUBSCRIBE",
            Self::Presence { .. } => "E_PRESENCE",
        }
    }

    fn retryable(&self) -> bool {
        true
    }
}

/// An inbound event that is invalid for the receiving state machine.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind} from {peer} invalid in state {state}")]
pub struct StateViolation {
    /// Event kind that was rejected (e.g. `"answer"`).
    pub kind: &'static str,
    /// Peer the event came from.
    pub peer: Uuid,
    /// State the pair was in when the event arrived.
    pub state: &'static str,
}

impl ErrorCode for StateViolation {
    fn error_code(&self) -> &'static str {
        "E_STATE_VIOLATION"
    }
}

/// Local media device or permission refusal.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ResourceDenied {
    #[error("microphone access denied: {0}")]
    Microphone(String),
    #[error("camera access denied: {0}")]
    Camera(String),
    #[error("screen capture denied: {0}")]
    Screen(String),
}

impl ErrorCode for ResourceDenied {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Microphone(_) => "E_MIC_DENIED",
            Self::Camera(_) => "E_CAMERA_DENIED",
            Self::Screen(_) => "E_SCREEN_DENIED",
        }
    }
}

/// File upload failed before any registry entry was created.
#[derive(Debug, Clone, thiserror::Error)]
#[error("upload of {filename} failed: {reason}")]
pub struct UploadFailure {
    pub filename: String,
    pub reason: String,
}

impl ErrorCode for UploadFailure {
    fn error_code(&self) -> &'static str {
        "E_UPLOAD_FAILED"
    }

    fn retryable(&self) -> bool {
        true
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
