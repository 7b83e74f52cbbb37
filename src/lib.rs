//! Room-session synchronization engine for multi-party study rooms.
//!
//! ARCHITECTURE
//! ============
//! A study room is a bounded real-time session carried over four pub/sub
//! topics (whiteboard, chat, files, signaling). Every client is an
//! independent replica: a local action is applied to local state first,
//! then published; inbound broker events flow through the same apply path,
//! so "my action" and "their action" replay identically.
//!
//! The composition root is [`session::RoomSessionController`], which owns
//! one engine per concern for the joined room and routes inbound events by
//! topic and kind. The pub/sub transport, the WebRTC media path, file
//! storage, and local capture devices are external collaborators consumed
//! behind traits ([`broker::Broker`], [`files::FileUploader`],
//! [`session::MediaDevices`], [`signaling::PeerConnector`]).
//!
//! ERROR HANDLING
//! ==============
//! Nothing here is fatal. Publish failures are retried with backoff inside
//! [`channel::ChannelRouter`]; invalid inbound payloads are rejected at the
//! decode boundary; signaling state-machine violations are logged and
//! discarded. Engines are isolated — a failed peer connection degrades one
//! media pair while whiteboard and chat keep working.

pub mod broker;
pub mod channel;
pub mod chat;
pub mod config;
pub mod error;
pub mod event;
pub mod files;
pub mod raster;
pub mod session;
pub mod signaling;
pub mod whiteboard;

pub use broker::{Broker, Inbound, Participant, PresenceAction, PresenceUpdate};
pub use channel::ChannelRouter;
pub use chat::ChatStream;
pub use config::Config;
pub use error::{ErrorCode, ResourceDenied, StateViolation, TransportError, UploadFailure};
pub use event::{ParticipantId, RoomEvent, RoomId, ToolKind, Topic};
pub use files::{FileId, FileShareRegistry, FileUploader, SharedFile};
pub use raster::Raster;
pub use session::{MediaDevices, MediaTrack, RoomSessionController, SessionError};
pub use signaling::{PairState, PeerConnector, PeerLink, RtcError, SignalingCoordinator};
pub use whiteboard::WhiteboardSyncEngine;
