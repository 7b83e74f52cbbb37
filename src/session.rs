//! Room session controller.
//!
//! LIFECYCLE
//! =========
//! One controller per client. `join` instantiates one of each engine,
//! subscribes the four topic channels, and enters presence; `leave`
//! tears everything down locally first (tracks stopped, peer links
//! closed, state dropped) and detaches from the broker on a spawned
//! task so a slow network never blocks the caller.
//!
//! ARCHITECTURE
//! ============
//! The controller is the only owner of engine state. Inbound traffic
//! lands on a bounded queue and is drained by `process_pending` on the
//! caller's loop; local actions mutate the owning engine first and then
//! hand the outbound event to the router. Engine state is therefore
//! touched only from the caller's thread, never concurrently.
//!
//! ERROR HANDLING
//! ==============
//! Join-time transport failures abort the join and propagate. After
//! that, malformed or out-of-place inbound messages are logged and
//! dropped at the dispatch boundary; they never unwind into engine
//! state.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::broker::{Broker, Inbound, Participant, PresenceAction};
use crate::channel::ChannelRouter;
use crate::chat::ChatStream;
use crate::config::Config;
use crate::error::{ErrorCode, ResourceDenied, TransportError, UploadFailure};
use crate::event::{
    ChatEvent, FileEvent, ParticipantId, RoomEvent, RoomId, SignalEvent, ToolKind, TypingEvent, WhiteboardEvent,
};
use crate::files::{FileId, FileShareRegistry, FileUploader, SharedFile};
use crate::signaling::{PairState, PeerConnector, SignalingCoordinator};
use crate::whiteboard::WhiteboardSyncEngine;

/// Capacity of the inbound queue; beyond this the broker's deliveries
/// are dropped rather than ballooning memory.
const INBOUND_QUEUE_CAPACITY: usize = 256;

// =============================================================================
// ERROR
// =============================================================================

/// Errors surfaced by session-level operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// `join` was called for a second room without leaving the first.
    #[error("already joined to room {current}")]
    AlreadyInDifferentRoom { current: RoomId },

    /// A local action was attempted with no active room.
    #[error("no active room session")]
    NotJoined,

    /// The broker rejected a join-time operation.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A file upload did not complete.
    #[error(transparent)]
    Upload(#[from] UploadFailure),

    /// The platform denied access to a local capture device.
    #[error(transparent)]
    MediaDenied(#[from] ResourceDenied),
}

impl ErrorCode for SessionError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::AlreadyInDifferentRoom { .. } => "E_ALREADY_JOINED",
            Self::NotJoined => "E_NOT_JOINED",
            Self::Transport(err) => err.error_code(),
            Self::Upload(err) => err.error_code(),
            Self::MediaDenied(err) => err.error_code(),
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::Transport(err) => err.retryable(),
            Self::Upload(err) => err.retryable(),
            _ => false,
        }
    }
}

// =============================================================================
// MEDIA COLLABORATORS
// =============================================================================

/// A live local capture handle. Stopping is synchronous and idempotent.
pub trait MediaTrack: Send + Sync {
    fn stop(&self);
}

/// Platform capture devices. Dyn-safe for mocking in tests.
#[async_trait::async_trait]
pub trait MediaDevices: Send + Sync {
    async fn open_microphone(&self) -> Result<Arc<dyn MediaTrack>, ResourceDenied>;
    async fn open_camera(&self) -> Result<Arc<dyn MediaTrack>, ResourceDenied>;
    async fn open_screen(&self) -> Result<Arc<dyn MediaTrack>, ResourceDenied>;
}

// =============================================================================
// ACTIVE ROOM STATE
// =============================================================================

struct ActiveRoom {
    room_id: RoomId,
    router: ChannelRouter,
    whiteboard: WhiteboardSyncEngine,
    chat: ChatStream,
    files: FileShareRegistry,
    signaling: SignalingCoordinator,
    roster: HashMap<ParticipantId, Participant>,
    inbound_rx: mpsc::Receiver<Inbound>,
    mic: Option<Arc<dyn MediaTrack>>,
    camera: Option<Arc<dyn MediaTrack>>,
    screen: Option<Arc<dyn MediaTrack>>,
}

// =============================================================================
// CONTROLLER
// =============================================================================

/// Owns the per-room engines and mediates between local actions and the
/// broker. At most one room is active at a time.
pub struct RoomSessionController {
    self_id: ParticipantId,
    profile: Participant,
    config: Config,
    broker: Arc<dyn Broker>,
    uploader: Arc<dyn FileUploader>,
    media: Arc<dyn MediaDevices>,
    connector: Arc<dyn PeerConnector>,
    active: Option<ActiveRoom>,
}

impl RoomSessionController {
    #[must_use]
    pub fn new(
        profile: Participant,
        config: Config,
        broker: Arc<dyn Broker>,
        uploader: Arc<dyn FileUploader>,
        media: Arc<dyn MediaDevices>,
        connector: Arc<dyn PeerConnector>,
    ) -> Self {
        Self { self_id: profile.id, profile, config, broker, uploader, media, connector, active: None }
    }

    #[must_use]
    pub fn self_id(&self) -> ParticipantId {
        self.self_id
    }

    #[must_use]
    pub fn current_room(&self) -> Option<RoomId> {
        self.active.as_ref().map(|a| a.room_id)
    }

    // =========================================================================
    // JOIN / LEAVE
    // =========================================================================

    /// Join a room: fresh engines, all four topic subscriptions, presence
    /// entered, roster hydrated. Idempotent when already joined to the
    /// same room.
    ///
    /// # Errors
    ///
    /// [`SessionError::AlreadyInDifferentRoom`] when another room is
    /// active, or a [`TransportError`] when the broker rejects a
    /// subscription or the presence enter.
    pub async fn join(&mut self, room_id: RoomId) -> Result<(), SessionError> {
        if let Some(active) = &self.active {
            if active.room_id == room_id {
                debug!(%room_id, "join: already in room");
                return Ok(());
            }
            return Err(SessionError::AlreadyInDifferentRoom { current: active.room_id });
        }

        let router = ChannelRouter::new(Arc::clone(&self.broker), room_id, &self.config);
        let (tx, inbound_rx) = mpsc::channel(INBOUND_QUEUE_CAPACITY);
        router.subscribe_all(&tx).await?;

        let presence_channel = ChannelRouter::presence_channel(room_id);
        let members = self.broker.presence_enter(&presence_channel, self.profile.clone(), tx).await?;
        let roster: HashMap<ParticipantId, Participant> = members.into_iter().map(|p| (p.id, p)).collect();

        info!(%room_id, members = roster.len(), "joined room");
        self.active = Some(ActiveRoom {
            room_id,
            router,
            whiteboard: WhiteboardSyncEngine::new(self.self_id, &self.config),
            chat: ChatStream::new(self.self_id, &self.config),
            files: FileShareRegistry::new(),
            signaling: SignalingCoordinator::new(self.self_id, Arc::clone(&self.connector)),
            roster,
            inbound_rx,
            mic: None,
            camera: None,
            screen: None,
        });
        Ok(())
    }

    /// Leave the active room. Local teardown is synchronous: capture
    /// tracks stop, peer links close, and all engine state drops before
    /// this returns. Broker detachment runs on a spawned task. No-op
    /// when no room is active.
    pub fn leave(&mut self) {
        let Some(mut active) = self.active.take() else {
            return;
        };
        for track in [active.mic.take(), active.camera.take(), active.screen.take()].into_iter().flatten() {
            track.stop();
        }
        active.signaling.close_all();
        info!(room_id = %active.room_id, "left room");

        let broker = Arc::clone(&self.broker);
        let self_id = self.self_id;
        tokio::spawn(async move {
            if let Err(err) = active.router.unsubscribe_all().await {
                warn!(%err, "leave: unsubscribe failed");
            }
            let presence_channel = ChannelRouter::presence_channel(active.room_id);
            if let Err(err) = broker.presence_leave(&presence_channel, self_id).await {
                warn!(%err, "leave: presence leave failed");
            }
        });
    }

    // =========================================================================
    // INBOUND DISPATCH
    // =========================================================================

    /// Drain the inbound queue and dispatch everything currently on it.
    pub async fn process_pending(&mut self) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        let mut items = Vec::new();
        while let Ok(item) = active.inbound_rx.try_recv() {
            items.push(item);
        }
        for item in items {
            self.dispatch_remote(item).await;
        }
    }

    /// Route one inbound item to its engine. Undecodable or out-of-place
    /// messages are logged and dropped here; engines only ever see typed
    /// events.
    pub async fn dispatch_remote(&mut self, item: Inbound) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        match item {
            Inbound::Event { topic, kind, payload } => {
                let event = match RoomEvent::decode(topic, &kind, &payload) {
                    Ok(event) => event,
                    Err(err) => {
                        warn!(%topic, kind, code = err.error_code(), %err, "inbound event dropped");
                        return;
                    }
                };
                match event {
                    RoomEvent::Whiteboard(WhiteboardEvent::Draw(e)) => {
                        active.whiteboard.apply_remote(&e);
                    }
                    RoomEvent::Whiteboard(WhiteboardEvent::Clear(e)) => {
                        active.whiteboard.apply_remote_clear(&e);
                    }
                    RoomEvent::Chat(ChatEvent::Message(e)) => {
                        active.chat.receive(&e);
                    }
                    RoomEvent::Chat(ChatEvent::Typing(e)) => {
                        if e.participant_id != self.self_id {
                            active.chat.set_typing(&e);
                        }
                    }
                    RoomEvent::Chat(ChatEvent::StopTyping(e)) => {
                        active.chat.clear_typing(&e);
                    }
                    RoomEvent::Files(FileEvent::FileShared(e)) => {
                        active.files.on_remote(&e);
                    }
                    RoomEvent::Signaling(signal) => {
                        Self::dispatch_signal(active, self.self_id, signal).await;
                    }
                }
            }
            Inbound::Presence(update) => match update.action {
                PresenceAction::Enter => {
                    debug!(participant = %update.participant.id, "presence enter");
                    active.roster.insert(update.participant.id, update.participant);
                }
                PresenceAction::Leave => {
                    debug!(participant = %update.participant.id, "presence leave");
                    active.roster.remove(&update.participant.id);
                    active.signaling.close(update.participant.id);
                }
            },
        }
    }

    async fn dispatch_signal(active: &mut ActiveRoom, self_id: ParticipantId, signal: SignalEvent) {
        // Signaling events are addressed; everything not for us is noise
        // from other pairs on the shared channel.
        let to_id = match &signal {
            SignalEvent::Offer(e) => e.to_id,
            SignalEvent::Answer(e) => e.to_id,
            SignalEvent::IceCandidate(e) => e.to_id,
        };
        if to_id != self_id {
            return;
        }
        match signal {
            SignalEvent::Offer(e) => {
                if let Some(answer) = active.signaling.on_offer(&e).await {
                    active.router.publish(&RoomEvent::Signaling(SignalEvent::Answer(answer)));
                }
            }
            SignalEvent::Answer(e) => active.signaling.on_answer(&e).await,
            SignalEvent::IceCandidate(e) => active.signaling.on_ice_candidate(&e).await,
        }
    }

    // =========================================================================
    // WHITEBOARD ACTIONS
    // =========================================================================

    /// Open a stroke; the pre-stroke canvas becomes the undo checkpoint.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotJoined`] when no room is active.
    pub fn begin_stroke(&mut self) -> Result<(), SessionError> {
        let active = self.active.as_mut().ok_or(SessionError::NotJoined)?;
        active.whiteboard.begin_stroke();
        Ok(())
    }

    /// Render one stroke segment locally and publish it. Outside an open
    /// stroke this does nothing, matching the engine's contract.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotJoined`] when no room is active.
    pub fn extend_stroke(
        &mut self,
        from: (f64, f64),
        to: (f64, f64),
        color: &str,
        width: f64,
        tool: ToolKind,
    ) -> Result<(), SessionError> {
        let active = self.active.as_mut().ok_or(SessionError::NotJoined)?;
        if let Some(event) = active.whiteboard.extend_stroke(from, to, color, width, tool) {
            active.router.publish(&RoomEvent::Whiteboard(WhiteboardEvent::Draw(event)));
        }
        Ok(())
    }

    /// Close the open stroke.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotJoined`] when no room is active.
    pub fn end_stroke(&mut self) -> Result<(), SessionError> {
        let active = self.active.as_mut().ok_or(SessionError::NotJoined)?;
        active.whiteboard.end_stroke();
        Ok(())
    }

    /// Blank the canvas for everyone.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotJoined`] when no room is active.
    pub fn clear_whiteboard(&mut self) -> Result<(), SessionError> {
        let active = self.active.as_mut().ok_or(SessionError::NotJoined)?;
        let event = active.whiteboard.clear();
        active.router.publish(&RoomEvent::Whiteboard(WhiteboardEvent::Clear(event)));
        Ok(())
    }

    /// Step the local canvas back one checkpoint. Never published.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotJoined`] when no room is active.
    pub fn undo(&mut self) -> Result<bool, SessionError> {
        let active = self.active.as_mut().ok_or(SessionError::NotJoined)?;
        Ok(active.whiteboard.undo())
    }

    /// Reapply the most recently undone checkpoint. Never published.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotJoined`] when no room is active.
    pub fn redo(&mut self) -> Result<bool, SessionError> {
        let active = self.active.as_mut().ok_or(SessionError::NotJoined)?;
        Ok(active.whiteboard.redo())
    }

    // =========================================================================
    // CHAT ACTIONS
    // =========================================================================

    /// Send a chat message; an explicit stop-typing follows it on the
    /// wire so peers drop our typing flag without waiting out the TTL.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotJoined`] when no room is active.
    pub fn send_chat(&mut self, content: &str) -> Result<(), SessionError> {
        let active = self.active.as_mut().ok_or(SessionError::NotJoined)?;
        let event = active.chat.send(content);
        active.router.publish(&RoomEvent::Chat(ChatEvent::Message(event)));
        let stop = TypingEvent { participant_id: self.self_id };
        active.router.publish(&RoomEvent::Chat(ChatEvent::StopTyping(stop)));
        Ok(())
    }

    /// Announce that this client is typing.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotJoined`] when no room is active.
    pub fn set_typing(&mut self) -> Result<(), SessionError> {
        let active = self.active.as_mut().ok_or(SessionError::NotJoined)?;
        let event = TypingEvent { participant_id: self.self_id };
        active.router.publish(&RoomEvent::Chat(ChatEvent::Typing(event)));
        Ok(())
    }

    // =========================================================================
    // FILE ACTIONS
    // =========================================================================

    /// Upload a file, register it, and announce it to the room.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotJoined`] with no active room, or the
    /// [`UploadFailure`] from the storage backend; nothing is registered
    /// or published on failure.
    pub async fn share_file(&mut self, filename: &str, bytes: &[u8]) -> Result<FileId, SessionError> {
        if self.active.is_none() {
            return Err(SessionError::NotJoined);
        }
        let url = self.uploader.upload(filename, bytes).await?;
        let active = self.active.as_mut().ok_or(SessionError::NotJoined)?;
        let size = bytes.len() as u64;
        let event = active.files.register(filename, &url, size, self.self_id);
        let id = event.id;
        active.router.publish(&RoomEvent::Files(FileEvent::FileShared(event)));
        info!(%id, filename, size, "file shared");
        Ok(id)
    }

    // =========================================================================
    // CALL / MEDIA ACTIONS
    // =========================================================================

    /// Start a call to `peer` by publishing an offer.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotJoined`] when no room is active.
    pub async fn call(&mut self, peer: ParticipantId) -> Result<(), SessionError> {
        let active = self.active.as_mut().ok_or(SessionError::NotJoined)?;
        if let Some(offer) = active.signaling.initiate(peer).await {
            active.router.publish(&RoomEvent::Signaling(SignalEvent::Offer(offer)));
        }
        Ok(())
    }

    /// Toggle the microphone; returns the new on/off state.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotJoined`] with no active room, or the
    /// [`ResourceDenied`] from the platform when turning on.
    pub async fn toggle_audio(&mut self) -> Result<bool, SessionError> {
        let active = self.active.as_mut().ok_or(SessionError::NotJoined)?;
        let on = match active.mic.take() {
            Some(track) => {
                track.stop();
                false
            }
            None => {
                active.mic = Some(self.media.open_microphone().await?);
                true
            }
        };
        self.profile.audio_on = on;
        if let Some(entry) = active.roster.get_mut(&self.self_id) {
            entry.audio_on = on;
        }
        Ok(on)
    }

    /// Toggle the camera; returns the new on/off state.
    ///
    /// # Errors
    ///
    /// Same contract as [`Self::toggle_audio`].
    pub async fn toggle_video(&mut self) -> Result<bool, SessionError> {
        let active = self.active.as_mut().ok_or(SessionError::NotJoined)?;
        let on = match active.camera.take() {
            Some(track) => {
                track.stop();
                false
            }
            None => {
                active.camera = Some(self.media.open_camera().await?);
                true
            }
        };
        self.profile.video_on = on;
        if let Some(entry) = active.roster.get_mut(&self.self_id) {
            entry.video_on = on;
        }
        Ok(on)
    }

    /// Toggle screen capture; returns the new on/off state.
    ///
    /// # Errors
    ///
    /// Same contract as [`Self::toggle_audio`].
    pub async fn toggle_screen_share(&mut self) -> Result<bool, SessionError> {
        let active = self.active.as_mut().ok_or(SessionError::NotJoined)?;
        let on = match active.screen.take() {
            Some(track) => {
                track.stop();
                false
            }
            None => {
                active.screen = Some(self.media.open_screen().await?);
                true
            }
        };
        self.profile.screen_sharing = on;
        if let Some(entry) = active.roster.get_mut(&self.self_id) {
            entry.screen_sharing = on;
        }
        Ok(on)
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    #[must_use]
    pub fn whiteboard(&self) -> Option<&WhiteboardSyncEngine> {
        self.active.as_ref().map(|a| &a.whiteboard)
    }

    /// Mutable because reading the typing set sweeps expired entries.
    pub fn chat(&mut self) -> Option<&mut ChatStream> {
        self.active.as_mut().map(|a| &mut a.chat)
    }

    #[must_use]
    pub fn shared_files(&self) -> Option<&[SharedFile]> {
        self.active.as_ref().map(|a| a.files.files())
    }

    #[must_use]
    pub fn roster(&self) -> Option<&HashMap<ParticipantId, Participant>> {
        self.active.as_ref().map(|a| &a.roster)
    }

    #[must_use]
    pub fn pair_state(&self, peer: ParticipantId) -> Option<PairState> {
        self.active.as_ref().and_then(|a| a.signaling.state(peer))
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
