//! Peer-to-peer call signaling.
//!
//! ARCHITECTURE
//! ============
//! One state machine per peer pair, keyed by the remote participant id:
//!
//! ```text
//! Idle -> OfferSent -> Connected          (we initiated)
//! Idle -> AnswerPending -> Connected      (peer initiated)
//! any non-terminal -> Failed              (RTC or transport error)
//! any -> Closed                           (explicit leave)
//! ```
//!
//! Glare — both sides initiating in the same tick — is resolved with a
//! deterministic tie-break: the numerically smaller participant id keeps
//! its offer, the larger side discards its own offer and answers instead.
//! Both sides compute the same winner from the same two ids, so no pair
//! ever ends with `OfferSent` on both ends.
//!
//! ICE candidates arriving before the remote description is set are
//! queued per pair and flushed when it lands; once a session exists a
//! candidate is never dropped.
//!
//! ERROR HANDLING
//! ==============
//! State-machine violations (an answer in `Idle`, a second offer while
//! `Connected`) are logged and the message discarded; they never mutate
//! the pair's current state. RTC failures during the handshake mark that
//! one pair `Failed` and leave every other pair untouched. Rejected ICE
//! candidates are routine; they are logged and dropped without touching
//! the pair.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::error::StateViolation;
use crate::event::{AnswerEvent, IceCandidateEvent, OfferEvent, ParticipantId};

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by the platform RTC layer.
#[derive(Debug, thiserror::Error)]
#[error("rtc operation failed: {reason}")]
pub struct RtcError {
    pub reason: String,
}

impl RtcError {
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

impl crate::error::ErrorCode for RtcError {
    fn error_code(&self) -> &'static str {
        "E_RTC"
    }
}

// =============================================================================
// COLLABORATOR TRAITS
// =============================================================================

/// One live peer connection as provided by the platform RTC layer.
///
/// Dyn-safe so tests can substitute a mock that records calls and returns
/// canned SDP strings.
#[async_trait::async_trait]
pub trait PeerLink: Send + Sync {
    /// Produce a local offer SDP.
    async fn create_offer(&self) -> Result<String, RtcError>;

    /// Apply the remote side's SDP (offer or answer).
    async fn set_remote_description(&self, sdp: &str) -> Result<(), RtcError>;

    /// Produce a local answer SDP; the remote offer must already be set.
    async fn create_answer(&self) -> Result<String, RtcError>;

    /// Apply one remote ICE candidate.
    async fn add_ice_candidate(&self, candidate: &str) -> Result<(), RtcError>;

    /// Release the connection's local resources. Infallible and idempotent.
    fn close(&self);
}

/// Factory for [`PeerLink`]s, one per remote participant.
#[async_trait::async_trait]
pub trait PeerConnector: Send + Sync {
    async fn connect(&self, peer: ParticipantId) -> Result<Arc<dyn PeerLink>, RtcError>;
}

// =============================================================================
// PAIR STATE
// =============================================================================

/// Lifecycle state of one peer pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairState {
    Idle,
    OfferSent,
    AnswerPending,
    Connected,
    Failed,
    Closed,
}

impl PairState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::OfferSent => "offer-sent",
            Self::AnswerPending => "answer-pending",
            Self::Connected => "connected",
            Self::Failed => "failed",
            Self::Closed => "closed",
        }
    }
}

struct PairSession {
    state: PairState,
    link: Option<Arc<dyn PeerLink>>,
    remote_description_set: bool,
    pending_candidates: Vec<String>,
}

impl PairSession {
    fn new() -> Self {
        Self { state: PairState::Idle, link: None, remote_description_set: false, pending_candidates: Vec::new() }
    }
}

// =============================================================================
// COORDINATOR
// =============================================================================

/// Per-room signaling coordinator owning one [`PairSession`] per peer.
pub struct SignalingCoordinator {
    self_id: ParticipantId,
    connector: Arc<dyn PeerConnector>,
    pairs: HashMap<ParticipantId, PairSession>,
}

impl SignalingCoordinator {
    #[must_use]
    pub fn new(self_id: ParticipantId, connector: Arc<dyn PeerConnector>) -> Self {
        Self { self_id, connector, pairs: HashMap::new() }
    }

    /// Current state of the pair with `peer`, if a session exists.
    #[must_use]
    pub fn state(&self, peer: ParticipantId) -> Option<PairState> {
        self.pairs.get(&peer).map(|p| p.state)
    }

    /// Start a call to `peer`. Valid only when no session exists or the
    /// existing one is `Idle`; otherwise the request is logged and
    /// discarded.
    pub async fn initiate(&mut self, peer: ParticipantId) -> Option<OfferEvent> {
        let session = self.pairs.entry(peer).or_insert_with(PairSession::new);
        if session.state != PairState::Idle {
            Self::log_violation("initiate", peer, session.state);
            return None;
        }

        let link = match self.connector.connect(peer).await {
            Ok(link) => link,
            Err(err) => {
                error!(%peer, %err, "signaling: connect failed");
                session.state = PairState::Failed;
                return None;
            }
        };
        let sdp = match link.create_offer().await {
            Ok(sdp) => sdp,
            Err(err) => {
                error!(%peer, %err, "signaling: offer creation failed");
                link.close();
                session.state = PairState::Failed;
                return None;
            }
        };

        session.link = Some(link);
        session.state = PairState::OfferSent;
        info!(%peer, "signaling: offer sent");
        Some(OfferEvent { from_id: self.self_id, to_id: peer, sdp })
    }

    /// Handle an inbound offer. From `Idle` this answers directly; from
    /// `OfferSent` this is glare and the id tie-break decides which side
    /// keeps its offer.
    pub async fn on_offer(&mut self, event: &OfferEvent) -> Option<AnswerEvent> {
        let peer = event.from_id;
        let session = self.pairs.entry(peer).or_insert_with(PairSession::new);

        match session.state {
            PairState::Idle => {}
            PairState::OfferSent => {
                if self.self_id < peer {
                    // We win the tie-break: our offer stands, the peer
                    // will answer it.
                    debug!(%peer, "signaling: glare, keeping own offer");
                    return None;
                }
                info!(%peer, "signaling: glare, yielding to peer offer");
            }
            state => {
                Self::log_violation("offer", peer, state);
                return None;
            }
        }

        // The glare loser reuses its existing link; a fresh answerer
        // connects first.
        if session.link.is_none() {
            match self.connector.connect(peer).await {
                Ok(link) => session.link = Some(link),
                Err(err) => {
                    error!(%peer, %err, "signaling: connect failed");
                    session.state = PairState::Failed;
                    return None;
                }
            }
        }
        session.state = PairState::AnswerPending;

        let link = session.link.as_ref().map(Arc::clone)?;
        if let Err(err) = link.set_remote_description(&event.sdp).await {
            error!(%peer, %err, "signaling: remote offer rejected");
            Self::fail_session(session);
            return None;
        }
        session.remote_description_set = true;
        Self::flush_candidates(session, peer, &link).await;

        let sdp = match link.create_answer().await {
            Ok(sdp) => sdp,
            Err(err) => {
                error!(%peer, %err, "signaling: answer creation failed");
                Self::fail_session(session);
                return None;
            }
        };
        session.state = PairState::Connected;
        info!(%peer, "signaling: answered, pair connected");
        Some(AnswerEvent { from_id: self.self_id, to_id: peer, sdp })
    }

    /// Handle an inbound answer; valid only from `OfferSent`.
    pub async fn on_answer(&mut self, event: &AnswerEvent) {
        let peer = event.from_id;
        let Some(session) = self.pairs.get_mut(&peer) else {
            warn!(%peer, "signaling: answer for unknown pair discarded");
            return;
        };
        if session.state != PairState::OfferSent {
            Self::log_violation("answer", peer, session.state);
            return;
        }
        let Some(link) = session.link.as_ref().map(Arc::clone) else {
            Self::log_violation("answer", peer, session.state);
            return;
        };

        if let Err(err) = link.set_remote_description(&event.sdp).await {
            error!(%peer, %err, "signaling: remote answer rejected");
            Self::fail_session(session);
            return;
        }
        session.remote_description_set = true;
        Self::flush_candidates(session, peer, &link).await;
        session.state = PairState::Connected;
        info!(%peer, "signaling: pair connected");
    }

    /// Handle an inbound ICE candidate: applied immediately once the
    /// remote description is set, queued until then. Candidates for a
    /// peer with no session at all are discarded with a warning. A
    /// candidate the platform rejects is logged and dropped; individual
    /// candidate failures never change the pair's state.
    pub async fn on_ice_candidate(&mut self, event: &IceCandidateEvent) {
        let peer = event.from_id;
        let Some(session) = self.pairs.get_mut(&peer) else {
            warn!(%peer, "signaling: candidate for unknown pair discarded");
            return;
        };
        if session.remote_description_set {
            if let Some(link) = session.link.as_ref().map(Arc::clone) {
                if let Err(err) = link.add_ice_candidate(&event.candidate).await {
                    warn!(%peer, %err, "signaling: candidate rejected, discarded");
                }
            }
        } else {
            session.pending_candidates.push(event.candidate.clone());
        }
    }

    /// Tear down the pair with `peer`. Idempotent: closing an already
    /// closed or absent pair is a no-op.
    pub fn close(&mut self, peer: ParticipantId) {
        let Some(session) = self.pairs.get_mut(&peer) else {
            return;
        };
        if session.state == PairState::Closed {
            return;
        }
        if let Some(link) = session.link.take() {
            link.close();
        }
        session.pending_candidates.clear();
        session.state = PairState::Closed;
        info!(%peer, "signaling: pair closed");
    }

    /// Tear down every pair; used on room leave.
    pub fn close_all(&mut self) {
        let peers: Vec<ParticipantId> = self.pairs.keys().copied().collect();
        for peer in peers {
            self.close(peer);
        }
    }

    async fn flush_candidates(session: &mut PairSession, peer: ParticipantId, link: &Arc<dyn PeerLink>) {
        for candidate in session.pending_candidates.drain(..) {
            if let Err(err) = link.add_ice_candidate(&candidate).await {
                warn!(%peer, %err, "signaling: queued candidate rejected, discarded");
            }
        }
    }

    fn fail_session(session: &mut PairSession) {
        if let Some(link) = session.link.take() {
            link.close();
        }
        session.state = PairState::Failed;
    }

    fn log_violation(kind: &'static str, peer: ParticipantId, state: PairState) {
        let violation = StateViolation { kind, peer, state: state.as_str() };
        warn!(%peer, %violation, "signaling: message discarded");
    }
}

#[cfg(test)]
#[path = "signaling_test.rs"]
mod tests;
