use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use uuid::Uuid;

use super::*;

// =============================================================================
// MOCKS
// =============================================================================

#[derive(Default)]
struct MockLink {
    ops: Mutex<Vec<String>>,
    closed: AtomicUsize,
    fail_answer: bool,
    fail_candidate: bool,
}

impl MockLink {
    fn ops(&self) -> Vec<String> {
        self.ops.lock().unwrap().clone()
    }

    fn record(&self, op: String) {
        self.ops.lock().unwrap().push(op);
    }
}

#[async_trait::async_trait]
impl PeerLink for MockLink {
    async fn create_offer(&self) -> Result<String, RtcError> {
        self.record("create_offer".into());
        Ok("offer-sdp".into())
    }

    async fn set_remote_description(&self, sdp: &str) -> Result<(), RtcError> {
        self.record(format!("set_remote_description:{sdp}"));
        Ok(())
    }

    async fn create_answer(&self) -> Result<String, RtcError> {
        if self.fail_answer {
            return Err(RtcError::new("answer rejected"));
        }
        self.record("create_answer".into());
        Ok("answer-sdp".into())
    }

    async fn add_ice_candidate(&self, candidate: &str) -> Result<(), RtcError> {
        if self.fail_candidate {
            return Err(RtcError::new("candidate rejected"));
        }
        self.record(format!("add_ice_candidate:{candidate}"));
        Ok(())
    }

    fn close(&self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct MockConnector {
    links: Mutex<Vec<(ParticipantId, Arc<MockLink>)>>,
    fail_connect: bool,
    fail_answer: bool,
    fail_candidate: bool,
}

impl MockConnector {
    fn link_for(&self, peer: ParticipantId) -> Arc<MockLink> {
        self.links
            .lock()
            .unwrap()
            .iter()
            .find(|(id, _)| *id == peer)
            .map(|(_, link)| Arc::clone(link))
            .expect("no link for peer")
    }
}

#[async_trait::async_trait]
impl PeerConnector for MockConnector {
    async fn connect(&self, peer: ParticipantId) -> Result<Arc<dyn PeerLink>, RtcError> {
        if self.fail_connect {
            return Err(RtcError::new("connect refused"));
        }
        let link = Arc::new(MockLink {
            fail_answer: self.fail_answer,
            fail_candidate: self.fail_candidate,
            ..MockLink::default()
        });
        self.links.lock().unwrap().push((peer, Arc::clone(&link)));
        Ok(link)
    }
}

fn coordinator(self_id: ParticipantId) -> (SignalingCoordinator, Arc<MockConnector>) {
    let connector = Arc::new(MockConnector::default());
    (SignalingCoordinator::new(self_id, Arc::clone(&connector) as Arc<dyn PeerConnector>), connector)
}

// =============================================================================
// OFFER / ANSWER FLOW
// =============================================================================

#[tokio::test]
async fn initiate_sends_offer_and_transitions() {
    let me = Uuid::from_u128(1);
    let peer = Uuid::from_u128(2);
    let (mut coord, _connector) = coordinator(me);

    let offer = coord.initiate(peer).await.unwrap();
    assert_eq!(offer.from_id, me);
    assert_eq!(offer.to_id, peer);
    assert_eq!(offer.sdp, "offer-sdp");
    assert_eq!(coord.state(peer), Some(PairState::OfferSent));
}

#[tokio::test]
async fn initiate_outside_idle_is_discarded() {
    let peer = Uuid::from_u128(2);
    let (mut coord, _connector) = coordinator(Uuid::from_u128(1));

    assert!(coord.initiate(peer).await.is_some());
    assert!(coord.initiate(peer).await.is_none());
    assert_eq!(coord.state(peer), Some(PairState::OfferSent));
}

#[tokio::test]
async fn inbound_offer_answers_and_connects() {
    let me = Uuid::from_u128(2);
    let peer = Uuid::from_u128(1);
    let (mut coord, connector) = coordinator(me);

    let answer = coord
        .on_offer(&OfferEvent { from_id: peer, to_id: me, sdp: "their-offer".into() })
        .await
        .unwrap();
    assert_eq!(answer.from_id, me);
    assert_eq!(answer.to_id, peer);
    assert_eq!(answer.sdp, "answer-sdp");
    assert_eq!(coord.state(peer), Some(PairState::Connected));
    assert_eq!(
        connector.link_for(peer).ops(),
        vec!["set_remote_description:their-offer".to_owned(), "create_answer".to_owned()]
    );
}

#[tokio::test]
async fn answer_completes_offerer_side() {
    let me = Uuid::from_u128(1);
    let peer = Uuid::from_u128(2);
    let (mut coord, connector) = coordinator(me);

    coord.initiate(peer).await.unwrap();
    coord.on_answer(&AnswerEvent { from_id: peer, to_id: me, sdp: "their-answer".into() }).await;
    assert_eq!(coord.state(peer), Some(PairState::Connected));
    assert!(connector.link_for(peer).ops().contains(&"set_remote_description:their-answer".to_owned()));
}

#[tokio::test]
async fn answer_without_offer_is_discarded() {
    let me = Uuid::from_u128(1);
    let peer = Uuid::from_u128(2);
    let (mut coord, _connector) = coordinator(me);

    coord.on_answer(&AnswerEvent { from_id: peer, to_id: me, sdp: "stray".into() }).await;
    assert_eq!(coord.state(peer), None);
}

#[tokio::test]
async fn offer_while_connected_is_discarded() {
    let me = Uuid::from_u128(2);
    let peer = Uuid::from_u128(1);
    let (mut coord, _connector) = coordinator(me);

    coord.on_offer(&OfferEvent { from_id: peer, to_id: me, sdp: "first".into() }).await.unwrap();
    let second = coord.on_offer(&OfferEvent { from_id: peer, to_id: me, sdp: "second".into() }).await;
    assert!(second.is_none());
    assert_eq!(coord.state(peer), Some(PairState::Connected));
}

// =============================================================================
// GLARE
// =============================================================================

#[tokio::test]
async fn glare_resolves_to_single_offerer() {
    let a_id = Uuid::from_u128(1);
    let b_id = Uuid::from_u128(2);
    let (mut a, _) = coordinator(a_id);
    let (mut b, _) = coordinator(b_id);

    // Both sides initiate within the same tick.
    let offer_from_a = a.initiate(b_id).await.unwrap();
    let offer_from_b = b.initiate(a_id).await.unwrap();

    // A has the smaller id: it discards B's offer and stays offerer.
    assert!(a.on_offer(&offer_from_b).await.is_none());
    assert_eq!(a.state(b_id), Some(PairState::OfferSent));

    // B yields, answers A's offer, and connects.
    let answer = b.on_offer(&offer_from_a).await.unwrap();
    assert_eq!(b.state(a_id), Some(PairState::Connected));

    a.on_answer(&answer).await;
    assert_eq!(a.state(b_id), Some(PairState::Connected));
}

// =============================================================================
// ICE CANDIDATES
// =============================================================================

#[tokio::test]
async fn candidates_queue_until_remote_description_set() {
    let me = Uuid::from_u128(1);
    let peer = Uuid::from_u128(2);
    let (mut coord, connector) = coordinator(me);

    coord.initiate(peer).await.unwrap();
    coord.on_ice_candidate(&IceCandidateEvent { from_id: peer, to_id: me, candidate: "c1".into() }).await;
    coord.on_ice_candidate(&IceCandidateEvent { from_id: peer, to_id: me, candidate: "c2".into() }).await;

    let link = connector.link_for(peer);
    assert!(!link.ops().iter().any(|op| op.starts_with("add_ice_candidate")));

    // The answer sets the remote description and flushes the queue in order.
    coord.on_answer(&AnswerEvent { from_id: peer, to_id: me, sdp: "their-answer".into() }).await;
    assert_eq!(
        link.ops(),
        vec![
            "create_offer".to_owned(),
            "set_remote_description:their-answer".to_owned(),
            "add_ice_candidate:c1".to_owned(),
            "add_ice_candidate:c2".to_owned(),
        ]
    );
}

#[tokio::test]
async fn candidate_after_connect_applies_immediately() {
    let me = Uuid::from_u128(2);
    let peer = Uuid::from_u128(1);
    let (mut coord, connector) = coordinator(me);

    coord.on_offer(&OfferEvent { from_id: peer, to_id: me, sdp: "their-offer".into() }).await.unwrap();
    coord.on_ice_candidate(&IceCandidateEvent { from_id: peer, to_id: me, candidate: "late".into() }).await;
    assert!(connector.link_for(peer).ops().contains(&"add_ice_candidate:late".to_owned()));
}

#[tokio::test]
async fn rejected_candidate_does_not_fail_the_pair() {
    let me = Uuid::from_u128(2);
    let peer = Uuid::from_u128(1);
    let connector = Arc::new(MockConnector { fail_candidate: true, ..MockConnector::default() });
    let mut coord = SignalingCoordinator::new(me, connector as Arc<dyn PeerConnector>);

    coord.on_offer(&OfferEvent { from_id: peer, to_id: me, sdp: "their-offer".into() }).await.unwrap();
    coord.on_ice_candidate(&IceCandidateEvent { from_id: peer, to_id: me, candidate: "bad".into() }).await;
    assert_eq!(coord.state(peer), Some(PairState::Connected));
}

#[tokio::test]
async fn rejected_queued_candidate_still_connects() {
    let me = Uuid::from_u128(1);
    let peer = Uuid::from_u128(2);
    let connector = Arc::new(MockConnector { fail_candidate: true, ..MockConnector::default() });
    let mut coord = SignalingCoordinator::new(me, connector as Arc<dyn PeerConnector>);

    coord.initiate(peer).await.unwrap();
    coord.on_ice_candidate(&IceCandidateEvent { from_id: peer, to_id: me, candidate: "bad".into() }).await;
    coord.on_answer(&AnswerEvent { from_id: peer, to_id: me, sdp: "their-answer".into() }).await;
    assert_eq!(coord.state(peer), Some(PairState::Connected));
}

#[tokio::test]
async fn candidate_for_unknown_pair_is_discarded() {
    let (mut coord, _connector) = coordinator(Uuid::from_u128(1));
    let stranger = Uuid::from_u128(9);
    coord
        .on_ice_candidate(&IceCandidateEvent { from_id: stranger, to_id: Uuid::from_u128(1), candidate: "c".into() })
        .await;
    assert_eq!(coord.state(stranger), None);
}

// =============================================================================
// FAILURE AND TEARDOWN
// =============================================================================

#[tokio::test]
async fn connect_failure_marks_only_that_pair_failed() {
    let me = Uuid::from_u128(1);
    let bad_peer = Uuid::from_u128(2);
    let connector = Arc::new(MockConnector { fail_connect: true, ..MockConnector::default() });
    let mut coord = SignalingCoordinator::new(me, connector as Arc<dyn PeerConnector>);

    assert!(coord.initiate(bad_peer).await.is_none());
    assert_eq!(coord.state(bad_peer), Some(PairState::Failed));
    assert_eq!(coord.state(Uuid::from_u128(3)), None);
}

#[tokio::test]
async fn answer_creation_failure_marks_pair_failed() {
    let me = Uuid::from_u128(2);
    let peer = Uuid::from_u128(1);
    let connector = Arc::new(MockConnector { fail_answer: true, ..MockConnector::default() });
    let mut coord = SignalingCoordinator::new(me, Arc::clone(&connector) as Arc<dyn PeerConnector>);

    let answer = coord.on_offer(&OfferEvent { from_id: peer, to_id: me, sdp: "their-offer".into() }).await;
    assert!(answer.is_none());
    assert_eq!(coord.state(peer), Some(PairState::Failed));
    assert_eq!(connector.link_for(peer).closed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn close_is_idempotent_and_releases_link() {
    let me = Uuid::from_u128(1);
    let peer = Uuid::from_u128(2);
    let (mut coord, connector) = coordinator(me);

    coord.initiate(peer).await.unwrap();
    coord.close(peer);
    coord.close(peer);
    assert_eq!(coord.state(peer), Some(PairState::Closed));
    assert_eq!(connector.link_for(peer).closed.load(Ordering::SeqCst), 1);

    // Closing a pair that never existed is a no-op.
    coord.close(Uuid::from_u128(9));
}

#[tokio::test]
async fn close_all_tears_down_every_pair() {
    let me = Uuid::from_u128(1);
    let (mut coord, connector) = coordinator(me);
    let peers = [Uuid::from_u128(2), Uuid::from_u128(3)];

    for peer in peers {
        coord.initiate(peer).await.unwrap();
    }
    coord.close_all();
    for peer in peers {
        assert_eq!(coord.state(peer), Some(PairState::Closed));
        assert_eq!(connector.link_for(peer).closed.load(Ordering::SeqCst), 1);
    }
}
