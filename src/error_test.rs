use super::*;

#[test]
fn transport_errors_are_retryable() {
    let err = TransportError::Publish { channel: "study-room:x:chat".into(), reason: "timeout".into() };
    assert_eq!(err.error_code(), "E_PUBLISH");
    assert!(err.retryable());
}

#[test]
fn state_violation_formats_peer_and_state() {
    let peer = Uuid::new_v4();
    let err = StateViolation { kind: "answer", peer, state: "idle" };
    let msg = err.to_string();
    assert!(msg.contains("answer"));
    assert!(msg.contains("idle"));
    assert!(!err.retryable());
}

#[test]
fn resource_denied_codes_per_device() {
    assert_eq!(ResourceDenied::Camera("no device".into()).error_code(), "E_CAMERA_DENIED");
    assert_eq!(ResourceDenied::Screen("refused".into()).error_code(), "E_SCREEN_DENIED");
}
