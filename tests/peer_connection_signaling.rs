//! Signaling-state gating scenarios (spec §8 property 8): operations the
//! state machine forbids in certain states must fail with `InvalidState`
//! rather than silently succeeding or panicking.

use webrtc_peer_core::sdp::{MediaKind, SdpType, SessionDescription};
use webrtc_peer_core::{Error, PeerConnection, Track};

#[tokio::test]
async fn create_answer_outside_have_remote_offer_is_rejected() {
    let pc = PeerConnection::new("gating-cname").unwrap();
    pc.add_track(Track::new("audio-0", MediaKind::Audio))
        .await
        .unwrap();

    let err = pc.create_answer().await.unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));
}

#[tokio::test]
async fn set_remote_description_answer_from_stable_is_rejected() {
    let pc = PeerConnection::new("gating-cname").unwrap();
    let bogus_answer = SessionDescription::new(SdpType::Answer, Vec::new(), "v=0\r\n".to_string());

    let err = pc.set_remote_description(bogus_answer).await.unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));
}

#[tokio::test]
async fn set_remote_description_offer_from_have_local_offer_is_rejected() {
    let pc = PeerConnection::new("gating-cname").unwrap();
    pc.add_track(Track::new("audio-0", MediaKind::Audio))
        .await
        .unwrap();

    let offer = pc.create_offer().await.unwrap();
    pc.set_local_description(offer).await.unwrap();

    let another_offer = SessionDescription::new(SdpType::Offer, Vec::new(), "v=0\r\n".to_string());
    let err = pc.set_remote_description(another_offer).await.unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));
}

#[tokio::test]
async fn add_track_after_close_is_rejected() {
    let pc = PeerConnection::new("gating-cname").unwrap();
    pc.close().await;

    let err = pc
        .add_track(Track::new("audio-0", MediaKind::Audio))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));
}

#[tokio::test]
async fn create_data_channel_after_close_is_rejected() {
    let pc = PeerConnection::new("gating-cname").unwrap();
    pc.close().await;

    let err = pc.create_data_channel("chat", "").await.unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));
}

#[tokio::test]
async fn close_is_idempotent() {
    let pc = PeerConnection::new("gating-cname").unwrap();
    pc.add_track(Track::new("audio-0", MediaKind::Audio))
        .await
        .unwrap();

    pc.close().await;
    pc.close().await;
    assert!(pc.is_closed());
}

#[tokio::test]
async fn add_track_twice_for_same_kind_is_rejected() {
    let pc = PeerConnection::new("gating-cname").unwrap();
    pc.add_track(Track::new("audio-0", MediaKind::Audio))
        .await
        .unwrap();

    let err = pc
        .add_track(Track::new("audio-1", MediaKind::Audio))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidAccess(_)));
}
