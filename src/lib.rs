//! A WebRTC peer endpoint's core transport stack: ICE connectivity (via an
//! external collaborator), the DTLS-SRTP session that keys and demuxes
//! media, the restricted SDP offer/answer codec that bootstraps it, and an
//! `RTCPeerConnection`-style state machine that drives gather → connect →
//! media-flow → close.
//!
//! Modeled on `webrtc-rs/webrtc`'s component layout: `dtls` here plays the
//! role of that crate's `dtls_transport`, `sdp` mirrors its `sdp` crate
//! restricted to the fields needed for DTLS-SRTP, and `peer_connection`
//! mirrors its `peer_connection` module. ICE and SCTP remain external
//! collaborators, expressed as the `IceConnection` and `SctpEndpoint`
//! traits (spec §1, §6).

pub mod dtls;
pub mod error;
pub mod ice_transport;
pub mod peer_connection;
pub mod sctp_transport;
pub mod sdp;

pub use error::{Error, Result};
pub use peer_connection::transceiver::Track;
pub use peer_connection::PeerConnection;
