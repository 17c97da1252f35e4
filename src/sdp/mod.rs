//! The restricted SDP offer/answer codec (spec §4.3): just enough grammar
//! to bootstrap DTLS-SRTP — fingerprints, setup role, ICE credentials and
//! candidates, rtpmap/sctpmap, direction, rtcp-mux. Full SDP grammar,
//! BUNDLE/RTX/FEC, and simulcast are explicitly out of scope.

pub mod codec;
pub mod emitter;
pub mod media_description;
pub mod parser;
pub mod session_description;

pub use codec::{Codec, MediaKind};
pub use media_description::{Direction, DtlsSetup, MediaDescription};
pub use session_description::{SdpType, SessionDescription};
