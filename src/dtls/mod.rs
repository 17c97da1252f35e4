//! DTLS-SRTP session handling (spec §4.1, §4.2): a shared [`DtlsContext`]
//! holding the ephemeral certificate and SSL configuration, and a
//! [`DtlsSession`] per transceiver driving the handshake, SRTP key export,
//! and first-byte demultiplexing over one ICE connection.

mod channel;
mod context;
mod fingerprint;
mod role;
mod session;
mod state;

pub use context::{DtlsContext, SRTP_PROFILE};
pub use fingerprint::{format_fingerprint, parse_fingerprint};
pub use role::DtlsRole;
pub use session::DtlsSession;
pub use state::DtlsSessionState;
