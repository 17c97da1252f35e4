use thiserror::Error;

/// Error is the error type returned by the public API of this crate.
///
/// The variants follow the error-kind taxonomy of the peer connection: state
/// and access errors are recoverable and surfaced to the caller as-is; `Dtls`
/// and `Parse` are terminal for the operation that raised them;
/// `ConnectionClosed` is the internal sentinel used to unwind the DTLS
/// receive pump and is not expected to reach a caller holding a handle that
/// was already closed cleanly.
#[derive(Debug, Error)]
pub enum Error {
    /// An API call was made while the peer connection or session was in a
    /// state that forbids it (e.g. `createAnswer` from `stable`).
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A track or data channel was already registered.
    #[error("invalid access: {0}")]
    InvalidAccess(String),

    /// An unsupported combination was requested (unknown media kind, a
    /// second track of a kind already bound, an offer with nothing to
    /// offer).
    #[error("internal: {0}")]
    Internal(String),

    /// DTLS handshake failure, remote fingerprint mismatch, or a failure of
    /// an underlying OpenSSL primitive. Terminal for the session.
    #[error("dtls: {0}")]
    Dtls(String),

    /// SDP could not be parsed, or named a forbidden payload type.
    #[error("parse: {0}")]
    Parse(String),

    /// Raised internally by `recv()`/`send()` after a session or channel has
    /// been closed. Never surfaced to a caller that did not itself call
    /// `close()` or observe a handshake failure.
    #[error("connection closed")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, Error>;
