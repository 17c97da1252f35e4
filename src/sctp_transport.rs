//! The SCTP association state machine is an out-of-scope external
//! collaborator (spec §1): this module only states the contract
//! `PeerConnection::create_data_channel` and the connect coroutine consume
//! (spec §6), so a real SCTP stack (e.g. `webrtc-sctp`) can be wired in
//! without touching `peer_connection`.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::dtls::DtlsSession;
use crate::error::Result;

/// SctpTransportState mirrors the four states spec §6 names for the SCTP
/// endpoint contract.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SctpTransportState {
    Closed,
    CookieWait,
    CookieEchoed,
    Established,
}

const CLOSED_STR: &str = "closed";
const COOKIE_WAIT_STR: &str = "cookie-wait";
const COOKIE_ECHOED_STR: &str = "cookie-echoed";
const ESTABLISHED_STR: &str = "established";

impl fmt::Display for SctpTransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SctpTransportState::Closed => CLOSED_STR,
            SctpTransportState::CookieWait => COOKIE_WAIT_STR,
            SctpTransportState::CookieEchoed => COOKIE_ECHOED_STR,
            SctpTransportState::Established => ESTABLISHED_STR,
        };
        write!(f, "{s}")
    }
}

/// SctpEndpoint is the opaque association object the connect coroutine and
/// `createDataChannel` consume (spec §6). A conforming implementation is
/// constructed with `(is_server, transport)` where `transport` is a DTLS
/// session's `data` channel; this crate ships no concrete implementation —
/// SCTP association logic is entirely out of scope (spec §1).
#[async_trait]
pub trait SctpEndpoint: Send + Sync {
    /// Runs the association's internal protocol loop until `close`/`abort`.
    async fn run(self: Arc<Self>) -> Result<()>;

    async fn recv(&self) -> Result<(u16, String, Bytes)>;

    async fn send(&self, stream_id: u16, protocol: &str, data: &[u8]) -> Result<()>;

    async fn close(&self);

    async fn abort(&self);

    async fn state(&self) -> SctpTransportState;
}

/// Constructs the association's transport argument from a DTLS session's
/// `data` channel, matching spec §6's "`transport=<dtls.data channel>`".
/// Kept as a thin marker type so a concrete `SctpEndpoint` need not depend
/// on `DtlsSession` directly.
pub struct DtlsDataTransport {
    pub session: Arc<DtlsSession>,
}

impl DtlsDataTransport {
    pub fn new(session: Arc<DtlsSession>) -> Self {
        Self { session }
    }

    pub async fn recv(&self) -> Result<Bytes> {
        self.session.recv_data().await
    }

    pub async fn send(&self, buf: &[u8]) -> Result<()> {
        self.session.send_data(buf).await
    }
}
