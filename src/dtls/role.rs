use std::fmt;

/// DTLSRole indicates the role played by a `DtlsSession` in the handshake.
///
/// ## Specifications
///
/// * [W3C]
///
/// [W3C]: https://w3c.github.io/webrtc-pc/#dom-rtcdtlstransport-role
///
/// Per spec §3, a session's role is `Server` iff its ICE connection is
/// controlling; this maps to SDP `setup:actpass` (server offer) /
/// `setup:active` (client answer).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DtlsRole {
    Client,
    Server,
}

impl DtlsRole {
    /// The `a=setup:` value this role advertises in an emitted SDP.
    pub fn setup(&self) -> &'static str {
        match self {
            DtlsRole::Server => "actpass",
            DtlsRole::Client => "active",
        }
    }

    /// SRTP key-material index assignment per spec §3: the controlling
    /// (server) side transmits with index 1 and receives with index 0; the
    /// controlled (client) side is the mirror image.
    pub fn tx_index(&self) -> usize {
        match self {
            DtlsRole::Server => 1,
            DtlsRole::Client => 0,
        }
    }

    pub fn rx_index(&self) -> usize {
        match self {
            DtlsRole::Server => 0,
            DtlsRole::Client => 1,
        }
    }
}

impl fmt::Display for DtlsRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DtlsRole::Client => write!(f, "client"),
            DtlsRole::Server => write!(f, "server"),
        }
    }
}
