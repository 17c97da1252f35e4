//! ICE connectivity is an out-of-scope external collaborator (spec §1): this
//! module only states the contract a real ICE agent must satisfy
//! (`IceConnection`) and ships one reference implementation,
//! `UdpIceConnection`, that offers host candidates only — no STUN/TURN, no
//! nomination — so the DTLS/SRTP/SDP/PeerConnection layers can be exercised
//! end-to-end on loopback. A production deployment would implement
//! `IceConnection` over a real agent (e.g. `webrtc-ice`'s `Agent`) instead.

use std::net::SocketAddr;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use rand::distr::Alphanumeric;
use rand::Rng;
use tokio::net::UdpSocket;

use crate::error::{Error, Result};

const RECEIVE_MTU: usize = 1460;

/// IceConnection is the opaque connection object the DTLS-SRTP session and
/// the peer connection's connect coroutine consume (spec §6). Every
/// transceiver owns exactly one of these (spec §3 invariant).
#[async_trait]
pub trait IceConnection: Send + Sync {
    /// Blocks until the next inbound datagram is available.
    async fn recv(&self) -> Result<Bytes>;

    /// Sends one datagram to the connected remote peer.
    async fn send(&self, buf: &[u8]) -> Result<()>;

    /// Idempotent teardown.
    async fn close(&self);

    fn local_candidates(&self) -> Vec<String>;
    fn remote_candidates(&self) -> Vec<String>;
    fn local_username(&self) -> String;
    fn local_password(&self) -> String;
    fn remote_username(&self) -> Option<String>;
    fn remote_password(&self) -> Option<String>;

    /// The candidate this connection would use by default for the given
    /// component (1 = RTP, 2 = RTCP), used when emitting SDP.
    fn get_default_candidate(&self, component: u16) -> Option<String>;

    /// True iff this connection plays the ICE controlling role, which per
    /// spec §3 determines whether its paired `DtlsSession` is `Server`.
    fn is_controlling(&self) -> bool;

    fn set_remote_credentials(&self, ufrag: String, pwd: String);
    fn add_remote_candidate(&self, candidate: String);

    /// One-shot candidate gathering (spec §4.4 "Gather coroutine").
    async fn gather_candidates(&self) -> Result<()>;

    /// Establishes connectivity with whatever pair gathering/negotiation
    /// selected. Must not be called until both local and remote candidates
    /// are present (spec §4.4 "Connect coroutine" preconditions).
    async fn connect(&self) -> Result<()>;
}

struct UdpIceConnectionState {
    remote_ufrag: Option<String>,
    remote_pwd: Option<String>,
    remote_candidates: Vec<String>,
    remote_addr: Option<SocketAddr>,
}

/// A host-candidate-only ICE connection over a single UDP socket. Useful for
/// integration tests and for running this crate end-to-end on a trusted
/// loopback or LAN where NAT traversal is unnecessary.
pub struct UdpIceConnection {
    socket: UdpSocket,
    controlling: bool,
    local_ufrag: String,
    local_pwd: String,
    state: Mutex<UdpIceConnectionState>,
}

impl UdpIceConnection {
    pub async fn bind(controlling: bool) -> Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0")
            .await
            .map_err(|e| Error::Internal(format!("failed to bind UDP socket: {e}")))?;
        let mut rng = rand::rng();
        let local_ufrag: String = (&mut rng)
            .sample_iter(Alphanumeric)
            .take(4)
            .map(char::from)
            .collect();
        let local_pwd: String = (&mut rng)
            .sample_iter(Alphanumeric)
            .take(22)
            .map(char::from)
            .collect();
        Ok(Self {
            socket,
            controlling,
            local_ufrag,
            local_pwd,
            state: Mutex::new(UdpIceConnectionState {
                remote_ufrag: None,
                remote_pwd: None,
                remote_candidates: Vec::new(),
                remote_addr: None,
            }),
        })
    }

    fn local_addr_string(&self) -> Option<String> {
        self.socket.local_addr().ok().map(|a| a.to_string())
    }

    /// The `a=candidate:` attribute value for this connection's one host
    /// candidate, formatted so `parse_host_candidate` can recover it on the
    /// far side after a full SDP round-trip (foundation/component/priority
    /// are fixed since host-only gathering never needs to compare them).
    fn local_candidate_line(&self) -> Option<String> {
        let addr = self.socket.local_addr().ok()?;
        Some(format!(
            "candidate:1 1 udp 2130706431 {} {} typ host",
            addr.ip(),
            addr.port()
        ))
    }
}

#[async_trait]
impl IceConnection for UdpIceConnection {
    async fn recv(&self) -> Result<Bytes> {
        let mut buf = BytesMut::zeroed(RECEIVE_MTU);
        let n = self
            .socket
            .recv(&mut buf)
            .await
            .map_err(|e| Error::Internal(format!("udp recv failed: {e}")))?;
        buf.truncate(n);
        Ok(buf.freeze())
    }

    async fn send(&self, buf: &[u8]) -> Result<()> {
        let addr = {
            let state = self.state.lock().unwrap();
            state
                .remote_addr
                .ok_or_else(|| Error::Internal("no remote address".to_string()))?
        };
        self.socket
            .send_to(buf, addr)
            .await
            .map_err(|e| Error::Internal(format!("udp send failed: {e}")))?;
        Ok(())
    }

    async fn close(&self) {
        // UdpSocket has no explicit close; dropping releases the fd. Nothing
        // to signal here — DtlsSession's own close tears down its pump.
    }

    fn local_candidates(&self) -> Vec<String> {
        self.local_candidate_line().into_iter().collect()
    }

    fn remote_candidates(&self) -> Vec<String> {
        self.state.lock().unwrap().remote_candidates.clone()
    }

    fn local_username(&self) -> String {
        self.local_ufrag.clone()
    }

    fn local_password(&self) -> String {
        self.local_pwd.clone()
    }

    fn remote_username(&self) -> Option<String> {
        self.state.lock().unwrap().remote_ufrag.clone()
    }

    fn remote_password(&self) -> Option<String> {
        self.state.lock().unwrap().remote_pwd.clone()
    }

    fn get_default_candidate(&self, _component: u16) -> Option<String> {
        self.local_addr_string()
    }

    fn is_controlling(&self) -> bool {
        self.controlling
    }

    fn set_remote_credentials(&self, ufrag: String, pwd: String) {
        let mut state = self.state.lock().unwrap();
        state.remote_ufrag = Some(ufrag);
        state.remote_pwd = Some(pwd);
    }

    fn add_remote_candidate(&self, candidate: String) {
        let mut state = self.state.lock().unwrap();
        if state.remote_addr.is_none() {
            if let Some(addr) = parse_host_candidate(&candidate) {
                state.remote_addr = Some(addr);
            }
        }
        state.remote_candidates.push(candidate);
    }

    async fn gather_candidates(&self) -> Result<()> {
        // The socket is already bound; there is nothing further to gather
        // for a host-only connection.
        Ok(())
    }

    async fn connect(&self) -> Result<()> {
        let addr = {
            let state = self.state.lock().unwrap();
            state.remote_addr
        };
        match addr {
            Some(addr) => self
                .socket
                .connect(addr)
                .await
                .map_err(|e| Error::Internal(format!("udp connect failed: {e}"))),
            None => Err(Error::Internal(
                "connect() called before a remote candidate was added".to_string(),
            )),
        }
    }
}

/// Parses a `candidate:` attribute value of the simplified form this crate
/// emits (`candidate:1 1 udp 2130706431 <ip> <port> typ host`) back into a
/// socket address, tolerating a bare `"<ip> <port>"` for tests.
fn parse_host_candidate(candidate: &str) -> Option<SocketAddr> {
    let parts: Vec<&str> = candidate.split_whitespace().collect();
    let (ip, port) = if parts.len() >= 6 && parts[0].starts_with("candidate:") {
        (parts[4], parts[5])
    } else if parts.len() == 2 {
        (parts[0], parts[1])
    } else {
        return None;
    };
    format!("{ip}:{port}").parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn host_candidates_connect_and_exchange_datagrams() {
        let a = UdpIceConnection::bind(true).await.unwrap();
        let b = UdpIceConnection::bind(false).await.unwrap();

        let a_addr = a.local_candidates().remove(0);
        let b_addr = b.local_candidates().remove(0);

        a.add_remote_candidate(b_addr);
        b.add_remote_candidate(a_addr);

        a.connect().await.unwrap();
        b.connect().await.unwrap();

        a.send(b"hello").await.unwrap();
        let received = b.recv().await.unwrap();
        assert_eq!(&received[..], b"hello");
    }
}
