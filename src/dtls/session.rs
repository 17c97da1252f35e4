use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use openssl::hash::MessageDigest;
use openssl::ssl::{HandshakeError, Ssl, SslStream};
use srtp::context::Context as SrtpContext;
use srtp::protection_profile::ProtectionProfile;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::dtls::channel::{inbound_queue, InboundQueue, InboundQueueSender};
use crate::dtls::context::DtlsContext;
use crate::dtls::fingerprint::format_fingerprint;
use crate::dtls::role::DtlsRole;
use crate::dtls::state::DtlsSessionState;
use crate::error::{Error, Result};
use crate::ice_transport::IceConnection;

/// Bytes exported via `EXTRACTOR-dtls_srtp`: client write key (16) + server
/// write key (16) + client write salt (14) + server write salt (14), per
/// RFC 5764 §4.2 and spec §4.2.
const SRTP_KEYING_MATERIAL_LEN: usize = 2 * (16 + 14);
const SRTP_KEY_LEN: usize = 16;
const SRTP_SALT_LEN: usize = 14;

/// Bound on the handshake loop (spec §9 open question: the source has no
/// explicit timeout; an implementer should add one). A stalled peer or a
/// black-holed ICE path fails the connect call instead of hanging it
/// forever.
const HANDSHAKE_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

const DTLS_RECORD_LOW: u8 = 20;
const DTLS_RECORD_HIGH: u8 = 63;
const RTP_RTCP_LOW: u8 = 128;
const RTP_RTCP_HIGH: u8 = 191;
const RTCP_PT_LOW: u8 = 192;
const RTCP_PT_HIGH: u8 = 223;

/// A purely in-memory, non-blocking BIO pair: `feed` stages bytes read off
/// the wire for OpenSSL to consume, `take_outbound` drains whatever OpenSSL
/// queued for the wire. Modeled on the `UdpStream` in the retrieval pack's
/// `rtc_dtls.rs`, but never touches a socket directly — the two in-memory
/// buffers spec §4.2 describes are exactly `read_buf`/`write_buf` below.
struct MemoryBio {
    read_buf: VecDeque<u8>,
    write_buf: VecDeque<u8>,
}

impl MemoryBio {
    fn new() -> Self {
        Self {
            read_buf: VecDeque::new(),
            write_buf: VecDeque::new(),
        }
    }

    fn feed(&mut self, data: &[u8]) {
        self.read_buf.extend(data.iter().copied());
    }

    fn take_outbound(&mut self) -> Vec<u8> {
        self.write_buf.drain(..).collect()
    }
}

impl Read for MemoryBio {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.read_buf.is_empty() {
            return Err(io::Error::new(io::ErrorKind::WouldBlock, "no data available"));
        }
        let n = buf.len().min(self.read_buf.len());
        for slot in buf.iter_mut().take(n) {
            *slot = self.read_buf.pop_front().expect("checked len above");
        }
        Ok(n)
    }
}

impl Write for MemoryBio {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_buf.extend(buf.iter().copied());
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

enum PacketKind {
    Dtls,
    Rtp,
    Rtcp,
    Unknown,
}

fn classify(datagram: &[u8]) -> PacketKind {
    let Some(&first) = datagram.first() else {
        return PacketKind::Unknown;
    };
    match first {
        DTLS_RECORD_LOW..=DTLS_RECORD_HIGH => PacketKind::Dtls,
        RTP_RTCP_LOW..=RTP_RTCP_HIGH => {
            let second = datagram.get(1).copied().unwrap_or(0);
            if (RTCP_PT_LOW..=RTCP_PT_HIGH).contains(&second) {
                PacketKind::Rtcp
            } else {
                PacketKind::Rtp
            }
        }
        _ => PacketKind::Unknown,
    }
}

struct SrtpKeys {
    tx: Vec<u8>,
    rx: Vec<u8>,
}

/// One DTLS-SRTP session bound to a single ICE connection (spec §4.2): it
/// owns the handshake, the derived SRTP read/write contexts, and the
/// `data`/`rtp` channels that carry demuxed payloads up to the SCTP
/// transport and the RTP transceivers respectively.
pub struct DtlsSession {
    context: Arc<DtlsContext>,
    role: DtlsRole,
    transport: Arc<dyn IceConnection>,
    state: Mutex<DtlsSessionState>,
    stream: Mutex<Option<SslStream<MemoryBio>>>,
    tx_srtp: Mutex<Option<SrtpContext>>,
    rx_srtp: Mutex<Option<SrtpContext>>,
    data_tx: InboundQueueSender,
    data_rx: InboundQueue,
    rtp_tx: InboundQueueSender,
    rtp_rx: InboundQueue,
    pump: Mutex<Option<JoinHandle<()>>>,
    closing: AtomicBool,
}

impl DtlsSession {
    pub fn new(context: Arc<DtlsContext>, role: DtlsRole, transport: Arc<dyn IceConnection>) -> Arc<Self> {
        let (data_tx, data_rx) = inbound_queue();
        let (rtp_tx, rtp_rx) = inbound_queue();
        Arc::new(Self {
            context,
            role,
            transport,
            state: Mutex::new(DtlsSessionState::Closed),
            stream: Mutex::new(None),
            tx_srtp: Mutex::new(None),
            rx_srtp: Mutex::new(None),
            data_tx,
            data_rx,
            rtp_tx,
            rtp_rx,
            pump: Mutex::new(None),
            closing: AtomicBool::new(false),
        })
    }

    pub async fn state(&self) -> DtlsSessionState {
        *self.state.lock().await
    }

    /// Drives the handshake to completion, verifies the remote fingerprint,
    /// derives SRTP keying material, and spawns the receive pump. Follows
    /// spec §4.2's connect algorithm step by step.
    pub async fn connect(self: &Arc<Self>, remote_fingerprint: &str) -> Result<()> {
        {
            let mut state = self.state.lock().await;
            if *state != DtlsSessionState::Closed {
                return Err(Error::InvalidState(format!(
                    "connect() called in state {state}"
                )));
            }
            *state = DtlsSessionState::Connecting;
        }

        let result = match tokio::time::timeout(HANDSHAKE_TIMEOUT, self.run_handshake(remote_fingerprint)).await
        {
            Ok(result) => result,
            Err(_) => Err(Error::Dtls(format!(
                "handshake did not complete within {HANDSHAKE_TIMEOUT:?}"
            ))),
        };
        if result.is_err() {
            *self.state.lock().await = DtlsSessionState::Closed;
        }
        result
    }

    async fn run_handshake(self: &Arc<Self>, remote_fingerprint: &str) -> Result<()> {
        let ssl = Ssl::new(self.context.ssl_ctx())
            .map_err(|e| Error::Dtls(format!("failed to create SSL session: {e}")))?;
        let bio = MemoryBio::new();

        let mut handshake = if self.role == DtlsRole::Server {
            ssl.accept(bio)
        } else {
            ssl.connect(bio)
        };

        let mut ssl_stream = loop {
            match handshake {
                Ok(stream) => break stream,
                Err(HandshakeError::WouldBlock(mut mid)) => {
                    let outbound = mid.get_mut().take_outbound();
                    if !outbound.is_empty() {
                        self.transport.send(&outbound).await?;
                    }
                    let datagram = self.transport.recv().await?;
                    mid.get_mut().feed(&datagram);
                    handshake = mid.handshake();
                }
                Err(e) => {
                    return Err(Error::Dtls(format!("handshake failed: {e}")));
                }
            }
        };

        let outbound = ssl_stream.get_mut().take_outbound();
        if !outbound.is_empty() {
            self.transport.send(&outbound).await?;
        }

        let peer_cert = ssl_stream
            .ssl()
            .peer_certificate()
            .ok_or_else(|| Error::Dtls("peer presented no certificate".to_string()))?;
        let digest = peer_cert
            .digest(MessageDigest::sha256())
            .map_err(|e| Error::Dtls(format!("failed to digest peer certificate: {e}")))?;
        let got_fingerprint = format_fingerprint(&digest);
        if !got_fingerprint.eq_ignore_ascii_case(remote_fingerprint) {
            return Err(Error::Dtls(format!(
                "remote fingerprint mismatch: expected {remote_fingerprint}, got {got_fingerprint}"
            )));
        }

        let keys = derive_srtp_keys(&ssl_stream, self.role)?;
        let tx_srtp = SrtpContext::new(
            &keys.tx[..SRTP_KEY_LEN],
            &keys.tx[SRTP_KEY_LEN..],
            ProtectionProfile::Aes128CmHmacSha1_80,
            None,
            None,
        )
        .map_err(|e| Error::Dtls(format!("failed to build tx SRTP context: {e}")))?;
        let rx_srtp = SrtpContext::new(
            &keys.rx[..SRTP_KEY_LEN],
            &keys.rx[SRTP_KEY_LEN..],
            ProtectionProfile::Aes128CmHmacSha1_80,
            None,
            None,
        )
        .map_err(|e| Error::Dtls(format!("failed to build rx SRTP context: {e}")))?;

        *self.tx_srtp.lock().await = Some(tx_srtp);
        *self.rx_srtp.lock().await = Some(rx_srtp);
        *self.stream.lock().await = Some(ssl_stream);
        *self.state.lock().await = DtlsSessionState::Connected;

        let pump_handle = {
            let this = Arc::clone(self);
            tokio::spawn(async move { this.run_pump().await })
        };
        *self.pump.lock().await = Some(pump_handle);

        Ok(())
    }

    async fn run_pump(self: Arc<Self>) {
        loop {
            let datagram = match self.transport.recv().await {
                Ok(d) => d,
                Err(_) => break,
            };
            if self.state().await == DtlsSessionState::Closed {
                break;
            }
            match classify(&datagram) {
                PacketKind::Dtls => self.handle_dtls_record(&datagram).await,
                PacketKind::Rtp => self.handle_srtp(&datagram).await,
                PacketKind::Rtcp => self.handle_srtcp(&datagram).await,
                PacketKind::Unknown => {
                    log::trace!(
                        "dropping undemuxable packet, first byte {:#x}",
                        datagram.first().copied().unwrap_or(0)
                    );
                }
            }
            if self.state().await == DtlsSessionState::Closed {
                break;
            }
        }
    }

    async fn handle_dtls_record(&self, datagram: &[u8]) {
        let mut guard = self.stream.lock().await;
        let Some(stream) = guard.as_mut() else {
            return;
        };
        stream.get_mut().feed(datagram);

        let mut scratch = [0u8; 2048];
        let read_result = stream.read(&mut scratch);
        let outbound = stream.get_mut().take_outbound();
        drop(guard);

        if !outbound.is_empty() {
            let _ = self.transport.send(&outbound).await;
        }

        match read_result {
            Ok(0) => {
                // A zero-length read means the peer sent close_notify; tear
                // the session down.
                self.close().await;
            }
            Ok(n) => {
                self.data_tx.try_enqueue(Bytes::copy_from_slice(&scratch[..n]));
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                // No application plaintext yet: a retransmitted handshake
                // flight, a non-fatal alert, or an already-drained buffer.
            }
            Err(_) => {
                self.close().await;
            }
        }
    }

    async fn handle_srtp(&self, datagram: &Bytes) {
        let mut guard = self.rx_srtp.lock().await;
        let Some(ctx) = guard.as_mut() else {
            return;
        };
        match ctx.decrypt_rtp(datagram) {
            Ok(plain) => self.rtp_tx.try_enqueue(plain),
            Err(e) => log::debug!("dropping undecryptable SRTP packet: {e}"),
        }
    }

    async fn handle_srtcp(&self, datagram: &Bytes) {
        let mut guard = self.rx_srtp.lock().await;
        let Some(ctx) = guard.as_mut() else {
            return;
        };
        match ctx.decrypt_rtcp(datagram) {
            Ok(plain) => self.rtp_tx.try_enqueue(plain),
            Err(e) => log::debug!("dropping undecryptable SRTCP packet: {e}"),
        }
    }

    /// Writes application data over the DTLS record layer (carries the SCTP
    /// association's datagrams, per spec §3).
    pub async fn send_data(&self, buf: &[u8]) -> Result<()> {
        match self.state().await {
            DtlsSessionState::Connected => {}
            DtlsSessionState::Closed => return Err(Error::ConnectionClosed),
            DtlsSessionState::Connecting => {
                return Err(Error::InvalidState("session is not connected".to_string()))
            }
        }
        let outbound = {
            let mut guard = self.stream.lock().await;
            let stream = guard
                .as_mut()
                .ok_or_else(|| Error::InvalidState("session has no DTLS stream".to_string()))?;
            stream
                .write_all(buf)
                .map_err(|e| Error::Dtls(format!("failed to write application data: {e}")))?;
            stream.get_mut().take_outbound()
        };
        if !outbound.is_empty() {
            self.transport.send(&outbound).await?;
        }
        Ok(())
    }

    pub async fn recv_data(&self) -> Result<Bytes> {
        self.data_rx.recv().await
    }

    /// Encrypts and sends one RTP or RTCP packet, classifying by the same
    /// first-byte rule the receive pump uses (spec §4.2).
    pub async fn send_rtp(&self, packet: &[u8]) -> Result<()> {
        match self.state().await {
            DtlsSessionState::Connected => {}
            DtlsSessionState::Closed => return Err(Error::ConnectionClosed),
            DtlsSessionState::Connecting => {
                return Err(Error::InvalidState("session is not connected".to_string()))
            }
        }
        let mut guard = self.tx_srtp.lock().await;
        let ctx = guard
            .as_mut()
            .ok_or_else(|| Error::InvalidState("session has no SRTP context".to_string()))?;
        let encrypted = match classify(packet) {
            PacketKind::Rtcp => ctx
                .encrypt_rtcp(packet)
                .map_err(|e| Error::Internal(format!("failed to encrypt RTCP packet: {e}")))?,
            _ => ctx
                .encrypt_rtp(packet)
                .map_err(|e| Error::Internal(format!("failed to encrypt RTP packet: {e}")))?,
        };
        drop(guard);
        self.transport.send(&encrypted).await
    }

    pub async fn recv_rtp(&self) -> Result<Bytes> {
        self.rtp_rx.recv().await
    }

    /// Idempotent teardown: sends a close_notify alert if the handshake
    /// completed, cancels the receive pump, and wakes every blocked
    /// `recv_data`/`recv_rtp` call with `ConnectionClosed` (spec §8
    /// property 6).
    pub async fn close(&self) {
        if self.closing.swap(true, Ordering::AcqRel) {
            return;
        }

        {
            let mut guard = self.stream.lock().await;
            if let Some(stream) = guard.as_mut() {
                let _ = stream.shutdown();
                let outbound = stream.get_mut().take_outbound();
                drop(guard);
                if !outbound.is_empty() {
                    let _ = self.transport.send(&outbound).await;
                }
            }
        }

        *self.state.lock().await = DtlsSessionState::Closed;
        self.data_rx.close();
        self.rtp_rx.close();

        if let Some(handle) = self.pump.lock().await.take() {
            handle.abort();
        }
    }
}

fn derive_srtp_keys(stream: &SslStream<MemoryBio>, role: DtlsRole) -> Result<SrtpKeys> {
    let mut material = [0u8; SRTP_KEYING_MATERIAL_LEN];
    stream
        .ssl()
        .export_keying_material(&mut material, "EXTRACTOR-dtls_srtp", None)
        .map_err(|e| Error::Dtls(format!("failed to export SRTP keying material: {e}")))?;

    let client_write_key = &material[0..SRTP_KEY_LEN];
    let server_write_key = &material[SRTP_KEY_LEN..2 * SRTP_KEY_LEN];
    let client_write_salt = &material[2 * SRTP_KEY_LEN..2 * SRTP_KEY_LEN + SRTP_SALT_LEN];
    let server_write_salt = &material[2 * SRTP_KEY_LEN + SRTP_SALT_LEN..];

    let mut client_key_salt = Vec::with_capacity(SRTP_KEY_LEN + SRTP_SALT_LEN);
    client_key_salt.extend_from_slice(client_write_key);
    client_key_salt.extend_from_slice(client_write_salt);

    let mut server_key_salt = Vec::with_capacity(SRTP_KEY_LEN + SRTP_SALT_LEN);
    server_key_salt.extend_from_slice(server_write_key);
    server_key_salt.extend_from_slice(server_write_salt);

    let by_index = [client_key_salt, server_key_salt];
    Ok(SrtpKeys {
        tx: by_index[role.tx_index()].clone(),
        rx: by_index[role.rx_index()].clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ice_transport::UdpIceConnection;

    async fn connected_pair() -> (Arc<DtlsSession>, Arc<DtlsSession>) {
        let client_ice = Arc::new(UdpIceConnection::bind(false).await.unwrap());
        let server_ice = Arc::new(UdpIceConnection::bind(true).await.unwrap());

        let client_addr = client_ice.local_candidates().remove(0);
        let server_addr = server_ice.local_candidates().remove(0);
        client_ice.add_remote_candidate(server_addr);
        server_ice.add_remote_candidate(client_addr);
        client_ice.connect().await.unwrap();
        server_ice.connect().await.unwrap();

        let client_ctx = Arc::new(DtlsContext::new().unwrap());
        let server_ctx = Arc::new(DtlsContext::new().unwrap());
        let client_fingerprint = client_ctx.local_fingerprint().to_string();
        let server_fingerprint = server_ctx.local_fingerprint().to_string();

        let client = DtlsSession::new(client_ctx, DtlsRole::Client, client_ice);
        let server = DtlsSession::new(server_ctx, DtlsRole::Server, server_ice);

        let client_for_connect = Arc::clone(&client);
        let server_for_connect = Arc::clone(&server);
        let (client_result, server_result) = tokio::join!(
            client_for_connect.connect(&server_fingerprint),
            server_for_connect.connect(&client_fingerprint)
        );
        client_result.unwrap();
        server_result.unwrap();

        (client, server)
    }

    #[tokio::test]
    async fn handshake_completes_and_exchanges_application_data() {
        let (client, server) = connected_pair().await;
        assert_eq!(client.state().await, DtlsSessionState::Connected);
        assert_eq!(server.state().await, DtlsSessionState::Connected);

        client.send_data(b"hello over dtls").await.unwrap();
        let received = server.recv_data().await.unwrap();
        assert_eq!(&received[..], b"hello over dtls");
    }

    #[tokio::test]
    async fn srtp_round_trip_is_symmetric_in_each_direction() {
        let (client, server) = connected_pair().await;

        // A minimal RTP packet: V=2 P=0 X=0 CC=0, PT=0 (not in the RTCP
        // range), sequence/timestamp/SSRC, no payload.
        let rtp_packet: [u8; 12] = [0x80, 0x00, 0x00, 0x01, 0, 0, 0, 2, 0, 0, 0, 3];
        client.send_rtp(&rtp_packet).await.unwrap();
        let received = server.recv_rtp().await.unwrap();
        assert_eq!(&received[..], &rtp_packet[..]);

        // A minimal RTCP SR: V=2 P=0 RC=0, PT=200 (in the RTCP range),
        // length, SSRC, and filler payload.
        let mut rtcp_packet = vec![0x80, 200, 0x00, 0x01, 0, 0, 0, 4];
        rtcp_packet.extend_from_slice(&[0u8; 12]);
        server.send_rtp(&rtcp_packet).await.unwrap();
        let received = client.recv_rtp().await.unwrap();
        assert_eq!(&received[..], &rtcp_packet[..]);
    }

    #[tokio::test]
    async fn connect_fails_on_remote_fingerprint_mismatch() {
        let client_ice = Arc::new(UdpIceConnection::bind(false).await.unwrap());
        let server_ice = Arc::new(UdpIceConnection::bind(true).await.unwrap());

        let client_addr = client_ice.local_candidates().remove(0);
        let server_addr = server_ice.local_candidates().remove(0);
        client_ice.add_remote_candidate(server_addr);
        server_ice.add_remote_candidate(client_addr);
        client_ice.connect().await.unwrap();
        server_ice.connect().await.unwrap();

        let client_ctx = Arc::new(DtlsContext::new().unwrap());
        let server_ctx = Arc::new(DtlsContext::new().unwrap());
        let client_fingerprint = client_ctx.local_fingerprint().to_string();

        let client = DtlsSession::new(client_ctx, DtlsRole::Client, client_ice);
        let server = DtlsSession::new(server_ctx, DtlsRole::Server, server_ice);

        let bogus_fingerprint =
            "00:11:22:33:44:55:66:77:88:99:AA:BB:CC:DD:EE:FF:00:11:22:33:44:55:66:77:88:99:AA:BB:CC:DD:EE:FF";

        let client_for_connect = Arc::clone(&client);
        let server_for_connect = Arc::clone(&server);
        let (client_result, _server_result) = tokio::join!(
            client_for_connect.connect(bogus_fingerprint),
            server_for_connect.connect(&client_fingerprint)
        );

        let err = client_result.unwrap_err();
        assert!(matches!(err, Error::Dtls(_)));
        assert_eq!(client.state().await, DtlsSessionState::Closed);
    }

    #[tokio::test]
    async fn close_is_idempotent_and_unblocks_pending_recv() {
        let (client, _server) = connected_pair().await;
        client.close().await;
        client.close().await;
        let err = client.recv_data().await.unwrap_err();
        assert!(matches!(err, Error::ConnectionClosed));
    }

    #[tokio::test]
    async fn send_after_close_raises_connection_closed() {
        let (client, _server) = connected_pair().await;
        client.close().await;

        let data_err = client.send_data(b"too late").await.unwrap_err();
        assert!(matches!(data_err, Error::ConnectionClosed));

        let rtp_err = client.send_rtp(&[0x80, 0, 0, 1, 0, 0, 0, 2, 0, 0, 0, 3]).await.unwrap_err();
        assert!(matches!(rtp_err, Error::ConnectionClosed));
    }
}
