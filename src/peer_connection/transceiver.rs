use std::sync::Arc;

use bytes::Bytes;
use rand::RngCore;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::dtls::DtlsSession;
use crate::error::Result;
use crate::ice_transport::IceConnection;
use crate::sdp::{Codec, Direction, MediaKind};

/// Track is the opaque media-capture handle this crate exposes (spec §1:
/// "media capture" beyond creation hooks is out of scope). It carries just
/// enough identity for `addTrack`/`ontrack` bookkeeping; encoding, capture,
/// and packetization belong to an external RTP/RTCP codec layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub id: String,
    pub kind: MediaKind,
}

impl Track {
    pub fn new(id: impl Into<String>, kind: MediaKind) -> Self {
        Self { id: id.into(), kind }
    }
}

/// The local sending half of a transceiver: the bound track (if any) and
/// the SSRC advertised in `a=ssrc:` (spec §4.3).
#[derive(Default)]
pub struct Sender {
    pub track: Option<Arc<Track>>,
    pub ssrc: u32,
}

/// The remote receiving half: the track discovered from a remote m-line,
/// surfaced through the peer connection's `track` event (spec §6).
#[derive(Default)]
pub struct Receiver {
    pub track: Option<Arc<Track>>,
}

/// Transceiver couples one m-line's negotiated codecs to the transport pair
/// that carries its media (spec §3): exactly one `IceConnection` and one
/// `DtlsSession`, created on first local `addTrack` or first remote m-line
/// of its kind.
pub struct Transceiver {
    pub mid: String,
    pub kind: MediaKind,
    pub direction: Mutex<Direction>,
    pub codecs: Mutex<Vec<Codec>>,
    pub sender: Mutex<Sender>,
    pub receiver: Mutex<Receiver>,
    pub controlling: bool,
    pub ice: Arc<dyn IceConnection>,
    pub dtls: Arc<DtlsSession>,
    /// Stashed by `setRemoteDescription` until the connect coroutine calls
    /// `dtls.connect(remote_fingerprint)` (spec §4.2 precondition:
    /// "`remote_fingerprint` already assigned by the peer connection").
    pub remote_fingerprint: Mutex<Option<String>>,
    media_pump: Mutex<Option<JoinHandle<()>>>,
}

impl Transceiver {
    pub fn new(
        mid: String,
        kind: MediaKind,
        controlling: bool,
        ice: Arc<dyn IceConnection>,
        dtls: Arc<DtlsSession>,
    ) -> Arc<Self> {
        Arc::new(Self {
            mid,
            kind,
            direction: Mutex::new(Direction::SendRecv),
            codecs: Mutex::new(Vec::new()),
            sender: Mutex::new(Sender {
                track: None,
                ssrc: random_ssrc(),
            }),
            receiver: Mutex::new(Receiver::default()),
            controlling,
            ice,
            dtls,
            remote_fingerprint: Mutex::new(None),
            media_pump: Mutex::new(None),
        })
    }

    pub async fn set_remote_fingerprint(&self, fingerprint: String) {
        *self.remote_fingerprint.lock().await = Some(fingerprint);
    }

    pub async fn is_ready_to_connect(&self) -> bool {
        self.remote_fingerprint.lock().await.is_some() && self.ice.remote_username().is_some()
    }

    pub async fn has_sender_track(&self) -> bool {
        self.sender.lock().await.track.is_some()
    }

    pub async fn bind_sender_track(&self, track: Arc<Track>) {
        self.sender.lock().await.track = Some(track);
    }

    pub async fn ssrc(&self) -> u32 {
        self.sender.lock().await.ssrc
    }

    /// Starts the transceiver's RTP run loop bound to its DTLS session's
    /// `rtp` channel (spec §4.4 connect coroutine). Decoded frames are
    /// handed to an external packetizer via `on_rtp`; this crate has no
    /// packetizer of its own (spec §1), so the default loop just drains the
    /// channel so it never backs up.
    pub async fn start_media_pump(self: &Arc<Self>) {
        let this = Arc::clone(self);
        let handle = tokio::spawn(async move {
            loop {
                match this.dtls.recv_rtp().await {
                    Ok(packet) => this.on_rtp(packet),
                    Err(_) => break,
                }
            }
        });
        *self.media_pump.lock().await = Some(handle);
    }

    /// Hook point for an external RTP/RTCP codec layer (spec §1 "consumed
    /// from ... RTP/RTCP codec packetizers"). Overriding this by wrapping
    /// `Transceiver` is left to the integrator; the default is a no-op.
    fn on_rtp(&self, _packet: Bytes) {}

    pub async fn send_rtp(&self, packet: &[u8]) -> Result<()> {
        self.dtls.send_rtp(packet).await
    }

    pub async fn stop(&self) {
        if let Some(handle) = self.media_pump.lock().await.take() {
            handle.abort();
        }
        self.dtls.close().await;
        self.ice.close().await;
    }
}

fn random_ssrc() -> u32 {
    rand::rng().next_u32()
}
