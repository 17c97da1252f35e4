//! The `RTCPeerConnection`-style state machine (spec §4.4): owns every
//! transceiver and the optional SCTP transport, drives the signaling and
//! ICE state machines, and composes ICE + DTLS + codec negotiation per
//! m-line.

pub mod events;
pub mod ice_state;
pub mod signaling_state;
pub mod transceiver;

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::dtls::{DtlsContext, DtlsRole, DtlsSession};
use crate::error::{Error, Result};
use crate::ice_transport::{IceConnection, UdpIceConnection};
use crate::sctp_transport::{DtlsDataTransport, SctpEndpoint};
use crate::sdp::codec::{find_common_codecs, preference_list, DYNAMIC_PT_BASE};
use crate::sdp::emitter::{self, MediaBlock, SctpBlock};
use crate::sdp::media_description::APPLICATION_KIND;
use crate::sdp::parser;
use crate::sdp::{Codec, Direction, DtlsSetup, MediaKind, SdpType, SessionDescription};

use events::EventHandlers;
use ice_state::{IceConnectionState, IceGatheringState};
use signaling_state::{next_signaling_state, SignalingState, StateChangeOp};
use transceiver::Transceiver;

/// Factory the peer connection uses to mint a fresh `IceConnection` for
/// each new transceiver/SCTP transport. Defaults to `UdpIceConnection::bind`
/// (spec §9: "the ICE agent ... consumed as an opaque connection object");
/// tests may substitute a different factory to exercise the layers above
/// without a real socket.
pub type IceFactory = Arc<
    dyn Fn(bool) -> Pin<Box<dyn Future<Output = Result<Arc<dyn IceConnection>>> + Send>>
        + Send
        + Sync,
>;

fn default_ice_factory() -> IceFactory {
    Arc::new(|controlling: bool| {
        Box::pin(async move {
            let ice = UdpIceConnection::bind(controlling).await?;
            Ok(Arc::new(ice) as Arc<dyn IceConnection>)
        })
    })
}

/// SctpTransport wires one `application` m-line's ICE connection and DTLS
/// session to an (optional) `SctpEndpoint` (spec §6). No concrete endpoint
/// ships with this crate; `run()` is only started if the peer connection
/// was constructed with an `sctp_factory`.
pub struct SctpTransport {
    pub mid: String,
    pub controlling: bool,
    pub ice: Arc<dyn IceConnection>,
    pub dtls: Arc<DtlsSession>,
    remote_fingerprint: Mutex<Option<String>>,
    endpoint: Mutex<Option<Arc<dyn SctpEndpoint>>>,
}

impl SctpTransport {
    async fn set_remote_fingerprint(&self, fingerprint: String) {
        *self.remote_fingerprint.lock().await = Some(fingerprint);
    }

    async fn is_ready_to_connect(&self) -> bool {
        self.remote_fingerprint.lock().await.is_some() && self.ice.remote_username().is_some()
    }

    async fn stop(&self) {
        if let Some(endpoint) = self.endpoint.lock().await.take() {
            endpoint.close().await;
        }
        self.dtls.close().await;
        self.ice.close().await;
    }
}

type SctpFactory = Arc<dyn Fn(bool, DtlsDataTransport) -> Arc<dyn SctpEndpoint> + Send + Sync>;

/// PeerConnection is the top-level object a caller drives through
/// gather → connect → media-flow → close (spec §3, §4.4).
pub struct PeerConnection {
    cname: String,
    dtls_context: Arc<DtlsContext>,
    ice_factory: IceFactory,
    sctp_factory: Mutex<Option<SctpFactory>>,
    transceivers: Mutex<Vec<Arc<Transceiver>>>,
    sctp: Mutex<Option<Arc<SctpTransport>>>,
    signaling_state: Mutex<SignalingState>,
    ice_connection_state: Mutex<IceConnectionState>,
    ice_gathering_state: Mutex<IceGatheringState>,
    is_closed: AtomicBool,
    gathering_started: AtomicBool,
    current_local_description: Mutex<Option<SessionDescription>>,
    current_remote_description: Mutex<Option<SessionDescription>>,
    events: EventHandlers,
}

impl PeerConnection {
    pub fn new(cname: impl Into<String>) -> Result<Arc<Self>> {
        Self::with_ice_factory(cname, default_ice_factory())
    }

    pub fn with_ice_factory(cname: impl Into<String>, ice_factory: IceFactory) -> Result<Arc<Self>> {
        let dtls_context = Arc::new(DtlsContext::new()?);
        Ok(Arc::new(Self {
            cname: cname.into(),
            dtls_context,
            ice_factory,
            sctp_factory: Mutex::new(None),
            transceivers: Mutex::new(Vec::new()),
            sctp: Mutex::new(None),
            signaling_state: Mutex::new(SignalingState::Stable),
            ice_connection_state: Mutex::new(IceConnectionState::New),
            ice_gathering_state: Mutex::new(IceGatheringState::New),
            is_closed: AtomicBool::new(false),
            gathering_started: AtomicBool::new(false),
            current_local_description: Mutex::new(None),
            current_remote_description: Mutex::new(None),
            events: EventHandlers::default(),
        }))
    }

    pub async fn set_sctp_factory(&self, factory: SctpFactory) {
        *self.sctp_factory.lock().await = Some(factory);
    }

    pub async fn signaling_state(&self) -> SignalingState {
        *self.signaling_state.lock().await
    }

    pub async fn ice_connection_state(&self) -> IceConnectionState {
        *self.ice_connection_state.lock().await
    }

    pub async fn ice_gathering_state(&self) -> IceGatheringState {
        *self.ice_gathering_state.lock().await
    }

    pub fn is_closed(&self) -> bool {
        self.is_closed.load(Ordering::Acquire)
    }

    pub async fn local_fingerprint(&self) -> String {
        self.dtls_context.local_fingerprint().to_string()
    }

    pub async fn on_track<F>(&self, handler: F)
    where
        F: (FnMut(Arc<transceiver::Track>) -> Pin<Box<dyn Future<Output = ()> + Send>>)
            + Send
            + Sync
            + 'static,
    {
        *self.events.on_track.lock().await = Some(Box::new(handler));
    }

    pub async fn on_ice_connection_state_change<F>(&self, handler: F)
    where
        F: (FnMut(IceConnectionState) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static,
    {
        *self.events.on_ice_connection_state_change.lock().await = Some(Box::new(handler));
    }

    pub async fn on_ice_gathering_state_change<F>(&self, handler: F)
    where
        F: (FnMut(IceGatheringState) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static,
    {
        *self.events.on_ice_gathering_state_change.lock().await = Some(Box::new(handler));
    }

    pub async fn on_signaling_state_change<F>(&self, handler: F)
    where
        F: (FnMut(SignalingState) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static,
    {
        *self.events.on_signaling_state_change.lock().await = Some(Box::new(handler));
    }

    /// `addTrack` (spec §4.4): binds to an existing trackless transceiver of
    /// the same kind, or creates a new one with `controlling=true`.
    pub async fn add_track(self: &Arc<Self>, track: transceiver::Track) -> Result<Arc<Transceiver>> {
        if self.is_closed() {
            return Err(Error::InvalidState("add_track called after close".to_string()));
        }

        let kind = track.kind;
        let track = Arc::new(track);

        let mut transceivers = self.transceivers.lock().await;
        for t in transceivers.iter() {
            if t.kind == kind {
                if t.has_sender_track().await {
                    return Err(Error::InvalidAccess(format!(
                        "a track of kind {kind} is already bound to this transceiver"
                    )));
                }
                t.bind_sender_track(track).await;
                return Ok(Arc::clone(t));
            }
        }

        let mid = transceivers.len().to_string();
        let ice = (self.ice_factory)(true).await?;
        let dtls = DtlsSession::new(Arc::clone(&self.dtls_context), DtlsRole::Server, Arc::clone(&ice));
        let transceiver = Transceiver::new(mid, kind, true, ice, dtls);
        transceiver.bind_sender_track(track).await;
        transceivers.push(Arc::clone(&transceiver));
        Ok(transceiver)
    }

    /// `createDataChannel` (spec §4.4): creates the SCTP transport on first
    /// call with `controlling=true`. The returned handle is just the mid;
    /// channel management is external (spec §1).
    pub async fn create_data_channel(self: &Arc<Self>, _label: &str, _protocol: &str) -> Result<String> {
        if self.is_closed() {
            return Err(Error::InvalidState(
                "create_data_channel called after close".to_string(),
            ));
        }
        let mut sctp = self.sctp.lock().await;
        if sctp.is_none() {
            let mid = self.transceivers.lock().await.len().to_string();
            let ice = (self.ice_factory)(true).await?;
            let dtls = DtlsSession::new(Arc::clone(&self.dtls_context), DtlsRole::Server, Arc::clone(&ice));
            *sctp = Some(Arc::new(SctpTransport {
                mid,
                controlling: true,
                ice,
                dtls,
                remote_fingerprint: Mutex::new(None),
                endpoint: Mutex::new(None),
            }));
        }
        Ok(sctp.as_ref().unwrap().mid.clone())
    }

    /// `createOffer` (spec §4.4): assigns dynamic PTs starting at 96,
    /// incrementing across every transceiver, and emits `type=offer`.
    pub async fn create_offer(&self) -> Result<SessionDescription> {
        if self.is_closed() {
            return Err(Error::InvalidState("create_offer called after close".to_string()));
        }
        let transceivers = self.transceivers.lock().await;
        let sctp = self.sctp.lock().await;
        if transceivers.is_empty() && sctp.is_none() {
            return Err(Error::Internal(
                "create_offer called with nothing to offer".to_string(),
            ));
        }

        let mut next_dynamic_pt = DYNAMIC_PT_BASE;
        let mut blocks = Vec::new();
        for t in transceivers.iter() {
            let mut codecs: Vec<Codec> = preference_list()
                .into_iter()
                .filter(|c| c.kind == t.kind)
                .collect();
            for codec in codecs.iter_mut() {
                if codec.pt.is_none() {
                    codec.pt = Some(next_dynamic_pt);
                    next_dynamic_pt += 1;
                }
            }
            *t.codecs.lock().await = codecs.clone();
            let direction = *t.direction.lock().await;
            blocks.push(OwnedMediaBlock {
                kind: t.kind.to_string(),
                mid: t.mid.clone(),
                direction,
                codecs,
                ssrc: t.ssrc().await,
                ice_candidates: t.ice.local_candidates(),
                ice_ufrag: t.ice.local_username(),
                ice_pwd: t.ice.local_password(),
                dtls_fingerprint: self.dtls_context.local_fingerprint().to_string(),
                dtls_setup: dtls_setup_for(t.controlling),
            });
        }

        let sctp_block = sctp.as_ref().map(|s| OwnedSctpBlock {
            mid: s.mid.clone(),
            ice_candidates: s.ice.local_candidates(),
            ice_ufrag: s.ice.local_username(),
            ice_pwd: s.ice.local_password(),
            dtls_fingerprint: self.dtls_context.local_fingerprint().to_string(),
            dtls_setup: dtls_setup_for(s.controlling),
        });

        Ok(self.build_sdp(SdpType::Offer, &blocks, sctp_block.as_ref()))
    }

    /// `createAnswer` (spec §4.4): requires `have-remote-offer` (this
    /// crate's signaling machine has no pranswer states — see DESIGN.md).
    /// Emits the negotiation already stored on each transceiver as
    /// `type=answer`.
    pub async fn create_answer(&self) -> Result<SessionDescription> {
        if self.is_closed() {
            return Err(Error::InvalidState("create_answer called after close".to_string()));
        }
        if *self.signaling_state.lock().await != SignalingState::HaveRemoteOffer {
            return Err(Error::InvalidState(
                "create_answer called outside have-remote-offer".to_string(),
            ));
        }

        let transceivers = self.transceivers.lock().await;
        let sctp = self.sctp.lock().await;
        let mut blocks = Vec::new();
        for t in transceivers.iter() {
            let codecs = t.codecs.lock().await.clone();
            let direction = *t.direction.lock().await;
            blocks.push(OwnedMediaBlock {
                kind: t.kind.to_string(),
                mid: t.mid.clone(),
                direction,
                codecs,
                ssrc: t.ssrc().await,
                ice_candidates: t.ice.local_candidates(),
                ice_ufrag: t.ice.local_username(),
                ice_pwd: t.ice.local_password(),
                dtls_fingerprint: self.dtls_context.local_fingerprint().to_string(),
                dtls_setup: dtls_setup_for(t.controlling),
            });
        }
        let sctp_block = sctp.as_ref().map(|s| OwnedSctpBlock {
            mid: s.mid.clone(),
            ice_candidates: s.ice.local_candidates(),
            ice_ufrag: s.ice.local_username(),
            ice_pwd: s.ice.local_password(),
            dtls_fingerprint: self.dtls_context.local_fingerprint().to_string(),
            dtls_setup: dtls_setup_for(s.controlling),
        });

        Ok(self.build_sdp(SdpType::Answer, &blocks, sctp_block.as_ref()))
    }

    fn build_sdp(
        &self,
        sdp_type: SdpType,
        blocks: &[OwnedMediaBlock],
        sctp: Option<&OwnedSctpBlock>,
    ) -> SessionDescription {
        let media_blocks: Vec<MediaBlock<'_>> = blocks
            .iter()
            .map(|b| MediaBlock {
                kind: &b.kind,
                mid: &b.mid,
                direction: b.direction,
                codecs: &b.codecs,
                ssrc: b.ssrc,
                ice_candidates: &b.ice_candidates,
                ice_ufrag: &b.ice_ufrag,
                ice_pwd: &b.ice_pwd,
                dtls_fingerprint: &b.dtls_fingerprint,
                dtls_setup: b.dtls_setup,
            })
            .collect();
        let sctp_block = sctp.map(|s| SctpBlock {
            mid: &s.mid,
            ice_candidates: &s.ice_candidates,
            ice_ufrag: &s.ice_ufrag,
            ice_pwd: &s.ice_pwd,
            dtls_fingerprint: &s.dtls_fingerprint,
            dtls_setup: s.dtls_setup,
        });

        let sdp = emitter::emit(&self.cname, &media_blocks, sctp_block.as_ref());
        let media = parser::parse(&sdp).unwrap_or_default();
        SessionDescription::new(sdp_type, media, sdp)
    }

    /// `setLocalDescription` (spec §4.4): advances the signaling state,
    /// stores the description, triggers gathering, and schedules the
    /// connect coroutine.
    pub async fn set_local_description(self: &Arc<Self>, desc: SessionDescription) -> Result<()> {
        if self.is_closed() {
            return Err(Error::InvalidState(
                "set_local_description called after close".to_string(),
            ));
        }
        let op = match desc.sdp_type {
            SdpType::Offer | SdpType::Answer => StateChangeOp::SetLocal,
            _ => {
                return Err(Error::InvalidState(format!(
                    "set_local_description does not support {}",
                    desc.sdp_type
                )))
            }
        };
        let next = {
            let mut state = self.signaling_state.lock().await;
            let next = next_signaling_state(*state, op, desc.sdp_type)?;
            *state = next;
            next
        };
        self.events.fire_signaling_state_change(next).await;

        *self.current_local_description.lock().await = Some(desc);

        self.start_gathering();
        self.try_connect();
        Ok(())
    }

    /// `setRemoteDescription` (spec §4.4): validates the type against the
    /// current signaling state, wires each m-line's transport fields into a
    /// found-or-created transceiver (or the SCTP transport), and schedules
    /// the connect coroutine.
    pub async fn set_remote_description(self: &Arc<Self>, desc: SessionDescription) -> Result<()> {
        if self.is_closed() {
            return Err(Error::InvalidState(
                "set_remote_description called after close".to_string(),
            ));
        }
        let op = StateChangeOp::SetRemote;
        {
            let state = *self.signaling_state.lock().await;
            match (desc.sdp_type, state) {
                (SdpType::Offer, SignalingState::Stable)
                | (SdpType::Offer, SignalingState::HaveRemoteOffer) => {}
                (SdpType::Answer, SignalingState::HaveLocalOffer) => {}
                _ => {
                    return Err(Error::InvalidState(format!(
                        "set_remote_description({}) rejected from {state}",
                        desc.sdp_type
                    )))
                }
            }
        }

        for m in &desc.media {
            if m.kind == APPLICATION_KIND {
                self.wire_remote_sctp(m).await?;
                continue;
            }
            let Some(kind) = m.media_kind() else { continue };
            self.wire_remote_media(kind, m).await?;
        }

        let next = {
            let mut state = self.signaling_state.lock().await;
            let next = next_signaling_state(*state, op, desc.sdp_type)?;
            *state = next;
            next
        };
        self.events.fire_signaling_state_change(next).await;

        *self.current_remote_description.lock().await = Some(desc);
        self.try_connect();
        Ok(())
    }

    async fn wire_remote_media(
        self: &Arc<Self>,
        kind: MediaKind,
        m: &crate::sdp::MediaDescription,
    ) -> Result<()> {
        let remote_codecs = remote_codecs_from_media(kind, m);

        let mut transceivers = self.transceivers.lock().await;
        let transceiver = match transceivers.iter().find(|t| t.kind == kind) {
            Some(t) => Arc::clone(t),
            None => {
                let mid = m.mid.clone().unwrap_or_else(|| transceivers.len().to_string());
                let ice = (self.ice_factory)(false).await?;
                let dtls =
                    DtlsSession::new(Arc::clone(&self.dtls_context), DtlsRole::Client, Arc::clone(&ice));
                let t = Transceiver::new(mid, kind, false, ice, dtls);
                transceivers.push(Arc::clone(&t));
                let discovered_track = Arc::new(transceiver::Track::new(
                    format!("remote-{kind}"),
                    kind,
                ));
                t.receiver.lock().await.track = Some(Arc::clone(&discovered_track));
                self.events.fire_track(discovered_track).await;
                t
            }
        };
        drop(transceivers);

        let local_preference: Vec<Codec> = preference_list().into_iter().filter(|c| c.kind == kind).collect();
        let negotiated = find_common_codecs(&local_preference, &remote_codecs);
        *transceiver.codecs.lock().await = negotiated;
        *transceiver.direction.lock().await = m.direction;

        wire_transport(&transceiver.ice, m);
        if let Some(fingerprint) = &m.dtls_fingerprint {
            transceiver.set_remote_fingerprint(fingerprint.clone()).await;
        }
        Ok(())
    }

    async fn wire_remote_sctp(self: &Arc<Self>, m: &crate::sdp::MediaDescription) -> Result<()> {
        let mut sctp = self.sctp.lock().await;
        let transport = match sctp.as_ref() {
            Some(s) => Arc::clone(s),
            None => {
                let mid = m.mid.clone().unwrap_or_else(|| "application".to_string());
                let ice = (self.ice_factory)(false).await?;
                let dtls =
                    DtlsSession::new(Arc::clone(&self.dtls_context), DtlsRole::Client, Arc::clone(&ice));
                let t = Arc::new(SctpTransport {
                    mid,
                    controlling: false,
                    ice,
                    dtls,
                    remote_fingerprint: Mutex::new(None),
                    endpoint: Mutex::new(None),
                });
                *sctp = Some(Arc::clone(&t));
                t
            }
        };
        drop(sctp);

        wire_transport(&transport.ice, m);
        if let Some(fingerprint) = &m.dtls_fingerprint {
            transport.set_remote_fingerprint(fingerprint.clone()).await;
        }
        Ok(())
    }

    fn start_gathering(self: &Arc<Self>) {
        if self.gathering_started.swap(true, Ordering::AcqRel) {
            return;
        }
        let this = Arc::clone(self);
        tokio::spawn(async move {
            *this.ice_gathering_state.lock().await = IceGatheringState::Gathering;
            this.events
                .fire_ice_gathering_state_change(IceGatheringState::Gathering)
                .await;

            let transceivers = this.transceivers.lock().await.clone();
            let sctp = this.sctp.lock().await.clone();
            for t in &transceivers {
                if let Err(e) = t.ice.gather_candidates().await {
                    log::warn!("candidate gathering failed for mid {}: {e}", t.mid);
                }
            }
            if let Some(s) = &sctp {
                if let Err(e) = s.ice.gather_candidates().await {
                    log::warn!("candidate gathering failed for sctp transport: {e}");
                }
            }

            *this.ice_gathering_state.lock().await = IceGatheringState::Complete;
            this.events
                .fire_ice_gathering_state_change(IceGatheringState::Complete)
                .await;
        });
    }

    /// Schedules the connect coroutine (spec §4.4). A no-op if already
    /// checking/completed, or if not every transport has both local and
    /// remote credentials yet — the next `setLocal`/`setRemoteDescription`
    /// call will try again.
    fn try_connect(self: &Arc<Self>) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = this.connect_if_ready().await {
                log::error!("peer connection bring-up failed: {e}");
            }
        });
    }

    async fn connect_if_ready(self: &Arc<Self>) -> Result<()> {
        {
            let state = *self.ice_connection_state.lock().await;
            if state != IceConnectionState::New {
                return Ok(());
            }
        }

        let transceivers = self.transceivers.lock().await.clone();
        let sctp = self.sctp.lock().await.clone();
        for t in &transceivers {
            if !t.is_ready_to_connect().await {
                return Ok(());
            }
        }
        if let Some(s) = &sctp {
            if !s.is_ready_to_connect().await {
                return Ok(());
            }
        }
        if transceivers.is_empty() && sctp.is_none() {
            return Ok(());
        }

        *self.ice_connection_state.lock().await = IceConnectionState::Checking;
        self.events
            .fire_ice_connection_state_change(IceConnectionState::Checking)
            .await;

        for t in &transceivers {
            t.ice.connect().await?;
            let fingerprint = t
                .remote_fingerprint
                .lock()
                .await
                .clone()
                .ok_or_else(|| Error::Internal("missing remote fingerprint".to_string()))?;
            t.dtls.connect(&fingerprint).await?;
        }
        if let Some(s) = &sctp {
            s.ice.connect().await?;
            let fingerprint = s
                .remote_fingerprint
                .lock()
                .await
                .clone()
                .ok_or_else(|| Error::Internal("missing remote fingerprint".to_string()))?;
            s.dtls.connect(&fingerprint).await?;
        }

        for t in &transceivers {
            t.start_media_pump().await;
        }
        if let Some(s) = &sctp {
            if let Some(factory) = self.sctp_factory.lock().await.as_ref() {
                let endpoint = factory(s.controlling, DtlsDataTransport::new(Arc::clone(&s.dtls)));
                *s.endpoint.lock().await = Some(Arc::clone(&endpoint));
                tokio::spawn(async move {
                    if let Err(e) = endpoint.run().await {
                        log::warn!("sctp association ended: {e}");
                    }
                });
            }
        }

        *self.ice_connection_state.lock().await = IceConnectionState::Completed;
        self.events
            .fire_ice_connection_state_change(IceConnectionState::Completed)
            .await;
        Ok(())
    }

    /// `close` (spec §4.4): idempotent teardown. Transceivers are closed
    /// (DTLS then ICE) before the SCTP transport's own close, preserving
    /// the ordering spec §9 Open Question (iii) calls out as likely
    /// incidental but not worth changing here.
    pub async fn close(self: &Arc<Self>) {
        if self.is_closed.swap(true, Ordering::AcqRel) {
            return;
        }

        *self.signaling_state.lock().await = SignalingState::Closed;
        self.events
            .fire_signaling_state_change(SignalingState::Closed)
            .await;

        let transceivers = self.transceivers.lock().await.clone();
        for t in &transceivers {
            t.stop().await;
        }

        if let Some(s) = self.sctp.lock().await.clone() {
            s.stop().await;
        }

        *self.ice_connection_state.lock().await = IceConnectionState::Closed;
        self.events
            .fire_ice_connection_state_change(IceConnectionState::Closed)
            .await;
    }
}

fn dtls_setup_for(controlling: bool) -> DtlsSetup {
    if controlling {
        DtlsSetup::Actpass
    } else {
        DtlsSetup::Active
    }
}

fn wire_transport(ice: &Arc<dyn IceConnection>, m: &crate::sdp::MediaDescription) {
    if let (Some(ufrag), Some(pwd)) = (&m.ice_ufrag, &m.ice_pwd) {
        ice.set_remote_credentials(ufrag.clone(), pwd.clone());
    }
    for candidate in &m.ice_candidates {
        ice.add_remote_candidate(candidate.clone());
    }
}

fn remote_codecs_from_media(kind: MediaKind, m: &crate::sdp::MediaDescription) -> Vec<Codec> {
    let mut codecs = Vec::new();
    for &pt in &m.fmt {
        let Some(rtpmap) = m.rtpmap.get(&pt) else {
            continue;
        };
        if let Some(codec) = parse_rtpmap_codec(kind, pt, rtpmap) {
            codecs.push(codec);
        }
    }
    codecs
}

fn parse_rtpmap_codec(kind: MediaKind, pt: u8, rtpmap: &str) -> Option<Codec> {
    let mut parts = rtpmap.splitn(2, '/');
    let name = parts.next()?;
    let rest = parts.next()?;
    let mut rest_parts = rest.splitn(2, '/');
    let clock_rate: u32 = rest_parts.next()?.parse().ok()?;
    let channels = rest_parts.next().and_then(|c| c.parse().ok());
    Some(Codec {
        kind,
        name: name.to_string(),
        clock_rate,
        channels,
        pt: Some(pt),
    })
}

/// Owned counterpart of `emitter::MediaBlock`: the emitter borrows fields
/// by reference, but the values live only as long as this function call, so
/// `create_offer`/`create_answer` stage them here first.
struct OwnedMediaBlock {
    kind: String,
    mid: String,
    direction: Direction,
    codecs: Vec<Codec>,
    ssrc: u32,
    ice_candidates: Vec<String>,
    ice_ufrag: String,
    ice_pwd: String,
    dtls_fingerprint: String,
    dtls_setup: DtlsSetup,
}

struct OwnedSctpBlock {
    mid: String,
    ice_candidates: Vec<String>,
    ice_ufrag: String,
    ice_pwd: String,
    dtls_fingerprint: String,
    dtls_setup: DtlsSetup,
}
