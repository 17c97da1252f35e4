use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::peer_connection::ice_state::{IceConnectionState, IceGatheringState};
use crate::peer_connection::signaling_state::SignalingState;
use crate::peer_connection::transceiver::Track;

pub(crate) type AsyncHandler<T> =
    Box<dyn (FnMut(T) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync>;

/// Event handler slots for the four events spec §6 says the peer connection
/// emits, mirroring `OnSignalingStateChangeHdlrFn`-style handler storage in
/// the teacher's `peer_connection/mod.rs`. Each setter replaces the prior
/// handler; there is no multi-subscriber fan-out, matching the teacher's
/// `on_*` API shape.
#[derive(Default)]
pub(crate) struct EventHandlers {
    pub on_track: tokio::sync::Mutex<Option<AsyncHandler<Arc<Track>>>>,
    pub on_ice_connection_state_change: tokio::sync::Mutex<Option<AsyncHandler<IceConnectionState>>>,
    pub on_ice_gathering_state_change: tokio::sync::Mutex<Option<AsyncHandler<IceGatheringState>>>,
    pub on_signaling_state_change: tokio::sync::Mutex<Option<AsyncHandler<SignalingState>>>,
}

impl EventHandlers {
    pub(crate) async fn fire_track(&self, track: Arc<Track>) {
        if let Some(handler) = self.on_track.lock().await.as_mut() {
            handler(track).await;
        }
    }

    pub(crate) async fn fire_ice_connection_state_change(&self, state: IceConnectionState) {
        if let Some(handler) = self.on_ice_connection_state_change.lock().await.as_mut() {
            handler(state).await;
        }
    }

    pub(crate) async fn fire_ice_gathering_state_change(&self, state: IceGatheringState) {
        if let Some(handler) = self.on_ice_gathering_state_change.lock().await.as_mut() {
            handler(state).await;
        }
    }

    pub(crate) async fn fire_signaling_state_change(&self, state: SignalingState) {
        if let Some(handler) = self.on_signaling_state_change.lock().await.as_mut() {
            handler(state).await;
        }
    }
}
