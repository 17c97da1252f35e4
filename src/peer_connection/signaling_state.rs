use std::fmt;

use crate::error::{Error, Result};
use crate::sdp::SdpType;

/// Which side of the offer/answer exchange an SDP is being applied to.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum StateChangeOp {
    SetLocal,
    SetRemote,
}

/// SignalingState indicates the signaling state of the offer/answer process
/// (spec §3). Unlike the full W3C enum this crate has no pranswer states:
/// `stable -> have-local-offer -> stable` and `stable -> have-remote-offer ->
/// stable` are the only two round trips, plus the `closed` terminal.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SignalingState {
    Stable,
    HaveLocalOffer,
    HaveRemoteOffer,
    Closed,
}

const STABLE_STR: &str = "stable";
const HAVE_LOCAL_OFFER_STR: &str = "have-local-offer";
const HAVE_REMOTE_OFFER_STR: &str = "have-remote-offer";
const CLOSED_STR: &str = "closed";

impl fmt::Display for SignalingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SignalingState::Stable => STABLE_STR,
            SignalingState::HaveLocalOffer => HAVE_LOCAL_OFFER_STR,
            SignalingState::HaveRemoteOffer => HAVE_REMOTE_OFFER_STR,
            SignalingState::Closed => CLOSED_STR,
        };
        write!(f, "{s}")
    }
}

/// Validates and computes the next signaling state per spec §3's restricted
/// machine. `createAnswer`/`setRemoteDescription(answer)` etc. call this
/// before committing a transition; an invalid combination surfaces
/// `Error::InvalidState` (spec §8 property 8).
pub(crate) fn next_signaling_state(
    cur: SignalingState,
    op: StateChangeOp,
    sdp_type: SdpType,
) -> Result<SignalingState> {
    match (cur, op, sdp_type) {
        (SignalingState::Stable, StateChangeOp::SetLocal, SdpType::Offer) => {
            Ok(SignalingState::HaveLocalOffer)
        }
        (SignalingState::Stable, StateChangeOp::SetRemote, SdpType::Offer) => {
            Ok(SignalingState::HaveRemoteOffer)
        }
        (SignalingState::HaveLocalOffer, StateChangeOp::SetRemote, SdpType::Answer) => {
            Ok(SignalingState::Stable)
        }
        (SignalingState::HaveRemoteOffer, StateChangeOp::SetLocal, SdpType::Answer) => {
            Ok(SignalingState::Stable)
        }
        _ => Err(Error::InvalidState(format!(
            "cannot apply {op:?} {sdp_type} from signaling state {cur}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_to_have_local_offer_on_set_local_offer() {
        let next =
            next_signaling_state(SignalingState::Stable, StateChangeOp::SetLocal, SdpType::Offer)
                .unwrap();
        assert_eq!(next, SignalingState::HaveLocalOffer);
    }

    #[test]
    fn have_local_offer_to_stable_on_set_remote_answer() {
        let next = next_signaling_state(
            SignalingState::HaveLocalOffer,
            StateChangeOp::SetRemote,
            SdpType::Answer,
        )
        .unwrap();
        assert_eq!(next, SignalingState::Stable);
    }

    #[test]
    fn create_answer_shape_rejected_from_stable() {
        let err = next_signaling_state(
            SignalingState::Stable,
            StateChangeOp::SetRemote,
            SdpType::Answer,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
    }
}
