use std::fmt;

use crate::sdp::media_description::MediaDescription;

/// `type` of a session description, mirroring the W3C `RTCSdpType` values
/// this crate actually uses (spec §3).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SdpType {
    Offer,
    Answer,
    Pranswer,
    Rollback,
}

const OFFER_STR: &str = "offer";
const ANSWER_STR: &str = "answer";
const PRANSWER_STR: &str = "pranswer";
const ROLLBACK_STR: &str = "rollback";

impl fmt::Display for SdpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SdpType::Offer => OFFER_STR,
            SdpType::Answer => ANSWER_STR,
            SdpType::Pranswer => PRANSWER_STR,
            SdpType::Rollback => ROLLBACK_STR,
        };
        write!(f, "{s}")
    }
}

/// A parsed/emitted session description (spec §3): the ordered media
/// blocks plus the serialized text form and its `type`. Round-tripping
/// through parse/emit is only required to be semantically equivalent on
/// the recognized subset, never byte-identical (spec §4.3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDescription {
    pub sdp_type: SdpType,
    pub media: Vec<MediaDescription>,
    pub sdp: String,
}

impl SessionDescription {
    pub fn new(sdp_type: SdpType, media: Vec<MediaDescription>, sdp: String) -> Self {
        Self {
            sdp_type,
            media,
            sdp,
        }
    }
}
