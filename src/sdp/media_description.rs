use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::sdp::codec::MediaKind;

pub const APPLICATION_KIND: &str = "application";

/// `a=sendrecv` / `a=sendonly` / `a=recvonly` / `a=inactive` (spec §4.3).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Direction {
    SendRecv,
    SendOnly,
    RecvOnly,
    Inactive,
}

const SENDRECV_STR: &str = "sendrecv";
const SENDONLY_STR: &str = "sendonly";
const RECVONLY_STR: &str = "recvonly";
const INACTIVE_STR: &str = "inactive";

impl Default for Direction {
    fn default() -> Self {
        Direction::SendRecv
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Direction::SendRecv => SENDRECV_STR,
            Direction::SendOnly => SENDONLY_STR,
            Direction::RecvOnly => RECVONLY_STR,
            Direction::Inactive => INACTIVE_STR,
        };
        write!(f, "{s}")
    }
}

impl Direction {
    /// Returns `None` for any attribute name that is not one of the four
    /// direction keywords, so callers can ignore unrecognized attributes
    /// (spec §4.3: "unknown attributes are ignored").
    pub fn from_attribute(s: &str) -> Option<Direction> {
        match s {
            SENDRECV_STR => Some(Direction::SendRecv),
            SENDONLY_STR => Some(Direction::SendOnly),
            RECVONLY_STR => Some(Direction::RecvOnly),
            INACTIVE_STR => Some(Direction::Inactive),
            _ => None,
        }
    }
}

/// `a=setup:` value (spec §4.3).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DtlsSetup {
    Active,
    Passive,
    Actpass,
}

const ACTIVE_STR: &str = "active";
const PASSIVE_STR: &str = "passive";
const ACTPASS_STR: &str = "actpass";

impl fmt::Display for DtlsSetup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DtlsSetup::Active => ACTIVE_STR,
            DtlsSetup::Passive => PASSIVE_STR,
            DtlsSetup::Actpass => ACTPASS_STR,
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for DtlsSetup {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            ACTIVE_STR => Ok(DtlsSetup::Active),
            PASSIVE_STR => Ok(DtlsSetup::Passive),
            ACTPASS_STR => Ok(DtlsSetup::Actpass),
            _ => Err(()),
        }
    }
}

/// The `rtcp` sub-fields of a media block: port, host, and whether
/// `a=rtcp-mux` was present (spec §3).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RtcpInfo {
    pub port: Option<u16>,
    pub host: Option<String>,
    pub mux: bool,
}

/// One parsed `m=` block and every attribute line that followed it up to
/// the next `m=` line (spec §3, §4.3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaDescription {
    /// The `m=` line's media token, e.g. `"audio"`, `"video"`, or
    /// `"application"` for the SCTP block. Kept as a plain string because
    /// `"application"` has no associated codec kind (spec §3).
    pub kind: String,
    pub port: u16,
    pub profile: String,
    pub fmt: Vec<u8>,
    pub host: Option<String>,
    pub direction: Direction,
    pub rtcp: RtcpInfo,
    pub rtpmap: BTreeMap<u8, String>,
    pub sctpmap: Option<(u16, String)>,
    pub dtls_fingerprint: Option<String>,
    pub dtls_setup: Option<DtlsSetup>,
    pub ice_candidates: Vec<String>,
    pub ice_ufrag: Option<String>,
    pub ice_pwd: Option<String>,
    pub mid: Option<String>,
}

impl MediaDescription {
    pub fn new(kind: &str, port: u16, profile: &str) -> Self {
        Self {
            kind: kind.to_string(),
            port,
            profile: profile.to_string(),
            fmt: Vec::new(),
            host: None,
            direction: Direction::default(),
            rtcp: RtcpInfo::default(),
            rtpmap: BTreeMap::new(),
            sctpmap: None,
            dtls_fingerprint: None,
            dtls_setup: None,
            ice_candidates: Vec::new(),
            ice_ufrag: None,
            ice_pwd: None,
            mid: None,
        }
    }

    /// The audio/video codec kind this block negotiates, or `None` for the
    /// `application` (SCTP) block which has no codecs.
    pub fn media_kind(&self) -> Option<MediaKind> {
        MediaKind::from_str(&self.kind).ok()
    }
}
