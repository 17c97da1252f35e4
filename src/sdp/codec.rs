use std::fmt;

/// Media kind of a transceiver or codec entry.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MediaKind {
    Audio,
    Video,
}

const AUDIO_STR: &str = "audio";
const VIDEO_STR: &str = "video";

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MediaKind::Audio => AUDIO_STR,
            MediaKind::Video => VIDEO_STR,
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for MediaKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            AUDIO_STR => Ok(MediaKind::Audio),
            VIDEO_STR => Ok(MediaKind::Video),
            _ => Err(()),
        }
    }
}

/// Lowest dynamic payload type a codec may be assigned at offer time
/// (spec §3); `96..=127` is the full dynamic range.
pub const DYNAMIC_PT_BASE: u8 = 96;
pub const DYNAMIC_PT_MAX: u8 = 127;

/// An immutable codec record (spec §3). `pt` is `None` until assigned by
/// `createOffer`, or `Some` for a codec parsed out of a remote offer/answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Codec {
    pub kind: MediaKind,
    pub name: String,
    pub clock_rate: u32,
    pub channels: Option<u16>,
    pub pt: Option<u8>,
}

impl Codec {
    pub fn new(kind: MediaKind, name: &str, clock_rate: u32, channels: Option<u16>) -> Self {
        Self {
            kind,
            name: name.to_string(),
            clock_rate,
            channels,
            pt: None,
        }
    }

    /// Returns a clone of this codec with a different payload type, leaving
    /// kind/name/clock_rate/channels untouched (spec §3: "clonable with an
    /// overridden pt").
    pub fn with_pt(&self, pt: u8) -> Codec {
        Codec {
            pt: Some(pt),
            ..self.clone()
        }
    }

    /// The `rtpmap:<pt> name/rate[/channels]` value, used both by the
    /// emitter and by negotiation matching.
    pub fn rtpmap_value(&self) -> String {
        match self.channels {
            Some(c) if c != 1 => format!("{}/{}/{}", self.name, self.clock_rate, c),
            _ => format!("{}/{}", self.name, self.clock_rate),
        }
    }
}

/// The fixed preference list `createOffer` starts from (spec §4.4):
/// opus/48000/2, PCMU/8000/1 (pt=0), PCMA/8000/1 (pt=8), VP8/90000.
/// PCMU and PCMA keep their reserved static PTs; opus and VP8 receive
/// dynamic PTs at offer time.
pub fn preference_list() -> Vec<Codec> {
    vec![
        Codec::new(MediaKind::Audio, "opus", 48000, Some(2)),
        Codec {
            pt: Some(0),
            ..Codec::new(MediaKind::Audio, "PCMU", 8000, Some(1))
        },
        Codec {
            pt: Some(8),
            ..Codec::new(MediaKind::Audio, "PCMA", 8000, Some(1))
        },
        Codec::new(MediaKind::Video, "VP8", 90000, None),
    ]
}

/// Payload types reserved by RTP and never assignable to a codec (spec
/// §4.3): `1..4`, `19..63`, `72..76`.
pub fn is_forbidden_pt(pt: u8) -> bool {
    (1..=4).contains(&pt) || (19..=63).contains(&pt) || (72..=76).contains(&pt)
}

/// Intersects `local` preferences with `remote`'s offered codecs by
/// `(kind, name, clock_rate)`, case-insensitive on name. For a dynamic PT
/// (`96..=127`) the remote's PT is preserved; for a static PT (0, 8) the
/// local PT is preserved, per spec §3 and §8 property 7.
pub fn find_common_codecs(local: &[Codec], remote: &[Codec]) -> Vec<Codec> {
    let mut common = Vec::new();
    for remote_codec in remote {
        let Some(local_codec) = local.iter().find(|l| {
            l.kind == remote_codec.kind
                && l.name.eq_ignore_ascii_case(&remote_codec.name)
                && l.clock_rate == remote_codec.clock_rate
        }) else {
            continue;
        };
        let negotiated_pt = match remote_codec.pt {
            Some(pt) if (DYNAMIC_PT_BASE..=DYNAMIC_PT_MAX).contains(&pt) => pt,
            _ => local_codec.pt.or(remote_codec.pt).unwrap_or(DYNAMIC_PT_BASE),
        };
        common.push(local_codec.with_pt(negotiated_pt));
    }
    common
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forbidden_range_matches_spec() {
        assert!(is_forbidden_pt(1));
        assert!(is_forbidden_pt(4));
        assert!(is_forbidden_pt(19));
        assert!(is_forbidden_pt(63));
        assert!(is_forbidden_pt(72));
        assert!(is_forbidden_pt(76));
        assert!(!is_forbidden_pt(0));
        assert!(!is_forbidden_pt(8));
        assert!(!is_forbidden_pt(96));
    }

    #[test]
    fn common_codecs_preserve_remote_pt_for_dynamic_entries() {
        let local = preference_list();
        let remote = vec![Codec {
            pt: Some(100),
            ..Codec::new(MediaKind::Audio, "opus", 48000, Some(2))
        }];
        let common = find_common_codecs(&local, &remote);
        assert_eq!(common.len(), 1);
        assert_eq!(common[0].pt, Some(100));
    }

    #[test]
    fn common_codecs_preserve_local_pt_for_static_entries() {
        let local = preference_list();
        let remote = vec![Codec {
            pt: Some(0),
            ..Codec::new(MediaKind::Audio, "PCMU", 8000, Some(1))
        }];
        let common = find_common_codecs(&local, &remote);
        assert_eq!(common[0].pt, Some(0));
    }

    #[test]
    fn common_codecs_is_commutative_in_presence() {
        let local = preference_list();
        let remote = preference_list();
        let forward = find_common_codecs(&local, &remote);
        let backward = find_common_codecs(&remote, &local);
        assert_eq!(forward.len(), backward.len());
    }
}
