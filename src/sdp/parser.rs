use crate::error::{Error, Result};
use crate::sdp::codec::is_forbidden_pt;
use crate::sdp::media_description::{DtlsSetup, MediaDescription, APPLICATION_KIND};

const FINGERPRINT_PREFIX: &str = "fingerprint:sha-256 ";
const CANDIDATE_PREFIX: &str = "candidate:";
const ICE_UFRAG_PREFIX: &str = "ice-ufrag:";
const ICE_PWD_PREFIX: &str = "ice-pwd:";
const SETUP_PREFIX: &str = "setup:";
const RTPMAP_PREFIX: &str = "rtpmap:";
const SCTPMAP_PREFIX: &str = "sctpmap:";
const RTCP_PREFIX: &str = "rtcp:";
const RTCP_MUX: &str = "rtcp-mux";
const MID_PREFIX: &str = "mid:";

/// Parses the restricted SDP subset this crate understands (spec §4.3). The
/// grammar is deliberately narrow: it is line-based, tolerates CRLF or bare
/// LF line endings, and only recognizes the attributes named in spec §4.3 —
/// anything else is ignored rather than rejected.
pub fn parse(input: &str) -> Result<Vec<MediaDescription>> {
    let mut session_fingerprint: Option<String> = None;
    let mut media: Vec<MediaDescription> = Vec::new();

    for raw_line in input.split('\n') {
        let line = raw_line.strip_suffix('\r').unwrap_or(raw_line);
        if line.is_empty() {
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            continue;
        };

        match key {
            "m" => {
                media.push(parse_media_line(value)?);
                if let (Some(fp), Some(last)) = (&session_fingerprint, media.last_mut()) {
                    if last.dtls_fingerprint.is_none() {
                        last.dtls_fingerprint = Some(fp.clone());
                    }
                }
            }
            "c" => {
                let host = parse_connection_line(value);
                if let Some(last) = media.last_mut() {
                    last.host = host;
                } else {
                    // A session-level `c=` line with no media blocks yet has
                    // nothing to attach to; restricted grammar ignores it.
                }
            }
            "a" => {
                if let Some(hex) = value.strip_prefix(FINGERPRINT_PREFIX) {
                    match media.last_mut() {
                        Some(last) => last.dtls_fingerprint = Some(hex.to_string()),
                        None => session_fingerprint = Some(hex.to_string()),
                    }
                } else if let Some(last) = media.last_mut() {
                    apply_media_attribute(last, value)?;
                }
            }
            _ => {}
        }
    }

    Ok(media)
}

fn parse_media_line(value: &str) -> Result<MediaDescription> {
    let mut parts = value.split_whitespace();
    let kind = parts
        .next()
        .ok_or_else(|| Error::Parse("m= line missing media kind".to_string()))?;
    let port: u16 = parts
        .next()
        .ok_or_else(|| Error::Parse("m= line missing port".to_string()))?
        .parse()
        .map_err(|_| Error::Parse("m= line has non-numeric port".to_string()))?;
    let profile = parts
        .next()
        .ok_or_else(|| Error::Parse("m= line missing profile".to_string()))?;

    let mut desc = MediaDescription::new(kind, port, profile);

    for token in parts {
        if kind == APPLICATION_KIND {
            // The application block's fmt tokens (e.g. a webrtc-datachannel
            // descriptor) are not numeric RTP payload types.
            continue;
        }
        let pt: u8 = token
            .parse()
            .map_err(|_| Error::Parse(format!("m= line has non-numeric payload type {token}")))?;
        if is_forbidden_pt(pt) {
            return Err(Error::Parse(format!(
                "payload type {pt} is in the range reserved by RTP"
            )));
        }
        desc.fmt.push(pt);
    }

    Ok(desc)
}

fn parse_connection_line(value: &str) -> Option<String> {
    let mut parts = value.split_whitespace();
    let net_type = parts.next()?;
    if net_type != "IN" {
        return None;
    }
    let _addr_type = parts.next()?; // IP4 or IP6
    parts.next().map(|s| s.to_string())
}

fn apply_media_attribute(desc: &mut MediaDescription, value: &str) -> Result<()> {
    if let Some(candidate) = value.strip_prefix(CANDIDATE_PREFIX) {
        desc.ice_candidates.push(format!("{CANDIDATE_PREFIX}{candidate}"));
    } else if let Some(ufrag) = value.strip_prefix(ICE_UFRAG_PREFIX) {
        desc.ice_ufrag = Some(ufrag.to_string());
    } else if let Some(pwd) = value.strip_prefix(ICE_PWD_PREFIX) {
        desc.ice_pwd = Some(pwd.to_string());
    } else if let Some(setup) = value.strip_prefix(SETUP_PREFIX) {
        desc.dtls_setup = setup.parse::<DtlsSetup>().ok();
    } else if value == RTCP_MUX {
        desc.rtcp.mux = true;
    } else if let Some(rtcp) = value.strip_prefix(RTCP_PREFIX) {
        let mut parts = rtcp.split_whitespace();
        desc.rtcp.port = parts.next().and_then(|p| p.parse().ok());
        if parts.next() == Some("IN") {
            let _addr_type = parts.next();
            desc.rtcp.host = parts.next().map(|s| s.to_string());
        }
    } else if let Some(rtpmap) = value.strip_prefix(RTPMAP_PREFIX) {
        let (pt_str, codec) = rtpmap
            .split_once(' ')
            .ok_or_else(|| Error::Parse(format!("malformed rtpmap attribute: {rtpmap}")))?;
        let pt: u8 = pt_str
            .parse()
            .map_err(|_| Error::Parse(format!("rtpmap has non-numeric payload type {pt_str}")))?;
        desc.rtpmap.insert(pt, codec.to_string());
    } else if let Some(sctpmap) = value.strip_prefix(SCTPMAP_PREFIX) {
        let mut parts = sctpmap.split_whitespace();
        let port: u16 = parts
            .next()
            .and_then(|p| p.parse().ok())
            .ok_or_else(|| Error::Parse(format!("malformed sctpmap attribute: {sctpmap}")))?;
        let proto = parts.next().unwrap_or("webrtc-datachannel").to_string();
        desc.sctpmap = Some((port, proto));
    } else if let Some(mid) = value.strip_prefix(MID_PREFIX) {
        desc.mid = Some(mid.to_string());
    } else if let Some(direction) = crate::sdp::media_description::Direction::from_attribute(value) {
        desc.direction = direction;
    }
    // Every other attribute is outside the restricted grammar and ignored.
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_forbidden_payload_type() {
        let sdp = "v=0\r\nm=audio 9 UDP/TLS/RTP/SAVPF 72\r\n";
        assert!(parse(sdp).is_err());
    }

    #[test]
    fn session_level_fingerprint_is_inherited_by_first_media_block() {
        let sdp = "v=0\r\na=fingerprint:sha-256 AA:BB:CC\r\nm=audio 9 UDP/TLS/RTP/SAVPF 0\r\n";
        let media = parse(sdp).unwrap();
        assert_eq!(media[0].dtls_fingerprint.as_deref(), Some("AA:BB:CC"));
    }

    #[test]
    fn media_level_fingerprint_overrides_session_level() {
        let sdp = "v=0\r\na=fingerprint:sha-256 AA:BB:CC\r\nm=audio 9 UDP/TLS/RTP/SAVPF 0\r\na=fingerprint:sha-256 11:22:33\r\n";
        let media = parse(sdp).unwrap();
        assert_eq!(media[0].dtls_fingerprint.as_deref(), Some("11:22:33"));
    }

    #[test]
    fn parses_core_media_attributes() {
        let sdp = "v=0\r\n\
m=audio 9 UDP/TLS/RTP/SAVPF 96 0 8\r\n\
c=IN IP4 0.0.0.0\r\n\
a=rtcp:9 IN IP4 0.0.0.0\r\n\
a=rtcp-mux\r\n\
a=ice-ufrag:abcd\r\n\
a=ice-pwd:0123456789012345678901\r\n\
a=setup:actpass\r\n\
a=sendrecv\r\n\
a=rtpmap:96 opus/48000/2\r\n\
a=rtpmap:0 PCMU/8000\r\n\
a=rtpmap:8 PCMA/8000\r\n";
        let media = parse(sdp).unwrap();
        assert_eq!(media.len(), 1);
        let m = &media[0];
        assert_eq!(m.kind, "audio");
        assert_eq!(m.port, 9);
        assert_eq!(m.fmt, vec![96, 0, 8]);
        assert_eq!(m.host.as_deref(), Some("0.0.0.0"));
        assert!(m.rtcp.mux);
        assert_eq!(m.ice_ufrag.as_deref(), Some("abcd"));
        assert_eq!(m.dtls_setup, Some(DtlsSetup::Actpass));
        assert_eq!(m.rtpmap.get(&96).map(String::as_str), Some("opus/48000/2"));
    }
}
