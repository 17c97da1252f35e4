use std::time::{SystemTime, UNIX_EPOCH};

use crate::sdp::codec::Codec;
use crate::sdp::media_description::{Direction, DtlsSetup};

const END_LINE: &str = "\r\n";

/// Seconds between the NTP epoch (1900-01-01 UTC) and the Unix epoch
/// (1970-01-01 UTC), used for the `o=` line's session-id/version (spec
/// §4.3: "NTP-seconds epoch").
const NTP_UNIX_OFFSET: u64 = 2_208_988_800;

/// Everything the emitter needs to produce one `m=audio`/`m=video` block
/// (spec §4.3). Constructed by the peer connection from one transceiver.
pub struct MediaBlock<'a> {
    pub kind: &'a str,
    pub mid: &'a str,
    pub direction: Direction,
    pub codecs: &'a [Codec],
    pub ssrc: u32,
    pub ice_candidates: &'a [String],
    pub ice_ufrag: &'a str,
    pub ice_pwd: &'a str,
    pub dtls_fingerprint: &'a str,
    pub dtls_setup: DtlsSetup,
}

/// Everything the emitter needs to produce the `application` (SCTP) block
/// (spec §4.3).
pub struct SctpBlock<'a> {
    pub mid: &'a str,
    pub ice_candidates: &'a [String],
    pub ice_ufrag: &'a str,
    pub ice_pwd: &'a str,
    pub dtls_fingerprint: &'a str,
    pub dtls_setup: DtlsSetup,
}

/// Serializes one session description: `v=`/`o=`/`s=`/`t=` header lines,
/// one media block per transceiver, and an optional trailing SCTP block
/// (spec §4.3). Lines are joined with CRLF and the whole string is
/// CRLF-terminated.
pub fn emit(cname: &str, media: &[MediaBlock<'_>], sctp: Option<&SctpBlock<'_>>) -> String {
    let ntp = unix_now_as_ntp_seconds();
    let mut lines = vec![
        "v=0".to_string(),
        format!("o=- {ntp} {ntp} IN IP4 0.0.0.0"),
        "s=-".to_string(),
        "t=0 0".to_string(),
    ];

    for block in media {
        emit_media_block(&mut lines, block, cname);
    }
    if let Some(sctp_block) = sctp {
        emit_sctp_block(&mut lines, sctp_block);
    }

    let mut sdp = lines.join(END_LINE);
    sdp.push_str(END_LINE);
    sdp
}

fn emit_transport_lines(
    lines: &mut Vec<String>,
    candidates: &[String],
    ufrag: &str,
    pwd: &str,
    fingerprint: &str,
    setup: DtlsSetup,
) {
    for candidate in candidates {
        lines.push(format!("a={candidate}"));
    }
    lines.push(format!("a=ice-pwd:{pwd}"));
    lines.push(format!("a=ice-ufrag:{ufrag}"));
    lines.push(format!("a=fingerprint:sha-256 {fingerprint}"));
    lines.push(format!("a=setup:{setup}"));
}

fn emit_media_block(lines: &mut Vec<String>, block: &MediaBlock<'_>, cname: &str) {
    let pts: Vec<String> = block
        .codecs
        .iter()
        .filter_map(|c| c.pt)
        .map(|pt| pt.to_string())
        .collect();
    lines.push(format!(
        "m={} 9 UDP/TLS/RTP/SAVPF {}",
        block.kind,
        pts.join(" ")
    ));
    lines.push("c=IN IP4 0.0.0.0".to_string());
    lines.push("a=rtcp:9 IN IP4 0.0.0.0".to_string());
    lines.push("a=rtcp-mux".to_string());
    emit_transport_lines(
        lines,
        block.ice_candidates,
        block.ice_ufrag,
        block.ice_pwd,
        block.dtls_fingerprint,
        block.dtls_setup,
    );
    lines.push(format!("a=mid:{}", block.mid));
    lines.push(format!("a={}", block.direction));
    lines.push(format!("a=ssrc:{} cname:{}", block.ssrc, cname));
    for codec in block.codecs {
        if let Some(pt) = codec.pt {
            lines.push(format!("a=rtpmap:{pt} {}", codec.rtpmap_value()));
        }
    }
}

fn emit_sctp_block(lines: &mut Vec<String>, block: &SctpBlock<'_>) {
    lines.push("m=application 9 DTLS/SCTP 5000".to_string());
    lines.push("c=IN IP4 0.0.0.0".to_string());
    emit_transport_lines(
        lines,
        block.ice_candidates,
        block.ice_ufrag,
        block.ice_pwd,
        block.dtls_fingerprint,
        block.dtls_setup,
    );
    lines.push(format!("a=mid:{}", block.mid));
    lines.push("a=sctpmap:5000 webrtc-datachannel 256".to_string());
}

fn unix_now_as_ntp_seconds() -> u64 {
    let unix_secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    unix_secs + NTP_UNIX_OFFSET
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sdp::codec::{preference_list, MediaKind};
    use crate::sdp::parser::parse;

    #[test]
    fn offer_with_one_audio_track_matches_expected_shape() {
        let mut codecs = preference_list();
        codecs.retain(|c| c.kind == MediaKind::Audio);
        let codecs: Vec<Codec> = codecs
            .into_iter()
            .enumerate()
            .map(|(i, c)| match c.pt {
                Some(pt) => c.with_pt(pt),
                None => c.with_pt(96 + i as u8),
            })
            .collect();

        let block = MediaBlock {
            kind: "audio",
            mid: "0",
            direction: Direction::SendRecv,
            codecs: &codecs,
            ssrc: 1234,
            ice_candidates: &[],
            ice_ufrag: "abcd",
            ice_pwd: "0123456789012345678901",
            dtls_fingerprint: "AA:BB",
            dtls_setup: DtlsSetup::Actpass,
        };

        let sdp = emit("peercname", &[block], None);
        assert!(sdp.contains("a=setup:actpass"));
        assert!(sdp.contains("a=rtpmap:0 PCMU/8000"));
        assert!(sdp.contains("a=rtpmap:8 PCMA/8000"));
        assert!(sdp.ends_with("\r\n"));
    }

    #[test]
    fn round_trip_preserves_recognized_fields() {
        let codecs = vec![Codec::new(MediaKind::Audio, "opus", 48000, Some(2)).with_pt(96)];
        let block = MediaBlock {
            kind: "audio",
            mid: "0",
            direction: Direction::SendRecv,
            codecs: &codecs,
            ssrc: 42,
            ice_candidates: &["candidate:1 1 udp 2130706431 127.0.0.1 5000 typ host".to_string()],
            ice_ufrag: "abcd",
            ice_pwd: "0123456789012345678901",
            dtls_fingerprint: "AA:BB:CC",
            dtls_setup: DtlsSetup::Active,
        };
        let sdp = emit("peercname", &[block], None);
        let parsed = parse(&sdp).unwrap();
        assert_eq!(parsed.len(), 1);
        let m = &parsed[0];
        assert_eq!(m.kind, "audio");
        assert_eq!(m.port, 9);
        assert_eq!(m.fmt, vec![96]);
        assert_eq!(m.direction, Direction::SendRecv);
        assert!(m.rtcp.mux);
        assert_eq!(m.ice_ufrag.as_deref(), Some("abcd"));
        assert_eq!(m.ice_pwd.as_deref(), Some("0123456789012345678901"));
        assert_eq!(m.dtls_fingerprint.as_deref(), Some("AA:BB:CC"));
        assert_eq!(m.dtls_setup, Some(DtlsSetup::Active));
        assert_eq!(m.ice_candidates.len(), 1);
        assert_eq!(m.rtpmap.get(&96).map(String::as_str), Some("opus/48000/2"));
    }
}
