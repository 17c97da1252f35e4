/// Formats a SHA-256 digest as the uppercase colon-separated hex pairs used
/// by `a=fingerprint:sha-256 ...` in SDP (RFC 4572). Load-bearing for
/// interop: browsers compare fingerprints byte-for-byte after uppercasing.
pub fn format_fingerprint(digest: &[u8]) -> String {
    digest
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(":")
}

/// Parses a colon-separated hex fingerprint back into raw bytes. Comparison
/// elsewhere is case-insensitive, so this does not care about case.
pub fn parse_fingerprint(s: &str) -> Option<Vec<u8>> {
    s.split(':')
        .map(|pair| u8::from_str_radix(pair, 16).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_uppercase_colon_separated() {
        let digest = [0xAAu8, 0xbb, 0x01, 0xff];
        assert_eq!(format_fingerprint(&digest), "AA:BB:01:FF");
    }

    #[test]
    fn round_trips() {
        let digest = [0xDEu8, 0xAD, 0xBE, 0xEF];
        let s = format_fingerprint(&digest);
        assert_eq!(parse_fingerprint(&s).unwrap(), digest.to_vec());
    }

    #[test]
    fn rejects_malformed() {
        assert!(parse_fingerprint("AA:ZZ").is_none());
    }
}
