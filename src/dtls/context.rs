use std::time::{SystemTime, UNIX_EPOCH};

use openssl::asn1::Asn1Time;
use openssl::bn::{BigNum, MsbOption};
use openssl::ec::{EcGroup, EcKey};
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::{PKey, Private};
use openssl::ssl::{SslContext, SslMethod, SslVerifyMode};
use openssl::x509::{X509NameBuilder, X509};
use rand::RngCore;

use crate::dtls::fingerprint::format_fingerprint;
use crate::error::{Error, Result};

/// SRTP_AES128_CM_SHA1_80 is the only SRTP protection profile this crate
/// advertises or accepts, per spec §4.1.
pub const SRTP_PROFILE: &str = "SRTP_AES128_CM_SHA1_80";

const CERT_VALIDITY_DAYS_BEFORE: u32 = 1;
const CERT_VALIDITY_DAYS_AFTER: u32 = 30;
const CIPHER_LIST: &str = "HIGH:!CAMELLIA:!aNULL";

/// DtlsContext is the process-wide DTLS configuration shared by every
/// `DtlsSession` belonging to one peer connection (spec §4.1, §9 "make it
/// explicitly constructed and reference-counted, not a singleton").
///
/// Key material is ephemeral: the certificate and private key are generated
/// fresh on construction and never persisted to disk.
pub struct DtlsContext {
    ssl_ctx: SslContext,
    cert: X509,
    key: PKey<Private>,
    local_fingerprint: String,
}

impl DtlsContext {
    /// Generates a fresh self-signed ECDSA P-256 certificate and builds the
    /// shared OpenSSL context, following spec §4.1 step by step.
    pub fn new() -> Result<Self> {
        let (cert, key) = generate_self_signed_cert()?;

        let mut builder = openssl::ssl::SslContextBuilder::new(SslMethod::dtls())
            .map_err(|e| Error::Dtls(format!("failed to create DTLS context: {e}")))?;

        // Request and require a peer certificate, but accept whatever is
        // presented — the real check is the fingerprint comparison after
        // the handshake completes (spec §4.1).
        let mut verify_mode = SslVerifyMode::PEER;
        verify_mode.insert(SslVerifyMode::FAIL_IF_NO_PEER_CERT);
        builder.set_verify_callback(verify_mode, |_, _| true);

        builder
            .set_certificate(&cert)
            .map_err(|e| Error::Dtls(format!("failed to install certificate: {e}")))?;
        builder
            .set_private_key(&key)
            .map_err(|e| Error::Dtls(format!("failed to install private key: {e}")))?;
        builder
            .set_cipher_list(CIPHER_LIST)
            .map_err(|e| Error::Dtls(format!("failed to restrict cipher list: {e}")))?;
        builder
            .set_tlsext_use_srtp(SRTP_PROFILE)
            .map_err(|e| Error::Dtls(format!("failed to advertise SRTP profile: {e}")))?;
        builder.set_read_ahead(true);

        let digest = cert
            .digest(MessageDigest::sha256())
            .map_err(|e| Error::Dtls(format!("failed to digest certificate: {e}")))?;
        let local_fingerprint = format_fingerprint(&digest);

        Ok(Self {
            ssl_ctx: builder.build(),
            cert,
            key,
            local_fingerprint,
        })
    }

    pub fn ssl_ctx(&self) -> &SslContext {
        &self.ssl_ctx
    }

    pub fn certificate(&self) -> &X509 {
        &self.cert
    }

    pub fn private_key(&self) -> &PKey<Private> {
        &self.key
    }

    /// The uppercase colon-separated hex SHA-256 of the local certificate,
    /// as carried in `a=fingerprint:sha-256` (spec §8 property 2).
    pub fn local_fingerprint(&self) -> &str {
        &self.local_fingerprint
    }
}

fn generate_self_signed_cert() -> Result<(X509, PKey<Private>)> {
    let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1)
        .map_err(|e| Error::Dtls(format!("failed to load P-256 group: {e}")))?;
    let ec_key =
        EcKey::generate(&group).map_err(|e| Error::Dtls(format!("failed to generate EC key: {e}")))?;
    let key = PKey::from_ec_key(ec_key)
        .map_err(|e| Error::Dtls(format!("failed to wrap EC key: {e}")))?;

    let mut cn_bytes = [0u8; 16];
    rand::rng().fill_bytes(&mut cn_bytes);
    let cn = hex::encode(cn_bytes);

    let mut name_builder =
        X509NameBuilder::new().map_err(|e| Error::Dtls(format!("failed to build name: {e}")))?;
    name_builder
        .append_entry_by_text("CN", &cn)
        .map_err(|e| Error::Dtls(format!("failed to set CN: {e}")))?;
    let name = name_builder.build();

    let mut builder = X509::builder().map_err(|e| Error::Dtls(format!("failed to build cert: {e}")))?;
    // X.509 version 3 is encoded as the integer 2 (0-indexed).
    builder
        .set_version(2)
        .map_err(|e| Error::Dtls(format!("failed to set version: {e}")))?;
    builder
        .set_subject_name(&name)
        .map_err(|e| Error::Dtls(format!("failed to set subject: {e}")))?;
    builder
        .set_issuer_name(&name)
        .map_err(|e| Error::Dtls(format!("failed to set issuer: {e}")))?;
    builder
        .set_pubkey(&key)
        .map_err(|e| Error::Dtls(format!("failed to set public key: {e}")))?;

    // Asn1Time only offers a forward-looking `days_from_now`, so notBefore
    // (one day in the past, per spec §4.1) is computed from the Unix clock
    // directly.
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64;
    let one_day = CERT_VALIDITY_DAYS_BEFORE as i64 * 24 * 60 * 60;
    let not_before = Asn1Time::from_unix(now - one_day)
        .map_err(|e| Error::Dtls(format!("failed to compute notBefore: {e}")))?;
    builder
        .set_not_before(&not_before)
        .map_err(|e| Error::Dtls(format!("failed to set notBefore: {e}")))?;

    let not_after = Asn1Time::days_from_now(CERT_VALIDITY_DAYS_AFTER)
        .map_err(|e| Error::Dtls(format!("failed to compute notAfter: {e}")))?;
    builder
        .set_not_after(&not_after)
        .map_err(|e| Error::Dtls(format!("failed to set notAfter: {e}")))?;

    let mut serial = BigNum::new().map_err(|e| Error::Dtls(format!("failed to allocate serial: {e}")))?;
    serial
        .rand(32, MsbOption::MAYBE_ZERO, false)
        .map_err(|e| Error::Dtls(format!("failed to randomize serial: {e}")))?;
    let serial = serial
        .to_asn1_integer()
        .map_err(|e| Error::Dtls(format!("failed to encode serial: {e}")))?;
    builder
        .set_serial_number(&serial)
        .map_err(|e| Error::Dtls(format!("failed to set serial: {e}")))?;

    builder
        .sign(&key, MessageDigest::sha256())
        .map_err(|e| Error::Dtls(format!("failed to sign certificate: {e}")))?;

    Ok((builder.build(), key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_matches_certificate_digest() {
        let ctx = DtlsContext::new().expect("context construction");
        let digest = ctx
            .certificate()
            .digest(MessageDigest::sha256())
            .expect("digest");
        assert_eq!(ctx.local_fingerprint(), format_fingerprint(&digest));
    }

    #[test]
    fn fingerprint_is_uppercase_colon_separated() {
        let ctx = DtlsContext::new().expect("context construction");
        let fp = ctx.local_fingerprint();
        assert_eq!(fp, fp.to_uppercase());
        assert_eq!(fp.split(':').count(), 32);
    }
}
