//! IAS attestation report verification for LCP enclave keys.
//!
//! The LCP service hands out enclave keys together with the Intel Attestation
//! Service report that vouches for them. Before such a key is trusted for
//! signing or submitted for on-chain registration, the report has to be
//! validated: the signing certificate must chain to the pinned IAS root, the
//! IAS signature must cover the raw report bytes, and the embedded quote must
//! describe a production enclave.

#![deny(clippy::all, missing_docs, dead_code)]

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::NaiveDateTime;
use rsa::pkcs8::DecodePublicKey;
use rsa::{Pkcs1v15Sign, RsaPublicKey};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use x509_cert::der::{Decode, DecodePem, Encode};
use x509_cert::Certificate;

/// Constants for report verification
pub mod constants;

/// Enclave key usage policy
pub mod policy;

/// Quote body parsing
pub mod quote;

/// Report and enclave key types
pub mod types;

pub use policy::{KeyUsagePolicy, PolicyViolation};
pub use quote::Quote;
pub use types::{
    AttestationError, AttestationReport, AttestationResult, EnclaveKeyInfo, Mrenclave, ReportData,
};

use constants::{AVR_TIMESTAMP_FORMAT, IAS_ROOT_CA_PEM};

/// The raw JSON shape of an AVR. Unknown fields are tolerated; the three
/// fields below are required.
#[derive(Debug, Deserialize)]
struct RawAvr {
    timestamp: String,
    #[serde(rename = "isvEnclaveQuoteStatus")]
    isv_enclave_quote_status: String,
    #[serde(rename = "isvEnclaveQuoteBody")]
    isv_enclave_quote_body: String,
    #[serde(rename = "advisoryIDs", default)]
    advisory_ids: Vec<String>,
}

/// Verifies IAS attestation verification reports.
///
/// Verification proceeds in three stages:
/// - Certificate validation: the report signing certificate parses, is inside
///   its validity window at the caller-provided time, and is issued and
///   signed by the pinned IAS root.
/// - Signature validation: the IAS RSA/SHA-256 signature covers the raw
///   report bytes.
/// - Report validation: the AVR JSON carries the required fields and the
///   embedded quote body parses and describes a production enclave (unless
///   debug enclaves are explicitly allowed).
pub struct IasReportVerifier {
    root_certificate: Vec<u8>,
    allow_debug_enclaves: bool,
    #[cfg(any(test, feature = "test-utils"))]
    skip_signature_verification: bool,
}

impl IasReportVerifier {
    /// Creates a verifier pinned to the Intel IAS root certificate.
    #[must_use]
    pub fn new(allow_debug_enclaves: bool) -> Self {
        Self {
            root_certificate: IAS_ROOT_CA_PEM.as_bytes().to_vec(),
            allow_debug_enclaves,
            #[cfg(any(test, feature = "test-utils"))]
            skip_signature_verification: false,
        }
    }

    /// Replaces the pinned root certificate (DER or PEM).
    #[must_use]
    pub fn with_root_certificate(mut self, root: Vec<u8>) -> Self {
        self.root_certificate = root;
        self
    }

    /// Creates a verifier that skips certificate and signature validation.
    ///
    /// Reports are still parsed and the quote checks still apply. Only for
    /// fixture-based tests, which cannot produce IAS-signed reports.
    #[cfg(any(test, feature = "test-utils"))]
    #[must_use]
    pub fn unverified(allow_debug_enclaves: bool) -> Self {
        Self {
            root_certificate: IAS_ROOT_CA_PEM.as_bytes().to_vec(),
            allow_debug_enclaves,
            skip_signature_verification: true,
        }
    }

    /// Verifies a report against its IAS signature and signing certificate,
    /// then parses it.
    ///
    /// `now` is the verification time in unix seconds; callers pass wall
    /// clock or destination block time as appropriate.
    ///
    /// # Errors
    ///
    /// Returns an [`AttestationError`] describing the first failed stage.
    pub fn verify_report(
        &self,
        report: &[u8],
        signature: &[u8],
        signing_cert: &[u8],
        now: u64,
    ) -> AttestationResult<AttestationReport> {
        let skip_signatures = {
            #[cfg(any(test, feature = "test-utils"))]
            {
                self.skip_signature_verification
            }
            #[cfg(not(any(test, feature = "test-utils")))]
            {
                false
            }
        };

        if !skip_signatures {
            let leaf = parse_certificate(signing_cert)?;
            check_validity_window(&leaf, now)?;
            self.verify_issued_by_root(&leaf)?;
            verify_rsa_sha256(&leaf, report, signature)
                .map_err(AttestationError::SignatureInvalid)?;
        }

        self.parse_avr(report)
    }

    /// Verifies a full enclave key record: the report itself plus the
    /// record's binding to it (`enclave_key_address` must equal the quote's
    /// report-data key, `attestation_time` must equal the AVR timestamp).
    ///
    /// # Errors
    ///
    /// Returns an [`AttestationError`] when the report fails verification or
    /// the record is inconsistent with it.
    pub fn verify_key_info(
        &self,
        eki: &EnclaveKeyInfo,
        now: u64,
    ) -> AttestationResult<AttestationReport> {
        let report = self.verify_report(&eki.report, &eki.signature, &eki.signing_cert, now)?;

        if report.timestamp != eki.attestation_time {
            return Err(AttestationError::TimestampMismatch {
                record: eki.attestation_time,
                report: report.timestamp,
            });
        }
        let report_data = report.quote.report_data()?;
        if report_data.enclave_key != eki.enclave_key_address {
            return Err(AttestationError::AddressMismatch {
                record: eki.enclave_key_address,
                report: report_data.enclave_key,
            });
        }

        Ok(report)
    }

    /// Parses an AVR without signature verification.
    ///
    /// For re-evaluating policy over reports that were already verified when
    /// their key record was created.
    ///
    /// # Errors
    ///
    /// Returns an [`AttestationError`] when the JSON or the embedded quote is
    /// malformed, or when a debug quote is encountered and not allowed.
    pub fn parse_avr(&self, report: &[u8]) -> AttestationResult<AttestationReport> {
        let raw: RawAvr = serde_json::from_slice(report)
            .map_err(|e| AttestationError::ReportParse(format!("invalid AVR JSON: {e}")))?;

        let timestamp = parse_avr_timestamp(&raw.timestamp)?;

        let quote_body = STANDARD.decode(&raw.isv_enclave_quote_body).map_err(|e| {
            AttestationError::ReportParse(format!("invalid base64 quote body: {e}"))
        })?;
        let quote = Quote::parse(&quote_body)?;

        if quote.is_debug() && !self.allow_debug_enclaves {
            let enclave_key = quote.report_data()?.enclave_key;
            return Err(AttestationError::DebugEnclaveNotAllowed { enclave_key });
        }

        Ok(AttestationReport {
            timestamp,
            quote_status: raw.isv_enclave_quote_status,
            advisory_ids: raw.advisory_ids,
            quote,
        })
    }

    fn verify_issued_by_root(&self, leaf: &Certificate) -> AttestationResult<()> {
        let root = parse_certificate(&self.root_certificate).map_err(|e| {
            AttestationError::CertificateInvalid(format!("pinned root certificate: {e}"))
        })?;

        if leaf.tbs_certificate.issuer != root.tbs_certificate.subject {
            return Err(AttestationError::CertificateInvalid(format!(
                "issuer mismatch: expected {:?}, got {:?}",
                root.tbs_certificate.subject, leaf.tbs_certificate.issuer
            )));
        }

        let tbs = leaf.tbs_certificate.to_der().map_err(|e| {
            AttestationError::CertificateInvalid(format!("failed to re-encode TBS: {e}"))
        })?;
        let signature = leaf.signature.raw_bytes();
        verify_rsa_sha256(&root, &tbs, signature).map_err(|e| {
            AttestationError::CertificateInvalid(format!("not signed by pinned root: {e}"))
        })
    }
}

fn parse_certificate(bytes: &[u8]) -> AttestationResult<Certificate> {
    Certificate::from_der(bytes)
        .or_else(|_| Certificate::from_pem(bytes))
        .map_err(|e| AttestationError::CertificateInvalid(format!("failed to parse: {e}")))
}

fn check_validity_window(cert: &Certificate, now: u64) -> AttestationResult<()> {
    let validity = &cert.tbs_certificate.validity;
    let not_before = unix_seconds(validity.not_before.to_system_time());
    let not_after = unix_seconds(validity.not_after.to_system_time());

    if now < not_before {
        return Err(AttestationError::CertificateExpired {
            now,
            reason: format!("not valid before {not_before}"),
        });
    }
    if now > not_after {
        return Err(AttestationError::CertificateExpired {
            now,
            reason: format!("not valid after {not_after}"),
        });
    }
    Ok(())
}

fn unix_seconds(t: std::time::SystemTime) -> u64 {
    t.duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Verifies an RSA PKCS#1 v1.5 / SHA-256 signature using the public key of
/// `signer_cert`.
fn verify_rsa_sha256(signer_cert: &Certificate, message: &[u8], signature: &[u8]) -> Result<(), String> {
    let spki = signer_cert
        .tbs_certificate
        .subject_public_key_info
        .to_der()
        .map_err(|e| format!("failed to encode public key: {e}"))?;
    let public_key = RsaPublicKey::from_public_key_der(&spki)
        .map_err(|e| format!("failed to parse RSA public key: {e}"))?;

    let digest = Sha256::digest(message);
    public_key
        .verify(Pkcs1v15Sign::new::<Sha256>(), digest.as_slice(), signature)
        .map_err(|e| format!("signature mismatch: {e}"))
}

fn parse_avr_timestamp(timestamp: &str) -> AttestationResult<u64> {
    let parsed = NaiveDateTime::parse_from_str(timestamp, AVR_TIMESTAMP_FORMAT)
        .map_err(|e| AttestationError::ReportParse(format!("invalid timestamp {timestamp}: {e}")))?;
    u64::try_from(parsed.and_utc().timestamp())
        .map_err(|_| AttestationError::ReportParse(format!("timestamp before epoch: {timestamp}")))
}

#[cfg(test)]
mod tests {
    use alloy_primitives::Address;
    use pretty_assertions::assert_eq;

    use super::quote::{ATTRIBUTE_FLAG_DEBUG, QUOTE_BODY_LEN};
    use super::*;

    fn quote_body(ek: [u8; 20], flags: u64) -> Vec<u8> {
        let mut body = vec![0u8; QUOTE_BODY_LEN];
        body[0] = 3;
        body[96..104].copy_from_slice(&flags.to_le_bytes());
        body[112..144].copy_from_slice(&[0xaa; 32]);
        body[368..388].copy_from_slice(&ek);
        body
    }

    fn avr_json(timestamp: &str, status: &str, body: &[u8]) -> Vec<u8> {
        serde_json::json!({
            "id": "142090828149453720542199954221331392599",
            "version": 4,
            "timestamp": timestamp,
            "isvEnclaveQuoteStatus": status,
            "isvEnclaveQuoteBody": STANDARD.encode(body),
        })
        .to_string()
        .into_bytes()
    }

    #[test]
    fn parses_required_fields_and_tolerates_unknown_ones() {
        let verifier = IasReportVerifier::new(false);
        let report = verifier
            .parse_avr(&avr_json("2023-05-01T12:00:00.123456", "OK", &quote_body([0x11; 20], 0x4)))
            .unwrap();

        assert_eq!(report.quote_status, "OK");
        assert_eq!(report.advisory_ids, Vec::<String>::new());
        assert_eq!(report.quote.mrenclave.0, [0xaa; 32]);
    }

    #[test]
    fn parses_advisory_ids() {
        let mut value: serde_json::Value = serde_json::from_slice(&avr_json(
            "2023-05-01T12:00:00.123456",
            "SW_HARDENING_NEEDED",
            &quote_body([0x11; 20], 0x4),
        ))
        .unwrap();
        value["advisoryIDs"] = serde_json::json!(["INTEL-SA-00334"]);

        let verifier = IasReportVerifier::new(false);
        let report = verifier.parse_avr(value.to_string().as_bytes()).unwrap();
        assert_eq!(report.advisory_ids, vec!["INTEL-SA-00334".to_string()]);
    }

    #[test]
    fn rejects_missing_required_field() {
        let mut value: serde_json::Value = serde_json::from_slice(&avr_json(
            "2023-05-01T12:00:00.123456",
            "OK",
            &quote_body([0x11; 20], 0x4),
        ))
        .unwrap();
        value.as_object_mut().unwrap().remove("isvEnclaveQuoteStatus");

        let verifier = IasReportVerifier::new(false);
        let err = verifier.parse_avr(value.to_string().as_bytes()).unwrap_err();
        assert!(matches!(err, AttestationError::ReportParse(_)));
    }

    #[test]
    fn rejects_malformed_timestamp() {
        let verifier = IasReportVerifier::new(false);
        let err = verifier
            .parse_avr(&avr_json("2023-05-01 12:00:00", "OK", &quote_body([0x11; 20], 0x4)))
            .unwrap_err();
        assert!(matches!(err, AttestationError::ReportParse(_)));
    }

    #[test]
    fn debug_quotes_are_rejected_unless_allowed() {
        let avr = avr_json(
            "2023-05-01T12:00:00.123456",
            "OK",
            &quote_body([0x11; 20], ATTRIBUTE_FLAG_DEBUG),
        );

        let err = IasReportVerifier::new(false).parse_avr(&avr).unwrap_err();
        assert!(matches!(err, AttestationError::DebugEnclaveNotAllowed { .. }));

        assert!(IasReportVerifier::new(true).parse_avr(&avr).is_ok());
    }

    #[test]
    fn verify_key_info_checks_record_binding() {
        let body = quote_body([0x11; 20], 0x4);
        let avr = avr_json("2023-05-01T12:00:00.123456", "OK", &body);
        let verifier = IasReportVerifier::unverified(false);
        let timestamp = parse_avr_timestamp("2023-05-01T12:00:00.123456").unwrap();

        let eki = EnclaveKeyInfo {
            enclave_key_address: Address::from([0x11; 20]),
            report: avr.clone(),
            signature: vec![],
            signing_cert: vec![],
            attestation_time: timestamp,
        };
        assert!(verifier.verify_key_info(&eki, timestamp).is_ok());

        let stale = EnclaveKeyInfo {
            attestation_time: timestamp + 1,
            ..eki.clone()
        };
        assert!(matches!(
            verifier.verify_key_info(&stale, timestamp).unwrap_err(),
            AttestationError::TimestampMismatch { .. }
        ));

        let wrong_address = EnclaveKeyInfo {
            enclave_key_address: Address::from([0x22; 20]),
            ..eki
        };
        assert!(matches!(
            verifier.verify_key_info(&wrong_address, timestamp).unwrap_err(),
            AttestationError::AddressMismatch { .. }
        ));
    }

    #[test]
    fn verify_report_rejects_garbage_certificate() {
        let verifier = IasReportVerifier::new(false);
        let err = verifier
            .verify_report(b"{}", b"sig", b"not a certificate", 1_700_000_000)
            .unwrap_err();
        assert!(matches!(err, AttestationError::CertificateInvalid(_)));
    }
}
