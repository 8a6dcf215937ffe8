//! Attestation report types and data structures.
//!
//! This module contains the core types used for IAS attestation verification
//! report (AVR) parsing, validation, and enclave key selection.

use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::quote::Quote;

/// Represents errors that can occur during attestation report verification
#[derive(Debug, Error)]
pub enum AttestationError {
    /// Failed to parse the attestation verification report
    #[error("Failed to parse attestation report: {0}")]
    ReportParse(String),

    /// The report signing certificate could not be decoded or is not issued
    /// by the pinned IAS root
    #[error("Report signing certificate invalid: {0}")]
    CertificateInvalid(String),

    /// The report signing certificate is outside its validity window
    #[error("Report signing certificate not valid at {now}: {reason}")]
    CertificateExpired {
        /// The verification time (unix seconds)
        now: u64,
        /// Which bound was violated
        reason: String,
    },

    /// The IAS signature over the report does not verify
    #[error("Report signature verification failed: {0}")]
    SignatureInvalid(String),

    /// The embedded enclave quote is malformed
    #[error("Enclave quote invalid: {0}")]
    QuoteInvalid(String),

    /// The quote carries the DEBUG attribute and debug enclaves are not allowed
    #[error("Debug enclave quote rejected (enclave key {enclave_key})")]
    DebugEnclaveNotAllowed {
        /// The enclave key address embedded in the report data
        enclave_key: Address,
    },

    /// The key record's attestation time does not match the AVR timestamp
    #[error("Attestation time mismatch: record={record}, report={report}")]
    TimestampMismatch {
        /// The attestation time stored on the key record
        record: u64,
        /// The timestamp embedded in the AVR
        report: u64,
    },

    /// The key record's address does not match the report data
    #[error("Enclave key address mismatch: record={record}, report={report}")]
    AddressMismatch {
        /// The address stored on the key record
        record: Address,
        /// The enclave key address embedded in the report data
        report: Address,
    },
}

/// Result type for attestation verification operations
pub type AttestationResult<T, E = AttestationError> = Result<T, E>;

/// An enclave key known to the LCP service, together with the attestation
/// evidence proving it was generated inside a trusted enclave.
///
/// The `(report, signature, signing_cert)` triple must validate against the
/// pinned IAS root, and `attestation_time` must equal the timestamp embedded
/// in the report. [`crate::IasReportVerifier::verify_key_info`] enforces both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnclaveKeyInfo {
    /// Address of the secp256k1 signing key generated inside the enclave
    pub enclave_key_address: Address,
    /// Raw AVR bytes (JSON, signed by IAS)
    pub report: Vec<u8>,
    /// IAS RSA signature over `report`
    pub signature: Vec<u8>,
    /// IAS report signing certificate (DER or PEM)
    pub signing_cert: Vec<u8>,
    /// Unix seconds extracted from the AVR timestamp
    pub attestation_time: u64,
}

/// A parsed and (unless explicitly skipped) cryptographically verified AVR.
#[derive(Debug, Clone)]
pub struct AttestationReport {
    /// AVR timestamp as unix seconds
    pub timestamp: u64,
    /// ISV enclave quote status, e.g. `OK` or `SW_HARDENING_NEEDED`
    pub quote_status: String,
    /// Security advisory IDs attached by IAS
    pub advisory_ids: Vec<String>,
    /// The embedded enclave quote body
    pub quote: Quote,
}

/// The 64-byte report data of an LCP enclave quote, split into its parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportData {
    /// The enclave key address
    pub enclave_key: Address,
    /// The operator the key is bound to; zero when the key is unbound
    pub operator: Address,
}

impl ReportData {
    /// Returns the operator address, or `None` when the key is not bound to
    /// a specific operator.
    #[must_use]
    pub fn expected_operator(&self) -> Option<Address> {
        (self.operator != Address::ZERO).then_some(self.operator)
    }
}

/// The MRENCLAVE measurement pinned by configuration and client state.
pub type Mrenclave = B256;
