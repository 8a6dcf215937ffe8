//! Enclave key usage policy.
//!
//! Decides whether an attested enclave key may be used for signing. The
//! rejection checks run in a fixed order so that the first violation is
//! always the one reported.

use alloy_primitives::B256;
use thiserror::Error;

use crate::constants::QUOTE_STATUS_OK;
use crate::types::AttestationReport;

/// A policy violation that makes an enclave key unusable
#[derive(Debug, Error)]
pub enum PolicyViolation {
    /// The quote was produced by a different enclave build
    #[error("MRENCLAVE mismatch: expected {expected}, got {actual}")]
    MrenclaveMismatch {
        /// The pinned measurement
        expected: B256,
        /// The measurement found in the quote
        actual: B256,
    },

    /// An `OK` quote status must not carry advisory IDs
    #[error("quote status OK but advisory IDs present: {0:?}")]
    UnexpectedAdvisories(Vec<String>),

    /// The quote status is not in the allow-list
    #[error("disallowed quote status: {0}")]
    DisallowedQuoteStatus(String),

    /// One or more advisory IDs are not in the allow-list
    #[error("disallowed advisory IDs: {0:?}")]
    DisallowedAdvisoryIds(Vec<String>),

    /// The key has passed its rotation deadline
    #[error("key expired for rotation: attested at {attestation_time}, rotation due at {deadline}, now {now}")]
    ExpiredForRotation {
        /// AVR timestamp (unix seconds)
        attestation_time: u64,
        /// `attestation_time + rotation_margin`
        deadline: u64,
        /// The evaluation time
        now: u64,
    },
}

/// Usability policy for attested enclave keys.
///
/// `rotation_margin` defaults to half of `key_expiration`: keys rotate well
/// before hard expiry so in-flight proofs never ride on a near-expired key.
#[derive(Debug, Clone)]
pub struct KeyUsagePolicy {
    mrenclave: B256,
    key_expiration: u64,
    rotation_margin: u64,
    allowed_quote_statuses: Vec<String>,
    allowed_advisory_ids: Vec<String>,
}

impl KeyUsagePolicy {
    /// Creates a policy with the default half-life rotation margin.
    #[must_use]
    pub fn new(
        mrenclave: B256,
        key_expiration: u64,
        allowed_quote_statuses: Vec<String>,
        allowed_advisory_ids: Vec<String>,
    ) -> Self {
        Self {
            mrenclave,
            key_expiration,
            rotation_margin: key_expiration / 2,
            allowed_quote_statuses,
            allowed_advisory_ids,
        }
    }

    /// Overrides the rotation margin (seconds after attestation at which the
    /// key is rotated out).
    #[must_use]
    pub const fn with_rotation_margin(mut self, margin: u64) -> Self {
        self.rotation_margin = margin;
        self
    }

    /// The pinned enclave measurement.
    #[must_use]
    pub const fn mrenclave(&self) -> B256 {
        self.mrenclave
    }

    /// The hard key expiration in seconds.
    #[must_use]
    pub const fn key_expiration(&self) -> u64 {
        self.key_expiration
    }

    /// Checks whether a key backed by `report` is usable at `now`.
    ///
    /// The checks run in a fixed order; the first failure wins:
    /// measurement, OK-implies-no-advisories, status allow-list, advisory
    /// allow-list, rotation deadline.
    ///
    /// # Errors
    ///
    /// Returns the first [`PolicyViolation`] encountered.
    pub fn check(&self, report: &AttestationReport, now: u64) -> Result<(), PolicyViolation> {
        if report.quote.mrenclave != self.mrenclave {
            return Err(PolicyViolation::MrenclaveMismatch {
                expected: self.mrenclave,
                actual: report.quote.mrenclave,
            });
        }

        if report.quote_status == QUOTE_STATUS_OK {
            if !report.advisory_ids.is_empty() {
                return Err(PolicyViolation::UnexpectedAdvisories(
                    report.advisory_ids.clone(),
                ));
            }
        } else if !self
            .allowed_quote_statuses
            .iter()
            .any(|s| *s == report.quote_status)
        {
            return Err(PolicyViolation::DisallowedQuoteStatus(
                report.quote_status.clone(),
            ));
        }

        let disallowed: Vec<String> = report
            .advisory_ids
            .iter()
            .filter(|id| !self.allowed_advisory_ids.contains(id))
            .cloned()
            .collect();
        if !disallowed.is_empty() {
            return Err(PolicyViolation::DisallowedAdvisoryIds(disallowed));
        }

        if self.rotation_due(report.timestamp, now) {
            return Err(PolicyViolation::ExpiredForRotation {
                attestation_time: report.timestamp,
                deadline: self.rotation_deadline(report.timestamp),
                now,
            });
        }

        Ok(())
    }

    /// The time at which a key attested at `attestation_time` must rotate.
    #[must_use]
    pub const fn rotation_deadline(&self, attestation_time: u64) -> u64 {
        attestation_time.saturating_add(self.rotation_margin)
    }

    /// Whether rotation is due at `now` for a key attested at
    /// `attestation_time`. The deadline itself counts as due.
    #[must_use]
    pub const fn rotation_due(&self, attestation_time: u64, now: u64) -> bool {
        now >= self.rotation_deadline(attestation_time)
    }

    /// Whether the key has passed its hard expiration, after which its
    /// persisted record may be destroyed.
    #[must_use]
    pub const fn hard_expired(&self, attestation_time: u64, now: u64) -> bool {
        now >= attestation_time.saturating_add(self.key_expiration)
    }
}
