//! Fixed-offset parser for the ISV enclave quote body embedded in an AVR.
//!
//! IAS strips the signature from the submitted quote, so the AVR embeds the
//! 432-byte quote body only: a 48-byte quote header followed by the 384-byte
//! enclave report. All multi-byte integers are little-endian.

use alloy_primitives::{Address, B256};

use crate::types::{AttestationError, AttestationResult, ReportData};

/// Length of the quote body carried in `isvEnclaveQuoteBody`.
pub const QUOTE_BODY_LEN: usize = 432;

/// Length of the report data field.
pub const REPORT_DATA_LEN: usize = 64;

/// The DEBUG bit of the enclave attribute flags.
pub const ATTRIBUTE_FLAG_DEBUG: u64 = 0x2;

// Offsets within the 432-byte quote body. The enclave report starts at 48;
// field offsets inside the report follow the SGX report layout.
const REPORT_OFFSET: usize = 48;
const ATTRIBUTES_OFFSET: usize = REPORT_OFFSET + 48;
const MRENCLAVE_OFFSET: usize = REPORT_OFFSET + 64;
const MRSIGNER_OFFSET: usize = REPORT_OFFSET + 128;
const REPORT_DATA_OFFSET: usize = REPORT_OFFSET + 320;

/// A parsed ISV enclave quote body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    /// Quote structure version
    pub version: u16,
    /// EPID signature type the quote was produced with
    pub sign_type: u16,
    /// Enclave measurement
    pub mrenclave: B256,
    /// Enclave signer measurement
    pub mrsigner: B256,
    /// Enclave attribute flags (`ATTRIBUTE_FLAG_DEBUG` et al.)
    pub attribute_flags: u64,
    /// Raw 64-byte report data
    pub report_data: [u8; REPORT_DATA_LEN],
}

impl Quote {
    /// Parses a raw quote body.
    ///
    /// # Errors
    ///
    /// Returns [`AttestationError::QuoteInvalid`] when the body is not
    /// exactly [`QUOTE_BODY_LEN`] bytes.
    pub fn parse(body: &[u8]) -> AttestationResult<Self> {
        if body.len() != QUOTE_BODY_LEN {
            return Err(AttestationError::QuoteInvalid(format!(
                "unexpected quote body length: expected {QUOTE_BODY_LEN} bytes, got {}",
                body.len()
            )));
        }

        let mut report_data = [0u8; REPORT_DATA_LEN];
        report_data.copy_from_slice(&body[REPORT_DATA_OFFSET..REPORT_DATA_OFFSET + REPORT_DATA_LEN]);

        let mut flags = [0u8; 8];
        flags.copy_from_slice(&body[ATTRIBUTES_OFFSET..ATTRIBUTES_OFFSET + 8]);

        Ok(Self {
            version: u16::from_le_bytes([body[0], body[1]]),
            sign_type: u16::from_le_bytes([body[2], body[3]]),
            mrenclave: B256::from_slice(&body[MRENCLAVE_OFFSET..MRENCLAVE_OFFSET + 32]),
            mrsigner: B256::from_slice(&body[MRSIGNER_OFFSET..MRSIGNER_OFFSET + 32]),
            attribute_flags: u64::from_le_bytes(flags),
            report_data,
        })
    }

    /// Whether the enclave was launched with the DEBUG attribute.
    #[must_use]
    pub const fn is_debug(&self) -> bool {
        self.attribute_flags & ATTRIBUTE_FLAG_DEBUG != 0
    }

    /// Splits the report data into the enclave key address and the expected
    /// operator address.
    ///
    /// The layout is `enclave_key (20) || operator (20) || zeros (24)`.
    ///
    /// # Errors
    ///
    /// Returns [`AttestationError::QuoteInvalid`] when the trailing 24 bytes
    /// are not all zero.
    pub fn report_data(&self) -> AttestationResult<ReportData> {
        if self.report_data[40..].iter().any(|b| *b != 0) {
            return Err(AttestationError::QuoteInvalid(
                "report data tail must be zero".to_string(),
            ));
        }
        Ok(ReportData {
            enclave_key: Address::from_slice(&self.report_data[..20]),
            operator: Address::from_slice(&self.report_data[20..40]),
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn quote_body(mrenclave: [u8; 32], ek: [u8; 20], operator: [u8; 20], flags: u64) -> Vec<u8> {
        let mut body = vec![0u8; QUOTE_BODY_LEN];
        body[0] = 3; // version
        body[ATTRIBUTES_OFFSET..ATTRIBUTES_OFFSET + 8].copy_from_slice(&flags.to_le_bytes());
        body[MRENCLAVE_OFFSET..MRENCLAVE_OFFSET + 32].copy_from_slice(&mrenclave);
        body[REPORT_DATA_OFFSET..REPORT_DATA_OFFSET + 20].copy_from_slice(&ek);
        body[REPORT_DATA_OFFSET + 20..REPORT_DATA_OFFSET + 40].copy_from_slice(&operator);
        body
    }

    #[test]
    fn parses_measurement_and_report_data() {
        let body = quote_body([0xaa; 32], [0x11; 20], [0x22; 20], 0x5);
        let quote = Quote::parse(&body).unwrap();

        assert_eq!(quote.version, 3);
        assert_eq!(quote.mrenclave, B256::from([0xaa; 32]));
        assert_eq!(quote.attribute_flags, 0x5);

        let data = quote.report_data().unwrap();
        assert_eq!(data.enclave_key, Address::from([0x11; 20]));
        assert_eq!(data.operator, Address::from([0x22; 20]));
        assert_eq!(data.expected_operator(), Some(Address::from([0x22; 20])));
    }

    #[test]
    fn zero_operator_means_unbound() {
        let body = quote_body([0xaa; 32], [0x11; 20], [0x00; 20], 0x4);
        let data = Quote::parse(&body).unwrap().report_data().unwrap();
        assert_eq!(data.expected_operator(), None);
    }

    #[test]
    fn debug_flag_detection() {
        let body = quote_body([0xaa; 32], [0x11; 20], [0x00; 20], ATTRIBUTE_FLAG_DEBUG);
        assert!(Quote::parse(&body).unwrap().is_debug());

        let body = quote_body([0xaa; 32], [0x11; 20], [0x00; 20], 0x4);
        assert!(!Quote::parse(&body).unwrap().is_debug());
    }

    #[test]
    fn rejects_wrong_length() {
        let err = Quote::parse(&[0u8; 431]).unwrap_err();
        assert!(matches!(err, AttestationError::QuoteInvalid(_)));
    }

    #[test]
    fn rejects_nonzero_report_data_tail() {
        let mut body = quote_body([0xaa; 32], [0x11; 20], [0x22; 20], 0);
        body[REPORT_DATA_OFFSET + 63] = 1;
        let err = Quote::parse(&body).unwrap().report_data().unwrap_err();
        assert!(matches!(err, AttestationError::QuoteInvalid(_)));
    }
}
