//! EIP-712 typed-data digests for operator-signed messages.
//!
//! The on-chain LCP client verifies operator signatures over two typed
//! structures: enclave key registrations and operator-set updates. The domain
//! is `LCPClient` version `1`; EVM chains bind `{chain_id, verifying
//! contract}` from configuration, Cosmos chains zero both and rely on the
//! chain salt for separation.

use std::borrow::Cow;

use alloy::primitives::{keccak256, Address, B256, U256};
use alloy::sol;
use alloy::sol_types::{Eip712Domain, SolStruct};

use crate::config::ChainType;

sol! {
    struct RegisterEnclaveKey {
        string avr;
    }

    struct UpdateOperators {
        string clientId;
        uint64 nonce;
        address[] newOperators;
        uint64 thresholdNumerator;
        uint64 thresholdDenominator;
    }
}

/// EIP-712 domain name shared by all LCP clients.
pub const EIP712_DOMAIN_NAME: &str = "LCPClient";

/// EIP-712 domain version shared by all LCP clients.
pub const EIP712_DOMAIN_VERSION: &str = "1";

/// Domain parameters resolved from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Eip712DomainParams {
    /// EIP-155 chain id; zero for Cosmos chains
    pub chain_id: u64,
    /// LCP client contract address; zero for Cosmos chains
    pub verifying_contract: Address,
}

impl Eip712DomainParams {
    /// The all-zero domain used for Cosmos-style chains.
    pub const ZERO: Self = Self {
        chain_id: 0,
        verifying_contract: Address::ZERO,
    };
}

/// The chain salt of an EVM destination: the keccak-256 of the chain type
/// code as two big-endian bytes.
#[must_use]
pub fn evm_chain_salt() -> B256 {
    keccak256(ChainType::Evm.as_u16().to_be_bytes())
}

/// The chain salt of a Cosmos destination, derived from the chain id and the
/// bech32 account prefix. The zero separator keeps distinct `(chain_id,
/// prefix)` pairs from colliding.
#[must_use]
pub fn cosmos_chain_salt(chain_id: &str, prefix: &str) -> B256 {
    let mut preimage = Vec::with_capacity(chain_id.len() + prefix.len() + 1);
    preimage.extend_from_slice(chain_id.as_bytes());
    preimage.push(0x00);
    preimage.extend_from_slice(prefix.as_bytes());
    keccak256(preimage)
}

/// Digest an operator signs to co-authorize an enclave key registration.
#[must_use]
pub fn register_enclave_key_digest(
    params: Eip712DomainParams,
    salt: B256,
    avr: &str,
) -> B256 {
    let message = RegisterEnclaveKey {
        avr: avr.to_string(),
    };
    message.eip712_signing_hash(&domain(params, salt))
}

/// Digest an operator signs to update the operator set.
#[must_use]
pub fn update_operators_digest(
    params: Eip712DomainParams,
    salt: B256,
    client_id: &str,
    nonce: u64,
    new_operators: &[Address],
    threshold_numerator: u64,
    threshold_denominator: u64,
) -> B256 {
    let message = UpdateOperators {
        clientId: client_id.to_string(),
        nonce,
        newOperators: new_operators.to_vec(),
        thresholdNumerator: threshold_numerator,
        thresholdDenominator: threshold_denominator,
    };
    message.eip712_signing_hash(&domain(params, salt))
}

fn domain(params: Eip712DomainParams, salt: B256) -> Eip712Domain {
    Eip712Domain::new(
        Some(Cow::Borrowed(EIP712_DOMAIN_NAME)),
        Some(Cow::Borrowed(EIP712_DOMAIN_VERSION)),
        Some(U256::from(params.chain_id)),
        Some(params.verifying_contract),
        Some(salt),
    )
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_ne;

    use super::*;

    const REPORT: &str = r#"{"isvEnclaveQuoteStatus":"OK"}"#;

    fn evm_params() -> Eip712DomainParams {
        Eip712DomainParams {
            chain_id: 5,
            verifying_contract: Address::from([0x42; 20]),
        }
    }

    #[test]
    fn digests_are_deterministic() {
        let a = register_enclave_key_digest(evm_params(), evm_chain_salt(), REPORT);
        let b = register_enclave_key_digest(evm_params(), evm_chain_salt(), REPORT);
        assert_eq!(a, b);
    }

    #[test]
    fn digest_binds_the_report() {
        let a = register_enclave_key_digest(evm_params(), evm_chain_salt(), REPORT);
        let b = register_enclave_key_digest(evm_params(), evm_chain_salt(), "{}");
        assert_ne!(a, b);
    }

    #[test]
    fn digest_binds_the_domain() {
        let a = register_enclave_key_digest(evm_params(), evm_chain_salt(), REPORT);
        let b = register_enclave_key_digest(
            Eip712DomainParams::ZERO,
            cosmos_chain_salt("ibc-0", "cosmos"),
            REPORT,
        );
        assert_ne!(a, b);
    }

    #[test]
    fn chain_salts_differ_by_chain_type() {
        assert_ne!(evm_chain_salt(), cosmos_chain_salt("ibc-0", "cosmos"));
    }

    #[test]
    fn cosmos_salt_separates_chain_id_from_prefix() {
        assert_ne!(
            cosmos_chain_salt("ab", "c"),
            cosmos_chain_salt("a", "bc")
        );
    }

    #[test]
    fn update_operators_digest_binds_the_nonce() {
        let operators = [Address::from([0x11; 20])];
        let a = update_operators_digest(evm_params(), evm_chain_salt(), "lcp-0", 1, &operators, 1, 1);
        let b = update_operators_digest(evm_params(), evm_chain_salt(), "lcp-0", 2, &operators, 1, 1);
        assert_ne!(a, b);
    }
}
