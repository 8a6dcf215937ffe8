//! Operator signer.
//!
//! When operator mode is enabled, enclave key registrations carry an EIP-712
//! co-signature from an off-chain operator key. The key is resolved once at
//! construction from the configured source and kept in memory.

use std::str::FromStr;

use alloy::primitives::{Address, B256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use tracing::info;

use crate::config::{ChainType, OperatorKeySource, ProverConfig};
use crate::eip712::{self, Eip712DomainParams};
use crate::types::{RelayerError, RelayerResult};

/// Signs LCP operator messages with a local secp256k1 key.
pub struct OperatorSigner {
    signer: PrivateKeySigner,
    domain: Eip712DomainParams,
    chain_salt: B256,
}

impl OperatorSigner {
    /// Builds the signer from configuration; `Ok(None)` when operator mode
    /// is disabled.
    ///
    /// # Errors
    ///
    /// Returns [`RelayerError::Fatal`] when operator mode is enabled but the
    /// key source or the chain-type domain parameters are missing or
    /// unusable.
    pub fn from_config(config: &ProverConfig) -> RelayerResult<Option<Self>> {
        if !config.operator_enabled {
            return Ok(None);
        }

        let source = config.operator_private_key.as_ref().ok_or_else(|| {
            RelayerError::Fatal("operator mode enabled without a key source".to_string())
        })?;
        let signer = resolve_key(source)?;

        let (domain, chain_salt) = match config.chain_type {
            ChainType::Evm => {
                let params = config.operator_evm_eip712_params.as_ref().ok_or_else(|| {
                    RelayerError::Fatal("missing EVM EIP-712 parameters".to_string())
                })?;
                let verifying_contract = Address::from_str(&params.verifying_contract_address)
                    .map_err(|e| {
                        RelayerError::Fatal(format!("invalid verifying contract address: {e}"))
                    })?;
                (
                    Eip712DomainParams {
                        chain_id: params.chain_id,
                        verifying_contract,
                    },
                    eip712::evm_chain_salt(),
                )
            }
            ChainType::Cosmos => {
                let params = config
                    .operator_cosmos_eip712_params
                    .as_ref()
                    .ok_or_else(|| {
                        RelayerError::Fatal("missing Cosmos EIP-712 parameters".to_string())
                    })?;
                (
                    Eip712DomainParams::ZERO,
                    eip712::cosmos_chain_salt(&params.chain_id, &params.prefix),
                )
            }
        };

        let operator = Self {
            signer,
            domain,
            chain_salt,
        };
        info!(operator = %operator.address(), "operator signer initialized");
        Ok(Some(operator))
    }

    /// The operator's address.
    #[must_use]
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Signs an enclave key registration over the raw AVR bytes.
    ///
    /// Returns the 65-byte `(r, s, v)` signature in Ethereum convention.
    ///
    /// # Errors
    ///
    /// Returns [`RelayerError::Attestation`] when the report is not UTF-8
    /// and [`RelayerError::Fatal`] when signing fails.
    pub fn sign_register_enclave_key(&self, report: &[u8]) -> RelayerResult<Vec<u8>> {
        let avr = std::str::from_utf8(report).map_err(|e| {
            RelayerError::Attestation(attestation_verifier::AttestationError::ReportParse(
                format!("report is not UTF-8: {e}"),
            ))
        })?;
        let digest = eip712::register_enclave_key_digest(self.domain, self.chain_salt, avr);
        self.sign_digest(digest)
    }

    /// Signs an operator-set update.
    ///
    /// # Errors
    ///
    /// Returns [`RelayerError::Fatal`] when signing fails.
    pub fn sign_update_operators(
        &self,
        client_id: &str,
        nonce: u64,
        new_operators: &[Address],
        threshold_numerator: u64,
        threshold_denominator: u64,
    ) -> RelayerResult<Vec<u8>> {
        let digest = eip712::update_operators_digest(
            self.domain,
            self.chain_salt,
            client_id,
            nonce,
            new_operators,
            threshold_numerator,
            threshold_denominator,
        );
        self.sign_digest(digest)
    }

    fn sign_digest(&self, digest: B256) -> RelayerResult<Vec<u8>> {
        let signature = self
            .signer
            .sign_hash_sync(&digest)
            .map_err(|e| RelayerError::Fatal(format!("operator signing failed: {e}")))?;
        Ok(signature.as_bytes().to_vec())
    }
}

fn resolve_key(source: &OperatorKeySource) -> RelayerResult<PrivateKeySigner> {
    let hex_key = match source {
        OperatorKeySource::Raw(key) => key.clone(),
        OperatorKeySource::Env(var) => std::env::var(var).map_err(|e| {
            RelayerError::Fatal(format!("operator key env var {var} unavailable: {e}"))
        })?,
        OperatorKeySource::File(path) => std::fs::read_to_string(path)
            .map_err(|e| {
                RelayerError::Fatal(format!(
                    "failed to read operator key file {}: {e}",
                    path.display()
                ))
            })?,
    };

    let bytes = hex::decode(hex_key.trim().trim_start_matches("0x"))
        .map_err(|e| RelayerError::Fatal(format!("operator key is not valid hex: {e}")))?;
    PrivateKeySigner::from_slice(&bytes)
        .map_err(|e| RelayerError::Fatal(format!("operator key is not a valid secp256k1 key: {e}")))
}
