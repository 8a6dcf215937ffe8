//! Prover configuration.
//!
//! Loading from files or CLI flags happens in the embedding relayer; this
//! crate receives the deserialized structure and validates cross-field
//! consistency before anything touches the network.

use std::path::PathBuf;

use alloy::primitives::B256;
use attestation_verifier::KeyUsagePolicy;
use serde::{Deserialize, Serialize};

use crate::types::{RelayerError, RelayerResult};

/// The kind of destination chain, which decides the EIP-712 domain shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainType {
    /// An EVM chain; domain parameters come from configuration
    Evm,
    /// A Cosmos-SDK chain; domain parameters are zero
    Cosmos,
}

impl ChainType {
    /// The chain-type code used in the EIP-712 salt preimage.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        match self {
            Self::Evm => 1,
            Self::Cosmos => 2,
        }
    }
}

/// EIP-712 domain parameters for an EVM destination chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvmEip712Params {
    /// EIP-155 chain id
    pub chain_id: u64,
    /// Address of the LCP client contract, hex
    pub verifying_contract_address: String,
}

/// EIP-712 salt parameters for a Cosmos destination chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CosmosEip712Params {
    /// Chain id string, e.g. `ibc-0`
    pub chain_id: String,
    /// Bech32 account prefix, e.g. `cosmos`
    pub prefix: String,
}

/// Where the operator private key is loaded from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "source", content = "value")]
pub enum OperatorKeySource {
    /// Hex-encoded key material inline (testing and development only)
    Raw(String),
    /// Name of an environment variable holding the hex-encoded key
    Env(String),
    /// Path of a file holding the hex-encoded key
    File(PathBuf),
}

/// Configuration of the LCP prover.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProverConfig {
    /// Network address of the LCP service gRPC endpoint
    pub lcp_service_address: String,
    /// Expected identifier of the light client inside the enclave
    pub elc_client_id: String,
    /// Trusted enclave measurement, 32 bytes hex
    pub mrenclave: String,
    /// Hard enclave key expiration in seconds
    pub key_expiration: u64,
    /// Seconds after attestation at which keys rotate; defaults to
    /// `key_expiration / 2`
    #[serde(default)]
    pub key_rotation_margin: Option<u64>,
    /// Quote statuses accepted besides `OK`
    #[serde(default)]
    pub allowed_quote_statuses: Vec<String>,
    /// Advisory IDs accepted on non-`OK` quotes
    #[serde(default)]
    pub allowed_advisory_ids: Vec<String>,
    /// Whether enclave key registration requires an operator co-signature
    #[serde(default)]
    pub operator_enabled: bool,
    /// Operator signing key; required when `operator_enabled`
    #[serde(default)]
    pub operator_private_key: Option<OperatorKeySource>,
    /// Destination chain kind
    pub chain_type: ChainType,
    /// EIP-712 domain parameters; required for EVM chains with operator mode
    #[serde(default)]
    pub operator_evm_eip712_params: Option<EvmEip712Params>,
    /// EIP-712 salt parameters; required for Cosmos chains with operator mode
    #[serde(default)]
    pub operator_cosmos_eip712_params: Option<CosmosEip712Params>,
    /// Accept quotes from DEBUG enclaves; never enable in production
    #[serde(default)]
    pub debug_allow_debug_enclaves: bool,
}

impl ProverConfig {
    /// The pinned enclave measurement as a typed value.
    ///
    /// # Errors
    ///
    /// Returns [`RelayerError::Fatal`] when the configured string is not
    /// 32 bytes of hex.
    pub fn mrenclave(&self) -> RelayerResult<B256> {
        let raw = self.mrenclave.trim_start_matches("0x");
        let bytes = hex::decode(raw)
            .map_err(|e| RelayerError::Fatal(format!("invalid mrenclave hex: {e}")))?;
        if bytes.len() != 32 {
            return Err(RelayerError::Fatal(format!(
                "mrenclave must be 32 bytes, got {}",
                bytes.len()
            )));
        }
        Ok(B256::from_slice(&bytes))
    }

    /// Builds the key usage policy from this configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RelayerError::Fatal`] when the measurement is malformed.
    pub fn policy(&self) -> RelayerResult<KeyUsagePolicy> {
        let policy = KeyUsagePolicy::new(
            self.mrenclave()?,
            self.key_expiration,
            self.allowed_quote_statuses.clone(),
            self.allowed_advisory_ids.clone(),
        );
        Ok(match self.key_rotation_margin {
            Some(margin) => policy.with_rotation_margin(margin),
            None => policy,
        })
    }

    /// Validates cross-field consistency.
    ///
    /// # Errors
    ///
    /// Returns [`RelayerError::Fatal`] describing the first contradiction
    /// found.
    pub fn validate(&self) -> RelayerResult<()> {
        self.mrenclave()?;

        if self.key_expiration == 0 {
            return Err(RelayerError::Fatal(
                "key_expiration must be positive".to_string(),
            ));
        }
        if self.elc_client_id.is_empty() {
            return Err(RelayerError::Fatal(
                "elc_client_id must not be empty".to_string(),
            ));
        }

        if self.operator_enabled {
            if self.operator_private_key.is_none() {
                return Err(RelayerError::Fatal(
                    "operator_enabled requires operator_private_key".to_string(),
                ));
            }
            match self.chain_type {
                ChainType::Evm if self.operator_evm_eip712_params.is_none() => {
                    return Err(RelayerError::Fatal(
                        "EVM chain with operator mode requires operator_evm_eip712_params"
                            .to_string(),
                    ));
                }
                ChainType::Cosmos if self.operator_cosmos_eip712_params.is_none() => {
                    return Err(RelayerError::Fatal(
                        "Cosmos chain with operator mode requires operator_cosmos_eip712_params"
                            .to_string(),
                    ));
                }
                _ => {}
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn base_config() -> ProverConfig {
        ProverConfig {
            lcp_service_address: "http://127.0.0.1:50051".to_string(),
            elc_client_id: "elc-0".to_string(),
            mrenclave: hex::encode([0xaa; 32]),
            key_expiration: 3600,
            key_rotation_margin: None,
            allowed_quote_statuses: vec![],
            allowed_advisory_ids: vec![],
            operator_enabled: false,
            operator_private_key: None,
            chain_type: ChainType::Cosmos,
            operator_evm_eip712_params: None,
            operator_cosmos_eip712_params: None,
            debug_allow_debug_enclaves: false,
        }
    }

    #[test]
    fn deserializes_minimal_config() {
        let config: ProverConfig = serde_json::from_str(
            r#"{
                "lcp_service_address": "http://127.0.0.1:50051",
                "elc_client_id": "elc-0",
                "mrenclave": "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
                "key_expiration": 3600,
                "chain_type": "cosmos"
            }"#,
        )
        .unwrap();

        assert_eq!(config.mrenclave().unwrap().0, [0xaa; 32]);
        assert!(!config.operator_enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_malformed_mrenclave() {
        let mut config = base_config();
        config.mrenclave = "aabb".to_string();
        assert!(matches!(
            config.validate().unwrap_err(),
            RelayerError::Fatal(_)
        ));
    }

    #[test]
    fn operator_mode_requires_key_source() {
        let mut config = base_config();
        config.operator_enabled = true;
        config.operator_cosmos_eip712_params = Some(CosmosEip712Params {
            chain_id: "ibc-0".to_string(),
            prefix: "cosmos".to_string(),
        });
        assert!(matches!(
            config.validate().unwrap_err(),
            RelayerError::Fatal(_)
        ));

        config.operator_private_key = Some(OperatorKeySource::Raw("11".repeat(32)));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn operator_mode_requires_domain_params_for_chain_type() {
        let mut config = base_config();
        config.operator_enabled = true;
        config.operator_private_key = Some(OperatorKeySource::Raw("11".repeat(32)));
        config.chain_type = ChainType::Evm;
        assert!(matches!(
            config.validate().unwrap_err(),
            RelayerError::Fatal(_)
        ));
    }

    #[test]
    fn rotation_margin_defaults_to_half_expiration() {
        let config = base_config();
        let policy = config.policy().unwrap();
        assert_eq!(policy.rotation_deadline(1000), 2800);

        let mut tuned = base_config();
        tuned.key_rotation_margin = Some(600);
        assert_eq!(tuned.policy().unwrap().rotation_deadline(1000), 1600);
    }
}
