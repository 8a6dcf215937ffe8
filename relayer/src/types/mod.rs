//! Wire-facing data types shared across the relayer.
//!
//! Payloads crossing the LCP or destination-chain boundary travel as opaque
//! `(type_url, value)` pairs and are only interpreted through the explicit
//! decoders defined here.

pub mod error;

use std::fmt;

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

pub use error::{ChainError, LcpError, RelayerError, RelayerResult};

/// Type URL of the LCP client state on the destination chain.
pub const LCP_CLIENT_STATE_TYPE_URL: &str = "/ibc.lightclients.lcp.v1.ClientState";

/// Type URL of the enclave key registration client message.
pub const REGISTER_ENCLAVE_KEY_TYPE_URL: &str =
    "/ibc.lightclients.lcp.v1.RegisterEnclaveKeyMessage";

/// Type URL of the update client message.
pub const UPDATE_CLIENT_TYPE_URL: &str = "/ibc.lightclients.lcp.v1.UpdateClientMessage";

/// An IBC revision height.
///
/// Ordering compares the revision number first, then the height within the
/// revision; the derived lexicographic order matches this.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Height {
    /// Chain revision number
    pub revision_number: u64,
    /// Height within the revision
    pub revision_height: u64,
}

impl Height {
    /// Creates a height.
    #[must_use]
    pub const fn new(revision_number: u64, revision_height: u64) -> Self {
        Self {
            revision_number,
            revision_height,
        }
    }
}

impl fmt::Display for Height {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.revision_number, self.revision_height)
    }
}

/// Opaque identifier of a submitted destination-chain message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MsgId(pub String);

impl fmt::Display for MsgId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An opaque packed payload crossing a collaborator boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtoAny {
    /// Payload type URL
    pub type_url: String,
    /// Encoded payload bytes
    pub value: Vec<u8>,
}

impl ProtoAny {
    /// Creates a packed payload.
    #[must_use]
    pub fn new(type_url: impl Into<String>, value: Vec<u8>) -> Self {
        Self {
            type_url: type_url.into(),
            value,
        }
    }
}

/// The LCP client state stored on the destination chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LcpClientState {
    /// Latest verified height
    pub latest_height: Height,
    /// Trusted enclave measurement
    pub mrenclave: Vec<u8>,
    /// Hard key expiration in seconds
    pub key_expiration: u64,
    /// Quote statuses accepted at registration
    pub allowed_quote_statuses: Vec<String>,
    /// Advisory IDs accepted at registration
    pub allowed_advisory_ids: Vec<String>,
    /// Registered operators
    pub operators: Vec<Address>,
    /// Monotonic nonce of operator-set updates
    pub operators_nonce: u64,
    /// Operator signature threshold numerator
    pub operators_threshold_numerator: u64,
    /// Operator signature threshold denominator
    pub operators_threshold_denominator: u64,
}

impl LcpClientState {
    /// Decodes a client state from a packed payload.
    ///
    /// # Errors
    ///
    /// Returns [`RelayerError::Fatal`] when the type URL is not the LCP
    /// client state or the value does not decode; a destination client of
    /// the wrong type is an unrecoverable configuration error.
    pub fn from_any(any: &ProtoAny) -> RelayerResult<Self> {
        if any.type_url != LCP_CLIENT_STATE_TYPE_URL {
            return Err(RelayerError::Fatal(format!(
                "unexpected client state type: {}",
                any.type_url
            )));
        }
        serde_json::from_slice(&any.value)
            .map_err(|e| RelayerError::Fatal(format!("failed to decode LCP client state: {e}")))
    }

    /// Packs the client state.
    ///
    /// # Errors
    ///
    /// Returns [`RelayerError::Fatal`] when encoding fails.
    pub fn into_any(&self) -> RelayerResult<ProtoAny> {
        let value = serde_json::to_vec(self)
            .map_err(|e| RelayerError::Fatal(format!("failed to encode LCP client state: {e}")))?;
        Ok(ProtoAny::new(LCP_CLIENT_STATE_TYPE_URL, value))
    }
}

/// Client message registering a freshly attested enclave key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterEnclaveKeyMessage {
    /// Raw AVR bytes
    pub report: Vec<u8>,
    /// IAS signature over the report
    pub signature: Vec<u8>,
    /// IAS report signing certificate
    pub signing_cert: Vec<u8>,
    /// EIP-712 operator co-signature, when operator mode is enabled
    pub operator_signature: Option<Vec<u8>>,
}

/// Client message applying an enclave-signed state transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateClientMessage {
    /// The LCP-produced commitment message (opaque)
    pub proxy_message: Vec<u8>,
    /// The enclave key that signed the commitment
    pub signer: Address,
    /// Enclave signature over `proxy_message`
    pub signature: Vec<u8>,
}

/// The tagged union of messages the destination LCP client accepts.
///
/// Dispatch is a match on the variant, mirrored on-chain by the type URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientMessage {
    /// Register a new enclave key
    RegisterEnclaveKey(RegisterEnclaveKeyMessage),
    /// Apply an enclave-signed update
    UpdateClient(UpdateClientMessage),
}

impl ClientMessage {
    /// The type URL identifying this message variant.
    #[must_use]
    pub const fn type_url(&self) -> &'static str {
        match self {
            Self::RegisterEnclaveKey(_) => REGISTER_ENCLAVE_KEY_TYPE_URL,
            Self::UpdateClient(_) => UPDATE_CLIENT_TYPE_URL,
        }
    }

    /// Packs the message for submission.
    ///
    /// # Errors
    ///
    /// Returns [`RelayerError::Fatal`] when encoding fails.
    pub fn into_any(&self) -> RelayerResult<ProtoAny> {
        let value = serde_json::to_vec(self)
            .map_err(|e| RelayerError::Fatal(format!("failed to encode client message: {e}")))?;
        Ok(ProtoAny::new(self.type_url(), value))
    }
}

/// An update-client submission for the destination chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgUpdateClient {
    /// The destination-chain client to update
    pub client_id: String,
    /// The wrapped client message
    pub message: ClientMessage,
    /// The destination-chain account submitting the message
    pub signer: String,
}

/// Result of searching the destination chain for a submitted message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MsgSearchResult {
    /// The message is not in any known block (never included, or reorged out)
    NotFound,
    /// The message was included in a block
    Found {
        /// Block the message landed in
        block_height: Height,
        /// Whether execution succeeded
        success: bool,
        /// Failure detail when `success` is false
        failure_reason: Option<String>,
    },
}

/// An enclave-signed output of the LCP service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyProof {
    /// The commitment message produced inside the enclave (opaque)
    pub message: Vec<u8>,
    /// The enclave key that signed it
    pub signer: Address,
    /// Enclave signature over `message`
    pub signature: Vec<u8>,
}

/// The packaged state proof handed back to the outer relayer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitmentProof {
    /// The commitment message produced inside the enclave (opaque)
    pub message: Vec<u8>,
    /// The enclave key that signed it
    pub signer: Address,
    /// Enclave signature over `message`
    pub signature: Vec<u8>,
}
