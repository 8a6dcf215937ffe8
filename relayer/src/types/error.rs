//! Error types for the relayer.
//!
//! Collaborators surface their own narrow error enums; everything converges
//! into [`RelayerError`], whose variants determine the caller's recovery
//! strategy: `Transient` errors are retried on the next tick, `PolicyRejected`
//! skips a candidate, `StateInconsistent` and `Fatal` halt the relayer.

use attestation_verifier::{AttestationError, PolicyViolation};
use enclave_key_store::KeyStoreError;
use thiserror::Error;

/// Result type for relayer operations
pub type RelayerResult<T> = Result<T, RelayerError>;

/// Errors surfaced by a destination-chain collaborator
#[derive(Debug, Error)]
pub enum ChainError {
    /// RPC transport failure, timeout, or cancellation
    #[error("chain transport error: {0}")]
    Transport(String),

    /// A query completed but returned an unusable response
    #[error("chain query failed: {0}")]
    Query(String),

    /// A submission was rejected before inclusion
    #[error("chain rejected submission: {0}")]
    Rejected(String),
}

/// Errors surfaced by the LCP service collaborator
#[derive(Debug, Error)]
pub enum LcpError {
    /// gRPC transport failure, timeout, or cancellation
    #[error("LCP transport error: {0}")]
    Transport(String),

    /// The service answered with an error status
    #[error("LCP service error: {0}")]
    Service(String),
}

/// Errors surfaced by the enclave key lifecycle manager
#[derive(Debug, Error)]
pub enum RelayerError {
    /// Attestation report validation failed
    #[error("attestation invalid: {0}")]
    Attestation(#[from] AttestationError),

    /// An enclave key was rejected by the usage policy
    #[error("enclave key rejected by policy: {0}")]
    PolicyRejected(#[from] PolicyViolation),

    /// The LCP service has no candidate key that passes policy
    #[error("no usable enclave key available")]
    NoUsableKey,

    /// On-chain registration of an enclave key failed
    #[error("enclave key registration failed: {0}")]
    RegistrationFailed(String),

    /// The persisted state violates an invariant; operator intervention required
    #[error("persistent state inconsistent: {0}")]
    StateInconsistent(String),

    /// Network, transport, or I/O failure; retry on the next tick
    #[error("transient failure: {0}")]
    Transient(String),

    /// Configuration contradiction; operator intervention required
    #[error("fatal: {0}")]
    Fatal(String),
}

impl From<KeyStoreError> for RelayerError {
    fn from(err: KeyStoreError) -> Self {
        match err {
            KeyStoreError::Io(e) => Self::Transient(format!("key store I/O: {e}")),
            KeyStoreError::NotFound => {
                Self::StateInconsistent("expected key record disappeared".to_string())
            }
            other => Self::StateInconsistent(other.to_string()),
        }
    }
}

impl From<ChainError> for RelayerError {
    fn from(err: ChainError) -> Self {
        match err {
            ChainError::Transport(e) | ChainError::Query(e) => Self::Transient(e),
            ChainError::Rejected(e) => Self::RegistrationFailed(e),
        }
    }
}

impl From<LcpError> for RelayerError {
    fn from(err: LcpError) -> Self {
        Self::Transient(err.to_string())
    }
}
