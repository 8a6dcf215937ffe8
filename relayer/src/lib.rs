//! Relayer-side integration of an SGX-enclave-backed light client proxy.
//!
//! An enclave (the LCP service) runs light-client verification inside
//! attested hardware and signs the resulting state transitions with an
//! ephemeral enclave key; the destination chain verifies only that
//! signature. This crate owns the hard part of that arrangement: keeping a
//! valid, trusted, on-chain registered enclave key available across key
//! expiration, destination-chain reorgs, attestation policy changes, and
//! relayer restarts.
//!
//! The embedding relayer supplies three capability handles
//! ([`LcpService`], [`DestinationChain`], and [`OriginProver`]) and drives
//! [`LcpProver`], which gates every relay operation behind
//! [`EnclaveKeyManager::ensure_active_key`].

#![deny(clippy::all, dead_code)]

pub mod config;
pub mod destination;
pub mod eip712;
pub mod key_manager;
pub mod lcp;
pub mod operator;
pub mod origin;
pub mod prover;
pub mod types;

mod registration;

pub use config::{
    ChainType, CosmosEip712Params, EvmEip712Params, OperatorKeySource, ProverConfig,
};
pub use destination::DestinationChain;
pub use key_manager::EnclaveKeyManager;
pub use lcp::LcpService;
pub use operator::OperatorSigner;
pub use origin::OriginProver;
pub use prover::{CreateElcResult, LcpProver, QueryElcResult};
pub use types::{
    ChainError, ClientMessage, CommitmentProof, Height, LcpClientState, LcpError, MsgId,
    MsgSearchResult, MsgUpdateClient, ProtoAny, ProxyProof, RegisterEnclaveKeyMessage,
    RelayerError, RelayerResult, UpdateClientMessage,
};
