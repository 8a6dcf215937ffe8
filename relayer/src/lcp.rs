//! LCP service collaborator.
//!
//! The enclave-hosted light client proxy is reached over gRPC in production;
//! the transport lives in the embedding relayer and implements this trait.

use alloy::primitives::Address;
use attestation_verifier::{EnclaveKeyInfo, Mrenclave};
use async_trait::async_trait;

use crate::types::{Height, LcpError, ProtoAny, ProxyProof};

/// Request to create the light client inside the enclave.
#[derive(Debug, Clone)]
pub struct CreateClientRequest {
    /// Initial origin-chain client state (opaque)
    pub client_state: ProtoAny,
    /// Initial origin-chain consensus state (opaque)
    pub consensus_state: ProtoAny,
    /// Enclave key that signs the creation result
    pub signer: Address,
}

/// Response of a client creation.
#[derive(Debug, Clone)]
pub struct CreateClientResponse {
    /// Identifier assigned to the new client
    pub client_id: String,
}

/// Request to update the light client inside the enclave.
#[derive(Debug, Clone)]
pub struct UpdateClientRequest {
    /// The enclave-hosted client to update
    pub client_id: String,
    /// Packed origin-chain header (opaque)
    pub header: ProtoAny,
    /// Whether the emitted message must include the full state
    pub include_state: bool,
    /// Enclave key that signs the commitment
    pub signer: Address,
}

/// Request to verify a membership proof inside the enclave.
#[derive(Debug, Clone)]
pub struct VerifyMembershipRequest {
    /// The enclave-hosted client to verify against
    pub client_id: String,
    /// Commitment store prefix
    pub prefix: Vec<u8>,
    /// Commitment path
    pub path: String,
    /// Committed value
    pub value: Vec<u8>,
    /// Height the proof was produced at
    pub proof_height: Height,
    /// Origin-chain membership proof
    pub proof: Vec<u8>,
    /// Enclave key that signs the commitment
    pub signer: Address,
}

/// The client and consensus state of an enclave-hosted light client.
#[derive(Debug, Clone)]
pub struct ElcClient {
    /// Packed client state (opaque)
    pub client_state: ProtoAny,
    /// Packed consensus state (opaque)
    pub consensus_state: ProtoAny,
}

/// Interface to the LCP service.
#[async_trait]
pub trait LcpService: Send + Sync {
    /// Lists enclave keys available for the given measurement.
    async fn available_enclave_keys(
        &self,
        mrenclave: Mrenclave,
    ) -> Result<Vec<EnclaveKeyInfo>, LcpError>;

    /// Probes whether the service still knows the given enclave key.
    async fn enclave_key(&self, address: Address) -> Result<Option<EnclaveKeyInfo>, LcpError>;

    /// Creates the light client inside the enclave. One-shot setup.
    async fn create_client(
        &self,
        request: CreateClientRequest,
    ) -> Result<CreateClientResponse, LcpError>;

    /// Feeds an origin-chain header to the enclave light client and returns
    /// the signed commitment.
    async fn update_client(&self, request: UpdateClientRequest) -> Result<ProxyProof, LcpError>;

    /// Verifies an origin-chain membership proof inside the enclave and
    /// returns the signed commitment.
    async fn verify_membership(
        &self,
        request: VerifyMembershipRequest,
    ) -> Result<ProxyProof, LcpError>;

    /// Fetches the enclave-hosted client state, if the client exists.
    async fn client(&self, client_id: &str) -> Result<Option<ElcClient>, LcpError>;
}
