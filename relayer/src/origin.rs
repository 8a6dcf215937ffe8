//! Origin prover collaborator.
//!
//! Produces origin-chain headers and state proofs; the enclave re-verifies
//! everything it hands over, so its outputs stay opaque here.

use async_trait::async_trait;

use crate::types::{ChainError, Height, ProtoAny};

/// Interface to the origin-chain prover.
#[async_trait]
pub trait OriginProver: Send + Sync {
    /// Builds the initial client and consensus state at `height` (or the
    /// latest finalized height when `None`).
    async fn create_initial_light_client_state(
        &self,
        height: Option<Height>,
    ) -> Result<(ProtoAny, ProtoAny), ChainError>;

    /// The latest finalized origin-chain header.
    async fn latest_finalized_header(&self) -> Result<ProtoAny, ChainError>;

    /// Returns the headers needed to advance a client to
    /// `latest_finalized_header`, in application order. An empty list means
    /// the client is already up to date.
    async fn setup_headers_for_update(
        &self,
        latest_finalized_header: ProtoAny,
    ) -> Result<Vec<ProtoAny>, ChainError>;

    /// Proves a committed `(path, value)` pair and returns the proof and the
    /// height it was produced at.
    async fn prove_state(&self, path: &str, value: &[u8]) -> Result<(Vec<u8>, Height), ChainError>;

    /// Whether the origin client needs a refresh ahead of schedule.
    async fn check_refresh_required(&self) -> Result<bool, ChainError>;
}
