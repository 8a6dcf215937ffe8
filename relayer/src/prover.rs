//! The prover façade exposed to the outer relayer.
//!
//! Every relay-facing operation establishes a valid enclave key first, then
//! forwards to the origin prover and translates its outputs through the LCP
//! service, binding the active key as the signer. The LCP-produced
//! commitment messages stay opaque here; only the signer binding matters.

use std::sync::Arc;

use chrono::Utc;
use enclave_key_store::EnclaveKeyStore;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::ProverConfig;
use crate::destination::DestinationChain;
use crate::key_manager::EnclaveKeyManager;
use crate::lcp::{
    CreateClientRequest, LcpService, UpdateClientRequest, VerifyMembershipRequest,
};
use crate::operator::OperatorSigner;
use crate::origin::OriginProver;
use crate::types::{
    ClientMessage, CommitmentProof, Height, MsgUpdateClient, ProtoAny, ProxyProof, RelayerError,
    RelayerResult, UpdateClientMessage,
};

/// The commitment store prefix of IBC state proofs.
pub const COMMITMENT_PREFIX: &[u8] = b"ibc";

/// Result of a one-shot ELC bootstrap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateElcResult {
    /// False when the client already existed and nothing was done
    pub created: bool,
}

/// Raw view of the enclave-hosted client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryElcResult {
    /// Whether the client exists
    pub found: bool,
    /// Packed client state, when found
    pub client_state: Option<ProtoAny>,
    /// Packed consensus state, when found
    pub consensus_state: Option<ProtoAny>,
}

/// LCP prover: the relayer-facing gate over the enclave light client.
pub struct LcpProver {
    config: ProverConfig,
    lcp: Arc<dyn LcpService>,
    origin: Arc<dyn OriginProver>,
    destination: Arc<dyn DestinationChain>,
    key_manager: EnclaveKeyManager,
}

impl LcpProver {
    /// Builds the prover and its key manager from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RelayerError::Fatal`] when the configuration is
    /// contradictory.
    pub fn new(
        config: ProverConfig,
        lcp: Arc<dyn LcpService>,
        origin: Arc<dyn OriginProver>,
        destination: Arc<dyn DestinationChain>,
        store: EnclaveKeyStore,
    ) -> RelayerResult<Self> {
        config.validate()?;
        let verifier =
            attestation_verifier::IasReportVerifier::new(config.debug_allow_debug_enclaves);
        let policy = config.policy()?;
        let operator = OperatorSigner::from_config(&config)?;
        let key_manager = EnclaveKeyManager::new(
            verifier,
            policy,
            store,
            Arc::clone(&lcp),
            Arc::clone(&destination),
            operator,
        );
        Ok(Self {
            config,
            lcp,
            origin,
            destination,
            key_manager,
        })
    }

    /// Builds the prover around an externally constructed key manager.
    /// Intended for tests that need a non-default verifier.
    #[must_use]
    pub fn with_key_manager(
        config: ProverConfig,
        lcp: Arc<dyn LcpService>,
        origin: Arc<dyn OriginProver>,
        destination: Arc<dyn DestinationChain>,
        key_manager: EnclaveKeyManager,
    ) -> Self {
        Self {
            config,
            lcp,
            origin,
            destination,
            key_manager,
        }
    }

    /// The underlying key manager.
    #[must_use]
    pub fn key_manager(&self) -> &EnclaveKeyManager {
        &self.key_manager
    }

    /// Creates the light client inside the enclave if it does not exist yet.
    ///
    /// No on-chain registration happens here; a candidate key only signs the
    /// creation result.
    ///
    /// # Errors
    ///
    /// Returns [`RelayerError::Fatal`] when the service assigns a client id
    /// other than the configured `elc_client_id`.
    pub async fn create_elc_client(&self, height: Option<Height>) -> RelayerResult<CreateElcResult> {
        if self.lcp.client(&self.config.elc_client_id).await?.is_some() {
            info!(elc_client_id = %self.config.elc_client_id, "ELC client already exists");
            return Ok(CreateElcResult { created: false });
        }

        let eki = self.key_manager.select_candidate_key(Utc::now()).await?;
        let (client_state, consensus_state) = self
            .origin
            .create_initial_light_client_state(height)
            .await?;
        let response = self
            .lcp
            .create_client(CreateClientRequest {
                client_state,
                consensus_state,
                signer: eki.enclave_key_address,
            })
            .await?;

        if response.client_id != self.config.elc_client_id {
            return Err(RelayerError::Fatal(format!(
                "configured elc_client_id is '{}', but the service assigned '{}'",
                self.config.elc_client_id, response.client_id
            )));
        }
        info!(elc_client_id = %response.client_id, "created ELC client");
        Ok(CreateElcResult { created: true })
    }

    /// Queries the enclave-hosted client without interpreting its state.
    ///
    /// # Errors
    ///
    /// Propagates LCP transport failures as [`RelayerError::Transient`].
    pub async fn query_elc(&self) -> RelayerResult<QueryElcResult> {
        match self.lcp.client(&self.config.elc_client_id).await? {
            Some(client) => Ok(QueryElcResult {
                found: true,
                client_state: Some(client.client_state),
                consensus_state: Some(client.consensus_state),
            }),
            None => Ok(QueryElcResult {
                found: false,
                client_state: None,
                consensus_state: None,
            }),
        }
    }

    /// Produces the enclave-signed update messages needed to advance the
    /// destination client to `latest_finalized_header`.
    ///
    /// # Errors
    ///
    /// Fails when no usable enclave key can be established or a collaborator
    /// call fails.
    pub async fn setup_headers_for_update(
        &mut self,
        latest_finalized_header: ProtoAny,
    ) -> RelayerResult<Vec<ClientMessage>> {
        self.key_manager.ensure_active_key(Utc::now()).await?;
        let signer = self.key_manager.signer_address()?;

        let headers = self
            .origin
            .setup_headers_for_update(latest_finalized_header)
            .await?;
        if headers.is_empty() {
            return Ok(Vec::new());
        }

        let mut updates = Vec::with_capacity(headers.len());
        for header in headers {
            let proof = self
                .lcp
                .update_client(UpdateClientRequest {
                    client_id: self.config.elc_client_id.clone(),
                    header,
                    include_state: false,
                    signer,
                })
                .await?;
            updates.push(ClientMessage::UpdateClient(UpdateClientMessage {
                proxy_message: proof.message,
                signer: proof.signer,
                signature: proof.signature,
            }));
        }
        Ok(updates)
    }

    /// Drives the enclave light client forward without touching the
    /// destination chain. Returns the raw signed commitments.
    ///
    /// # Errors
    ///
    /// Fails when no usable enclave key can be established or a collaborator
    /// call fails.
    pub async fn update_elc(&mut self, include_state: bool) -> RelayerResult<Vec<ProxyProof>> {
        self.key_manager.ensure_active_key(Utc::now()).await?;
        let signer = self.key_manager.signer_address()?;

        let latest = self.origin.latest_finalized_header().await?;
        let headers = self.origin.setup_headers_for_update(latest).await?;
        if headers.is_empty() {
            info!("ELC already up to date");
            return Ok(Vec::new());
        }

        let mut proofs = Vec::with_capacity(headers.len());
        for header in headers {
            let proof = self
                .lcp
                .update_client(UpdateClientRequest {
                    client_id: self.config.elc_client_id.clone(),
                    header,
                    include_state,
                    signer,
                })
                .await?;
            proofs.push(proof);
        }
        Ok(proofs)
    }

    /// Synchronizes the enclave light client with the origin chain and
    /// submits the resulting updates to the destination client. Used to
    /// activate a freshly created client.
    ///
    /// # Errors
    ///
    /// Fails when no usable enclave key can be established or the
    /// destination rejects the submission.
    pub async fn activate_client(&mut self) -> RelayerResult<()> {
        let updates = self.update_elc(true).await?;
        if updates.is_empty() {
            return Ok(());
        }

        let signer = self.destination.signer_address().await?;
        let msgs = updates
            .into_iter()
            .map(|proof| MsgUpdateClient {
                client_id: self.destination.client_id().to_string(),
                message: ClientMessage::UpdateClient(UpdateClientMessage {
                    proxy_message: proof.message,
                    signer: proof.signer,
                    signature: proof.signature,
                }),
                signer: signer.clone(),
            })
            .collect();
        self.destination.send_msgs(msgs).await?;
        Ok(())
    }

    /// Proves a committed `(path, value)` pair through the enclave and
    /// returns the packaged commitment proof with the height it verifies at.
    ///
    /// # Errors
    ///
    /// Fails when no usable enclave key can be established or a collaborator
    /// call fails.
    pub async fn prove_state(
        &mut self,
        path: String,
        value: Vec<u8>,
    ) -> RelayerResult<(Vec<u8>, Height)> {
        self.key_manager.ensure_active_key(Utc::now()).await?;
        let signer = self.key_manager.signer_address()?;

        let (proof, proof_height) = self.origin.prove_state(&path, &value).await?;
        let result = self
            .lcp
            .verify_membership(VerifyMembershipRequest {
                client_id: self.config.elc_client_id.clone(),
                prefix: COMMITMENT_PREFIX.to_vec(),
                path,
                value,
                proof_height,
                proof,
                signer,
            })
            .await?;

        let commitment = CommitmentProof {
            message: result.message,
            signer: result.signer,
            signature: result.signature,
        };
        let encoded = serde_json::to_vec(&commitment)
            .map_err(|e| RelayerError::Transient(format!("failed to encode proof: {e}")))?;
        Ok((encoded, proof_height))
    }

    /// Whether the origin client needs a refresh ahead of schedule.
    ///
    /// # Errors
    ///
    /// Propagates origin prover failures as [`RelayerError::Transient`].
    pub async fn check_refresh_required(&self) -> RelayerResult<bool> {
        Ok(self.origin.check_refresh_required().await?)
    }
}
