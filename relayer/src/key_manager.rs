//! Enclave key lifecycle management.
//!
//! The manager keeps one active enclave key in memory together with its
//! finalization status, and reconciles three views of the world on every
//! tick: memory, the on-disk record store, and the destination chain.
//! Disk is written ahead of memory so that a restart reconstructs the same
//! state from the store alone.
//!
//! All transitions happen on one task; the collaborator calls and disk
//! writes in between are suspension points, never concurrency.

use std::sync::Arc;

use alloy::primitives::Address;
use attestation_verifier::{EnclaveKeyInfo, IasReportVerifier, KeyUsagePolicy};
use chrono::{DateTime, Utc};
use enclave_key_store::{EnclaveKeyStore, KeyStoreError};
use tracing::{info, warn};

use crate::destination::DestinationChain;
use crate::lcp::LcpService;
use crate::operator::OperatorSigner;
use crate::registration;
use crate::types::{MsgId, MsgSearchResult, RelayerError, RelayerResult};

/// Converts a timestamp to unix seconds, clamping pre-epoch values to zero.
pub(crate) fn unix_time(now: DateTime<Utc>) -> u64 {
    u64::try_from(now.timestamp()).unwrap_or(0)
}

/// Inclusion status of a registration message, folded over the chain's
/// latest finalized height.
enum MsgStatus {
    /// Not in any known block: never included, or reorged out
    NotFound,
    /// Included but execution failed
    Failed(Option<String>),
    /// Executed successfully
    Executed {
        /// Whether the containing block is at or below the finalized height
        finalized: bool,
    },
}

/// Maintains a valid, registered enclave signing key across expiration,
/// reorgs, and restarts.
pub struct EnclaveKeyManager {
    verifier: IasReportVerifier,
    policy: KeyUsagePolicy,
    store: EnclaveKeyStore,
    lcp: Arc<dyn LcpService>,
    destination: Arc<dyn DestinationChain>,
    operator: Option<OperatorSigner>,

    active_key: Option<EnclaveKeyInfo>,
    unfinalized_msg_id: Option<MsgId>,
}

impl EnclaveKeyManager {
    /// Creates a manager over the given capability handles.
    #[must_use]
    pub fn new(
        verifier: IasReportVerifier,
        policy: KeyUsagePolicy,
        store: EnclaveKeyStore,
        lcp: Arc<dyn LcpService>,
        destination: Arc<dyn DestinationChain>,
        operator: Option<OperatorSigner>,
    ) -> Self {
        Self {
            verifier,
            policy,
            store,
            lcp,
            destination,
            operator,
            active_key: None,
            unfinalized_msg_id: None,
        }
    }

    /// The active enclave key, if one is established.
    #[must_use]
    pub fn active_key(&self) -> Option<&EnclaveKeyInfo> {
        self.active_key.as_ref()
    }

    /// Whether the active key's registration is finalized.
    #[must_use]
    pub fn is_finalized(&self) -> bool {
        self.active_key.is_some() && self.unfinalized_msg_id.is_none()
    }

    /// The active key's address, for use as the signer field of LCP requests.
    ///
    /// # Errors
    ///
    /// Returns [`RelayerError::StateInconsistent`] when no key is active;
    /// callers must run [`Self::ensure_active_key`] first.
    pub fn signer_address(&self) -> RelayerResult<Address> {
        self.active_key
            .as_ref()
            .map(|eki| eki.enclave_key_address)
            .ok_or_else(|| {
                RelayerError::StateInconsistent("no active enclave key established".to_string())
            })
    }

    /// Ensures an enclave key is active, allowed by policy at `now`, and
    /// registered (or registering) on the destination chain.
    ///
    /// On success, [`Self::active_key`] is set and passes policy; the
    /// corresponding record was written to disk before memory became
    /// observable.
    ///
    /// # Errors
    ///
    /// Propagates collaborator, store, attestation, and registration
    /// failures per their [`RelayerError`] classification; `Transient`
    /// errors leave the state recoverable on the next tick.
    pub async fn ensure_active_key(&mut self, now: DateTime<Utc>) -> RelayerResult<()> {
        let update_needed = self.load_and_check_update_needed(now).await?;
        info!(update_needed, "checked enclave key status");
        if !update_needed {
            return Ok(());
        }

        // A new key is required: start from a clean slate.
        self.active_key = None;
        self.unfinalized_msg_id = None;

        let pruned = self
            .store
            .prune_finalized(unix_time(now).saturating_sub(self.policy.key_expiration()))
            .await?;
        for address in pruned {
            info!(enclave_key = %address, "pruned hard-expired finalized key record");
        }

        info!("selecting a new enclave key");
        let eki = self.select_candidate_key(now).await?;

        info!(enclave_key = %eki.enclave_key_address, "registering new enclave key");
        let msg_id = registration::register_enclave_key(
            &self.verifier,
            self.destination.as_ref(),
            self.operator.as_ref(),
            &eki,
            unix_time(now),
        )
        .await?;
        info!(
            enclave_key = %eki.enclave_key_address,
            msg_id = %msg_id,
            "registration submitted"
        );

        match self.check_msg_status(&msg_id).await? {
            MsgStatus::NotFound => Err(RelayerError::RegistrationFailed(format!(
                "registration message {msg_id} not found after submission"
            ))),
            MsgStatus::Failed(reason) => Err(RelayerError::RegistrationFailed(format!(
                "registration message {msg_id} failed: {}",
                reason.unwrap_or_else(|| "unknown".to_string())
            ))),
            MsgStatus::Executed { finalized: true } => {
                // Instant finality: the record goes straight to finalized.
                self.store.save_finalized(&eki).await?;
                self.active_key = Some(eki);
                self.unfinalized_msg_id = None;
                Ok(())
            }
            MsgStatus::Executed { finalized: false } => {
                self.store.save_unfinalized(&eki, &msg_id.0).await?;
                self.active_key = Some(eki);
                self.unfinalized_msg_id = Some(msg_id);
                Ok(())
            }
        }
    }

    /// Selects the first LCP-offered candidate key that verifies and passes
    /// policy. Policy rejections are logged and skipped; only an exhausted
    /// candidate list is an error.
    pub(crate) async fn select_candidate_key(
        &self,
        now: DateTime<Utc>,
    ) -> RelayerResult<EnclaveKeyInfo> {
        let candidates = self
            .lcp
            .available_enclave_keys(self.policy.mrenclave())
            .await?;
        if candidates.is_empty() {
            warn!("LCP service returned no enclave keys");
            return Err(RelayerError::NoUsableKey);
        }

        let now_secs = unix_time(now);
        for eki in candidates {
            let report = self.verifier.verify_key_info(&eki, now_secs)?;
            if let Err(violation) = self.policy.check(&report, now_secs) {
                info!(
                    enclave_key = %eki.enclave_key_address,
                    %violation,
                    "candidate key rejected by policy, skipping"
                );
                continue;
            }
            return Ok(eki);
        }
        warn!("all candidate enclave keys were rejected by policy");
        Err(RelayerError::NoUsableKey)
    }

    /// Loads state from disk when memory is empty, reconciles any in-flight
    /// registration with the destination chain, and decides whether a new
    /// key is needed.
    async fn load_and_check_update_needed(&mut self, now: DateTime<Utc>) -> RelayerResult<bool> {
        if self.active_key.is_none() {
            info!("no active enclave key in memory");
            match self.store.load_last_unfinalized().await {
                Ok((eki, msg_id)) => {
                    info!(enclave_key = %eki.enclave_key_address, "loaded last unfinalized enclave key");
                    self.active_key = Some(eki);
                    self.unfinalized_msg_id = Some(MsgId(msg_id));
                }
                Err(KeyStoreError::NotFound) => match self.store.load_last_finalized().await {
                    Ok(eki) => {
                        info!(enclave_key = %eki.enclave_key_address, "loaded last finalized enclave key");
                        self.active_key = Some(eki);
                        self.unfinalized_msg_id = None;
                    }
                    Err(KeyStoreError::NotFound) => {
                        info!("no enclave key records found");
                        return Ok(true);
                    }
                    Err(e) => return Err(e.into()),
                },
                Err(e) => return Err(e.into()),
            }
        }

        let Some(active) = self.active_key.clone() else {
            return Err(RelayerError::StateInconsistent(
                "active key not established after load".to_string(),
            ));
        };

        let Some(msg_id) = self.unfinalized_msg_id.clone() else {
            // Finalized key: staleness checks only.
            return Ok(self.key_update_needed(&active, now).await);
        };

        // Unfinalized key: reconcile the in-flight registration first.
        match self.check_msg_status(&msg_id).await? {
            MsgStatus::NotFound => {
                warn!(%msg_id, "registration message no longer in any block, assuming reorg");
                self.store.remove_unfinalized().await?;
                self.active_key = None;
                self.unfinalized_msg_id = None;
                Ok(true)
            }
            MsgStatus::Failed(reason) => {
                warn!(
                    %msg_id,
                    reason = reason.as_deref().unwrap_or("unknown"),
                    "registration message execution failed"
                );
                self.store.remove_unfinalized().await?;
                self.active_key = None;
                self.unfinalized_msg_id = None;
                Ok(true)
            }
            MsgStatus::Executed { finalized: true } => {
                // Promote first, even when rotation follows: the next tick
                // then starts from a clean finalized baseline.
                info!(%msg_id, enclave_key = %active.enclave_key_address, "registration finalized, promoting record");
                self.store.save_finalized(&active).await?;
                self.store.remove_unfinalized().await?;
                self.unfinalized_msg_id = None;
                Ok(self.key_update_needed(&active, now).await)
            }
            MsgStatus::Executed { finalized: false } => {
                info!(%msg_id, "registration included but not yet finalized");
                Ok(self.key_update_needed(&active, now).await)
            }
        }
    }

    /// Whether the given active key must be replaced: past its rotation
    /// deadline, rejected by the current policy, or unknown to the LCP
    /// service.
    async fn key_update_needed(&self, eki: &EnclaveKeyInfo, now: DateTime<Utc>) -> bool {
        let now_secs = unix_time(now);
        if self.policy.rotation_due(eki.attestation_time, now_secs) {
            info!(
                enclave_key = %eki.enclave_key_address,
                attestation_time = eki.attestation_time,
                rotation_deadline = self.policy.rotation_deadline(eki.attestation_time),
                now = now_secs,
                "enclave key reached its rotation deadline"
            );
            return true;
        }

        match self.verifier.parse_avr(&eki.report) {
            Ok(report) => {
                if let Err(violation) = self.policy.check(&report, now_secs) {
                    warn!(enclave_key = %eki.enclave_key_address, %violation, "active key no longer passes policy");
                    return true;
                }
            }
            Err(e) => {
                warn!(enclave_key = %eki.enclave_key_address, error = %e, "stored report no longer parses");
                return true;
            }
        }

        match self.lcp.enclave_key(eki.enclave_key_address).await {
            Ok(Some(_)) => false,
            Ok(None) => {
                warn!(enclave_key = %eki.enclave_key_address, "enclave key not found in LCP service");
                true
            }
            Err(e) => {
                warn!(enclave_key = %eki.enclave_key_address, error = %e, "enclave key probe failed");
                true
            }
        }
    }

    /// Folds the message search result over the latest finalized height.
    async fn check_msg_status(&self, msg_id: &MsgId) -> RelayerResult<MsgStatus> {
        let finalized_height = self.destination.latest_finalized_height().await?;
        match self.destination.msg_result(msg_id).await? {
            MsgSearchResult::NotFound => Ok(MsgStatus::NotFound),
            MsgSearchResult::Found {
                success: false,
                failure_reason,
                ..
            } => Ok(MsgStatus::Failed(failure_reason)),
            MsgSearchResult::Found {
                success: true,
                block_height,
                ..
            } => Ok(MsgStatus::Executed {
                finalized: block_height <= finalized_height,
            }),
        }
    }
}
