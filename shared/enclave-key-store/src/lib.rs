//! Durable storage for enclave key records.
//!
//! The relayer must survive restarts without losing track of which enclave
//! key it registered on the destination chain. Records live in two
//! categories: `finalized` keys whose registration transaction is final, and
//! at most one `unfinalized` key whose registration is still in flight
//! (tracked by the submission message id).
//!
//! Layout: `<home>/<path-identifier>/{finalized,unfinalized}/<address-hex>`,
//! one JSON record per file. Every write goes to a `.tmp` sibling first and
//! is renamed into place, so a crash never leaves a half-written record.
//! A single process owns the directory; cross-process locking is out of
//! scope.

#![deny(clippy::all, missing_docs, dead_code)]

mod error;

use std::path::{Path, PathBuf};

use attestation_verifier::EnclaveKeyInfo;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::debug;

pub use error::{KeyStoreError, KeyStoreResult};

const FINALIZED_DIR: &str = "finalized";
const UNFINALIZED_DIR: &str = "unfinalized";
const TMP_SUFFIX: &str = ".tmp";

/// Registration status of a persisted enclave key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyStatus {
    /// The registration transaction is final on the destination chain
    Finalized,
    /// The registration transaction is included but not yet final
    Unfinalized,
}

/// The persisted form of an enclave key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyRecord {
    /// The enclave key and its attestation evidence
    pub eki: EnclaveKeyInfo,
    /// Registration status
    pub status: KeyStatus,
    /// Submission message id; present iff `status` is `Unfinalized`
    pub msg_id: Option<String>,
}

/// File-backed store for enclave key records.
pub struct EnclaveKeyStore {
    root: PathBuf,
}

impl EnclaveKeyStore {
    /// Opens (creating if necessary) the store rooted at
    /// `<home>/<path_identifier>/`.
    ///
    /// # Errors
    ///
    /// Returns [`KeyStoreError::Io`] when the directories cannot be created.
    pub async fn open(home: impl AsRef<Path>, path_identifier: &str) -> KeyStoreResult<Self> {
        let root = home.as_ref().join(path_identifier);
        fs::create_dir_all(root.join(FINALIZED_DIR)).await?;
        fs::create_dir_all(root.join(UNFINALIZED_DIR)).await?;
        Ok(Self { root })
    }

    /// The store's root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Persists a finalized key record, replacing any previous record for
    /// the same address.
    ///
    /// # Errors
    ///
    /// Returns [`KeyStoreError::Io`] when the write fails.
    pub async fn save_finalized(&self, eki: &EnclaveKeyInfo) -> KeyStoreResult<()> {
        let record = KeyRecord {
            eki: eki.clone(),
            status: KeyStatus::Finalized,
            msg_id: None,
        };
        self.write_record(FINALIZED_DIR, &record).await
    }

    /// Persists the single in-flight key record.
    ///
    /// # Errors
    ///
    /// Returns [`KeyStoreError::UnfinalizedKeyExists`] when another
    /// unfinalized record is already present, or [`KeyStoreError::Io`] when
    /// the write fails.
    pub async fn save_unfinalized(
        &self,
        eki: &EnclaveKeyInfo,
        msg_id: &str,
    ) -> KeyStoreResult<()> {
        if let Some(existing) = self.record_names(UNFINALIZED_DIR).await?.first() {
            return Err(KeyStoreError::UnfinalizedKeyExists {
                existing: existing.clone(),
            });
        }
        let record = KeyRecord {
            eki: eki.clone(),
            status: KeyStatus::Unfinalized,
            msg_id: Some(msg_id.to_string()),
        };
        self.write_record(UNFINALIZED_DIR, &record).await
    }

    /// Loads the finalized record with the most recent attestation time.
    ///
    /// # Errors
    ///
    /// Returns [`KeyStoreError::NotFound`] when no finalized record exists.
    pub async fn load_last_finalized(&self) -> KeyStoreResult<EnclaveKeyInfo> {
        let records = self.read_records(FINALIZED_DIR, KeyStatus::Finalized).await?;
        records
            .into_iter()
            .max_by_key(|r| r.eki.attestation_time)
            .map(|r| r.eki)
            .ok_or(KeyStoreError::NotFound)
    }

    /// Loads the sole unfinalized record and its message id.
    ///
    /// # Errors
    ///
    /// Returns [`KeyStoreError::NotFound`] when none exists and
    /// [`KeyStoreError::Inconsistent`] when more than one exists or the
    /// record lacks its message id.
    pub async fn load_last_unfinalized(&self) -> KeyStoreResult<(EnclaveKeyInfo, String)> {
        let mut records = self
            .read_records(UNFINALIZED_DIR, KeyStatus::Unfinalized)
            .await?;
        match records.len() {
            0 => Err(KeyStoreError::NotFound),
            1 => {
                let record = records.remove(0);
                let msg_id = record.msg_id.ok_or_else(|| {
                    KeyStoreError::Inconsistent(
                        "unfinalized record has no message id".to_string(),
                    )
                })?;
                Ok((record.eki, msg_id))
            }
            n => Err(KeyStoreError::Inconsistent(format!(
                "{n} unfinalized records present, at most one is allowed"
            ))),
        }
    }

    /// Removes the unfinalized record if any. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`KeyStoreError::Io`] when a removal fails.
    pub async fn remove_unfinalized(&self) -> KeyStoreResult<()> {
        let dir = self.root.join(UNFINALIZED_DIR);
        let mut entries = fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            fs::remove_file(entry.path()).await?;
            debug!(path = %entry.path().display(), "removed unfinalized key record");
        }
        Ok(())
    }

    /// Removes finalized records attested at or before `attested_before`
    /// (hard-expired keys). Returns the removed addresses.
    ///
    /// # Errors
    ///
    /// Returns [`KeyStoreError::Io`] when a removal fails.
    pub async fn prune_finalized(&self, attested_before: u64) -> KeyStoreResult<Vec<String>> {
        let dir = self.root.join(FINALIZED_DIR);
        let mut pruned = Vec::new();
        for record in self.read_records(FINALIZED_DIR, KeyStatus::Finalized).await? {
            if record.eki.attestation_time <= attested_before {
                let name = address_file_name(&record.eki);
                fs::remove_file(dir.join(&name)).await?;
                pruned.push(name);
            }
        }
        Ok(pruned)
    }

    async fn write_record(&self, subdir: &str, record: &KeyRecord) -> KeyStoreResult<()> {
        let bytes = serde_json::to_vec_pretty(record).map_err(|e| {
            KeyStoreError::Inconsistent(format!("failed to encode key record: {e}"))
        })?;

        let dir = self.root.join(subdir);
        let name = address_file_name(&record.eki);
        let tmp = dir.join(format!("{name}{TMP_SUFFIX}"));
        let path = dir.join(&name);

        fs::write(&tmp, &bytes).await?;
        fs::rename(&tmp, &path).await?;
        debug!(path = %path.display(), status = ?record.status, "persisted key record");
        Ok(())
    }

    async fn read_records(
        &self,
        subdir: &str,
        expected: KeyStatus,
    ) -> KeyStoreResult<Vec<KeyRecord>> {
        let dir = self.root.join(subdir);
        let mut records = Vec::new();
        let mut entries = fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path
                .file_name()
                .and_then(|n| n.to_str())
                .is_none_or(|n| n.ends_with(TMP_SUFFIX))
            {
                // Leftover from an interrupted write; the rename never happened.
                continue;
            }
            let bytes = fs::read(&path).await?;
            let record: KeyRecord = serde_json::from_slice(&bytes).map_err(|e| {
                KeyStoreError::Corrupt {
                    path: path.clone(),
                    reason: e.to_string(),
                }
            })?;
            if record.status != expected {
                return Err(KeyStoreError::Inconsistent(format!(
                    "record {} has status {:?}, expected {:?}",
                    path.display(),
                    record.status,
                    expected
                )));
            }
            records.push(record);
        }
        Ok(records)
    }

    async fn record_names(&self, subdir: &str) -> KeyStoreResult<Vec<String>> {
        let dir = self.root.join(subdir);
        let mut names = Vec::new();
        let mut entries = fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if let Some(name) = entry.file_name().to_str() {
                if !name.ends_with(TMP_SUFFIX) {
                    names.push(name.to_string());
                }
            }
        }
        Ok(names)
    }
}

fn address_file_name(eki: &EnclaveKeyInfo) -> String {
    hex::encode(eki.enclave_key_address.as_slice())
}
