//! Error types for enclave key store operations

use std::path::PathBuf;

use thiserror::Error;

/// Result type for key store operations
pub type KeyStoreResult<T> = Result<T, KeyStoreError>;

/// Errors that can occur during key store operations
#[derive(Error, Debug)]
pub enum KeyStoreError {
    /// Filesystem operation failed
    #[error("Key store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// No record of the requested kind exists
    #[error("No enclave key record found")]
    NotFound,

    /// A second unfinalized record was about to be created
    #[error("An unfinalized enclave key record already exists: {existing}")]
    UnfinalizedKeyExists {
        /// Address of the record already in flight
        existing: String,
    },

    /// The on-disk state violates a store invariant
    #[error("Key store state inconsistent: {0}")]
    Inconsistent(String),

    /// A record file could not be decoded
    #[error("Failed to decode key record {path}: {reason}")]
    Corrupt {
        /// The offending record file
        path: PathBuf,
        /// Decode failure detail
        reason: String,
    },
}
