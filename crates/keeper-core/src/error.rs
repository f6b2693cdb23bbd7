//! Error types for Keeper core operations.
//!
//! Every failure a caller can observe is a distinct variant so that callers
//! branch on the kind rather than on message text. Variants that wrap a
//! statement failure carry the name of the operation that issued it.

use thiserror::Error;

/// Result type alias for Keeper operations.
pub type Result<T> = std::result::Result<T, KeeperError>;

/// Core error type for Keeper operations.
#[derive(Debug, Error)]
pub enum KeeperError {
    /// A component the operation depends on is not ready (encryptor, database, cipher)
    #[error("{0} is not initialized")]
    NotInitialized(&'static str),

    /// The store has not been opened
    #[error("Storage is not open")]
    NotOpen,

    /// Cipher initialization attempted on a store that already has one
    #[error("Storage is already initialized")]
    AlreadyInitialized,

    /// BEGIN failed
    #[error("Failed to start transaction: {source}")]
    TransactionStart { source: rusqlite::Error },

    /// A transaction is already in progress on this connection
    #[error("A transaction is already active")]
    TransactionActive,

    /// A write was issued outside of a transaction
    #[error("No active transaction for {0}")]
    NoActiveTransaction(&'static str),

    /// COMMIT failed
    #[error("Failed to commit transaction: {source}")]
    Commit { source: rusqlite::Error },

    /// ROLLBACK failed
    #[error("Failed to roll back transaction: {source}")]
    Rollback { source: rusqlite::Error },

    /// A statement failed and the rollback that followed failed too
    #[error("{operation} failed: {source}; rollback also failed: {rollback}")]
    RollbackFailed {
        operation: &'static str,
        source: Box<KeeperError>,
        rollback: Box<KeeperError>,
    },

    /// Insert statement failed
    #[error("{operation}: insert failed: {source}")]
    Insert {
        operation: &'static str,
        source: rusqlite::Error,
    },

    /// Soft-delete statement failed
    #[error("{operation}: delete failed: {source}")]
    Delete {
        operation: &'static str,
        source: rusqlite::Error,
    },

    /// Update statement failed
    #[error("{operation}: update failed: {source}")]
    Update {
        operation: &'static str,
        source: rusqlite::Error,
    },

    /// Select statement or row decoding failed
    #[error("{operation}: read failed: {reason}")]
    Read {
        operation: &'static str,
        reason: String,
    },

    /// No live item with this id
    #[error("Item not found: {0}")]
    ItemNotFound(i64),

    /// Input rejected before any I/O
    #[error("Validation error: {0}")]
    Validation(String),

    /// Icon is not part of the icon catalog
    #[error("Icon not found: {0}")]
    IconNotFound(String),

    /// Item id is zero or negative
    #[error("Item id is empty or invalid: {0}")]
    InvalidItemId(i64),

    /// Key check did not verify against the derived key
    #[error("Incorrect passphrase")]
    IncorrectPassphrase,

    /// Cipher name is not in the registry
    #[error("Unsupported cipher: {0}")]
    UnsupportedCipher(String),

    /// Encryption or decryption error
    #[error("Encryption error: {0}")]
    Crypto(String),

    /// Invalid caller input outside item/field validation (passphrases, paths)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Storage backend error (generic)
    #[error("Storage error: {0}")]
    Storage(String),

    /// SQLite-specific storage error
    #[error("SQLite error: {source}")]
    Sqlite {
        #[from]
        source: rusqlite::Error,
    },

    /// I/O error
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error
    #[error("JSON error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },
}

impl KeeperError {
    /// True for errors raised by the readiness gate.
    pub fn is_readiness(&self) -> bool {
        matches!(self, KeeperError::NotInitialized(_))
    }

    pub(crate) fn read(operation: &'static str, err: impl std::fmt::Display) -> Self {
        KeeperError::Read {
            operation,
            reason: err.to_string(),
        }
    }
}
