//! # Keeper Core
//!
//! Core library for Keeper - an embedded, encrypted item store for a
//! credential manager.
//!
//! Items (a bank login, a card, a note) and their fields live in a single
//! SQLite file. Every name, icon and value is encrypted before it reaches the
//! file, with a key derived from the user's passphrase.
//!
//! ## Architecture
//!
//! - **session**: open/locked state machine and the item/field operations
//! - **storage**: transactional data access layer and data types
//! - **crypto**: key derivation, value ciphers, the encryption gate, backups
//! - **validation**: input checks run before any I/O
//! - **catalog**: icon and value-type lookup tables
//! - **config**: session tunables

pub mod catalog;
pub mod config;
pub mod crypto;
pub mod error;
pub mod fs;
pub mod session;
pub mod storage;
pub mod validation;

pub use catalog::{BuiltinIcons, IconCatalog, ValueType};
pub use config::SessionConfig;
pub use crypto::{Encryptor, KdfParams};
pub use error::{KeeperError, Result};
pub use session::StorageSession;
pub use storage::types::{
    CommonResponse, Field, FieldAdded, Item, ItemAdded, NewField, NewItem, Status, UpdateItem,
};

/// Core version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_session_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<StorageSession>();
    }
}
