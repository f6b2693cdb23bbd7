//! Session configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::crypto::KdfParams;

/// Tunables for a [`crate::StorageSession`].
///
/// Deserializes from any serde format; missing keys take the defaults, so an
/// empty `[session]` table is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Cipher used by `initialize_cipher` when the caller does not name one
    pub default_cipher: String,

    /// How long SQLite waits on a locked database file
    pub busy_timeout_ms: u64,

    /// Argon2id cost for newly created stores
    pub kdf: KdfParams,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_cipher: "AES256-GCM".to_string(),
            busy_timeout_ms: 5_000,
            kdf: KdfParams::default(),
        }
    }
}

impl SessionConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// Builder method to override the KDF cost.
    pub fn with_kdf(mut self, kdf: KdfParams) -> Self {
        self.kdf = kdf;
        self
    }

    /// Builder method to override the default cipher.
    pub fn with_default_cipher(mut self, cipher: impl Into<String>) -> Self {
        self.default_cipher = cipher.into();
        self
    }
}
