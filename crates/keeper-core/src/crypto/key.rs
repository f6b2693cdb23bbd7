//! Key derivation using Argon2id.
//!
//! The store key is derived from the passphrase and a per-store salt. The
//! Argon2 cost parameters are persisted with the salt so a store opened later
//! always re-derives with the parameters it was created with.

use argon2::Argon2;
use serde::{Deserialize, Serialize};
use zeroize::ZeroizeOnDrop;

use crate::error::{KeeperError, Result};

/// Length of derived key in bytes (256-bit AEAD keys).
pub const KEY_LENGTH: usize = 32;

/// Minimum salt length accepted by [`derive_key`].
pub const MIN_SALT_LENGTH: usize = 16;

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KdfParams {
    /// Memory cost in KiB
    pub memory_kib: u32,
    /// Number of passes
    pub iterations: u32,
    /// Degree of parallelism
    pub parallelism: u32,
}

impl Default for KdfParams {
    /// 64 MiB, 3 passes, single lane.
    fn default() -> Self {
        Self {
            memory_kib: 64 * 1024,
            iterations: 3,
            parallelism: 1,
        }
    }
}

impl KdfParams {
    /// Minimal parameters for tests and throwaway stores.
    pub fn insecure_fast() -> Self {
        Self {
            memory_kib: argon2::Params::MIN_M_COST,
            iterations: 1,
            parallelism: 1,
        }
    }
}

/// A cryptographic key derived from a passphrase.
///
/// Key bytes are zeroized when the value is dropped.
#[derive(Clone, ZeroizeOnDrop)]
pub struct DerivedKey {
    key: [u8; KEY_LENGTH],
}

impl DerivedKey {
    pub(crate) fn from_bytes(bytes: [u8; KEY_LENGTH]) -> Self {
        Self { key: bytes }
    }

    /// Raw key bytes. Never log or persist these.
    pub fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.key
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKey")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Derive an encryption key from a passphrase using Argon2id.
///
/// Same passphrase, salt and parameters always produce the same key.
///
/// # Errors
///
/// Returns `KeeperError::InvalidInput` for an empty passphrase or a salt
/// shorter than [`MIN_SALT_LENGTH`], and `KeeperError::Crypto` if Argon2
/// rejects the parameters.
pub fn derive_key(passphrase: &str, salt: &[u8], params: &KdfParams) -> Result<DerivedKey> {
    if passphrase.is_empty() {
        return Err(KeeperError::InvalidInput(
            "Passphrase cannot be empty".to_string(),
        ));
    }

    if salt.len() < MIN_SALT_LENGTH {
        return Err(KeeperError::InvalidInput(format!(
            "Salt must be at least {} bytes",
            MIN_SALT_LENGTH
        )));
    }

    let argon_params = argon2::Params::new(
        params.memory_kib,
        params.iterations,
        params.parallelism,
        Some(KEY_LENGTH),
    )
    .map_err(|e| KeeperError::Crypto(format!("Failed to create Argon2 params: {}", e)))?;

    let argon2 = Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2::Version::V0x13,
        argon_params,
    );

    let mut key_bytes = [0u8; KEY_LENGTH];
    argon2
        .hash_password_into(passphrase.as_bytes(), salt, &mut key_bytes)
        .map_err(|e| KeeperError::Crypto(format!("Key derivation failed: {}", e)))?;

    Ok(DerivedKey::from_bytes(key_bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SALT: &[u8] = b"unique-salt-1234567890123456";

    #[test]
    fn test_key_derivation_deterministic() {
        let params = KdfParams::insecure_fast();
        let key1 = derive_key("test-passphrase", SALT, &params).unwrap();
        let key2 = derive_key("test-passphrase", SALT, &params).unwrap();
        assert_eq!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_different_salt_different_key() {
        let params = KdfParams::insecure_fast();
        let key1 = derive_key("test-passphrase", b"salt1-1234567890123456", &params).unwrap();
        let key2 = derive_key("test-passphrase", b"salt2-1234567890123456", &params).unwrap();
        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_different_params_different_key() {
        let fast = KdfParams::insecure_fast();
        let slower = KdfParams {
            iterations: 2,
            ..fast
        };
        let key1 = derive_key("test-passphrase", SALT, &fast).unwrap();
        let key2 = derive_key("test-passphrase", SALT, &slower).unwrap();
        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_empty_passphrase_rejected() {
        let result = derive_key("", SALT, &KdfParams::insecure_fast());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Passphrase cannot be empty"));
    }

    #[test]
    fn test_short_salt_rejected() {
        let result = derive_key("test-passphrase", b"short", &KdfParams::insecure_fast());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Salt must be at least 16 bytes"));
    }

    #[test]
    fn test_derived_key_debug_redacts() {
        let key = derive_key("test-passphrase", SALT, &KdfParams::insecure_fast()).unwrap();
        let debug_output = format!("{:?}", key);
        assert!(debug_output.contains("REDACTED"));
        let key_hex = hex::encode(&key.as_bytes()[..4]);
        assert!(!debug_output.contains(&key_hex));
    }
}
