//! The encryption gate.
//!
//! `Encryptor` tracks the store's crypt id (which cipher, which salt, which
//! KDF cost) and, once unlocked, the derived key. Every text value the
//! session persists goes through [`Encryptor::encrypt`]; every value it
//! returns goes through [`Encryptor::decrypt`]. Both refuse to run until the
//! gate is ready.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::crypto::cipher::{CipherProvider, CipherRegistry};
use crate::crypto::key::{derive_key, DerivedKey, KdfParams};
use crate::crypto::passphrase::validate_passphrase;
use crate::error::{KeeperError, Result};

/// Salt length for new stores.
pub const SALT_LENGTH: usize = 32;

/// Known plaintext sealed into every crypt id to verify a derived key.
const KEY_CHECK: &[u8] = b"keeper:key-check:v1";

/// Persisted description of a store's key material.
///
/// Stored as JSON in the `settings` table. Contains nothing secret: the key
/// check is a ciphertext of a constant under the store key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CryptId {
    /// Cipher provider name
    pub cipher: String,
    /// Base64 Argon2 salt
    pub salt: String,
    /// Argon2 cost parameters used at creation
    pub kdf: KdfParams,
    /// Base64 sealed key check
    pub check: String,
}

impl CryptId {
    /// Parse a persisted crypt id.
    pub fn parse(value: &str) -> Result<Self> {
        serde_json::from_str(value)
            .map_err(|e| KeeperError::Crypto(format!("Malformed crypt id: {}", e)))
    }

    /// Serialize for persistence.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    fn salt_bytes(&self) -> Result<Vec<u8>> {
        STANDARD
            .decode(&self.salt)
            .map_err(|e| KeeperError::Crypto(format!("Malformed crypt id salt: {}", e)))
    }

    fn check_bytes(&self) -> Result<Vec<u8>> {
        STANDARD
            .decode(&self.check)
            .map_err(|e| KeeperError::Crypto(format!("Malformed crypt id key check: {}", e)))
    }
}

/// Pluggable per-value encryption with explicit readiness.
#[derive(Debug)]
pub struct Encryptor {
    registry: CipherRegistry,
    crypt_id: Option<CryptId>,
    key: Option<DerivedKey>,
}

impl Default for Encryptor {
    fn default() -> Self {
        Self::new(CipherRegistry::default())
    }
}

impl Encryptor {
    /// A gate with no crypt id loaded.
    pub fn new(registry: CipherRegistry) -> Self {
        Self {
            registry,
            crypt_id: None,
            key: None,
        }
    }

    /// Load a persisted crypt id.
    ///
    /// Drops any previous key material. The gate is not ready until
    /// [`Encryptor::unlock`] succeeds.
    ///
    /// # Errors
    ///
    /// `KeeperError::UnsupportedCipher` when the cipher is not registered,
    /// `KeeperError::Crypto` when the document is malformed.
    pub fn init(&mut self, crypt_id: &str) -> Result<()> {
        self.clear();
        let parsed = CryptId::parse(crypt_id)?;
        if self.registry.get(&parsed.cipher).is_none() {
            return Err(KeeperError::UnsupportedCipher(parsed.cipher));
        }
        parsed.salt_bytes()?;
        parsed.check_bytes()?;
        self.crypt_id = Some(parsed);
        Ok(())
    }

    /// Derive the key for the loaded crypt id and verify it.
    ///
    /// # Errors
    ///
    /// `KeeperError::NotInitialized` when no crypt id is loaded and
    /// `KeeperError::IncorrectPassphrase` when the key check does not open.
    pub fn unlock(&mut self, passphrase: &str) -> Result<()> {
        let crypt_id = self
            .crypt_id
            .as_ref()
            .ok_or(KeeperError::NotInitialized("cipher"))?;
        let provider = self
            .registry
            .get(&crypt_id.cipher)
            .ok_or_else(|| KeeperError::UnsupportedCipher(crypt_id.cipher.clone()))?;

        let key = derive_key(passphrase, &crypt_id.salt_bytes()?, &crypt_id.kdf)?;
        match provider.open(&key, &crypt_id.check_bytes()?) {
            Ok(check) if check == KEY_CHECK => {
                self.key = Some(key);
                Ok(())
            }
            _ => Err(KeeperError::IncorrectPassphrase),
        }
    }

    /// Create key material for a new store and make the gate ready.
    ///
    /// Returns the crypt id JSON the caller must persist.
    pub fn create(&mut self, cipher_name: &str, passphrase: &str, kdf: KdfParams) -> Result<String> {
        validate_passphrase(passphrase)?;
        let provider = self
            .registry
            .get(cipher_name)
            .ok_or_else(|| KeeperError::UnsupportedCipher(cipher_name.to_string()))?;

        let mut salt = [0u8; SALT_LENGTH];
        OsRng.fill_bytes(&mut salt);
        let key = derive_key(passphrase, &salt, &kdf)?;
        let check = provider.seal(&key, KEY_CHECK)?;

        let crypt_id = CryptId {
            cipher: provider.name().to_string(),
            salt: STANDARD.encode(salt),
            kdf,
            check: STANDARD.encode(check),
        };
        let json = crypt_id.to_json()?;

        self.crypt_id = Some(crypt_id);
        self.key = Some(key);
        Ok(json)
    }

    /// True when a crypt id is loaded and its key is present.
    pub fn is_ready(&self) -> bool {
        self.crypt_id.is_some() && self.key.is_some()
    }

    /// Name of the cipher of the loaded crypt id, if any.
    pub fn cipher_name(&self) -> Option<&str> {
        self.crypt_id.as_ref().map(|id| id.cipher.as_str())
    }

    /// Names of every registered cipher, regardless of readiness.
    pub fn cipher_names(&self) -> Vec<String> {
        self.registry.names()
    }

    fn active(&self) -> Result<(&dyn CipherProvider, &DerivedKey)> {
        let (crypt_id, key) = match (&self.crypt_id, &self.key) {
            (Some(crypt_id), Some(key)) => (crypt_id, key),
            _ => return Err(KeeperError::NotInitialized("encryptor")),
        };
        let provider = self
            .registry
            .get(&crypt_id.cipher)
            .ok_or_else(|| KeeperError::UnsupportedCipher(crypt_id.cipher.clone()))?;
        Ok((provider, key))
    }

    /// Encrypt a text value to base64 `nonce || ciphertext`.
    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        let (provider, key) = self.active()?;
        let sealed = provider.seal(key, plaintext.as_bytes())?;
        Ok(STANDARD.encode(sealed))
    }

    /// Decrypt a value produced by [`Encryptor::encrypt`].
    pub fn decrypt(&self, ciphertext: &str) -> Result<String> {
        let (provider, key) = self.active()?;
        let sealed = STANDARD
            .decode(ciphertext)
            .map_err(|e| KeeperError::Crypto(format!("Ciphertext is not base64: {}", e)))?;
        let plaintext = provider.open(key, &sealed)?;
        String::from_utf8(plaintext)
            .map_err(|e| KeeperError::Crypto(format!("Decrypted value is not UTF-8: {}", e)))
    }

    /// Drop the key but keep the crypt id, so the gate can be unlocked again.
    pub fn lock(&mut self) {
        self.key = None;
    }

    /// Drop both key and crypt id.
    pub fn clear(&mut self) {
        self.key = None;
        self.crypt_id = None;
    }
}
