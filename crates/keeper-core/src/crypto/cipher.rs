//! Named AEAD cipher providers.
//!
//! Each provider seals a value with a fresh random 96-bit nonce and returns
//! `nonce || ciphertext` (the ciphertext carries the 16-byte tag). The
//! provider name is what gets persisted in the store's crypt id, so names are
//! part of the on-disk format and must never change.

use aes_gcm::Aes256Gcm;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::ChaCha20Poly1305;
use rand::rngs::OsRng;
use rand::RngCore;

use crate::crypto::key::DerivedKey;
use crate::error::{KeeperError, Result};

/// Nonce length shared by both providers.
pub const NONCE_LENGTH: usize = 12;

/// AEAD tag length shared by both providers.
pub const TAG_LENGTH: usize = 16;

/// A symmetric cipher selectable by name.
pub trait CipherProvider: Send + Sync {
    /// Stable identifier persisted in the crypt id.
    fn name(&self) -> &'static str;

    /// Encrypt `plaintext`, returning `nonce || ciphertext`.
    fn seal(&self, key: &DerivedKey, plaintext: &[u8]) -> Result<Vec<u8>>;

    /// Decrypt a blob produced by [`CipherProvider::seal`] with the same key.
    fn open(&self, key: &DerivedKey, sealed: &[u8]) -> Result<Vec<u8>>;
}

fn random_nonce() -> [u8; NONCE_LENGTH] {
    let mut nonce = [0u8; NONCE_LENGTH];
    OsRng.fill_bytes(&mut nonce);
    nonce
}

fn pack(nonce: &[u8; NONCE_LENGTH], ciphertext: Vec<u8>) -> Vec<u8> {
    let mut out = Vec::with_capacity(NONCE_LENGTH + ciphertext.len());
    out.extend_from_slice(nonce);
    out.extend_from_slice(&ciphertext);
    out
}

fn split(sealed: &[u8]) -> Result<(&[u8], &[u8])> {
    if sealed.len() < NONCE_LENGTH + TAG_LENGTH {
        return Err(KeeperError::Crypto("Ciphertext too short".to_string()));
    }
    Ok(sealed.split_at(NONCE_LENGTH))
}

/// AES-256 in Galois/Counter Mode.
#[derive(Debug, Default, Clone, Copy)]
pub struct Aes256GcmCipher;

impl CipherProvider for Aes256GcmCipher {
    fn name(&self) -> &'static str {
        "AES256-GCM"
    }

    fn seal(&self, key: &DerivedKey, plaintext: &[u8]) -> Result<Vec<u8>> {
        let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
            .map_err(|_| KeeperError::Crypto("Invalid AES key length".to_string()))?;
        let nonce = random_nonce();
        let ciphertext = cipher
            .encrypt(aes_gcm::Nonce::from_slice(&nonce), plaintext)
            .map_err(|_| KeeperError::Crypto("AES-GCM encryption failed".to_string()))?;
        Ok(pack(&nonce, ciphertext))
    }

    fn open(&self, key: &DerivedKey, sealed: &[u8]) -> Result<Vec<u8>> {
        let (nonce, ciphertext) = split(sealed)?;
        let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
            .map_err(|_| KeeperError::Crypto("Invalid AES key length".to_string()))?;
        cipher
            .decrypt(aes_gcm::Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| {
                KeeperError::Crypto("Decryption failed: wrong key or corrupted data".to_string())
            })
    }
}

/// ChaCha20 stream cipher with Poly1305 authenticator.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChaCha20Poly1305Cipher;

impl CipherProvider for ChaCha20Poly1305Cipher {
    fn name(&self) -> &'static str {
        "CHACHA20-POLY1305"
    }

    fn seal(&self, key: &DerivedKey, plaintext: &[u8]) -> Result<Vec<u8>> {
        let cipher = ChaCha20Poly1305::new_from_slice(key.as_bytes())
            .map_err(|_| KeeperError::Crypto("Invalid ChaCha20 key length".to_string()))?;
        let nonce = random_nonce();
        let ciphertext = cipher
            .encrypt(chacha20poly1305::Nonce::from_slice(&nonce), plaintext)
            .map_err(|_| KeeperError::Crypto("ChaCha20-Poly1305 encryption failed".to_string()))?;
        Ok(pack(&nonce, ciphertext))
    }

    fn open(&self, key: &DerivedKey, sealed: &[u8]) -> Result<Vec<u8>> {
        let (nonce, ciphertext) = split(sealed)?;
        let cipher = ChaCha20Poly1305::new_from_slice(key.as_bytes())
            .map_err(|_| KeeperError::Crypto("Invalid ChaCha20 key length".to_string()))?;
        cipher
            .decrypt(chacha20poly1305::Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| {
                KeeperError::Crypto("Decryption failed: wrong key or corrupted data".to_string())
            })
    }
}

/// The set of cipher providers a session can use, in preference order.
pub struct CipherRegistry {
    providers: Vec<Box<dyn CipherProvider>>,
}

impl CipherRegistry {
    /// An empty registry; add providers with [`CipherRegistry::register`].
    pub fn empty() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// Add a provider. A provider with the same name replaces the old one.
    pub fn register(mut self, provider: Box<dyn CipherProvider>) -> Self {
        self.providers.retain(|p| p.name() != provider.name());
        self.providers.push(provider);
        self
    }

    /// Look up a provider by name (exact match).
    pub fn get(&self, name: &str) -> Option<&dyn CipherProvider> {
        self.providers
            .iter()
            .find(|p| p.name() == name)
            .map(|p| p.as_ref())
    }

    /// Names of all registered providers.
    pub fn names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }
}

impl Default for CipherRegistry {
    fn default() -> Self {
        Self::empty()
            .register(Box::new(Aes256GcmCipher))
            .register(Box::new(ChaCha20Poly1305Cipher))
    }
}

impl std::fmt::Debug for CipherRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CipherRegistry")
            .field("providers", &self.names())
            .finish()
    }
}
