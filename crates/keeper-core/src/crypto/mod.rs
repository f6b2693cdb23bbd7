//! Cryptographic services for Keeper.
//!
//! - **Argon2id** derives the store key from the passphrase
//! - **AES-256-GCM / ChaCha20-Poly1305** encrypt individual values
//! - **Age** seals whole-store backups
//!
//! The [`Encryptor`] is the gate the session consults before any value is
//! written or returned. Key material is zeroized when dropped.
//!
//! ## Threat Model
//!
//! We defend against:
//! - Theft of the store file or a backup
//! - Offline brute-force attacks on the passphrase
//!
//! We do NOT defend against:
//! - Compromised OS / keylogger
//! - Access to an unlocked session / memory

pub mod cipher;
pub mod envelope;
pub mod gate;
pub mod key;
pub mod passphrase;

pub use cipher::{Aes256GcmCipher, ChaCha20Poly1305Cipher, CipherProvider, CipherRegistry};
pub use gate::{CryptId, Encryptor};
pub use key::{derive_key, DerivedKey, KdfParams};
pub use passphrase::validate_passphrase;
