//! Backup envelopes.
//!
//! A backup is a complete SQLite image of the store wrapped in an Age
//! passphrase envelope (scrypt inside Age). Values inside the image are
//! still sealed with the store cipher; the envelope additionally hides the
//! schema, row counts and timestamps. Both directions check that the payload
//! really is a SQLite image, so a restore can never write anything else over
//! a store file.

use std::io::{self, Write};
use std::iter;

use age::secrecy::SecretString;

use crate::error::{KeeperError, Result};

/// Magic bytes at the start of every SQLite database file.
pub const SQLITE_HEADER: &[u8] = b"SQLite format 3\0";

/// Wrap a store image for `passphrase`.
pub fn seal_image(image: &[u8], passphrase: &str) -> Result<Vec<u8>> {
    check_image(image)?;

    let recipient = age::Encryptor::with_user_passphrase(secret(passphrase));
    let mut sealed = Vec::with_capacity(image.len() + 512);
    let mut writer = recipient
        .wrap_output(&mut sealed)
        .map_err(|e| crypto("wrap backup", e))?;
    writer
        .write_all(image)
        .map_err(|e| crypto("write backup", e))?;
    writer.finish().map_err(|e| crypto("finish backup", e))?;
    Ok(sealed)
}

/// Unwrap a backup made by [`seal_image`] and return the store image.
///
/// # Errors
///
/// `IncorrectPassphrase` when the envelope does not open with `passphrase`,
/// `Crypto` for anything that is not a Keeper backup.
pub fn open_image(sealed: &[u8], passphrase: &str) -> Result<Vec<u8>> {
    let decryptor = age::Decryptor::new(sealed).map_err(|e| crypto("read backup header", e))?;
    let identity = age::scrypt::Identity::new(secret(passphrase));
    let mut reader = decryptor
        .decrypt(iter::once(&identity as &dyn age::Identity))
        .map_err(|e| match e {
            age::DecryptError::NoMatchingKeys
            | age::DecryptError::DecryptionFailed
            | age::DecryptError::KeyDecryptionFailed => KeeperError::IncorrectPassphrase,
            other => crypto("unlock backup", other),
        })?;

    let mut image = Vec::with_capacity(sealed.len());
    io::copy(&mut reader, &mut image).map_err(|e| crypto("read backup", e))?;
    check_image(&image)?;
    Ok(image)
}

fn check_image(image: &[u8]) -> Result<()> {
    if image.starts_with(SQLITE_HEADER) {
        Ok(())
    } else {
        Err(KeeperError::Crypto(
            "Backup does not contain a SQLite store".to_string(),
        ))
    }
}

fn secret(passphrase: &str) -> SecretString {
    SecretString::from(passphrase.to_string())
}

fn crypto(step: &str, err: impl std::fmt::Display) -> KeeperError {
    KeeperError::Crypto(format!("Failed to {}: {}", step, err))
}
