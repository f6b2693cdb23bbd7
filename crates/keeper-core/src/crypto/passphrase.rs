//! Passphrase validation.

use crate::error::{KeeperError, Result};

/// Minimum passphrase length in characters.
pub const MIN_PASSPHRASE_LENGTH: usize = 8;

/// Validate a passphrase before it is used to create key material.
///
/// Blank passphrases and passphrases shorter than
/// [`MIN_PASSPHRASE_LENGTH`] characters are rejected with
/// `KeeperError::InvalidInput`. Existing stores are unlocked without this
/// check so that a policy change never locks a user out.
pub fn validate_passphrase(passphrase: &str) -> Result<()> {
    if passphrase.trim().is_empty() {
        return Err(KeeperError::InvalidInput(
            "Passphrase cannot be empty".to_string(),
        ));
    }

    let length = passphrase.chars().count();
    if length < MIN_PASSPHRASE_LENGTH {
        return Err(KeeperError::InvalidInput(format!(
            "Passphrase must be at least {} characters (got {})",
            MIN_PASSPHRASE_LENGTH, length
        )));
    }

    Ok(())
}
