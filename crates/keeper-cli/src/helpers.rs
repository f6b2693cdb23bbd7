use std::io::{self, IsTerminal, Read};

use dialoguer::{Input, Password};
use keeper_core::ValueType;

/// Prompt for the store passphrase, or read it from KEEPER_PASSPHRASE.
pub fn prompt_passphrase(interactive: bool) -> anyhow::Result<String> {
    if let Some(value) = env_value("KEEPER_PASSPHRASE") {
        return Ok(value);
    }
    if !interactive {
        return Err(anyhow::anyhow!(
            "No passphrase provided and no TTY available. Set KEEPER_PASSPHRASE."
        ));
    }
    Password::new()
        .with_prompt("Passphrase")
        .interact()
        .map_err(|e| anyhow::anyhow!("Failed to read passphrase: {}", e))
}

/// Prompt for a new store passphrase with confirmation, or read it from
/// KEEPER_PASSPHRASE.
pub fn prompt_init_passphrase(interactive: bool) -> anyhow::Result<String> {
    if let Some(value) = env_value("KEEPER_PASSPHRASE") {
        return Ok(value);
    }
    if !interactive {
        return Err(anyhow::anyhow!(
            "No passphrase provided and no TTY available. Set KEEPER_PASSPHRASE."
        ));
    }
    Password::new()
        .with_prompt("Enter passphrase")
        .with_confirmation("Confirm passphrase", "Passphrases do not match")
        .interact()
        .map_err(|e| anyhow::anyhow!("Failed to read passphrase: {}", e))
}

/// Backup passphrase from KEEPER_BACKUP_PASSPHRASE, or a confirmed prompt.
pub fn prompt_backup_passphrase(interactive: bool, confirm: bool) -> anyhow::Result<String> {
    if let Some(value) = env_value("KEEPER_BACKUP_PASSPHRASE") {
        return Ok(value);
    }
    if !interactive {
        return Err(anyhow::anyhow!(
            "No backup passphrase provided and no TTY available. Set KEEPER_BACKUP_PASSPHRASE."
        ));
    }
    let mut prompt = Password::new().with_prompt("Backup passphrase");
    if confirm {
        prompt = prompt.with_confirmation("Confirm backup passphrase", "Passphrases do not match");
    }
    prompt
        .interact()
        .map_err(|e| anyhow::anyhow!("Failed to read passphrase: {}", e))
}

/// Resolve a field value: the flag, then a prompt on a TTY, then stdin.
pub fn read_field_value(
    value: Option<String>,
    value_type: &str,
    interactive: bool,
) -> anyhow::Result<String> {
    if let Some(value) = value {
        return Ok(value);
    }
    if interactive {
        let secret = value_type
            .parse::<ValueType>()
            .map(is_secret)
            .unwrap_or(false);
        let read = if secret {
            Password::new().with_prompt("Value").interact()
        } else {
            Input::<String>::new()
                .with_prompt("Value")
                .allow_empty(true)
                .interact_text()
        };
        return read.map_err(|e| anyhow::anyhow!("Failed to read value: {}", e));
    }

    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .map_err(|e| anyhow::anyhow!("Failed to read value from stdin: {}", e))?;
    Ok(buffer.trim_end_matches(['\r', '\n']).to_string())
}

/// True when stdin is a terminal.
pub fn is_interactive() -> bool {
    io::stdin().is_terminal()
}

/// Value types masked in human-readable output.
pub fn is_secret(value_type: ValueType) -> bool {
    matches!(value_type, ValueType::Password | ValueType::Otp)
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_value_wins() {
        let value = read_field_value(Some("alice".to_string()), "text", false).unwrap();
        assert_eq!(value, "alice");
    }

    #[test]
    fn test_secret_types() {
        assert!(is_secret(ValueType::Password));
        assert!(is_secret(ValueType::Otp));
        assert!(!is_secret(ValueType::Email));
    }
}
