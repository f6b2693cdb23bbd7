//! Application context for the Keeper CLI.
//!
//! Bundles the parsed arguments with the loaded config so handlers do not
//! re-resolve paths or re-read the config file.

use std::path::{Path, PathBuf};

use keeper_core::StorageSession;

use crate::cli::Cli;
use crate::config::{default_store_path, KeeperConfig};
use crate::helpers::{is_interactive, prompt_passphrase};

pub struct AppContext<'a> {
    cli: &'a Cli,
    config: KeeperConfig,
    config_path: PathBuf,
}

impl<'a> AppContext<'a> {
    pub fn new(cli: &'a Cli, config: KeeperConfig, config_path: PathBuf) -> Self {
        Self {
            cli,
            config,
            config_path,
        }
    }

    pub fn quiet(&self) -> bool {
        self.cli.quiet
    }

    pub fn config(&self) -> &KeeperConfig {
        &self.config
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Store path: `--store` / KEEPER_STORE, then the config file, then the
    /// XDG data directory.
    pub fn store_path(&self) -> anyhow::Result<PathBuf> {
        if let Some(path) = &self.cli.store {
            return Ok(PathBuf::from(path));
        }
        if let Some(path) = &self.config.store.path {
            return Ok(PathBuf::from(path));
        }
        default_store_path()
    }

    /// A closed session built from the `[session]` config.
    pub fn session(&self) -> StorageSession {
        StorageSession::new(self.config.session.clone())
    }

    /// Open the store without unlocking it.
    pub fn open_locked(&self) -> anyhow::Result<(StorageSession, PathBuf)> {
        let path = self.store_path()?;
        if !path.exists() {
            return Err(anyhow::anyhow!(missing_store_message(&path)));
        }
        tracing::debug!(path = %path.display(), "opening store");
        let session = self.session();
        session.open(&path)?;
        if session.is_new() {
            return Err(anyhow::anyhow!(
                "Store at {} is not initialized\n\nRun:\n  keeper init {}",
                path.display(),
                path.display()
            ));
        }
        Ok((session, path))
    }

    /// Open and unlock the store.
    pub fn open_unlocked(&self) -> anyhow::Result<StorageSession> {
        let (session, _) = self.open_locked()?;
        let passphrase = prompt_passphrase(is_interactive())?;
        session.unlock(&passphrase)?;
        Ok(session)
    }
}

/// Error message when the store file is missing.
pub fn missing_store_message(path: &Path) -> String {
    format!(
        "No store found at {}\n\nRun:\n  keeper init\n\nOr specify a store path:\n  KEEPER_STORE=/path/to/keeper.db keeper init",
        path.display()
    )
}
