use std::path::Path;

use keeper_core::StorageSession;

use crate::app::AppContext;
use crate::helpers::{is_interactive, prompt_backup_passphrase};
use crate::output::format_timestamp;

pub fn handle_ciphers(ctx: &AppContext) -> anyhow::Result<()> {
    let default = &ctx.config().session.default_cipher;
    for name in ctx.session().available_ciphers() {
        if !ctx.quiet() && &name == default {
            println!("{} (default)", name);
        } else {
            println!("{}", name);
        }
    }
    Ok(())
}

pub fn handle_status(ctx: &AppContext, json: bool) -> anyhow::Result<()> {
    let path = ctx.store_path()?;
    let session = ctx.session();
    let exists = path.exists();
    if exists {
        // An unsupported cipher still leaves the store open; report it below.
        if let Err(err) = session.open(&path) {
            if session.db_version() < 0 {
                return Err(err.into());
            }
            eprintln!("Warning: {}", err);
        }
    }

    let version = session.db_version();
    let initialized = session.is_active();
    let cipher = session.cipher_name();
    let locked = session.is_locked();
    session.close()?;

    if json {
        let status = serde_json::json!({
            "path": path,
            "exists": exists,
            "version": version,
            "initialized": initialized,
            "cipher": cipher,
            "locked": locked,
            "config": ctx.config_path(),
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }
    println!("Store: {}", path.display());
    if !exists {
        println!("State: missing");
        return Ok(());
    }
    println!("State: {}", if initialized { "initialized" } else { "new" });
    println!("Schema version: {}", version);
    if let Some(cipher) = cipher {
        println!("Cipher: {}", cipher);
    }
    println!("Config: {}", ctx.config_path().display());
    Ok(())
}

pub fn handle_backup(ctx: &AppContext, destination: &str) -> anyhow::Result<()> {
    let session = ctx.open_unlocked()?;
    let passphrase = prompt_backup_passphrase(is_interactive(), true)?;
    let destination = Path::new(destination);
    session.backup_to(destination, &passphrase)?;
    let finished = session.last_access();
    session.close()?;

    if !ctx.quiet() {
        match finished {
            Some(at) => println!(
                "Backed up store to {} at {}",
                destination.display(),
                format_timestamp(&at)
            ),
            None => println!("Backed up store to {}", destination.display()),
        }
    }
    Ok(())
}

pub fn handle_restore(ctx: &AppContext, source: &str, force: bool) -> anyhow::Result<()> {
    let source = Path::new(source);
    if !source.exists() {
        return Err(anyhow::anyhow!("No backup found at {}", source.display()));
    }
    let target = ctx.store_path()?;
    if target.exists() && !force {
        return Err(anyhow::anyhow!(
            "A store already exists at {}; pass --force to replace it",
            target.display()
        ));
    }
    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let passphrase = prompt_backup_passphrase(is_interactive(), false)?;
    StorageSession::restore_backup(source, &target, &passphrase)?;

    if !ctx.quiet() {
        println!("Restored {} to {}", source.display(), target.display());
    }
    Ok(())
}
