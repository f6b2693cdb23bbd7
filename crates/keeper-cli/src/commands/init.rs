use std::path::PathBuf;

use crate::app::AppContext;
use crate::cli::InitArgs;
use crate::config::{write_config, KeeperConfig};
use crate::helpers::{is_interactive, prompt_init_passphrase};

pub fn handle_init(ctx: &AppContext, args: &InitArgs) -> anyhow::Result<()> {
    let target = match &args.path {
        Some(path) => PathBuf::from(path),
        None => ctx.store_path()?,
    };
    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            anyhow::anyhow!("Failed to create directory {}: {}", parent.display(), e)
        })?;
    }

    let session = ctx.session();
    session.open(&target)?;
    if !session.is_new() {
        return Err(anyhow::anyhow!(
            "A store already exists at {}",
            target.display()
        ));
    }

    let cipher = args
        .cipher
        .clone()
        .unwrap_or_else(|| ctx.config().session.default_cipher.clone());
    let passphrase = prompt_init_passphrase(is_interactive())?;
    session.initialize_cipher(&cipher, &passphrase)?;
    session.close()?;

    if !ctx.config_path().exists() {
        write_config(ctx.config_path(), &KeeperConfig::with_store_path(&target))?;
    }

    if !ctx.quiet() {
        println!("Initialized new store at {} ({})", target.display(), cipher);
    }
    Ok(())
}
