//! Keeper CLI - an encrypted item store for credentials, cards and notes
//!
//! This is the command-line interface for Keeper. It resolves the store and
//! config paths, installs logging and hands each subcommand to its handler.

mod app;
mod cli;
mod commands;
mod config;
mod helpers;
mod logging;
mod output;

use clap::Parser;

use crate::app::AppContext;
use crate::cli::{Cli, Commands};
use crate::config::{load_config, resolve_config_path};
use crate::logging::init_logging;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = resolve_config_path()?;
    let config = load_config(&config_path)?;
    init_logging(&config.log.level, config.log.format);

    let ctx = AppContext::new(&cli, config, config_path);
    match &cli.command {
        Commands::Init(args) => commands::handle_init(&ctx, args),
        Commands::Add(args) => commands::handle_add(&ctx, args),
        Commands::Field(args) => commands::handle_field(&ctx, args),
        Commands::List(args) => commands::handle_list(&ctx, args),
        Commands::Show(args) => commands::handle_show(&ctx, args),
        Commands::Rename { id, name } => commands::handle_rename(&ctx, *id, name),
        Commands::Icon { id, icon } => commands::handle_icon(&ctx, *id, icon),
        Commands::Delete { id, yes } => commands::handle_delete(&ctx, *id, *yes),
        Commands::Ciphers => commands::handle_ciphers(&ctx),
        Commands::Status { json } => commands::handle_status(&ctx, *json),
        Commands::Backup { destination } => commands::handle_backup(&ctx, destination),
        Commands::Restore { source, force } => commands::handle_restore(&ctx, source, *force),
    }
}
