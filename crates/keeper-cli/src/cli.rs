use clap::{Args, Parser, Subcommand};

use keeper_core::VERSION;

/// Keeper - an encrypted item store for credentials, cards and notes
#[derive(Parser)]
#[command(name = "keeper")]
#[command(author, version = VERSION, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the store file
    #[arg(short, long, global = true, env = "KEEPER_STORE")]
    pub store: Option<String>,

    #[command(subcommand)]
    pub command: Commands,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create and initialize a new encrypted store
    Init(InitArgs),

    /// Add a new item
    Add(AddArgs),

    /// Add a field to an item
    Field(FieldArgs),

    /// List items
    List(ListArgs),

    /// Show one item with its fields
    Show(ShowArgs),

    /// Rename an item
    Rename {
        /// Item ID
        #[arg(value_name = "ID")]
        id: i64,

        /// New name
        #[arg(value_name = "NAME")]
        name: String,
    },

    /// Change an item's icon
    Icon {
        /// Item ID
        #[arg(value_name = "ID")]
        id: i64,

        /// New icon identifier
        #[arg(value_name = "ICON")]
        icon: String,
    },

    /// Soft-delete an item and its fields
    Delete {
        /// Item ID
        #[arg(value_name = "ID")]
        id: i64,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// List supported ciphers
    Ciphers,

    /// Show store status without unlocking it
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write an encrypted backup of the store
    Backup {
        /// Destination file
        #[arg(value_name = "DEST")]
        destination: String,
    },

    /// Restore a backup into the store path
    Restore {
        /// Backup file
        #[arg(value_name = "SRC")]
        source: String,

        /// Replace an existing store
        #[arg(long)]
        force: bool,
    },
}

/// Arguments for the `init` command
#[derive(Args)]
pub struct InitArgs {
    /// Path where the store will be created
    #[arg(value_name = "PATH")]
    pub path: Option<String>,

    /// Cipher to encrypt values with (see `keeper ciphers`)
    #[arg(long)]
    pub cipher: Option<String>,
}

/// Arguments for the `add` command
#[derive(Args)]
pub struct AddArgs {
    /// Item name
    #[arg(value_name = "NAME")]
    pub name: String,

    /// Icon identifier
    #[arg(short, long, default_value = "fa-key")]
    pub icon: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `field` command
#[derive(Args)]
pub struct FieldArgs {
    /// Item ID the field belongs to
    #[arg(value_name = "ID")]
    pub item_id: i64,

    /// Field name
    #[arg(value_name = "NAME")]
    pub name: String,

    /// Value type (text, password, email, url, phone, number, date, note, otp)
    #[arg(short = 't', long = "type", default_value = "text")]
    pub value_type: String,

    /// Icon identifier
    #[arg(short, long, default_value = "fa-key")]
    pub icon: String,

    /// Field value (prompted or read from stdin when omitted)
    #[arg(long)]
    pub value: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `list` command
#[derive(Args)]
pub struct ListArgs {
    /// Include deleted items
    #[arg(long)]
    pub all: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `show` command
#[derive(Args)]
pub struct ShowArgs {
    /// Item ID
    #[arg(value_name = "ID")]
    pub id: i64,

    /// Print secret field values instead of masking them
    #[arg(long)]
    pub reveal: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}
