//! Command handlers, one function per subcommand.

mod init;
mod items;
mod maintenance;

pub use init::handle_init;
pub use items::{
    handle_add, handle_delete, handle_field, handle_icon, handle_list, handle_rename, handle_show,
};
pub use maintenance::{handle_backup, handle_ciphers, handle_restore, handle_status};
