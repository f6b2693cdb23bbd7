//! Storage layer for Keeper.
//!
//! - [`sqlite`]: the transactional data access layer over a SQLite file
//! - [`types`]: items, fields and the request/response shapes around them
//!
//! The data access layer stores and returns ciphertext only; encryption is
//! applied by [`crate::StorageSession`] before values reach this layer.

pub mod sqlite;
pub mod types;

pub use sqlite::StorageDb;
pub use types::{
    CommonResponse, Field, FieldAdded, Item, ItemAdded, NewField, NewItem, Status, UpdateItem,
};
