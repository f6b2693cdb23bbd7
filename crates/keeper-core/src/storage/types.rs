//! Core data types for the storage layer.
//!
//! `Item` and `Field` are what callers see after decryption. The `New*` and
//! `Update*` types are request shapes; the `*Added` / `CommonResponse` types
//! are result shapes. All derive serde so an API layer can pass them through
//! unchanged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::ValueType;

/// An item (a credential, a card, a note...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Store-assigned identifier, never reused
    pub id: i64,

    /// Display name (plaintext after decryption)
    pub name: String,

    /// Icon identifier (plaintext after decryption)
    pub icon: String,

    /// When this item was created
    pub created: DateTime<Utc>,

    /// Last mutation of this item or its fields
    pub updated: DateTime<Utc>,

    /// Soft-delete flag
    pub deleted: bool,

    /// Fields, populated only when the item is read individually
    #[serde(default)]
    pub fields: Vec<Field>,
}

/// A field belonging to an item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub id: i64,
    pub item_id: i64,
    pub name: String,
    pub icon: String,
    pub value_type: ValueType,
    pub value: String,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub deleted: bool,
}

/// Request to create an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewItem {
    pub name: String,
    pub icon: String,
}

impl NewItem {
    pub fn new(name: impl Into<String>, icon: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            icon: icon.into(),
        }
    }
}

/// Request to create a field.
///
/// `value_type` is the textual name so that unknown types reach the
/// validator instead of failing deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewField {
    pub name: String,
    pub icon: String,
    pub value_type: String,
    #[serde(default)]
    pub value: String,
}

impl NewField {
    pub fn new(
        name: impl Into<String>,
        icon: impl Into<String>,
        value_type: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            icon: icon.into(),
            value_type: value_type.into(),
            value: value.into(),
        }
    }
}

/// Request to change an item's name and/or icon.
///
/// `None` or an empty string leaves that attribute unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UpdateItem {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
}

impl UpdateItem {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    /// Builder method to set the new name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Builder method to set the new icon.
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    /// The new name, if one was supplied and is non-empty.
    pub fn new_name(&self) -> Option<&str> {
        self.name.as_deref().filter(|name| !name.is_empty())
    }

    /// The new icon, if one was supplied and is non-empty.
    pub fn new_icon(&self) -> Option<&str> {
        self.icon.as_deref().filter(|icon| !icon.is_empty())
    }
}

/// Outcome marker returned by every successful mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
}

/// Result of a mutation that returns no payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommonResponse {
    pub status: Status,
}

impl CommonResponse {
    pub fn success() -> Self {
        Self {
            status: Status::Success,
        }
    }
}

/// Result of [`crate::StorageSession::add_new_item`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemAdded {
    pub item_id: i64,
    pub status: Status,
}

/// Result of [`crate::StorageSession::add_new_field`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldAdded {
    pub field_id: i64,
    pub status: Status,
}
