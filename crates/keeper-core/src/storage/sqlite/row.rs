//! Row types for database queries.
//!
//! Rows carry the stored text as-is; text columns that hold encrypted values
//! are still ciphertext after conversion and are decrypted by the session.

use chrono::{DateTime, Utc};

use crate::catalog::ValueType;
use crate::error::{KeeperError, Result};
use crate::storage::types::{Field, Item};

pub const ITEM_COLUMNS: &str = "item_id, name, icon, created, updated, deleted";

pub const FIELD_COLUMNS: &str =
    "field_id, item_id, name, icon, value_type, value, created, updated, deleted";

/// Raw row data from the items table.
#[derive(Debug)]
pub struct ItemRow {
    pub id: i64,
    pub name: String,
    pub icon: String,
    pub created: String,
    pub updated: String,
    pub deleted: bool,
}

impl ItemRow {
    /// Map a row selected with [`ITEM_COLUMNS`].
    pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            icon: row.get(2)?,
            created: row.get(3)?,
            updated: row.get(4)?,
            deleted: row.get(5)?,
        })
    }
}

/// Raw row data from the fields table.
#[derive(Debug)]
pub struct FieldRow {
    pub id: i64,
    pub item_id: i64,
    pub name: String,
    pub icon: String,
    pub value_type: String,
    pub value: String,
    pub created: String,
    pub updated: String,
    pub deleted: bool,
}

impl FieldRow {
    /// Map a row selected with [`FIELD_COLUMNS`].
    pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            item_id: row.get(1)?,
            name: row.get(2)?,
            icon: row.get(3)?,
            value_type: row.get(4)?,
            value: row.get(5)?,
            created: row.get(6)?,
            updated: row.get(7)?,
            deleted: row.get(8)?,
        })
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|e| KeeperError::read("parse_timestamp", format!("Invalid timestamp: {}", e)))
}

impl TryFrom<ItemRow> for Item {
    type Error = KeeperError;

    fn try_from(row: ItemRow) -> Result<Self> {
        Ok(Item {
            id: row.id,
            name: row.name,
            icon: row.icon,
            created: parse_timestamp(&row.created)?,
            updated: parse_timestamp(&row.updated)?,
            deleted: row.deleted,
            fields: Vec::new(),
        })
    }
}

impl TryFrom<FieldRow> for Field {
    type Error = KeeperError;

    fn try_from(row: FieldRow) -> Result<Self> {
        let value_type: ValueType = row.value_type.parse().map_err(|_| {
            KeeperError::read(
                "parse_field",
                format!("Unknown value type in store: {}", row.value_type),
            )
        })?;
        Ok(Field {
            id: row.id,
            item_id: row.item_id,
            name: row.name,
            icon: row.icon,
            value_type,
            value: row.value,
            created: parse_timestamp(&row.created)?,
            updated: parse_timestamp(&row.updated)?,
            deleted: row.deleted,
        })
    }
}
