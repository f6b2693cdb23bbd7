//! SQLite data access layer.
//!
//! `StorageDb` owns the connection and exposes explicit transaction
//! boundaries. Every write requires an active transaction and stamps rows
//! with the single "now" captured when that transaction started. The layer
//! never sees plaintext: name, icon and value columns arrive already
//! encrypted and leave still encrypted.

mod row;
pub mod schema;

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use crate::error::{KeeperError, Result};
use crate::storage::types::{Field, Item};

use row::{FieldRow, ItemRow, FIELD_COLUMNS, ITEM_COLUMNS};
use schema::{CREATE_TABLES, SCHEMA_VERSION, SETTING_CREATED_AT, SETTING_CRYPT_ID};

const SQL_INSERT_ITEM: &str = r#"
    INSERT INTO items (name, icon, created, updated, deleted)
    VALUES (?1, ?2, ?3, ?3, 0)
"#;

const SQL_DELETE_ITEM: &str =
    "UPDATE items SET deleted = 1, updated = ?1 WHERE item_id = ?2 AND deleted = 0";

const SQL_DELETE_ITEM_FIELDS: &str =
    "UPDATE fields SET deleted = 1, updated = ?1 WHERE item_id = ?2 AND deleted = 0";

const SQL_UPDATE_ITEM_NAME: &str =
    "UPDATE items SET name = ?1, updated = ?2 WHERE item_id = ?3 AND deleted = 0";

const SQL_UPDATE_ITEM_ICON: &str =
    "UPDATE items SET icon = ?1, updated = ?2 WHERE item_id = ?3 AND deleted = 0";

const SQL_TOUCH_ITEM: &str = "UPDATE items SET updated = ?1 WHERE item_id = ?2 AND deleted = 0";

const SQL_INSERT_FIELD: &str = r#"
    INSERT INTO fields (item_id, name, icon, value_type, value, created, updated, deleted)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6, 0)
"#;

/// Handle to an open SQLite store.
#[derive(Debug)]
pub struct StorageDb {
    path: PathBuf,
    conn: Connection,
    version: i32,
    tx_now: Option<DateTime<Utc>>,
}

impl StorageDb {
    /// Open (or create) the store file at `path`.
    pub fn open(path: &Path, busy_timeout: Duration) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(busy_timeout)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let version = read_version(&conn)?;
        debug!(path = %path.display(), version, "store opened");

        Ok(Self {
            path: path.to_path_buf(),
            conn,
            version,
            tx_now: None,
        })
    }

    /// Close the connection. An open transaction is rolled back by SQLite.
    pub fn close(self) -> Result<()> {
        let path = self.path;
        self.conn.close().map_err(|(_, err)| KeeperError::from(err))?;
        debug!(path = %path.display(), "store closed");
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Schema version as of the last open or refresh. `<= 0` means new.
    pub fn version(&self) -> i32 {
        self.version
    }

    /// Re-read the schema version from the file header.
    pub fn refresh_version(&mut self) -> Result<i32> {
        self.version = read_version(&self.conn)?;
        Ok(self.version)
    }

    /// The persisted crypt id, if the store has been bootstrapped.
    pub fn crypt_id(&self) -> Result<Option<String>> {
        if self.version <= 0 {
            return Ok(None);
        }
        self.conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                [SETTING_CRYPT_ID],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| KeeperError::read("crypt_id", e))
    }

    /// Create the schema and persist the crypt id. Requires a transaction;
    /// the new version is visible through [`StorageDb::refresh_version`]
    /// once committed.
    pub fn bootstrap(&mut self, crypt_id: &str) -> Result<()> {
        let now = self.now("bootstrap")?;
        if self.version > 0 {
            return Err(KeeperError::AlreadyInitialized);
        }

        self.conn
            .execute_batch(CREATE_TABLES)
            .map_err(|source| KeeperError::Insert {
                operation: "bootstrap",
                source,
            })?;
        for (key, value) in [(SETTING_CRYPT_ID, crypt_id), (SETTING_CREATED_AT, now.as_str())] {
            self.conn
                .execute(
                    "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
                    [key, value],
                )
                .map_err(|source| KeeperError::Insert {
                    operation: "bootstrap",
                    source,
                })?;
        }
        self.conn
            .execute_batch(&format!("PRAGMA user_version = {};", SCHEMA_VERSION))
            .map_err(|source| KeeperError::Insert {
                operation: "bootstrap",
                source,
            })?;
        Ok(())
    }

    // --- Transaction boundaries ---

    /// Begin a write transaction and capture its timestamp.
    pub fn start_tx(&mut self) -> Result<()> {
        if self.tx_now.is_some() {
            return Err(KeeperError::TransactionActive);
        }
        self.conn
            .execute_batch("BEGIN IMMEDIATE")
            .map_err(|source| KeeperError::TransactionStart { source })?;
        self.tx_now = Some(Utc::now());
        debug!("transaction started");
        Ok(())
    }

    /// Commit the active transaction.
    ///
    /// A failed COMMIT never leaves the transaction open: if SQLite kept it
    /// (e.g. `SQLITE_BUSY` while another connection reads), it is rolled
    /// back before the error is returned.
    pub fn commit_tx(&mut self) -> Result<()> {
        if self.tx_now.is_none() {
            return Err(KeeperError::NoActiveTransaction("commit_tx"));
        }
        let source = match self.conn.execute_batch("COMMIT") {
            Ok(()) => {
                self.tx_now = None;
                debug!("transaction committed");
                return Ok(());
            }
            Err(source) => source,
        };

        let cleanup = if self.conn.is_autocommit() {
            Ok(())
        } else {
            self.conn.execute_batch("ROLLBACK")
        };
        if self.conn.is_autocommit() {
            self.tx_now = None;
        }
        match cleanup {
            Ok(()) => {
                debug!(error = %source, "commit failed; transaction rolled back");
                Err(KeeperError::Commit { source })
            }
            Err(rollback) => Err(KeeperError::RollbackFailed {
                operation: "commit_tx",
                source: Box::new(KeeperError::Commit { source }),
                rollback: Box::new(KeeperError::Rollback { source: rollback }),
            }),
        }
    }

    /// Roll back the active transaction.
    pub fn rollback_tx(&mut self) -> Result<()> {
        if self.tx_now.is_none() {
            return Err(KeeperError::NoActiveTransaction("rollback_tx"));
        }
        let result = self.conn.execute_batch("ROLLBACK");
        if self.conn.is_autocommit() {
            self.tx_now = None;
        }
        result.map_err(|source| KeeperError::Rollback { source })?;
        debug!("transaction rolled back");
        Ok(())
    }

    pub fn in_transaction(&self) -> bool {
        self.tx_now.is_some()
    }

    fn now(&self, operation: &'static str) -> Result<String> {
        self.tx_now
            .map(|now| now.to_rfc3339())
            .ok_or(KeeperError::NoActiveTransaction(operation))
    }

    // --- Item writes ---

    /// Insert an item; `name` and `icon` must already be encrypted.
    pub fn insert_item(&mut self, name: &str, icon: &str) -> Result<i64> {
        let now = self.now("insert_item")?;
        self.conn
            .execute(SQL_INSERT_ITEM, params![name, icon, now])
            .map_err(|source| KeeperError::Insert {
                operation: "insert_item",
                source,
            })?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Soft-delete an item and all of its fields.
    ///
    /// Two statements; the caller's transaction makes them one unit.
    pub fn delete_item(&mut self, item_id: i64) -> Result<()> {
        let now = self.now("delete_item")?;
        let changed = self
            .conn
            .execute(SQL_DELETE_ITEM, params![now, item_id])
            .map_err(|source| KeeperError::Delete {
                operation: "delete_item",
                source,
            })?;
        if changed == 0 {
            return Err(KeeperError::ItemNotFound(item_id));
        }

        self.conn
            .execute(SQL_DELETE_ITEM_FIELDS, params![now, item_id])
            .map_err(|source| KeeperError::Delete {
                operation: "delete_item_fields",
                source,
            })?;
        Ok(())
    }

    pub fn update_item_name(&mut self, item_id: i64, name: &str) -> Result<()> {
        let now = self.now("update_item_name")?;
        self.update_item_row("update_item_name", SQL_UPDATE_ITEM_NAME, item_id, name, &now)
    }

    pub fn update_item_icon(&mut self, item_id: i64, icon: &str) -> Result<()> {
        let now = self.now("update_item_icon")?;
        self.update_item_row("update_item_icon", SQL_UPDATE_ITEM_ICON, item_id, icon, &now)
    }

    fn update_item_row(
        &mut self,
        operation: &'static str,
        sql: &str,
        item_id: i64,
        value: &str,
        now: &str,
    ) -> Result<()> {
        let changed = self
            .conn
            .execute(sql, params![value, now, item_id])
            .map_err(|source| KeeperError::Update { operation, source })?;
        if changed == 0 {
            return Err(KeeperError::ItemNotFound(item_id));
        }
        Ok(())
    }

    /// Refresh an item's `updated` timestamp.
    pub fn touch_item(&mut self, item_id: i64) -> Result<()> {
        let now = self.now("touch_item")?;
        let changed = self
            .conn
            .execute(SQL_TOUCH_ITEM, params![now, item_id])
            .map_err(|source| KeeperError::Update {
                operation: "touch_item",
                source,
            })?;
        if changed == 0 {
            return Err(KeeperError::ItemNotFound(item_id));
        }
        Ok(())
    }

    // --- Field writes ---

    /// Insert a field; `name`, `icon` and `value` must already be encrypted.
    pub fn insert_field(
        &mut self,
        item_id: i64,
        name: &str,
        icon: &str,
        value_type: &str,
        value: &str,
    ) -> Result<i64> {
        let now = self.now("insert_field")?;
        self.conn
            .execute(
                SQL_INSERT_FIELD,
                params![item_id, name, icon, value_type, value, now],
            )
            .map_err(|source| KeeperError::Insert {
                operation: "insert_field",
                source,
            })?;
        Ok(self.conn.last_insert_rowid())
    }

    // --- Reads (no transaction required) ---

    /// All items, excluding soft-deleted ones unless `include_deleted`.
    /// Name and icon are still encrypted.
    pub fn select_all_items(&self, include_deleted: bool) -> Result<Vec<Item>> {
        const OPERATION: &str = "select_all_items";
        let mut sql = format!("SELECT {} FROM items", ITEM_COLUMNS);
        if !include_deleted {
            sql.push_str(" WHERE deleted = 0");
        }
        sql.push_str(" ORDER BY item_id");

        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| KeeperError::read(OPERATION, e))?;
        let rows = stmt
            .query_map([], ItemRow::from_row)
            .map_err(|e| KeeperError::read(OPERATION, e))?;

        let mut items = Vec::new();
        for row in rows {
            let row = row.map_err(|e| KeeperError::read(OPERATION, e))?;
            if row.deleted && !include_deleted {
                continue;
            }
            items.push(row.try_into()?);
        }
        Ok(items)
    }

    /// Exactly one item, or `ItemNotFound`. Name and icon are still encrypted.
    pub fn get_item_by_id(&self, item_id: i64, include_deleted: bool) -> Result<Item> {
        let mut sql = format!("SELECT {} FROM items WHERE item_id = ?1", ITEM_COLUMNS);
        if !include_deleted {
            sql.push_str(" AND deleted = 0");
        }
        let row = self
            .conn
            .query_row(&sql, [item_id], ItemRow::from_row)
            .optional()
            .map_err(|e| KeeperError::read("get_item_by_id", e))?;
        match row {
            Some(row) => row.try_into(),
            None => Err(KeeperError::ItemNotFound(item_id)),
        }
    }

    /// Fields of an item in insertion order. Name, icon and value are still
    /// encrypted.
    pub fn select_fields_by_item_id(&self, item_id: i64, include_deleted: bool) -> Result<Vec<Field>> {
        const OPERATION: &str = "select_fields_by_item_id";
        let mut sql = format!("SELECT {} FROM fields WHERE item_id = ?1", FIELD_COLUMNS);
        if !include_deleted {
            sql.push_str(" AND deleted = 0");
        }
        sql.push_str(" ORDER BY field_id");

        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| KeeperError::read(OPERATION, e))?;
        let rows = stmt
            .query_map([item_id], FieldRow::from_row)
            .map_err(|e| KeeperError::read(OPERATION, e))?;

        let mut fields = Vec::new();
        for row in rows {
            let row = row.map_err(|e| KeeperError::read(OPERATION, e))?;
            fields.push(row.try_into()?);
        }
        Ok(fields)
    }

    // --- Maintenance ---

    /// Write a compacted copy of the store to `dest`, which must not exist.
    pub fn vacuum_into(&self, dest: &Path) -> Result<()> {
        if self.tx_now.is_some() {
            return Err(KeeperError::TransactionActive);
        }
        let dest = dest
            .to_str()
            .ok_or_else(|| KeeperError::InvalidInput("Backup path is not UTF-8".to_string()))?;
        self.conn.execute("VACUUM INTO ?1", [dest])?;
        Ok(())
    }
}

fn read_version(conn: &Connection) -> Result<i32> {
    Ok(conn.query_row("PRAGMA user_version", [], |row| row.get(0))?)
}
