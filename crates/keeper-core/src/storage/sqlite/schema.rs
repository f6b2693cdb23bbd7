//! Schema bootstrap for a new store.

/// Schema version written to `PRAGMA user_version` by [`super::StorageDb::bootstrap`].
pub const SCHEMA_VERSION: i32 = 1;

/// Settings key holding the crypt id JSON.
pub const SETTING_CRYPT_ID: &str = "crypt_id";

/// Settings key holding the creation timestamp.
pub const SETTING_CREATED_AT: &str = "created_at";

pub const CREATE_TABLES: &str = r#"
    CREATE TABLE IF NOT EXISTS settings (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS items (
        item_id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        icon TEXT NOT NULL,
        created TEXT NOT NULL,
        updated TEXT NOT NULL,
        deleted BOOLEAN NOT NULL DEFAULT 0 CHECK (deleted IN (0, 1))
    );

    CREATE TABLE IF NOT EXISTS fields (
        field_id INTEGER PRIMARY KEY AUTOINCREMENT,
        item_id INTEGER NOT NULL,
        name TEXT NOT NULL,
        icon TEXT NOT NULL,
        value_type TEXT NOT NULL,
        value TEXT NOT NULL,
        created TEXT NOT NULL,
        updated TEXT NOT NULL,
        deleted BOOLEAN NOT NULL DEFAULT 0 CHECK (deleted IN (0, 1)),

        FOREIGN KEY (item_id) REFERENCES items(item_id)
    );
"#;
