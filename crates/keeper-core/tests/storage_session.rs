use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use keeper_core::crypto::CryptId;
use keeper_core::{
    KdfParams, KeeperError, NewField, NewItem, SessionConfig, Status, StorageSession,
};
use rusqlite::Connection;
use tempfile::TempDir;

const PASSPHRASE: &str = "test-passphrase-secure-123";

struct TempStore {
    dir: TempDir,
}

impl TempStore {
    fn new() -> Self {
        Self {
            dir: TempDir::new().expect("temp dir should be available"),
        }
    }

    fn path(&self) -> PathBuf {
        self.dir.path().join("keeper.db")
    }

    fn join(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

fn fast_config() -> SessionConfig {
    SessionConfig::default().with_kdf(KdfParams::insecure_fast())
}

fn test_icons() -> HashSet<String> {
    ["bank-icon", "mail-icon", "key-icon"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn new_session() -> StorageSession {
    StorageSession::with_catalog(fast_config(), test_icons())
}

fn initialized(path: &Path) -> StorageSession {
    let session = new_session();
    session.open(path).expect("open should succeed");
    session
        .initialize_cipher("AES256-GCM", PASSPHRASE)
        .expect("initialize should succeed");
    session
}

#[test]
fn test_new_store_rejects_items_until_initialized() {
    let temp = TempStore::new();
    let session = new_session();

    session.open(temp.path()).expect("open should succeed");
    assert!(session.is_new());

    let result = session.add_new_item(NewItem::new("Bank", "bank-icon"));
    assert!(matches!(result, Err(KeeperError::NotInitialized(_))));

    session
        .initialize_cipher("AES256-GCM", PASSPHRASE)
        .expect("initialize should succeed");
    let added = session
        .add_new_item(NewItem::new("Bank", "bank-icon"))
        .expect("add should succeed");
    assert_eq!(added.item_id, 1);
    assert_eq!(added.status, Status::Success);

    let item = session.read_item_by_id(1).expect("read should succeed");
    assert_eq!(item.name, "Bank");
    assert_eq!(item.icon, "bank-icon");
    assert!(item.fields.is_empty());
}

#[test]
fn test_delete_hides_item_from_live_reads() {
    let temp = TempStore::new();
    let session = initialized(&temp.path());

    session
        .add_new_item(NewItem::new("Bank", "bank-icon"))
        .expect("add should succeed");
    session
        .add_new_item(NewItem::new("Mail", "mail-icon"))
        .expect("add should succeed");

    let deleted = session.delete_item(1).expect("delete should succeed");
    assert_eq!(deleted.status, Status::Success);

    let live = session.read_all_items().expect("read should succeed");
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].id, 2);
    assert_eq!(live[0].name, "Mail");

    let all = session
        .read_all_items_including_deleted()
        .expect("read should succeed");
    let ids: Vec<i64> = all.iter().map(|item| item.id).collect();
    assert_eq!(ids, vec![1, 2]);
    assert!(all[0].deleted);
    assert_eq!(all[0].name, "Bank");

    assert!(matches!(
        session.read_item_by_id(1),
        Err(KeeperError::ItemNotFound(1))
    ));
    assert!(matches!(
        session.delete_item(1),
        Err(KeeperError::ItemNotFound(1))
    ));
}

#[test]
fn test_delete_marks_fields_deleted() {
    let temp = TempStore::new();
    let session = initialized(&temp.path());

    session
        .add_new_item(NewItem::new("Bank", "bank-icon"))
        .expect("add should succeed");
    session
        .add_new_field(1, NewField::new("PIN", "key-icon", "password", "1234"))
        .expect("field should be added");
    session.delete_item(1).expect("delete should succeed");

    let conn = Connection::open(temp.path()).expect("raw open should succeed");
    let live_fields: i64 = conn
        .query_row("SELECT COUNT(*) FROM fields WHERE deleted = 0", [], |row| {
            row.get(0)
        })
        .expect("count should succeed");
    assert_eq!(live_fields, 0);
}

#[test]
fn test_failed_delete_leaves_item_live() {
    let temp = TempStore::new();
    let session = initialized(&temp.path());

    session
        .add_new_item(NewItem::new("Bank", "bank-icon"))
        .expect("add should succeed");
    session
        .add_new_field(1, NewField::new("PIN", "key-icon", "password", "1234"))
        .expect("field should be added");

    let conn = Connection::open(temp.path()).expect("raw open should succeed");
    conn.execute_batch(
        "CREATE TRIGGER fail_field_delete BEFORE UPDATE ON fields
         BEGIN SELECT RAISE(ABORT, 'injected failure'); END;",
    )
    .expect("trigger should be created");
    drop(conn);

    let result = session.delete_item(1);
    assert!(matches!(
        result,
        Err(KeeperError::Delete {
            operation: "delete_item_fields",
            ..
        })
    ));

    let item = session.read_item_by_id(1).expect("item should still be live");
    assert!(!item.deleted);
    assert_eq!(item.fields.len(), 1);

    // The session is usable again after the rollback.
    session
        .add_new_item(NewItem::new("Mail", "mail-icon"))
        .expect("add should succeed");
}

#[test]
fn test_commit_blocked_by_reader_leaves_no_trace() {
    let temp = TempStore::new();
    let mut config = fast_config();
    config.busy_timeout_ms = 50;
    let session = StorageSession::with_catalog(config, test_icons());
    session.open(temp.path()).expect("open should succeed");
    session
        .initialize_cipher("AES256-GCM", PASSPHRASE)
        .expect("initialize should succeed");

    let reader = Connection::open(temp.path()).expect("raw open should succeed");
    reader.execute_batch("BEGIN").expect("begin should succeed");
    let live: i64 = reader
        .query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))
        .expect("count should succeed");
    assert_eq!(live, 0);

    let result = session.add_new_item(NewItem::new("Bank", "bank-icon"));
    assert!(matches!(result, Err(KeeperError::Commit { .. })));
    assert!(session
        .read_all_items()
        .expect("read should succeed")
        .is_empty());

    reader.execute_batch("COMMIT").expect("commit should succeed");
    drop(reader);

    let added = session
        .add_new_item(NewItem::new("Mail", "mail-icon"))
        .expect("add should succeed once the reader is gone");
    assert_eq!(added.item_id, 1);
    let items = session.read_all_items().expect("read should succeed");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].name, "Mail");
}

#[test]
fn test_locked_session_writes_nothing() {
    let temp = TempStore::new();
    {
        let session = initialized(&temp.path());
        session
            .add_new_item(NewItem::new("Bank", "bank-icon"))
            .expect("add should succeed");
        session.close().expect("close should succeed");
    }

    let session = new_session();
    session.open(temp.path()).expect("open should succeed");
    assert!(session.is_active());
    assert!(session.is_locked());

    assert!(matches!(
        session.add_new_item(NewItem::new("Mail", "mail-icon")),
        Err(KeeperError::NotInitialized("encryptor"))
    ));
    assert!(matches!(
        session.delete_item(1),
        Err(KeeperError::NotInitialized("encryptor"))
    ));
    assert!(matches!(
        session.update_item_name(1, "Renamed"),
        Err(KeeperError::NotInitialized("encryptor"))
    ));
    assert!(matches!(
        session.add_new_field(1, NewField::new("PIN", "key-icon", "text", "1")),
        Err(KeeperError::NotInitialized("encryptor"))
    ));
    assert!(matches!(
        session.read_all_items(),
        Err(KeeperError::NotInitialized("encryptor"))
    ));

    session.unlock(PASSPHRASE).expect("unlock should succeed");
    let items = session.read_all_items().expect("read should succeed");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].name, "Bank");
    assert!(items[0].updated == items[0].created);
}

#[test]
fn test_db_version_tracks_open_state() {
    let temp = TempStore::new();
    let session = new_session();
    assert_eq!(session.db_version(), -1);

    session.open(temp.path()).expect("open should succeed");
    assert!(session.db_version() >= 0);

    session
        .initialize_cipher("CHACHA20-POLY1305", PASSPHRASE)
        .expect("initialize should succeed");
    assert!(session.db_version() > 0);

    session.close().expect("close should succeed");
    assert_eq!(session.db_version(), -1);
}

#[test]
fn test_wrong_passphrase_leaves_session_open_and_locked() {
    let temp = TempStore::new();
    initialized(&temp.path())
        .close()
        .expect("close should succeed");

    let session = new_session();
    session.open(temp.path()).expect("open should succeed");
    let result = session.unlock("wrong-passphrase-456");
    assert!(matches!(result, Err(KeeperError::IncorrectPassphrase)));
    assert!(session.db_version() > 0);
    assert!(session.is_locked());

    session.unlock(PASSPHRASE).expect("unlock should succeed");
    assert!(!session.is_locked());
}

#[test]
fn test_unsupported_cipher_leaves_session_open_and_locked() {
    let temp = TempStore::new();
    initialized(&temp.path())
        .close()
        .expect("close should succeed");

    let conn = Connection::open(temp.path()).expect("raw open should succeed");
    let stored: String = conn
        .query_row("SELECT value FROM settings WHERE key = 'crypt_id'", [], |row| {
            row.get(0)
        })
        .expect("crypt id should exist");
    let mut crypt_id = CryptId::parse(&stored).expect("crypt id should parse");
    crypt_id.cipher = "TWOFISH".to_string();
    conn.execute(
        "UPDATE settings SET value = ?1 WHERE key = 'crypt_id'",
        [crypt_id.to_json().expect("crypt id should serialize")],
    )
    .expect("update should succeed");
    drop(conn);

    let session = new_session();
    let result = session.open(temp.path());
    assert!(matches!(result, Err(KeeperError::UnsupportedCipher(name)) if name == "TWOFISH"));
    assert!(session.db_version() > 0);
    assert!(session.is_locked());
    assert!(session.unlock(PASSPHRASE).is_err());
}

#[test]
fn test_available_ciphers_independent_of_lock_state() {
    let session = new_session();
    let closed = session.available_ciphers();
    assert!(closed.contains(&"AES256-GCM".to_string()));
    assert!(closed.contains(&"CHACHA20-POLY1305".to_string()));

    let temp = TempStore::new();
    session.open(temp.path()).expect("open should succeed");
    assert_eq!(session.available_ciphers(), closed);
}

#[test]
fn test_validation_rejects_before_writing() {
    let temp = TempStore::new();
    let session = initialized(&temp.path());

    assert!(matches!(
        session.add_new_item(NewItem::new("Bank", "unknown-icon")),
        Err(KeeperError::IconNotFound(_))
    ));
    assert!(matches!(
        session.add_new_item(NewItem::new("", "bank-icon")),
        Err(KeeperError::Validation(_))
    ));
    assert!(matches!(
        session.update_item_icon(1, "unknown-icon"),
        Err(KeeperError::IconNotFound(_))
    ));
    assert!(matches!(
        session.update_item_name(0, "Bank"),
        Err(KeeperError::InvalidItemId(0))
    ));

    session
        .add_new_item(NewItem::new("Bank", "bank-icon"))
        .expect("add should succeed");
    assert!(matches!(
        session.add_new_field(1, NewField::new("PIN", "key-icon", "colour", "1")),
        Err(KeeperError::Validation(_))
    ));
    assert!(session
        .read_fields_by_item_id(1)
        .expect("read should succeed")
        .is_empty());
    assert_eq!(
        session.read_all_items_including_deleted().unwrap().len(),
        1
    );
}

#[test]
fn test_update_name_and_icon() {
    let temp = TempStore::new();
    let session = initialized(&temp.path());

    session
        .add_new_item(NewItem::new("Bank", "bank-icon"))
        .expect("add should succeed");
    session
        .update_item_name(1, "Savings")
        .expect("rename should succeed");
    session
        .update_item_icon(1, "key-icon")
        .expect("icon change should succeed");

    let item = session.read_item_by_id(1).expect("read should succeed");
    assert_eq!(item.name, "Savings");
    assert_eq!(item.icon, "key-icon");
    assert!(item.updated >= item.created);

    assert!(matches!(
        session.update_item_name(9, "Missing"),
        Err(KeeperError::ItemNotFound(9))
    ));
}

#[test]
fn test_fields_read_in_insertion_order() {
    let temp = TempStore::new();
    let session = initialized(&temp.path());

    session
        .add_new_item(NewItem::new("Mail", "mail-icon"))
        .expect("add should succeed");
    for (name, value_type, value) in [
        ("Login", "email", "alice@example.com"),
        ("Password", "password", "hunter22"),
        ("Recovery", "note", "ask Bob"),
    ] {
        session
            .add_new_field(1, NewField::new(name, "key-icon", value_type, value))
            .expect("field should be added");
    }

    let fields = session
        .read_fields_by_item_id(1)
        .expect("read should succeed");
    let names: Vec<&str> = fields.iter().map(|field| field.name.as_str()).collect();
    assert_eq!(names, vec!["Login", "Password", "Recovery"]);
    assert_eq!(fields[1].value, "hunter22");

    let item = session.read_item_by_id(1).expect("read should succeed");
    assert!(item.updated >= fields[2].created);
}

#[test]
fn test_backup_and_restore() {
    let temp = TempStore::new();
    let session = initialized(&temp.path());
    session
        .add_new_item(NewItem::new("Bank", "bank-icon"))
        .expect("add should succeed");

    let backup = temp.join("keeper.backup.age");
    session
        .backup_to(&backup, "backup-passphrase-789")
        .expect("backup should succeed");
    session.close().expect("close should succeed");

    let on_disk = std::fs::read(&backup).expect("backup should exist");
    assert!(!on_disk.starts_with(b"SQLite format 3"));

    // The plaintext snapshot used to build the backup is gone.
    let leftovers: Vec<_> = std::fs::read_dir(temp.dir.path())
        .expect("temp dir should be readable")
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty(), "leftover temp files: {:?}", leftovers);

    let restored = temp.join("restored.db");
    assert!(matches!(
        StorageSession::restore_backup(&backup, &restored, "not-the-passphrase"),
        Err(KeeperError::IncorrectPassphrase)
    ));
    assert!(!restored.exists());

    StorageSession::restore_backup(&backup, &restored, "backup-passphrase-789")
        .expect("restore should succeed");

    let reopened = new_session();
    reopened.open(&restored).expect("open should succeed");
    reopened.unlock(PASSPHRASE).expect("unlock should succeed");
    let items = reopened.read_all_items().expect("read should succeed");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].name, "Bank");
}

#[test]
fn test_backup_requires_unlocked_session() {
    let temp = TempStore::new();
    let session = initialized(&temp.path());
    session.lock().expect("lock should succeed");

    let result = session.backup_to(&temp.join("keeper.backup.age"), "backup-passphrase-789");
    assert!(matches!(result, Err(KeeperError::NotInitialized(_))));
}

#[test]
fn test_concurrent_inserts_get_distinct_ids() {
    let temp = TempStore::new();
    let session = Arc::new(initialized(&temp.path()));

    let handles: Vec<_> = (0..4)
        .map(|worker| {
            let session = Arc::clone(&session);
            thread::spawn(move || {
                (0..5)
                    .map(|n| {
                        session
                            .add_new_item(NewItem::new(format!("item-{}-{}", worker, n), "key-icon"))
                            .expect("add should succeed")
                            .item_id
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut ids: Vec<i64> = handles
        .into_iter()
        .flat_map(|handle| handle.join().expect("worker should not panic"))
        .collect();
    ids.sort_unstable();
    assert_eq!(ids, (1..=20).collect::<Vec<_>>());
}
