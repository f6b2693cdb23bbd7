//! The storage session.
//!
//! `StorageSession` ties the data access layer to the encryption gate. It is
//! closed until [`StorageSession::open`] succeeds, and locked until the gate
//! has a verified key. Item and field operations check readiness first,
//! validate second, encrypt third and only then touch the store, inside one
//! transaction per call.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::catalog::{BuiltinIcons, IconCatalog, ValueType};
use crate::config::SessionConfig;
use crate::crypto::{envelope, validate_passphrase, Encryptor};
use crate::error::{KeeperError, Result};
use crate::fs::{temp_sibling, write_atomic};
use crate::storage::sqlite::StorageDb;
use crate::storage::types::{
    CommonResponse, Field, FieldAdded, Item, ItemAdded, NewField, NewItem, Status, UpdateItem,
};
use crate::validation::{validate_field, validate_item_id, validate_item_update, validate_new_item};

#[derive(Debug, Default)]
struct SessionState {
    db: Option<StorageDb>,
    encryptor: Encryptor,
    last_access: Option<DateTime<Utc>>,
}

impl SessionState {
    /// Gate first, then handle.
    fn ready(&mut self) -> Result<(&mut StorageDb, &Encryptor)> {
        if !self.encryptor.is_ready() {
            return Err(KeeperError::NotInitialized("encryptor"));
        }
        let db = self
            .db
            .as_mut()
            .ok_or(KeeperError::NotInitialized("database"))?;
        Ok((db, &self.encryptor))
    }

    fn version(&self) -> i32 {
        self.db.as_ref().map_or(-1, StorageDb::version)
    }

    fn is_active(&self) -> bool {
        self.db.is_some() && self.version() > 0
    }

    fn touch(&mut self) {
        self.last_access = Some(Utc::now());
    }
}

/// An encrypted item store bound to at most one open SQLite file.
///
/// All methods take `&self`; the session state sits behind a mutex held for
/// the whole of each call, so transactions never interleave.
pub struct StorageSession {
    config: SessionConfig,
    icons: Box<dyn IconCatalog>,
    state: Mutex<SessionState>,
}

impl fmt::Debug for StorageSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageSession")
            .field("config", &self.config)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Default for StorageSession {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl StorageSession {
    /// A closed session validating icons against [`BuiltinIcons`].
    pub fn new(config: SessionConfig) -> Self {
        Self::with_catalog(config, BuiltinIcons)
    }

    /// A closed session validating icons against a custom catalog.
    pub fn with_catalog(config: SessionConfig, icons: impl IconCatalog + 'static) -> Self {
        Self {
            config,
            icons: Box::new(icons),
            state: Mutex::new(SessionState::default()),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn lock_state(&self) -> Result<MutexGuard<'_, SessionState>> {
        self.state
            .lock()
            .map_err(|_| KeeperError::Storage("session state poisoned".to_string()))
    }

    // --- Lifecycle ---

    /// Open (or create) the store at `path`.
    ///
    /// Does nothing when a store is already open and unlocked. An existing
    /// store loads its crypt id into the gate; the session then stays locked
    /// until [`StorageSession::unlock`]. If the crypt id names a cipher this
    /// build does not support, the error is returned and the session is left
    /// open and locked.
    pub fn open(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut state = self.lock_state()?;
        if state.db.is_some() && state.encryptor.is_ready() {
            return Ok(());
        }

        state.encryptor.clear();
        if let Some(previous) = state.db.take() {
            if let Err(err) = previous.close() {
                warn!(error = %err, "failed to close previous store handle");
            }
        }

        let db = StorageDb::open(path, self.config.busy_timeout())?;
        let version = db.version();
        let crypt_id = db.crypt_id()?;
        state.db = Some(db);
        info!(path = %path.display(), version, "storage opened");

        if version > 0 {
            let crypt_id = crypt_id.ok_or_else(|| {
                KeeperError::Crypto("Store has a schema but no crypt id".to_string())
            })?;
            state.encryptor.init(&crypt_id)?;
        }
        state.touch();
        Ok(())
    }

    /// Verify `passphrase` against the store's key check and unlock the gate.
    pub fn unlock(&self, passphrase: &str) -> Result<()> {
        let mut state = self.lock_state()?;
        if state.db.is_none() {
            return Err(KeeperError::NotOpen);
        }
        if let Err(err) = state.encryptor.unlock(passphrase) {
            if matches!(err, KeeperError::IncorrectPassphrase) {
                warn!("unlock refused: incorrect passphrase");
            }
            return Err(err);
        }
        state.touch();
        debug!("storage unlocked");
        Ok(())
    }

    /// Create key material for a new store with the configured default cipher.
    pub fn initialize(&self, passphrase: &str) -> Result<()> {
        self.initialize_cipher(&self.config.default_cipher, passphrase)
    }

    /// Create key material for a new store and write its schema.
    ///
    /// On success the session is active and unlocked. If writing the schema
    /// fails the gate is cleared again and the store stays new.
    pub fn initialize_cipher(&self, cipher_name: &str, passphrase: &str) -> Result<()> {
        let mut state = self.lock_state()?;
        {
            let SessionState { db, encryptor, .. } = &mut *state;
            let db = db.as_mut().ok_or(KeeperError::NotOpen)?;
            if db.version() > 0 {
                return Err(KeeperError::AlreadyInitialized);
            }

            let crypt_id = encryptor.create(cipher_name, passphrase, self.config.kdf)?;
            let written = run_in_transaction(db, "bootstrap", |db| db.bootstrap(&crypt_id))
                .and_then(|()| db.refresh_version());
            if let Err(err) = written {
                encryptor.clear();
                return Err(err);
            }
        }
        state.touch();
        info!(cipher = cipher_name, "storage initialized");
        Ok(())
    }

    /// Drop the key but keep the store open.
    pub fn lock(&self) -> Result<()> {
        let mut state = self.lock_state()?;
        state.encryptor.lock();
        debug!("storage locked");
        Ok(())
    }

    /// Clear key material and release the store. Safe when already closed.
    pub fn close(&self) -> Result<()> {
        let mut state = self.lock_state()?;
        state.encryptor.clear();
        if let Some(db) = state.db.take() {
            let path = db.path().to_path_buf();
            db.close()?;
            info!(path = %path.display(), "storage closed");
        }
        Ok(())
    }

    // --- State queries ---

    /// True when no store is open or the open store has no schema yet.
    pub fn is_new(&self) -> bool {
        self.db_version() <= 0
    }

    /// True when an initialized store is open.
    pub fn is_active(&self) -> bool {
        self.lock_state()
            .map(|state| state.is_active())
            .unwrap_or(false)
    }

    /// True unless an initialized store is open and the gate holds its key.
    pub fn is_locked(&self) -> bool {
        self.lock_state()
            .map(|state| !(state.is_active() && state.encryptor.is_ready()))
            .unwrap_or(true)
    }

    /// Schema version of the open store, `-1` when closed.
    pub fn db_version(&self) -> i32 {
        self.lock_state()
            .map(|state| state.version())
            .unwrap_or(-1)
    }

    /// Ciphers this build can initialize a store with.
    pub fn available_ciphers(&self) -> Vec<String> {
        self.lock_state()
            .map(|state| state.encryptor.cipher_names())
            .unwrap_or_default()
    }

    /// Cipher of the open store, once its crypt id is loaded.
    pub fn cipher_name(&self) -> Option<String> {
        self.lock_state()
            .ok()
            .and_then(|state| state.encryptor.cipher_name().map(str::to_string))
    }

    /// Path of the open store.
    pub fn path(&self) -> Option<PathBuf> {
        self.lock_state()
            .ok()
            .and_then(|state| state.db.as_ref().map(|db| db.path().to_path_buf()))
    }

    /// When the session last completed an operation successfully.
    pub fn last_access(&self) -> Option<DateTime<Utc>> {
        self.lock_state().ok().and_then(|state| state.last_access)
    }

    /// Fails with `NotInitialized` unless item and field operations can run.
    pub fn check_readiness(&self) -> Result<()> {
        let mut state = self.lock_state()?;
        state.ready().map(|_| ())
    }

    // --- Items ---

    pub fn add_new_item(&self, item: NewItem) -> Result<ItemAdded> {
        let mut state = self.lock_state()?;
        let (db, gate) = state.ready()?;
        validate_new_item(&item, self.icons.as_ref())?;

        let name = gate.encrypt(&item.name)?;
        let icon = gate.encrypt(&item.icon)?;
        let item_id = run_in_transaction(db, "add_new_item", |db| db.insert_item(&name, &icon))?;

        state.touch();
        debug!(item_id, "item added");
        Ok(ItemAdded {
            item_id,
            status: Status::Success,
        })
    }

    /// Soft-delete an item together with its fields.
    pub fn delete_item(&self, item_id: i64) -> Result<CommonResponse> {
        let mut state = self.lock_state()?;
        let (db, _) = state.ready()?;
        validate_item_id(item_id)?;

        run_in_transaction(db, "delete_item", |db| db.delete_item(item_id))?;

        state.touch();
        debug!(item_id, "item deleted");
        Ok(CommonResponse::success())
    }

    pub fn update_item_name(&self, item_id: i64, name: &str) -> Result<CommonResponse> {
        self.update_item(UpdateItem::new(item_id).with_name(name))
    }

    pub fn update_item_icon(&self, item_id: i64, icon: &str) -> Result<CommonResponse> {
        self.update_item(UpdateItem::new(item_id).with_icon(icon))
    }

    /// Apply a name and/or icon change in one transaction.
    pub fn update_item(&self, update: UpdateItem) -> Result<CommonResponse> {
        let mut state = self.lock_state()?;
        let (db, gate) = state.ready()?;
        validate_item_update(&update, self.icons.as_ref())?;

        let name = update.new_name().map(|name| gate.encrypt(name)).transpose()?;
        let icon = update.new_icon().map(|icon| gate.encrypt(icon)).transpose()?;
        run_in_transaction(db, "update_item", |db| {
            if let Some(name) = &name {
                db.update_item_name(update.id, name)?;
            }
            if let Some(icon) = &icon {
                db.update_item_icon(update.id, icon)?;
            }
            Ok(())
        })?;

        state.touch();
        debug!(
            item_id = update.id,
            name = name.is_some(),
            icon = icon.is_some(),
            "item updated"
        );
        Ok(CommonResponse::success())
    }

    // --- Fields ---

    /// Add a field to a live item and refresh the item's `updated` stamp.
    pub fn add_new_field(&self, item_id: i64, field: NewField) -> Result<FieldAdded> {
        let mut state = self.lock_state()?;
        let (db, gate) = state.ready()?;
        validate_item_id(item_id)?;
        validate_field(&field, self.icons.as_ref())?;

        let value_type: ValueType = field.value_type.parse()?;
        let name = gate.encrypt(&field.name)?;
        let icon = gate.encrypt(&field.icon)?;
        let value = gate.encrypt(&field.value)?;
        let field_id = run_in_transaction(db, "add_new_field", |db| {
            db.touch_item(item_id)?;
            db.insert_field(item_id, &name, &icon, value_type.as_str(), &value)
        })?;

        state.touch();
        debug!(item_id, field_id, "field added");
        Ok(FieldAdded {
            field_id,
            status: Status::Success,
        })
    }

    // --- Reads ---

    /// Live items without their fields.
    pub fn read_all_items(&self) -> Result<Vec<Item>> {
        self.read_items(false)
    }

    /// Every item, soft-deleted ones included, without their fields.
    pub fn read_all_items_including_deleted(&self) -> Result<Vec<Item>> {
        self.read_items(true)
    }

    fn read_items(&self, include_deleted: bool) -> Result<Vec<Item>> {
        let mut state = self.lock_state()?;
        let (db, gate) = state.ready()?;

        let items = db
            .select_all_items(include_deleted)?
            .into_iter()
            .map(|item| decrypt_item(gate, item))
            .collect::<Result<Vec<_>>>()?;

        state.touch();
        Ok(items)
    }

    /// One live item with its live fields.
    pub fn read_item_by_id(&self, item_id: i64) -> Result<Item> {
        let mut state = self.lock_state()?;
        let (db, gate) = state.ready()?;
        validate_item_id(item_id)?;

        let mut item = decrypt_item(gate, db.get_item_by_id(item_id, false)?)?;
        item.fields = db
            .select_fields_by_item_id(item_id, false)?
            .into_iter()
            .map(|field| decrypt_field(gate, field))
            .collect::<Result<Vec<_>>>()?;

        state.touch();
        Ok(item)
    }

    /// Live fields of a live item.
    pub fn read_fields_by_item_id(&self, item_id: i64) -> Result<Vec<Field>> {
        let mut state = self.lock_state()?;
        let (db, gate) = state.ready()?;
        validate_item_id(item_id)?;

        db.get_item_by_id(item_id, false)?;
        let fields = db
            .select_fields_by_item_id(item_id, false)?
            .into_iter()
            .map(|field| decrypt_field(gate, field))
            .collect::<Result<Vec<_>>>()?;

        state.touch();
        Ok(fields)
    }

    // --- Backup ---

    /// Write an age-encrypted snapshot of the whole store to `dest`.
    pub fn backup_to(&self, dest: &Path, passphrase: &str) -> Result<()> {
        validate_passphrase(passphrase)?;
        let mut state = self.lock_state()?;
        let (db, _) = state.ready()?;

        let snapshot = temp_sibling(dest, "snapshot")?;
        let image = db
            .vacuum_into(&snapshot)
            .and_then(|()| std::fs::read(&snapshot).map_err(KeeperError::from));
        if let Err(err) = std::fs::remove_file(&snapshot) {
            if err.kind() != std::io::ErrorKind::NotFound {
                warn!(snapshot = %snapshot.display(), error = %err, "failed to remove backup snapshot");
            }
        }
        let sealed = envelope::seal_image(&image?, passphrase)?;
        write_atomic(dest, &sealed)?;

        state.touch();
        info!(dest = %dest.display(), bytes = sealed.len(), "backup written");
        Ok(())
    }

    /// Decrypt a backup made by [`StorageSession::backup_to`] into a plain
    /// store file at `dest`, replacing whatever is there.
    pub fn restore_backup(src: &Path, dest: &Path, passphrase: &str) -> Result<()> {
        let sealed = std::fs::read(src)?;
        let image = envelope::open_image(&sealed, passphrase)?;
        write_atomic(dest, &image)?;
        info!(src = %src.display(), dest = %dest.display(), "backup restored");
        Ok(())
    }
}

/// Run `f` inside a transaction.
///
/// Commits on success. On failure rolls back and returns the original error,
/// or `RollbackFailed` carrying both causes when the rollback fails as well.
fn run_in_transaction<T>(
    db: &mut StorageDb,
    operation: &'static str,
    f: impl FnOnce(&mut StorageDb) -> Result<T>,
) -> Result<T> {
    db.start_tx()?;
    match f(db) {
        Ok(value) => {
            db.commit_tx()?;
            Ok(value)
        }
        Err(err) => match db.rollback_tx() {
            Ok(()) => Err(err),
            Err(rollback) => {
                warn!(operation, error = %err, rollback = %rollback, "rollback failed");
                Err(KeeperError::RollbackFailed {
                    operation,
                    source: Box::new(err),
                    rollback: Box::new(rollback),
                })
            }
        },
    }
}

fn decrypt_item(gate: &Encryptor, item: Item) -> Result<Item> {
    Ok(Item {
        name: gate.decrypt(&item.name)?,
        icon: gate.decrypt(&item.icon)?,
        ..item
    })
}

fn decrypt_field(gate: &Encryptor, field: Field) -> Result<Field> {
    Ok(Field {
        name: gate.decrypt(&field.name)?,
        icon: gate.decrypt(&field.icon)?,
        value: gate.decrypt(&field.value)?,
        ..field
    })
}
