//! Filesystem helpers for backup files.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{KeeperError, Result};

/// A not-yet-existing path next to `path`, suffixed with `tag` and a nanosecond stamp.
pub fn temp_sibling(path: &Path, tag: &str) -> Result<PathBuf> {
    let parent = path
        .parent()
        .ok_or_else(|| KeeperError::InvalidInput(format!("Invalid path: {}", path.display())))?;
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| KeeperError::InvalidInput(format!("Invalid filename: {}", path.display())))?;
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| KeeperError::Storage(format!("System time error: {}", e)))?
        .as_nanos();
    Ok(parent.join(format!(".{}.{}.{}.tmp", filename, tag, nanos)))
}

/// Write `data` to `path` through a synced temp file and a rename.
pub fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let temp_path = temp_sibling(path, "write")?;

    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&temp_path)
        .map_err(|e| KeeperError::Storage(format!("Temp file create failed: {}", e)))?;
    let written = file.write_all(data).and_then(|_| file.sync_all());
    if let Err(e) = written {
        let _ = fs::remove_file(&temp_path);
        return Err(KeeperError::Storage(format!("Temp file write failed: {}", e)));
    }

    rename_with_fallback(&temp_path, path)
        .map_err(|e| KeeperError::Storage(format!("Atomic rename failed: {}", e)))
}

/// Rename, removing the destination first on platforms where rename refuses
/// to overwrite. The temp file is removed if the rename ultimately fails.
pub fn rename_with_fallback(temp_path: &Path, destination: &Path) -> io::Result<()> {
    if let Err(initial_err) = fs::rename(temp_path, destination) {
        let _ = fs::remove_file(destination);
        fs::rename(temp_path, destination).map_err(|retry_err| {
            let _ = fs::remove_file(temp_path);
            io::Error::new(
                retry_err.kind(),
                format!(
                    "initial: {}, retry: {}",
                    initial_err, retry_err
                ),
            )
        })?;
    }
    Ok(())
}
