use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use keeper_core::fs::write_atomic;
use keeper_core::SessionConfig;
use serde::{Deserialize, Serialize};

use crate::logging::LogFormat;

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct KeeperConfig {
    #[serde(default)]
    pub store: StoreSection,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub log: LogSection,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct StoreSection {
    pub path: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSection {
    pub format: LogFormat,
    pub level: String,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: crate::logging::DEFAULT_LEVEL.to_string(),
        }
    }
}

impl KeeperConfig {
    pub fn with_store_path(path: &Path) -> Self {
        Self {
            store: StoreSection {
                path: Some(path.to_string_lossy().to_string()),
            },
            ..Self::default()
        }
    }
}

/// Resolve the config file path, checking KEEPER_CONFIG first.
pub fn resolve_config_path() -> anyhow::Result<PathBuf> {
    match non_empty_env("KEEPER_CONFIG") {
        Some(value) => Ok(PathBuf::from(value)),
        None => Ok(keeper_dir(BaseDir::Config)?.join("config.toml")),
    }
}

/// Where the store lives when neither the flag nor the config names one.
pub fn default_store_path() -> anyhow::Result<PathBuf> {
    Ok(keeper_dir(BaseDir::Data)?.join("keeper.db"))
}

/// Load the config file. A missing file means defaults.
pub fn load_config(path: &Path) -> anyhow::Result<KeeperConfig> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(KeeperConfig::default()),
        Err(err) => anyhow::bail!("Failed to read config {}: {}", path.display(), err),
    };
    toml::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("Failed to parse config {}: {}", path.display(), e))
}

/// Write `config`, creating its directory. The file is replaced atomically so
/// a crash never leaves a truncated config behind.
pub fn write_config(path: &Path, config: &KeeperConfig) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| anyhow::anyhow!("Failed to create {}: {}", parent.display(), e))?;
    }
    let contents = toml::to_string_pretty(config)?;
    write_atomic(path, contents.as_bytes())
        .map_err(|e| anyhow::anyhow!("Failed to write config {}: {}", path.display(), e))
}

#[derive(Debug, Clone, Copy)]
enum BaseDir {
    Config,
    Data,
}

/// `$XDG_CONFIG_HOME/keeper` or `$XDG_DATA_HOME/keeper`, falling back to the
/// usual locations under `$HOME`.
fn keeper_dir(base: BaseDir) -> anyhow::Result<PathBuf> {
    let (var, fallback): (&str, &[&str]) = match base {
        BaseDir::Config => ("XDG_CONFIG_HOME", &[".config"]),
        BaseDir::Data => ("XDG_DATA_HOME", &[".local", "share"]),
    };
    let root = match non_empty_env(var) {
        Some(value) => PathBuf::from(value),
        None => {
            let home = non_empty_env("HOME")
                .ok_or_else(|| anyhow::anyhow!("HOME is not set; pass --store or set {}", var))?;
            fallback.iter().fold(PathBuf::from(home), |dir, part| dir.join(part))
        }
    };
    Ok(root.join("keeper"))
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use keeper_core::KdfParams;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = load_config(&dir.path().join("absent.toml")).unwrap();
        assert!(config.store.path.is_none());
        assert_eq!(config.session, SessionConfig::default());
        assert_eq!(config.log.format, LogFormat::Pretty);
        assert_eq!(config.log.level, "warn");
    }

    #[test]
    fn test_partial_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[store]\npath = \"/data/keeper.db\"\n\n[session.kdf]\nmemory_kib = 8\niterations = 1\n\n[log]\nformat = \"json\"\n",
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.store.path.as_deref(), Some("/data/keeper.db"));
        assert_eq!(config.session.kdf.memory_kib, 8);
        assert_eq!(config.session.kdf.parallelism, KdfParams::default().parallelism);
        assert_eq!(config.session.default_cipher, "AES256-GCM");
        assert_eq!(config.log.format, LogFormat::Json);
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        write_config(&path, &KeeperConfig::with_store_path(Path::new("/x/keeper.db"))).unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.store.path.as_deref(), Some("/x/keeper.db"));
    }

    #[test]
    fn test_malformed_file_names_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[store\n").unwrap();
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("config.toml"));
    }
}
