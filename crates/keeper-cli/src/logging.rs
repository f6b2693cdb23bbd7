//! Structured logging.
//!
//! Log output goes to stderr so stdout stays clean for tables and JSON.

use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter when `RUST_LOG` is not set.
pub const DEFAULT_LEVEL: &str = "warn";

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` overrides `default_level`, e.g.
/// `RUST_LOG=keeper_core=debug keeper list`.
pub fn init_logging(default_level: &str, format: LogFormat) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let installed = match format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true),
            )
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true),
            )
            .try_init(),
    };
    if installed.is_ok() {
        tracing::debug!(?format, "logging initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Section {
        format: LogFormat,
    }

    #[test]
    fn test_format_parses_lowercase() {
        let section: Section = toml::from_str("format = \"json\"").unwrap();
        assert_eq!(section.format, LogFormat::Json);
        let section: Section = toml::from_str("format = \"pretty\"").unwrap();
        assert_eq!(section.format, LogFormat::Pretty);
    }

    #[test]
    fn test_unknown_format_rejected() {
        assert!(toml::from_str::<Section>("format = \"xml\"").is_err());
    }
}
