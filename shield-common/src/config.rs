//! Configuration loading
//!
//! Settings resolve through four tiers, first match wins:
//! 1. Command-line arguments (passed in by the binary)
//! 2. Environment variables (handled by clap's `env` feature in the binary)
//! 3. TOML config file (`shield/config.toml` under the OS config directory)
//! 4. Built-in defaults

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 5800;
const DEFAULT_CHEF_SESSION_TTL_HOURS: i64 = 8;

/// Resolved runtime settings
#[derive(Debug, Clone)]
pub struct Settings {
    /// SQLite database file path
    pub database_path: PathBuf,
    /// Bind host
    pub host: String,
    /// Bind port
    pub port: u16,
    /// Chef-centre session lifetime in hours
    pub chef_session_ttl_hours: i64,
}

/// Optional overrides read from the TOML config file
#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    database_path: Option<PathBuf>,
    host: Option<String>,
    port: Option<u16>,
    chef_session_ttl_hours: Option<i64>,
}

impl Settings {
    /// Resolve settings from CLI overrides, a config file, and defaults
    pub fn load(
        config_file: Option<&Path>,
        database: Option<PathBuf>,
        host: Option<String>,
        port: Option<u16>,
    ) -> Result<Self> {
        let file = match config_file {
            Some(path) => Self::read_file(path)?,
            None => {
                let default = default_config_path();
                if default.exists() {
                    Self::read_file(&default)?
                } else {
                    debug!("No config file at {}, using defaults", default.display());
                    FileSettings::default()
                }
            }
        };

        let settings = Settings {
            database_path: database
                .or(file.database_path)
                .unwrap_or_else(default_database_path),
            host: host.or(file.host).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: port.or(file.port).unwrap_or(DEFAULT_PORT),
            chef_session_ttl_hours: file
                .chef_session_ttl_hours
                .unwrap_or(DEFAULT_CHEF_SESSION_TTL_HOURS),
        };

        info!(
            "Settings: database={} bind={}:{}",
            settings.database_path.display(),
            settings.host,
            settings.port
        );
        Ok(settings)
    }

    fn read_file(path: &Path) -> Result<FileSettings> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        toml::from_str(&raw)
            .map_err(|e| Error::Config(format!("cannot parse {}: {}", path.display(), e)))
    }
}

/// Default config file location under the OS config directory
fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("shield")
        .join("config.toml")
}

/// Default database location under the OS data directory
fn default_database_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("shield")
        .join("shield.db")
}
