//! Configuration loading
//!
//! The server reads one TOML file holding the admin key, the database
//! path, the path manifest location, and the bind address. The file
//! location resolves in priority order:
//! 1. Command-line argument (highest priority)
//! 2. `ANNO_CONFIG` environment variable
//! 3. `./anno.toml` in the working directory (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming the config file.
pub const CONFIG_ENV_VAR: &str = "ANNO_CONFIG";

const DEFAULT_CONFIG_PATH: &str = "anno.toml";

/// Server configuration from the TOML config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Key admin clients must present for registration, migration
    /// submits, and deletion requests.
    #[serde(rename = "admin-key")]
    pub admin_key: String,

    /// Path to the SQLite database file backing all three buckets.
    #[serde(rename = "db-path", default = "default_db_path")]
    pub db_path: PathBuf,

    /// Path to the path manifest CSV (clan_file, block_index, block_path).
    #[serde(rename = "manifest-path", default = "default_manifest_path")]
    pub manifest_path: PathBuf,

    /// Address the HTTP server binds to.
    #[serde(rename = "bind-addr", default = "default_bind_addr")]
    pub bind_addr: String,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("db/anno.db")
}

fn default_manifest_path() -> PathBuf {
    PathBuf::from("data/path_manifest.csv")
}

fn default_bind_addr() -> String {
    "127.0.0.1:8080".to_string()
}

impl ServerConfig {
    /// Resolve the config file location and load it.
    pub fn load(cli_arg: Option<&Path>) -> Result<Self> {
        // Priority 1: Command-line argument
        if let Some(path) = cli_arg {
            return Self::from_file(path);
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            return Self::from_file(Path::new(&path));
        }

        // Priority 3: working-directory default
        Self::from_file(Path::new(DEFAULT_CONFIG_PATH))
    }

    /// Parse a config file at a known location.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Could not read config file {}: {}", path.display(), e))
        })?;
        let config: ServerConfig = toml::from_str(&text)
            .map_err(|e| Error::Config(format!("Invalid config file {}: {}", path.display(), e)))?;
        if config.admin_key.is_empty() {
            return Err(Error::Config("admin-key must not be empty".to_string()));
        }
        Ok(config)
    }

    /// Whether a presented key grants admin access.
    pub fn key_is_admin(&self, key: &str) -> bool {
        !self.admin_key.is_empty() && key == self.admin_key
    }
}
