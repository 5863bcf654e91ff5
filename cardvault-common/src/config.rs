//! Configuration loading and root folder resolution
//!
//! Root folder priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`CARDVAULT_ROOT_FOLDER`)
//! 3. TOML config file
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing or unreadable TOML file never aborts startup; defaults are used
//! and a warning is logged.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "CARDVAULT_ROOT_FOLDER";

/// SQLite database file name inside the root folder
pub const DATABASE_FILENAME: &str = "cardvault.db";

/// Blob storage directory inside the root folder
pub const STORAGE_DIRNAME: &str = "storage";

pub const DEFAULT_PORT: u16 = 5730;
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1";
pub const DEFAULT_SCRYFALL_BASE_URL: &str = "https://api.scryfall.com";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Bootstrap configuration loaded from TOML file
///
/// Every key is optional. These settings are read once at startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Root folder holding the database and blob storage
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// HTTP server port
    #[serde(default)]
    pub port: Option<u16>,

    /// HTTP bind address
    #[serde(default)]
    pub bind_address: Option<String>,

    /// Base URL of the external card-data API
    #[serde(default)]
    pub scryfall_base_url: Option<String>,

    /// Timeout for external API calls and asset downloads
    #[serde(default)]
    pub http_timeout_secs: Option<u64>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Parse a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read TOML failed: {}", e)))?;
        toml::from_str(&content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Load from an explicit path or the platform default location
    ///
    /// Falls back to defaults (with a warning) when nothing usable is found.
    pub fn load_or_default(explicit: Option<&Path>) -> Self {
        let path = match explicit {
            Some(p) => Some(p.to_path_buf()),
            None => default_config_path(),
        };

        match path {
            Some(p) => match Self::load(&p) {
                Ok(config) => {
                    info!("Loaded config file: {}", p.display());
                    config
                }
                Err(e) => {
                    warn!("Config file {} unusable ({}), using defaults", p.display(), e);
                    Self::default()
                }
            },
            None => {
                info!("No config file found, using defaults");
                Self::default()
            }
        }
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    pub fn bind_address(&self) -> &str {
        self.bind_address.as_deref().unwrap_or(DEFAULT_BIND_ADDRESS)
    }

    pub fn http_timeout_secs(&self) -> u64 {
        self.http_timeout_secs.unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS)
    }
}

/// Get default configuration file path for the platform
///
/// Tries `<config_dir>/cardvault/config.toml`, then `/etc/cardvault/config.toml`
/// on Linux. Returns None if neither exists.
pub fn default_config_path() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("cardvault").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/cardvault/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Get OS-dependent default root folder path
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("cardvault"))
        .unwrap_or_else(|| PathBuf::from("./cardvault_data"))
}

/// Resolves the root folder following the documented priority order
#[derive(Debug, Clone, Default)]
pub struct RootFolderResolver {
    cli_arg: Option<PathBuf>,
    toml_root: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new(cli_arg: Option<PathBuf>, toml: &TomlConfig) -> Self {
        Self {
            cli_arg,
            toml_root: toml.root_folder.clone(),
        }
    }

    pub fn resolve(&self) -> PathBuf {
        // Priority 1: Command-line argument
        if let Some(path) = &self.cli_arg {
            info!("Root folder from command line: {}", path.display());
            return path.clone();
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if !path.trim().is_empty() {
                info!("Root folder from {}: {}", ROOT_FOLDER_ENV, path);
                return PathBuf::from(path);
            }
        }

        // Priority 3: TOML config file
        if let Some(path) = &self.toml_root {
            info!("Root folder from config file: {}", path.display());
            return path.clone();
        }

        // Priority 4: OS-dependent compiled default
        let path = default_root_folder();
        info!("Root folder from compiled default: {}", path.display());
        path
    }
}

/// Creates the root folder layout and hands out paths inside it
#[derive(Debug, Clone)]
pub struct RootFolderInitializer {
    root: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create root and storage directories if missing
    pub fn ensure_directory_exists(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root)?;
        std::fs::create_dir_all(self.storage_path())?;
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.root.join(DATABASE_FILENAME)
    }

    pub fn storage_path(&self) -> PathBuf {
        self.root.join(STORAGE_DIRNAME)
    }
}
