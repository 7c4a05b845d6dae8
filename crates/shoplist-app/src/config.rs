//! # Application Configuration
//!
//! Settings that are fixed for the lifetime of a [`ShoppingApp`](crate::ShoppingApp).
//!
//! ## Configuration Sources (Priority Order)
//! 1. Environment variables (`SHOPLIST_*`)
//! 2. Config file (`shoplist.toml` in the platform config directory)
//! 3. Defaults (this file)
//!
//! Sort modes are not configuration: they change at runtime and live in
//! [`SortSettings`](crate::settings::SortSettings).

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use shoplist_core::{DEFAULT_CATEGORY, EXPORT_HEADER, MAX_NAME_LENGTH};
use tracing::{debug, info};

/// File name looked up in the config directory.
pub const CONFIG_FILE_NAME: &str = "shoplist.toml";

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct AppConfig {
    /// SQLite file. `None` resolves to `shoplist.db` in the platform data dir.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,

    /// Category prefilled in a blank item draft.
    /// Default: "Misc."
    pub default_category: String,

    /// First line of an exported list.
    /// Default: "Shopping List:"
    pub export_header: String,

    /// Categories created, in this order, when the database is empty.
    pub seed_categories: Vec<String>,

    /// TOML file backing the sort preferences. `None` keeps them in memory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferences_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            database_path: None,
            default_category: DEFAULT_CATEGORY.to_string(),
            export_header: EXPORT_HEADER.to_string(),
            seed_categories: vec![DEFAULT_CATEGORY.to_string()],
            preferences_path: None,
        }
    }
}

impl AppConfig {
    /// Platform project directories (`com.shoplist.shoplist`).
    pub fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("com", "shoplist", "shoplist")
    }

    /// Where `load_or_default` looks for the config file.
    pub fn default_path() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Reads a TOML config file, then applies env overrides and validates.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let mut config: AppConfig =
            toml::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        debug!(path = %path.display(), "Config file loaded");

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Loads the default config file if there is one, otherwise defaults.
    /// Env overrides apply either way.
    pub fn load_or_default() -> Result<Self, ConfigError> {
        if let Some(path) = Self::default_path() {
            if path.exists() {
                return Self::load(&path);
            }
        }

        let mut config = AppConfig::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Writes the config as TOML, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let io_error = |e: std::io::Error| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }
        let text = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))?;
        std::fs::write(path, text).map_err(io_error)?;

        info!(path = %path.display(), "Config saved");
        Ok(())
    }

    /// Applies `SHOPLIST_DB_PATH`, `SHOPLIST_DEFAULT_CATEGORY` and
    /// `SHOPLIST_EXPORT_HEADER`.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("SHOPLIST_DB_PATH") {
            self.database_path = Some(PathBuf::from(path));
        }

        if let Ok(category) = std::env::var("SHOPLIST_DEFAULT_CATEGORY") {
            self.default_category = category;
        }

        if let Ok(header) = std::env::var("SHOPLIST_EXPORT_HEADER") {
            self.export_header = header;
        }
    }

    /// Checks the values a handler would otherwise trip over.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let category = self.default_category.trim();
        if category.is_empty() {
            return Err(ConfigError::InvalidValue("default_category".to_string()));
        }
        if category.chars().count() > MAX_NAME_LENGTH {
            return Err(ConfigError::InvalidValue("default_category".to_string()));
        }
        if self.seed_categories.iter().any(|c| c.trim().is_empty()) {
            return Err(ConfigError::InvalidValue("seed_categories".to_string()));
        }
        Ok(())
    }

    /// Resolved database file path.
    pub fn resolve_database_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(path) = &self.database_path {
            return Ok(path.clone());
        }

        let dirs = Self::project_dirs()
            .ok_or_else(|| ConfigError::MissingRequired("data directory".to_string()))?;
        let data_dir = dirs.data_dir();
        std::fs::create_dir_all(data_dir).map_err(|e| ConfigError::Io {
            path: data_dir.display().to_string(),
            message: e.to_string(),
        })?;

        Ok(data_dir.join("shoplist.db"))
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Could not parse config: {0}")]
    Parse(String),

    #[error("Could not access {path}: {message}")]
    Io { path: String, message: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}
