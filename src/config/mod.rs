//! Configuration for AlbertoX3
//!
//! Configuration is read from `~/.albertox3/config.json` (or the file named
//! by `ALBERTOX3_CONFIG`), with a few environment overrides on top. Every
//! field has a default, so a missing file yields a working configuration.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{AlbertoError, Result};
use crate::extensions::{CommandInventory, LibraryInventory, StaticInventory};
use crate::permissions::{default_levels, PermissionDefaults, PermissionLevel, PermissionLevels};

/// Environment variable naming an alternative config file.
pub const CONFIG_ENV: &str = "ALBERTOX3_CONFIG";

/// Upper bound of `cache_ttl_secs` (one year).
pub const MAX_CACHE_TTL_SECS: u64 = 365 * 24 * 60 * 60;

/// Runtime configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root folder scanned for extensions.
    pub extensions_folder: PathBuf,

    /// TTL of cached permission levels, in seconds.
    pub cache_ttl_secs: u64,

    /// Declared permission levels.
    pub permission_levels: Vec<PermissionLevel>,

    /// Level a permission starts with when it has no stored row.
    pub permission_default_level: i64,

    /// Per-permission starting levels, `{extension: {permission: level}}`.
    pub permission_default_overrides: HashMap<String, HashMap<String, i64>>,

    /// Installed libraries as `{name: version}`.
    pub libraries: HashMap<String, String>,

    /// Command printing installed libraries; replaces `libraries` when set.
    pub library_command: Option<Vec<String>>,

    /// Actor id of the bot owner.
    pub owner_id: Option<u64>,

    /// Default log filter when `RUST_LOG` is not set.
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            extensions_folder: PathBuf::from("./extensions"),
            cache_ttl_secs: 3600,
            permission_levels: default_levels(),
            permission_default_level: 0,
            permission_default_overrides: HashMap::new(),
            libraries: HashMap::new(),
            library_command: None,
            owner_id: None,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Base directory for AlbertoX3 data (`~/.albertox3`).
    pub fn dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".albertox3")
    }

    /// Config file location.
    pub fn path() -> PathBuf {
        std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| Self::dir().join("config.json"))
    }

    /// Directory of the file-backed store tables.
    pub fn db_dir() -> PathBuf {
        Self::dir().join("db")
    }

    /// Load `.env`, the config file and environment overrides, then validate.
    pub fn load() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!(path = %path.display(), "Loaded .env");
        }

        let mut config = Self::load_from(&Self::path())?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Read a config file. A missing or empty file gives the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            AlbertoError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_json::from_str(&content).map_err(|e| {
            AlbertoError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    /// Apply `ALBERTOX3_*` overrides looked up through `lookup`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(folder) = lookup("ALBERTOX3_EXTENSIONS_FOLDER") {
            self.extensions_folder = PathBuf::from(folder);
        }
        if let Some(ttl) = lookup("ALBERTOX3_CACHE_TTL") {
            self.cache_ttl_secs = ttl.trim().parse().map_err(|_| {
                AlbertoError::Config(format!("ALBERTOX3_CACHE_TTL is not a number: {}", ttl))
            })?;
        }
        if let Some(level) = lookup("ALBERTOX3_LOG_LEVEL") {
            self.log_level = level;
        }
        Ok(())
    }

    /// Check the cache TTL, the level table and that every default level
    /// is declared.
    pub fn validate(&self) -> Result<PermissionLevels> {
        if self.cache_ttl_secs > MAX_CACHE_TTL_SECS {
            return Err(AlbertoError::Config(format!(
                "cache_ttl_secs {} exceeds the maximum of {}",
                self.cache_ttl_secs, MAX_CACHE_TTL_SECS
            )));
        }

        let levels = PermissionLevels::new(self.permission_levels.clone())?;

        levels.find(self.permission_default_level).map_err(|_| {
            AlbertoError::Config(format!(
                "permission_default_level {} is not a declared level",
                self.permission_default_level
            ))
        })?;
        for (extension, names) in &self.permission_default_overrides {
            for (name, level) in names {
                levels.find(*level).map_err(|_| {
                    AlbertoError::Config(format!(
                        "Default level {} of {}.{} is not a declared level",
                        level, extension, name
                    ))
                })?;
            }
        }

        Ok(levels)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn permission_defaults(&self) -> PermissionDefaults {
        PermissionDefaults {
            default_level: self.permission_default_level,
            overrides: self.permission_default_overrides.clone(),
        }
    }

    /// The library inventory described by this config.
    pub fn inventory(&self) -> Box<dyn LibraryInventory> {
        match self.library_command.as_deref().and_then(CommandInventory::from_argv) {
            Some(inventory) => Box::new(inventory),
            None => Box::new(StaticInventory::new(self.libraries.clone())),
        }
    }
}
