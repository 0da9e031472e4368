//! Updater configuration
//!
//! Loaded from a TOML file; every key is optional. A missing file gives the
//! defaults, an unreadable or invalid one is an error.

use crate::error::{Result, UpdaterError};
use crate::layout::{StorageLayout, DEFAULT_ENTRY_FILE};
use crate::stats::DeviceInfo;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

const APP_DIR: &str = "otter";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdaterConfig {
    /// Fast tier, one directory per bundle
    #[serde(default = "default_hot_root")]
    pub hot_root: PathBuf,

    /// Durable tier, one directory per bundle
    #[serde(default = "default_persist_root")]
    pub persist_root: PathBuf,

    /// Unpack area; must share a filesystem with both tiers
    #[serde(default = "default_scratch_root")]
    pub scratch_root: PathBuf,

    /// JSON file holding bundle records and pointers
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,

    #[serde(default = "default_entry_file")]
    pub entry_file: String,

    /// Stats endpoint; empty disables stats
    #[serde(default)]
    pub stats_url: String,

    /// Update-check endpoint
    #[serde(default)]
    pub update_url: String,

    #[serde(default)]
    pub app_id: String,

    #[serde(default)]
    pub device_id: String,

    /// Host app version name, also the native version for delay conditions
    #[serde(default)]
    pub version_build: String,

    #[serde(default)]
    pub version_code: String,

    #[serde(default)]
    pub os_version: String,

    /// Delete the previous fallback when a new bundle is confirmed
    #[serde(default = "default_auto_delete_previous")]
    pub auto_delete_previous: bool,
}

fn data_local_base() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from(".local/share"))
        .join(APP_DIR)
}

fn data_base() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from(".local/share"))
        .join(APP_DIR)
}

fn default_hot_root() -> PathBuf {
    data_local_base().join("versions")
}

fn default_persist_root() -> PathBuf {
    data_base().join("snapshots")
}

fn default_scratch_root() -> PathBuf {
    data_local_base().join("scratch")
}

fn default_state_path() -> PathBuf {
    data_base().join("state.json")
}

fn default_entry_file() -> String {
    DEFAULT_ENTRY_FILE.to_string()
}

fn default_auto_delete_previous() -> bool {
    true
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            hot_root: default_hot_root(),
            persist_root: default_persist_root(),
            scratch_root: default_scratch_root(),
            state_path: default_state_path(),
            entry_file: default_entry_file(),
            stats_url: String::new(),
            update_url: String::new(),
            app_id: String::new(),
            device_id: String::new(),
            version_build: String::new(),
            version_code: String::new(),
            os_version: String::new(),
            auto_delete_previous: default_auto_delete_previous(),
        }
    }
}

impl UpdaterConfig {
    /// Default config file location
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(APP_DIR)
            .join("config.toml")
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| UpdaterError::Config(format!("{}: {}", path.display(), e)))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| UpdaterError::Config(format!("{}: {}", path.display(), e)))?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// All state under one base directory, for tests and sandboxes
    pub fn rooted_at(base: &Path) -> Self {
        let layout = StorageLayout::under(base);
        Self {
            hot_root: layout.hot_root,
            persist_root: layout.persist_root,
            scratch_root: layout.scratch_root,
            state_path: base.join("state.json"),
            ..Self::default()
        }
    }

    pub fn layout(&self) -> StorageLayout {
        StorageLayout::new(&self.hot_root, &self.persist_root, &self.scratch_root)
            .with_entry_file(&self.entry_file)
    }

    pub fn device_info(&self) -> DeviceInfo {
        DeviceInfo {
            device_id: self.device_id.clone(),
            app_id: self.app_id.clone(),
            version_build: self.version_build.clone(),
            version_code: self.version_code.clone(),
            os_version: self.os_version.clone(),
            plugin_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
