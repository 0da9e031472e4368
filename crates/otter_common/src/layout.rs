//! Storage layout conventions
//!
//! Each downloaded bundle `X` lives twice: `<hot_root>/X` (fast, may be
//! cleared by the platform) and `<persist_root>/X` (durable, authoritative).
//! Archives are unpacked under `scratch_root` before being moved into place.

use std::path::{Path, PathBuf};

/// Entry file every usable bundle carries at its root
pub const DEFAULT_ENTRY_FILE: &str = "index.html";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLayout {
    pub hot_root: PathBuf,
    pub persist_root: PathBuf,
    pub scratch_root: PathBuf,
    pub entry_file: String,
}

impl StorageLayout {
    pub fn new(
        hot_root: impl Into<PathBuf>,
        persist_root: impl Into<PathBuf>,
        scratch_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            hot_root: hot_root.into(),
            persist_root: persist_root.into(),
            scratch_root: scratch_root.into(),
            entry_file: DEFAULT_ENTRY_FILE.to_string(),
        }
    }

    /// Layout rooted in a single directory, with one subdirectory per tier
    pub fn under(base: &Path) -> Self {
        Self::new(
            base.join("versions"),
            base.join("snapshots"),
            base.join("scratch"),
        )
    }

    pub fn with_entry_file(mut self, entry_file: &str) -> Self {
        self.entry_file = entry_file.to_string();
        self
    }

    pub fn hot_path(&self, id: &str) -> PathBuf {
        self.hot_root.join(id)
    }

    pub fn persist_path(&self, id: &str) -> PathBuf {
        self.persist_root.join(id)
    }

    /// Both tiers are directories holding the entry file
    pub fn is_installed(&self, id: &str) -> bool {
        if id.is_empty() {
            return false;
        }
        let hot = self.hot_path(id);
        let persist = self.persist_path(id);
        hot.is_dir()
            && persist.is_dir()
            && hot.join(&self.entry_file).exists()
            && persist.join(&self.entry_file).exists()
    }
}
