//! Bundle metadata store
//!
//! One JSON record per downloaded bundle under `<id>_info`. Reads never fail:
//! a missing or corrupt record degrades to a pending placeholder, and the
//! builtin/unknown ids are answered without touching storage.

use crate::bundle::{BundleInfo, BundleStatus, ID_BUILTIN, ID_UNKNOWN};
use crate::error::Result;
use crate::kv::KvStore;
use crate::layout::StorageLayout;
use std::fs;
use std::sync::Arc;
use tracing::{debug, warn};

const INFO_SUFFIX: &str = "_info";

/// Outcome of a record lookup that keeps "absent" and "corrupt" apart
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Found(BundleInfo),
    Absent,
    Degraded { id: String, reason: String },
}

#[derive(Clone)]
pub struct BundleStore {
    kv: Arc<dyn KvStore>,
    layout: StorageLayout,
}

impl BundleStore {
    pub fn new(kv: Arc<dyn KvStore>, layout: StorageLayout) -> Self {
        Self { kv, layout }
    }

    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    fn key(id: &str) -> String {
        format!("{}{}", id, INFO_SUFFIX)
    }

    /// Look up a stored record, distinguishing absence from corruption.
    pub fn lookup(&self, id: &str) -> Lookup {
        if id == ID_BUILTIN {
            return Lookup::Found(BundleInfo::builtin());
        }
        if id == ID_UNKNOWN {
            return Lookup::Found(BundleInfo::unknown());
        }

        let Some(raw) = self.kv.get(&Self::key(id)) else {
            return Lookup::Absent;
        };
        match serde_json::from_str::<BundleInfo>(&raw) {
            Ok(info) => Lookup::Found(info.with_id(id)),
            Err(e) => Lookup::Degraded {
                id: id.to_string(),
                reason: e.to_string(),
            },
        }
    }

    pub fn get(&self, id: &str) -> BundleInfo {
        debug!("Getting info for bundle [{}]", id);
        match self.lookup(id) {
            Lookup::Found(info) => info,
            Lookup::Absent => BundleInfo::placeholder(id),
            Lookup::Degraded { reason, .. } => {
                warn!("Failed to parse info for bundle [{}]: {}", id, reason);
                BundleInfo::placeholder(id)
            }
        }
    }

    /// Store a record under `id`. Builtin and unknown records are skipped.
    pub fn put(&self, id: &str, info: &BundleInfo) -> Result<()> {
        if info.is_builtin() || info.is_unknown() {
            debug!("Not saving info for bundle [{}] {}", id, info);
            return Ok(());
        }
        let update = info.clone().with_id(id);
        debug!("Storing info for bundle [{}] {}", id, update);
        let raw = serde_json::to_string(&update)?;
        self.kv.set(&Self::key(id), &raw)
    }

    pub fn remove(&self, id: &str) -> Result<()> {
        debug!("Removing info for bundle [{}]", id);
        self.kv.remove(&Self::key(id))
    }

    /// One record per directory in the hot tier. Re-invoke to restart.
    pub fn list_all(&self) -> impl Iterator<Item = BundleInfo> + '_ {
        let entries = match fs::read_dir(&self.layout.hot_root) {
            Ok(entries) => Some(entries),
            Err(e) => {
                debug!("No bundle available in {}: {}", self.layout.hot_root.display(), e);
                None
            }
        };

        entries
            .into_iter()
            .flatten()
            .filter_map(|entry| entry.ok())
            .map(move |entry| self.get(&entry.file_name().to_string_lossy()))
    }

    pub fn find_by_version(&self, version: &str) -> Option<BundleInfo> {
        self.list_all().find(|info| info.version == version)
    }

    pub fn set_status(&self, id: &str, status: BundleStatus) -> Result<()> {
        debug!("Setting status for bundle [{}] to {}", id, status);
        let info = self.get(id).with_status(status);
        self.put(id, &info)
    }

    pub fn set_version_name(&self, id: &str, version: &str) -> Result<()> {
        debug!("Setting version for bundle [{}] to {}", id, version);
        let info = self.get(id).with_version(version);
        self.put(id, &info)
    }
}
