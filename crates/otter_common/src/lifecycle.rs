//! Bundle lifecycle controller
//!
//! Per-bundle states: downloading → pending → success | error, with pending
//! re-entered whenever a bundle is activated or staged again.
//!
//! Pointers:
//! - current: path of the persist-tier copy being served (absent = builtin)
//! - fallback: last bundle confirmed to load (absent = builtin)
//! - next: bundle to activate on the next launch (absent = none)
//!
//! Guarantees: only fully installed bundles become current or next, the
//! builtin and current bundles are never deleted, and every pointer change
//! goes through this type.

use crate::bundle::{BundleInfo, BundleStatus, ID_BUILTIN};
use crate::delay::{self, DelayCondition};
use crate::error::Result;
use crate::state::PersistentState;
use crate::stats::StatsSink;
use crate::store::BundleStore;
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[derive(Clone)]
pub struct LifecycleController {
    store: BundleStore,
    state: PersistentState,
    stats: Arc<dyn StatsSink>,
}

impl LifecycleController {
    pub fn new(store: BundleStore, state: PersistentState, stats: Arc<dyn StatsSink>) -> Self {
        Self {
            store,
            state,
            stats,
        }
    }

    pub fn store(&self) -> &BundleStore {
        &self.store
    }

    /// Every bundle present in the hot tier
    pub fn list(&self) -> Vec<BundleInfo> {
        self.store.list_all().collect()
    }

    /// Persist-tier directory of a bundle
    pub fn bundle_path(&self, id: &str) -> PathBuf {
        self.store.layout().persist_path(id)
    }

    /// Make `id` the current bundle. Builtin resets all pointers.
    pub fn activate(&self, id: &str) -> bool {
        let bundle = self.store.get(id);
        if bundle.is_builtin() {
            self.reset(false);
            return true;
        }

        if !is_valid_id(id) || !self.store.layout().is_installed(id) {
            warn!("Bundle [{}] is not installed, cannot activate", id);
            self.stats.send("set_fail", bundle.version_name());
            return false;
        }

        let path = self.bundle_path(id);
        if let Err(e) = self.state.set_current_path(Some(&path.to_string_lossy())) {
            error!("Cannot store current bundle [{}]: {}", id, e);
            self.stats.send("set_fail", bundle.version_name());
            return false;
        }
        info!("Current bundle set to: {}", path.display());

        self.record_status(id, BundleStatus::Pending);
        self.stats.send("set", bundle.version_name());
        true
    }

    pub fn activate_bundle(&self, bundle: &BundleInfo) -> bool {
        self.activate(&bundle.id)
    }

    /// Back to builtin: clears current, fallback and next.
    /// Internal resets (recovery paths) are not reported to stats.
    pub fn reset(&self, internal: bool) {
        info!("reset: internal={}", internal);
        let results = [
            self.state.set_current_path(None),
            self.state.set_fallback_id(None),
            self.state.set_next_id(None),
        ];
        for result in results {
            if let Err(e) = result {
                error!("Reset could not clear a pointer: {}", e);
            }
        }
        if !internal {
            self.stats
                .send("reset", self.current_bundle().version_name());
        }
    }

    /// The host loaded `bundle` correctly: it becomes the fallback.
    pub fn confirm_success(&self, bundle: &BundleInfo, auto_delete_previous: bool) {
        self.record_status(&bundle.id, BundleStatus::Success);

        let fallback = self.fallback_bundle();
        debug!("Fallback bundle is: {}", fallback);
        info!("Version successfully loaded: {}", bundle);

        if auto_delete_previous && !fallback.is_builtin() && fallback.id != bundle.id {
            if self.delete(&fallback.id) {
                info!("Deleted previous bundle: {}", fallback);
            } else {
                warn!("Failed to delete previous bundle: {}", fallback);
            }
        }

        if let Err(e) = self.state.set_fallback_id(Some(&bundle.id)) {
            error!("Cannot store fallback bundle [{}]: {}", bundle.id, e);
        }
    }

    /// The host failed to load `bundle`. Rolling back is the host's call:
    /// it activates `fallback_bundle()` itself.
    pub fn confirm_error(&self, bundle: &BundleInfo) {
        warn!("Bundle marked as failed: {}", bundle);
        self.record_status(&bundle.id, BundleStatus::Error);
    }

    /// Delete both tiers and the record of `id`.
    pub fn delete(&self, id: &str) -> bool {
        self.delete_with(id, true)
    }

    /// Delete both tiers of `id`, keeping the record unless `remove_record`.
    /// Refuses builtin and the current bundle.
    pub fn delete_with(&self, id: &str, remove_record: bool) -> bool {
        let deleted = self.store.get(id);
        if deleted.is_builtin() || !is_valid_id(id) || self.current_bundle_id() == id {
            warn!("Cannot delete {}", id);
            return false;
        }

        let layout = self.store.layout();
        let persist = layout.persist_path(id);
        if let Err(e) = fs::remove_dir_all(&persist) {
            error!("Folder {} not removed: {}", persist.display(), e);
            return false;
        }
        let hot = layout.hot_path(id);
        if let Err(e) = fs::remove_dir_all(&hot) {
            warn!("Hot folder {} not removed: {}", hot.display(), e);
        }

        if remove_record {
            if let Err(e) = self.store.remove(id) {
                warn!("Record of bundle [{}] not removed: {}", id, e);
            }
        }
        self.stats.send("delete", deleted.version_name());
        true
    }

    /// Stage `id` for the next launch; `None` clears the staged bundle.
    pub fn stage_next(&self, id: Option<&str>) -> bool {
        let Some(next_id) = id else {
            if let Err(e) = self.state.set_next_id(None) {
                error!("Cannot clear next bundle: {}", e);
                return false;
            }
            return true;
        };

        let bundle = self.store.get(next_id);
        if !bundle.is_builtin()
            && (!is_valid_id(next_id) || !self.store.layout().is_installed(next_id))
        {
            warn!("Bundle [{}] is not installed, cannot stage it", next_id);
            return false;
        }

        if let Err(e) = self.state.set_next_id(Some(next_id)) {
            error!("Cannot store next bundle [{}]: {}", next_id, e);
            return false;
        }
        self.record_status(next_id, BundleStatus::Pending);
        true
    }

    /// Activate the staged bundle, if any, once its date and native-version
    /// delay conditions are met. Meant for application startup, or for the
    /// host's background and kill events.
    ///
    /// A held-back bundle stays staged. Otherwise the staging pointer and the
    /// delay conditions are cleared, whether or not activation succeeds.
    pub fn apply_next(&self, now: DateTime<Utc>, native_version: &str) -> Option<BundleInfo> {
        let next = self.next_bundle()?;
        let conditions = self.delay_conditions();
        if !delay::all_met(&conditions, now, native_version) {
            info!("Staged bundle held back by delay conditions: {}", next);
            return None;
        }

        let applied = self.activate(&next.id);
        if let Err(e) = self.state.set_next_id(None) {
            error!("Cannot clear next bundle: {}", e);
        }
        if let Err(e) = self.clear_delay_conditions() {
            error!("Cannot clear delay conditions: {}", e);
        }
        if applied {
            info!("Applied staged bundle: {}", next);
            Some(self.current_bundle())
        } else {
            warn!("Staged bundle could not be applied: {}", next);
            None
        }
    }

    pub fn current_bundle(&self) -> BundleInfo {
        self.store.get(&self.current_bundle_id())
    }

    /// Id of the current bundle: last segment of the stored path
    pub fn current_bundle_id(&self) -> String {
        let Some(path) = self.state.current_path() else {
            return ID_BUILTIN.to_string();
        };
        Path::new(&path)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or(path)
    }

    pub fn fallback_bundle(&self) -> BundleInfo {
        let id = self
            .state
            .fallback_id()
            .unwrap_or_else(|| ID_BUILTIN.to_string());
        self.store.get(&id)
    }

    pub fn next_bundle(&self) -> Option<BundleInfo> {
        self.state.next_id().map(|id| self.store.get(&id))
    }

    pub fn is_using_builtin(&self) -> bool {
        self.state.current_path().is_none()
    }

    pub fn delay_conditions(&self) -> Vec<DelayCondition> {
        self.state.delay_conditions()
    }

    pub fn set_delay_conditions(&self, conditions: &[DelayCondition]) -> Result<()> {
        self.state.set_delay_conditions(conditions)
    }

    pub fn clear_delay_conditions(&self) -> Result<()> {
        self.state.set_delay_conditions(&[])
    }

    fn record_status(&self, id: &str, status: BundleStatus) {
        if let Err(e) = self.store.set_status(id, status) {
            error!("Cannot set status of bundle [{}] to {}: {}", id, status, e);
        }
    }
}

/// Ids are single path segments
fn is_valid_id(id: &str) -> bool {
    !id.is_empty() && id != "." && id != ".." && !id.contains(['/', '\\'])
}
