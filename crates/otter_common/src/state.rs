//! Lifecycle pointers
//!
//! Three scalar keys in the durable substrate: the path of the current
//! bundle, the id of the fallback bundle and the id of the bundle staged for
//! the next launch. Absent keys mean builtin / builtin / nothing staged.
//! Only the lifecycle controller writes through this type.

use crate::delay::DelayCondition;
use crate::error::Result;
use crate::kv::KvStore;
use std::sync::Arc;
use tracing::warn;

/// Path of the bundle currently served; empty means builtin
pub const CURRENT_KEY: &str = "serverBasePath";
pub const FALLBACK_KEY: &str = "pastVersion";
pub const NEXT_KEY: &str = "nextVersion";
pub const DELAY_KEY: &str = "delayConditions";

#[derive(Clone)]
pub struct PersistentState {
    kv: Arc<dyn KvStore>,
}

impl PersistentState {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    pub fn current_path(&self) -> Option<String> {
        self.kv.get(CURRENT_KEY).filter(|p| !p.is_empty())
    }

    /// `None` stores the empty path, i.e. builtin
    pub fn set_current_path(&self, path: Option<&str>) -> Result<()> {
        self.kv.set(CURRENT_KEY, path.unwrap_or(""))
    }

    pub fn fallback_id(&self) -> Option<String> {
        self.kv.get(FALLBACK_KEY).filter(|id| !id.is_empty())
    }

    pub fn set_fallback_id(&self, id: Option<&str>) -> Result<()> {
        match id {
            Some(id) => self.kv.set(FALLBACK_KEY, id),
            None => self.kv.set(FALLBACK_KEY, crate::bundle::ID_BUILTIN),
        }
    }

    pub fn next_id(&self) -> Option<String> {
        self.kv.get(NEXT_KEY).filter(|id| !id.is_empty())
    }

    pub fn set_next_id(&self, id: Option<&str>) -> Result<()> {
        match id {
            Some(id) => self.kv.set(NEXT_KEY, id),
            None => self.kv.remove(NEXT_KEY),
        }
    }

    pub fn delay_conditions(&self) -> Vec<DelayCondition> {
        let Some(raw) = self.kv.get(DELAY_KEY) else {
            return Vec::new();
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!("Ignoring unreadable delay conditions: {}", e);
            Vec::new()
        })
    }

    pub fn set_delay_conditions(&self, conditions: &[DelayCondition]) -> Result<()> {
        if conditions.is_empty() {
            return self.kv.remove(DELAY_KEY);
        }
        let raw = serde_json::to_string(conditions)?;
        self.kv.set(DELAY_KEY, &raw)
    }
}
