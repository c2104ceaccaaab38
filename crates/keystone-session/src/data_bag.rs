//! Per-owner keyed state attached to a session.
//!
//! Independent collaborators store values under their own owner name, so two
//! modules using the same key never see each other's data.
//!
//! A detached bag ignores writes; it backs sessions shared by unrelated
//! callers, where stored state would leak between them.

use parking_lot::RwLock;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

type Value = Arc<dyn Any + Send + Sync>;

/// Keyed storage partitioned by owner.
#[derive(Default)]
pub struct DataBag {
    entries: RwLock<HashMap<String, HashMap<String, Value>>>,
    detached: bool,
}

impl DataBag {
    /// Empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bag on which `set` is a silent no-op; reads always come back empty.
    pub fn detached() -> Self {
        Self {
            entries: RwLock::default(),
            detached: true,
        }
    }

    /// Whether writes are ignored.
    pub fn is_detached(&self) -> bool {
        self.detached
    }

    /// Store `value` under `(owner, key)`, replacing any previous value.
    pub fn set<T>(&self, owner: &str, key: &str, value: T)
    where
        T: Any + Send + Sync,
    {
        if self.detached {
            return;
        }
        self.entries
            .write()
            .entry(owner.to_string())
            .or_default()
            .insert(key.to_string(), Arc::new(value));
    }

    /// Value under `(owner, key)` if present and of type `T`.
    pub fn get<T>(&self, owner: &str, key: &str) -> Option<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        let value = self.entries.read().get(owner)?.get(key)?.clone();
        value.downcast::<T>().ok()
    }

    /// Remove `(owner, key)`; returns whether something was removed.
    pub fn remove(&self, owner: &str, key: &str) -> bool {
        let mut entries = self.entries.write();
        let Some(owned) = entries.get_mut(owner) else {
            return false;
        };
        let removed = owned.remove(key).is_some();
        if owned.is_empty() {
            entries.remove(owner);
        }
        removed
    }

    /// Drop everything `owner` stored.
    pub fn clear_owner(&self, owner: &str) {
        self.entries.write().remove(owner);
    }

    /// Keys stored by `owner`.
    pub fn keys(&self, owner: &str) -> Vec<String> {
        self.entries
            .read()
            .get(owner)
            .map(|owned| owned.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl std::fmt::Debug for DataBag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries = self.entries.read();
        let mut map = f.debug_map();
        for (owner, owned) in entries.iter() {
            map.entry(owner, &owned.keys().collect::<Vec<_>>());
        }
        map.finish()
    }
}
