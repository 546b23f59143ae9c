//! Group Registry
//!
//! Maps group names to live groups so the peer server can dispatch an inbound
//! request (`/{group}/{key}`) to the right namespace.
//!
//! ## Lifecycle
//! - **Creation**: `create_group` builds and registers a group in one step.
//!   Names are unique; a second group with the same name is rejected.
//! - **Lookup**: `get` is lock-free for readers on different shards and is
//!   what the peer server calls on every request.
//! - **Teardown**: `remove` unregisters a group. Requests already holding the
//!   `Arc<Group>` finish normally.

use super::group::Group;
use super::types::Loader;
use crate::error::{CacheError, Result};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;

pub struct GroupRegistry {
    groups: DashMap<String, Arc<Group>>,
}

impl GroupRegistry {
    /// Creates a new, empty registry.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Creates a group named `name` and registers it.
    ///
    /// # Errors
    /// `Misconfiguration` if the name is empty or already taken.
    pub fn create_group(&self, name: &str, cache_bytes: u64, loader: impl Loader) -> Result<Arc<Group>> {
        let group = Arc::new(Group::new(name, cache_bytes, loader)?);

        match self.groups.entry(name.to_string()) {
            Entry::Occupied(_) => Err(CacheError::Misconfiguration(format!(
                "group {} already registered",
                name
            ))),
            Entry::Vacant(entry) => {
                entry.insert(group.clone());
                tracing::info!("Registered group: {} ({} bytes)", name, cache_bytes);
                Ok(group)
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<Group>> {
        self.groups.get(name).map(|entry| entry.value().clone())
    }

    /// Same as [`GroupRegistry::get`], but reports a missing group as an error.
    pub fn require(&self, name: &str) -> Result<Arc<Group>> {
        self.get(name)
            .ok_or_else(|| CacheError::GroupNotFound(name.to_string()))
    }

    pub fn remove(&self, name: &str) -> Option<Arc<Group>> {
        let removed = self.groups.remove(name).map(|(_, group)| group);
        if removed.is_some() {
            tracing::info!("Unregistered group: {}", name);
        }
        removed
    }

    /// Returns a list of all registered group names.
    pub fn names(&self) -> Vec<String> {
        self.groups.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl Default for GroupRegistry {
    fn default() -> Self {
        Self {
            groups: DashMap::new(),
        }
    }
}
