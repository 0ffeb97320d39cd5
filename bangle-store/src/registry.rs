//! Registry of heavy resources addressed by id
//!
//! Slices keep `ResourceId`s in their state instead of the resources
//! themselves. Releasing an id drops the resource, and every later lookup
//! with that id resolves to `None`.

use crate::types::ResourceId;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Shared map from `ResourceId` to an owned resource
pub struct ResourceRegistry<T> {
    entries: Arc<RwLock<HashMap<ResourceId, T>>>,
}

impl<T> ResourceRegistry<T> {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Take ownership of `resource` and hand back its id
    pub fn insert(&self, resource: T) -> ResourceId {
        let id = ResourceId::new();
        self.entries.write().insert(id, resource);
        debug!(resource = %id, "Resource registered");
        id
    }

    /// Borrow a resource for the duration of `f`
    pub fn with<R>(&self, id: ResourceId, f: impl FnOnce(&T) -> R) -> Option<R> {
        self.entries.read().get(&id).map(f)
    }

    pub fn with_mut<R>(&self, id: ResourceId, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        self.entries.write().get_mut(&id).map(f)
    }

    pub fn contains(&self, id: ResourceId) -> bool {
        self.entries.read().contains_key(&id)
    }

    /// Drop the resource behind `id`, returning it if it was still live
    pub fn release(&self, id: ResourceId) -> Option<T> {
        let released = self.entries.write().remove(&id);
        if released.is_some() {
            debug!(resource = %id, "Resource released");
        }
        released
    }

    /// Release every resource
    pub fn clear(&self) -> usize {
        let drained: Vec<T> = self.entries.write().drain().map(|(_, v)| v).collect();
        drained.len()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl<T> Clone for ResourceRegistry<T> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<T> Default for ResourceRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for ResourceRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceRegistry")
            .field("len", &self.len())
            .finish()
    }
}
