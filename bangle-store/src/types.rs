//! Identity types used by the store

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifier of a resource held in a `ResourceRegistry`
///
/// Ids are handed out instead of references so that releasing the
/// registry entry is enough to free the resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceId(pub u64);

static RESOURCE_COUNTER: AtomicU64 = AtomicU64::new(1);

impl ResourceId {
    /// Create a new unique resource ID
    pub fn new() -> Self {
        Self(RESOURCE_COUNTER.fetch_add(1, Ordering::SeqCst))
    }
}

impl Default for ResourceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "res:{}", self.0)
    }
}

/// Monotonic sequence number assigned to each committed dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DispatchSeq(pub u64);

impl DispatchSeq {
    /// The sequence number of the initial state
    pub fn genesis() -> Self {
        Self(0)
    }

    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for DispatchSeq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "seq:{}", self.0)
    }
}
