//! Immutable whole-store snapshots

use crate::types::DispatchSeq;
use bangle_types::{Action, ActionOrigin};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// One slice's sub-state with its type erased
pub type SubState = Arc<dyn Any + Send + Sync>;

/// An action as committed by the store, tagged with where it came from
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchedAction {
    pub action: Action,
    pub origin: ActionOrigin,
    pub seq: DispatchSeq,
}

/// Merged state of every slice plus the store-wide last action
///
/// Snapshots are cheap to clone and never change once handed out; a
/// dispatch produces a new snapshot that shares every untouched sub-state.
#[derive(Clone)]
pub struct StoreState {
    slices: Arc<HashMap<&'static str, SubState>>,
    last_action: Option<Arc<DispatchedAction>>,
    seq: DispatchSeq,
}

impl StoreState {
    pub(crate) fn from_slices(slices: impl IntoIterator<Item = (&'static str, SubState)>) -> Self {
        Self {
            slices: Arc::new(slices.into_iter().collect()),
            last_action: None,
            seq: DispatchSeq::genesis(),
        }
    }

    /// Erased sub-state for a slice key name
    pub fn slice_state(&self, name: &str) -> Option<SubState> {
        self.slices.get(name).cloned()
    }

    pub fn has_slice(&self, name: &str) -> bool {
        self.slices.contains_key(name)
    }

    /// The action whose dispatch produced this snapshot
    pub fn last_action(&self) -> Option<&DispatchedAction> {
        self.last_action.as_deref()
    }

    pub fn seq(&self) -> DispatchSeq {
        self.seq
    }

    /// Whether `name`'s sub-state is the same allocation in both snapshots
    pub fn same_slice_state(&self, other: &StoreState, name: &str) -> bool {
        match (self.slices.get(name), other.slices.get(name)) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }

    pub(crate) fn sub_states(&self) -> &HashMap<&'static str, SubState> {
        &self.slices
    }

    /// Commit a set of sub-states as the successor of `self`
    pub(crate) fn successor(
        &self,
        slices: HashMap<&'static str, SubState>,
        action: Action,
        origin: ActionOrigin,
    ) -> Self {
        let seq = self.seq.next();
        Self {
            slices: Arc::new(slices),
            last_action: Some(Arc::new(DispatchedAction {
                action,
                origin,
                seq,
            })),
            seq,
        }
    }
}

impl fmt::Debug for StoreState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.slices.keys().collect();
        names.sort();
        f.debug_struct("StoreState")
            .field("slices", &names)
            .field("last_action", &self.last_action)
            .field("seq", &self.seq)
            .finish()
    }
}
