//! Slice keys and selectors

use super::effect::{ReactorCallback, SelectedValues, SideEffect};
use crate::store::{Store, StoreState};
use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Unique token identifying one slice's sub-state
///
/// The key also scopes the action names the slice may declare: every
/// name must start with `action::<key name>:`.
pub struct SliceKey<S> {
    name: &'static str,
    _state: PhantomData<fn() -> S>,
}

impl<S> SliceKey<S> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _state: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The action-name prefix owned by this key
    pub fn action_prefix(&self) -> String {
        bangle_types::action_prefix(self.name)
    }

    pub fn owns_action_name(&self, action_name: &str) -> bool {
        action_name.starts_with(&self.action_prefix())
    }
}

impl<S> Clone for SliceKey<S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S> Copy for SliceKey<S> {}

impl<S> fmt::Debug for SliceKey<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SliceKey({})", self.name)
    }
}

impl<S> PartialEq for SliceKey<S> {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl<S: Send + Sync + 'static> SliceKey<S> {
    /// Read this slice's sub-state out of the whole-store state
    pub fn get(&self, state: &StoreState) -> Option<Arc<S>> {
        state.slice_state(self.name)?.downcast::<S>().ok()
    }

    /// Read this slice's sub-state from a store's current snapshot
    pub fn get_from(&self, store: &Store) -> Option<Arc<S>> {
        self.get(&store.state())
    }

    /// Build a pure accessor for one field of this slice
    pub fn select<T, F>(&self, label: &'static str, accessor: F) -> Selector
    where
        T: FieldValue + PartialEq + Clone,
        F: Fn(&S) -> T + Send + Sync + 'static,
    {
        let key = *self;
        Selector {
            label,
            read: Arc::new(move |state: &StoreState| {
                key.get(state)
                    .map(|sub| Box::new(accessor(&sub)) as Box<dyn FieldValue>)
            }),
        }
    }

    /// Start a side effect named after this key
    pub fn effect(&self, name: &str) -> SideEffect {
        SideEffect::new(format!("{}/{}", self.name, name))
    }

    /// Build a reactor scoped to this key
    pub fn reactor<F>(&self, name: &str, selectors: Vec<Selector>, callback: F) -> SideEffect
    where
        F: Fn(&Store, &SelectedValues) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let callback: ReactorCallback = Arc::new(callback);
        self.effect(name).with_reactor(selectors, callback)
    }
}

/// A selected value that can be compared with the value seen last time
pub trait FieldValue: Any + Send + Sync + fmt::Debug {
    fn as_any(&self) -> &dyn Any;

    fn eq_value(&self, other: &dyn FieldValue) -> bool;

    fn clone_value(&self) -> Box<dyn FieldValue>;
}

impl<T> FieldValue for T
where
    T: Any + Send + Sync + fmt::Debug + PartialEq + Clone,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn eq_value(&self, other: &dyn FieldValue) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| other == self)
    }

    fn clone_value(&self) -> Box<dyn FieldValue> {
        Box::new(self.clone())
    }
}

/// Pure accessor from the whole-store state to one selected value
#[derive(Clone)]
pub struct Selector {
    label: &'static str,
    read: Arc<dyn Fn(&StoreState) -> Option<Box<dyn FieldValue>> + Send + Sync>,
}

impl Selector {
    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Evaluate against a state snapshot; `None` if the slice is absent
    pub fn read(&self, state: &StoreState) -> Option<Box<dyn FieldValue>> {
        (self.read)(state)
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Selector({})", self.label)
    }
}
