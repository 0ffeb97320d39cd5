//! Side-effect descriptors
//!
//! A side effect reacts to state transitions; it never mutates state
//! except by dispatching. Three handler forms exist:
//!
//! - `deferred_once`: an async task spawned once after store creation,
//!   handed the store's abort signal
//! - `update`: called synchronously after every committed dispatch with
//!   the dispatched action and the previous state
//! - `reactor`: called synchronously when any of its selected values
//!   differ from the values it last saw

use super::key::{FieldValue, Selector};
use crate::abort::AbortSignal;
use crate::store::{DispatchedAction, Store, StoreState};
use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

pub(crate) type DeferredOnce = Box<dyn FnOnce(Store, AbortSignal) -> BoxFuture<'static, ()> + Send>;
pub(crate) type UpdateCallback =
    Arc<dyn Fn(&Store, &DispatchedAction, &StoreState) -> anyhow::Result<()> + Send + Sync>;
pub(crate) type ReactorCallback =
    Arc<dyn Fn(&Store, &SelectedValues) -> anyhow::Result<()> + Send + Sync>;

/// A named bundle of side-effect handlers
pub struct SideEffect {
    name: String,
    deferred_once: Option<DeferredOnce>,
    update: Option<UpdateCallback>,
    reactor: Option<(Vec<Selector>, ReactorCallback)>,
}

impl SideEffect {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            deferred_once: None,
            update: None,
            reactor: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run `task` once, asynchronously, after the store is created
    pub fn deferred_once<F, Fut>(mut self, task: F) -> Self
    where
        F: FnOnce(Store, AbortSignal) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.deferred_once = Some(Box::new(move |store, signal| Box::pin(task(store, signal))));
        self
    }

    /// Run `callback` after every committed dispatch
    pub fn update<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Store, &DispatchedAction, &StoreState) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.update = Some(Arc::new(callback));
        self
    }

    /// Run `callback` whenever one of `selectors` yields a new value
    pub fn reactor<F>(self, selectors: Vec<Selector>, callback: F) -> Self
    where
        F: Fn(&Store, &SelectedValues) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.with_reactor(selectors, Arc::new(callback))
    }

    pub(crate) fn with_reactor(mut self, selectors: Vec<Selector>, callback: ReactorCallback) -> Self {
        self.reactor = Some((selectors, callback));
        self
    }

    pub fn has_deferred_once(&self) -> bool {
        self.deferred_once.is_some()
    }

    pub fn has_update(&self) -> bool {
        self.update.is_some()
    }

    pub fn has_reactor(&self) -> bool {
        self.reactor.is_some()
    }

    pub(crate) fn into_parts(self) -> EffectParts {
        EffectParts {
            name: self.name,
            deferred_once: self.deferred_once,
            update: self.update,
            reactor: self.reactor,
        }
    }
}

impl fmt::Debug for SideEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SideEffect")
            .field("name", &self.name)
            .field("deferred_once", &self.has_deferred_once())
            .field("update", &self.has_update())
            .field("reactor", &self.reactor.as_ref().map(|(s, _)| s))
            .finish()
    }
}

pub(crate) struct EffectParts {
    pub name: String,
    pub deferred_once: Option<DeferredOnce>,
    pub update: Option<UpdateCallback>,
    pub reactor: Option<(Vec<Selector>, ReactorCallback)>,
}

/// The values a reactor's selectors produced for the current state
#[derive(Debug)]
pub struct SelectedValues {
    entries: Vec<(&'static str, Option<Box<dyn FieldValue>>)>,
}

impl SelectedValues {
    pub(crate) fn read(selectors: &[Selector], state: &StoreState) -> Self {
        Self {
            entries: selectors
                .iter()
                .map(|selector| (selector.label(), selector.read(state)))
                .collect(),
        }
    }

    /// Typed access by selector label
    pub fn get<T: 'static>(&self, label: &str) -> Option<&T> {
        self.entries
            .iter()
            .find(|(l, _)| *l == label)
            .and_then(|(_, value)| value.as_ref())
            .and_then(|value| value.as_any().downcast_ref::<T>())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether every entry equals the corresponding entry in `other`
    pub(crate) fn same_as(&self, other: &SelectedValues) -> bool {
        self.entries.len() == other.entries.len()
            && self
                .entries
                .iter()
                .zip(other.entries.iter())
                .all(|((_, a), (_, b))| match (a, b) {
                    (None, None) => true,
                    (Some(a), Some(b)) => a.eq_value(&**b),
                    _ => false,
                })
    }
}

impl Clone for SelectedValues {
    fn clone(&self) -> Self {
        Self {
            entries: self
                .entries
                .iter()
                .map(|(label, value)| (*label, value.as_ref().map(|v| v.clone_value())))
                .collect(),
        }
    }
}
