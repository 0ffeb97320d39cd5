//! The dispatch engine
//!
//! A `Store` owns an ordered list of slices and the current `StoreState`.
//! Dispatch is the only mutation path:
//!
//! 1. every slice's `apply` runs, in registration order, on the snapshot
//! 2. if any slice fails, nothing is committed and the error is returned
//! 3. the new snapshot is committed with the action in `last_action`
//! 4. `update` handlers run, then reactors whose selected values changed
//!
//! Effects may dispatch again. The dispatch gate is re-entrant so a nested
//! dispatch on the same thread completes, effects included, before the
//! outer effect pass resumes.

mod state;

pub use state::{DispatchedAction, StoreState, SubState};

use crate::abort::{AbortController, AbortSignal};
use crate::error::{Result, StoreError};
use crate::slice::{
    AnySlice, EffectParts, ReactorCallback, SelectedValues, Selector, UpdateCallback,
};
use bangle_types::{action_prefix, Action, ActionOrigin, ExecutionContext, SliceAction};
use parking_lot::{Mutex, ReentrantMutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, error, info};

/// Per-store settings handed to every slice's `init`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    pub name: String,
    pub context: ExecutionContext,
}

impl StoreConfig {
    pub fn new(name: impl Into<String>, context: ExecutionContext) -> Self {
        Self {
            name: name.into(),
            context,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new("bangle-store", ExecutionContext::Window)
    }
}

struct UpdateEntry {
    name: String,
    callback: UpdateCallback,
}

struct ReactorEntry {
    name: String,
    selectors: Vec<Selector>,
    callback: ReactorCallback,
    last_seen: Mutex<SelectedValues>,
}

struct StoreInner {
    config: StoreConfig,
    slices: Vec<Box<dyn AnySlice>>,
    state: RwLock<StoreState>,
    gate: ReentrantMutex<()>,
    updates: Vec<UpdateEntry>,
    reactors: Vec<ReactorEntry>,
    abort: AbortController,
    destroyed: AtomicBool,
}

/// Handle to a store; clones share the same store
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

impl Store {
    /// Build a store from an ordered slice list
    ///
    /// Validates slice keys and declared action names, initializes every
    /// slice in order, then spawns each `deferred_once` effect on the
    /// current tokio runtime.
    pub fn create(slices: Vec<Box<dyn AnySlice>>, config: StoreConfig) -> Result<Store> {
        validate_slices(&slices)?;

        let mut initial = HashMap::with_capacity(slices.len());
        for slice in &slices {
            initial.insert(slice.key_name(), slice.init_state(&config)?);
        }
        let state = StoreState::from_slices(initial);

        let mut deferred = Vec::new();
        let mut updates = Vec::new();
        let mut reactors = Vec::new();
        for slice in &slices {
            for effect in slice.effects() {
                let EffectParts {
                    name,
                    deferred_once,
                    update,
                    reactor,
                } = effect.into_parts();
                if let Some(task) = deferred_once {
                    deferred.push((name.clone(), task));
                }
                if let Some(callback) = update {
                    updates.push(UpdateEntry {
                        name: name.clone(),
                        callback,
                    });
                }
                if let Some((selectors, callback)) = reactor {
                    let last_seen = Mutex::new(SelectedValues::read(&selectors, &state));
                    reactors.push(ReactorEntry {
                        name,
                        selectors,
                        callback,
                        last_seen,
                    });
                }
            }
        }

        let runtime = tokio::runtime::Handle::try_current().ok();
        if !deferred.is_empty() && runtime.is_none() {
            return Err(StoreError::NoRuntime);
        }

        let store = Store {
            inner: Arc::new(StoreInner {
                config,
                slices,
                state: RwLock::new(state),
                gate: ReentrantMutex::new(()),
                updates,
                reactors,
                abort: AbortController::new(),
                destroyed: AtomicBool::new(false),
            }),
        };

        info!(
            store = %store.name(),
            context = %store.context(),
            slices = store.inner.slices.len(),
            "Store created"
        );

        if let Some(runtime) = runtime {
            for (name, task) in deferred {
                let future = task(store.clone(), store.abort_signal());
                runtime.spawn(async move {
                    future.await;
                    debug!(effect = %name, "Deferred effect finished");
                });
            }
        }

        Ok(store)
    }

    pub fn name(&self) -> &str {
        &self.inner.config.name
    }

    pub fn context(&self) -> ExecutionContext {
        self.inner.config.context
    }

    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    /// Current immutable snapshot
    pub fn state(&self) -> StoreState {
        self.inner.state.read().clone()
    }

    /// Every action name declared by this store's slices
    pub fn action_names(&self) -> Vec<&'static str> {
        declared_action_names(&self.inner.slices)
    }

    pub fn abort_signal(&self) -> AbortSignal {
        self.inner.abort.signal()
    }

    /// Dispatch an action originating in this context
    pub fn dispatch(&self, action: Action) -> Result<()> {
        self.dispatch_with_origin(action, ActionOrigin::Local)
    }

    /// Dispatch an action replayed from another context
    pub fn dispatch_remote(&self, action: Action, from: ExecutionContext) -> Result<()> {
        self.dispatch_with_origin(action, ActionOrigin::Remote(from))
    }

    /// Encode and dispatch a slice's typed action
    pub fn dispatch_action<A: SliceAction>(&self, action: &A) -> Result<()> {
        self.dispatch(Action::encode(action)?)
    }

    fn dispatch_with_origin(&self, action: Action, origin: ActionOrigin) -> Result<()> {
        if self.is_destroyed() {
            return Err(StoreError::Destroyed(self.name().to_string()));
        }

        let _gate = self.inner.gate.lock();

        let prev = self.state();
        let mut next_slices = prev.sub_states().clone();
        for slice in &self.inner.slices {
            let name = slice.key_name();
            let Some(current) = prev.sub_states().get(name) else {
                continue;
            };
            let next = slice.apply_state(&action, current)?;
            if !Arc::ptr_eq(&next, current) {
                next_slices.insert(name, next);
            }
        }

        debug!(
            store = %self.name(),
            action = %action,
            origin = ?origin,
            "Dispatch"
        );

        let next = prev.successor(next_slices, action, origin);
        *self.inner.state.write() = next.clone();

        self.run_updates(&next, &prev);
        self.run_reactors();
        Ok(())
    }

    fn run_updates(&self, next: &StoreState, prev: &StoreState) {
        let Some(dispatched) = next.last_action() else {
            return;
        };
        for entry in &self.inner.updates {
            if let Err(err) = (entry.callback)(self, dispatched, prev) {
                error!(
                    store = %self.name(),
                    effect = %entry.name,
                    error = %err,
                    "Side effect update failed"
                );
            }
        }
    }

    fn run_reactors(&self) {
        for entry in &self.inner.reactors {
            // Read against the live state: a nested dispatch may already
            // have reported this change.
            let current = SelectedValues::read(&entry.selectors, &self.state());
            {
                let mut last_seen = entry.last_seen.lock();
                if last_seen.same_as(&current) {
                    continue;
                }
                *last_seen = current.clone();
            }
            if let Err(err) = (entry.callback)(self, &current) {
                error!(
                    store = %self.name(),
                    effect = %entry.name,
                    error = %err,
                    "Side effect reactor failed"
                );
            }
        }
    }

    /// Tear the store down
    ///
    /// Fires the abort signal on the first call; later calls do nothing.
    pub fn destroy(&self) {
        if self.inner.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.abort.abort();
        info!(store = %self.name(), context = %self.context(), "Store destroyed");
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.load(Ordering::SeqCst)
    }

    /// A handle that does not keep the store alive
    pub fn downgrade(&self) -> WeakStore {
        WeakStore {
            inner: Arc::downgrade(&self.inner),
        }
    }
}

/// Non-owning store handle, for collaborators the store itself holds
#[derive(Clone, Default)]
pub struct WeakStore {
    inner: Weak<StoreInner>,
}

impl WeakStore {
    pub fn upgrade(&self) -> Option<Store> {
        self.inner.upgrade().map(|inner| Store { inner })
    }
}

impl fmt::Debug for WeakStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakStore")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("name", &self.name())
            .field("context", &self.context())
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}

/// Every action name declared by `slices`, in slice order
pub fn declared_action_names(slices: &[Box<dyn AnySlice>]) -> Vec<&'static str> {
    slices
        .iter()
        .flat_map(|slice| slice.action_names().iter().copied())
        .collect()
}

fn validate_slices(slices: &[Box<dyn AnySlice>]) -> Result<()> {
    let mut seen = HashSet::new();
    for slice in slices {
        let key = slice.key_name();
        if !seen.insert(key) {
            return Err(StoreError::DuplicateSliceKey(key.to_string()));
        }
        let prefix = action_prefix(key);
        if let Some(foreign) = slice
            .action_names()
            .iter()
            .find(|name| !name.starts_with(&prefix))
        {
            return Err(StoreError::ForeignActionName {
                slice: key.to_string(),
                action: foreign.to_string(),
            });
        }
    }
    Ok(())
}
