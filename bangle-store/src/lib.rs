//! Bangle store - slice-based state container
//!
//! This crate provides the typed, action-driven store that runs in each
//! execution context of the application. Stores in different contexts are
//! kept consistent by `bangle-sync`, which replays whitelisted actions.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                          Store                             │
//! │                                                            │
//! │   dispatch(action) ──► gate (re-entrant)                   │
//! │                          │                                 │
//! │                          ▼                                 │
//! │   ┌────────────┐ ┌────────────┐ ┌────────────┐             │
//! │   │  Slice A   │ │  Slice B   │ │  Slice C   │  ...        │
//! │   │ apply(&A)  │ │ apply(&B)  │ │ apply(&C)  │             │
//! │   └─────┬──────┘ └─────┬──────┘ └─────┬──────┘             │
//! │         └──────────────┼──────────────┘                    │
//! │                        ▼                                   │
//! │              StoreState (snapshot)                         │
//! │                        │                                   │
//! │         ┌──────────────┼────────────────┐                  │
//! │         ▼              ▼                ▼                  │
//! │    update(..)     reactor(..)    deferred_once(..)         │
//! │  every dispatch  on value change  once, until abort        │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Core Concepts
//!
//! ## Slices
//!
//! A **slice** owns one sub-state, identified by a `SliceKey`. Its
//! `apply` returns the same `Arc` for actions it ignores, which is how the
//! store tells an untouched sub-state from a changed one.
//!
//! ## Actions
//!
//! Each slice declares a closed action enum (`SliceAction`). The store
//! carries the serializable `Action` envelope and decodes it once per
//! slice, so actions can always cross a context boundary.
//!
//! ## Side effects
//!
//! Effects observe transitions and may dispatch. Long-running effects get
//! an `AbortSignal` that fires when the store is destroyed.
//!
//! # Example
//!
//! ```rust
//! use bangle_store::{Slice, SliceError, SliceKey, Store, StoreConfig};
//! use bangle_types::SliceAction;
//! use serde::{Deserialize, Serialize};
//! use std::sync::Arc;
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! #[serde(tag = "name", content = "value")]
//! enum CounterAction {
//!     #[serde(rename = "action::counter:increment")]
//!     Increment,
//! }
//!
//! impl SliceAction for CounterAction {
//!     const NAMES: &'static [&'static str] = &["action::counter:increment"];
//! }
//!
//! struct Counter;
//!
//! const COUNTER: SliceKey<u32> = SliceKey::new("counter");
//!
//! impl Slice for Counter {
//!     type State = u32;
//!     type Action = CounterAction;
//!
//!     fn key(&self) -> SliceKey<u32> {
//!         COUNTER
//!     }
//!
//!     fn init(&self, _config: &StoreConfig) -> Result<u32, SliceError> {
//!         Ok(0)
//!     }
//!
//!     fn apply(&self, action: &CounterAction, state: &Arc<u32>) -> Result<Arc<u32>, SliceError> {
//!         match action {
//!             CounterAction::Increment => Ok(Arc::new(**state + 1)),
//!         }
//!     }
//! }
//!
//! let store = Store::create(vec![Counter.boxed()], StoreConfig::default()).unwrap();
//! store.dispatch_action(&CounterAction::Increment).unwrap();
//! assert_eq!(COUNTER.get_from(&store).as_deref(), Some(&1));
//! ```

pub mod abort;
pub mod error;
pub mod registry;
pub mod slice;
pub mod store;
pub mod types;

pub use abort::{AbortController, AbortSignal};
pub use error::{Result, SliceError, StoreError};
pub use registry::ResourceRegistry;
pub use slice::{AnySlice, FieldValue, SelectedValues, Selector, SideEffect, Slice, SliceKey};
pub use store::{
    declared_action_names, DispatchedAction, Store, StoreConfig, StoreState, SubState, WeakStore,
};
pub use types::{DispatchSeq, ResourceId};

// Re-export the envelope types so slice crates need only one import path
pub use bangle_types::{Action, ActionOrigin, ExecutionContext, NoAction, SliceAction};
