//! Slices: isolated reducers over one sub-state
//!
//! A slice owns a typed sub-state, a closed set of actions, and a list of
//! side effects. The store only ever sees slices through `AnySlice`, which
//! erases the state type and decodes the wire envelope once per slice.

mod effect;
mod key;

pub use effect::{SelectedValues, SideEffect};
pub use key::{FieldValue, Selector, SliceKey};

pub(crate) use effect::{EffectParts, ReactorCallback, UpdateCallback};

use crate::error::{SliceError, StoreError};
use crate::store::{StoreConfig, SubState};
use bangle_types::{Action, SliceAction};
use std::sync::Arc;

/// A reducer over one isolated sub-state
///
/// `apply` must be total: actions the slice does not understand return the
/// same `Arc` it was given. Returning a different `Arc` is what marks the
/// sub-state as changed.
pub trait Slice: Send + Sync + 'static {
    type State: Send + Sync + 'static;
    type Action: SliceAction;

    fn key(&self) -> SliceKey<Self::State>;

    /// Build the initial sub-state; synchronous and free of I/O
    fn init(&self, config: &StoreConfig) -> Result<Self::State, SliceError>;

    fn apply(
        &self,
        _action: &Self::Action,
        state: &Arc<Self::State>,
    ) -> Result<Arc<Self::State>, SliceError> {
        Ok(state.clone())
    }

    fn side_effects(&self) -> Vec<SideEffect> {
        Vec::new()
    }

    fn boxed(self) -> Box<dyn AnySlice>
    where
        Self: Sized,
    {
        Box::new(self)
    }
}

/// Type-erased view of a `Slice` used by the store
pub trait AnySlice: Send + Sync {
    fn key_name(&self) -> &'static str;

    fn action_names(&self) -> &'static [&'static str];

    fn init_state(&self, config: &StoreConfig) -> Result<SubState, StoreError>;

    /// Apply an envelope to the erased sub-state
    ///
    /// Envelopes outside this slice's action set return `current` unchanged.
    fn apply_state(&self, action: &Action, current: &SubState) -> Result<SubState, StoreError>;

    fn effects(&self) -> Vec<SideEffect>;
}

impl<T: Slice> AnySlice for T {
    fn key_name(&self) -> &'static str {
        self.key().name()
    }

    fn action_names(&self) -> &'static [&'static str] {
        T::Action::NAMES
    }

    fn init_state(&self, config: &StoreConfig) -> Result<SubState, StoreError> {
        let state = self.init(config).map_err(|source| StoreError::Init {
            slice: self.key_name().to_string(),
            source,
        })?;
        Ok(Arc::new(state) as SubState)
    }

    fn apply_state(&self, action: &Action, current: &SubState) -> Result<SubState, StoreError> {
        let decoded = action
            .decode::<T::Action>()
            .map_err(|source| StoreError::Decode {
                slice: self.key_name().to_string(),
                source,
            })?;
        let Some(decoded) = decoded else {
            return Ok(current.clone());
        };

        let typed = current
            .clone()
            .downcast::<T::State>()
            .map_err(|_| StoreError::StateType(self.key_name().to_string()))?;
        let next = self
            .apply(&decoded, &typed)
            .map_err(|source| StoreError::Apply {
                slice: self.key_name().to_string(),
                action: action.name.clone(),
                source,
            })?;

        if Arc::ptr_eq(&next, &typed) {
            Ok(current.clone())
        } else {
            Ok(next as SubState)
        }
    }

    fn effects(&self) -> Vec<SideEffect> {
        self.side_effects()
    }
}
