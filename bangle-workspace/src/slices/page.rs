//! The page slice: page lifecycle and the reload guard

use bangle_store::{Slice, SliceAction, SliceError, SliceKey, Store, StoreConfig, StoreError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

pub const PAGE_SLICE_KEY_NAME: &str = "@bangle.io/slice-page";

pub const PAGE_KEY: SliceKey<PageSliceState> = SliceKey::new(PAGE_SLICE_KEY_NAME);

/// States of the page lifecycle as reported by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageLifecycleState {
    Active,
    Passive,
    Hidden,
    Frozen,
    Terminated,
    Discarded,
}

impl fmt::Display for PageLifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PageLifecycleState::Active => "active",
            PageLifecycleState::Passive => "passive",
            PageLifecycleState::Hidden => "hidden",
            PageLifecycleState::Frozen => "frozen",
            PageLifecycleState::Terminated => "terminated",
            PageLifecycleState::Discarded => "discarded",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", content = "value")]
pub enum PageSliceAction {
    #[serde(rename = "action::@bangle.io/slice-page:update-page-lifecycle-state")]
    UpdatePageLifecycleState {
        current: Option<PageLifecycleState>,
        previous: Option<PageLifecycleState>,
    },

    #[serde(rename = "action::@bangle.io/slice-page:block-reload")]
    BlockReload { block: bool },
}

impl SliceAction for PageSliceAction {
    const NAMES: &'static [&'static str] = &[
        "action::@bangle.io/slice-page:update-page-lifecycle-state",
        "action::@bangle.io/slice-page:block-reload",
    ];
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageSliceState {
    pub lifecycle: Option<PageLifecycleState>,
    pub previous_lifecycle: Option<PageLifecycleState>,
    pub block_reload: bool,
}

#[derive(Debug, Default)]
pub struct PageSlice;

impl Slice for PageSlice {
    type State = PageSliceState;
    type Action = PageSliceAction;

    fn key(&self) -> SliceKey<PageSliceState> {
        PAGE_KEY
    }

    fn init(&self, _config: &StoreConfig) -> Result<PageSliceState, SliceError> {
        Ok(PageSliceState::default())
    }

    fn apply(
        &self,
        action: &PageSliceAction,
        state: &Arc<PageSliceState>,
    ) -> Result<Arc<PageSliceState>, SliceError> {
        match action {
            PageSliceAction::UpdatePageLifecycleState { current, previous } => {
                Ok(Arc::new(PageSliceState {
                    lifecycle: *current,
                    previous_lifecycle: *previous,
                    ..(**state).clone()
                }))
            }
            PageSliceAction::BlockReload { block } if *block == state.block_reload => {
                Ok(state.clone())
            }
            PageSliceAction::BlockReload { block } => Ok(Arc::new(PageSliceState {
                block_reload: *block,
                ..(**state).clone()
            })),
        }
    }
}

/// Ask the host to warn before the page is reloaded
pub fn block_reload(store: &Store, block: bool) -> Result<(), StoreError> {
    store.dispatch_action(&PageSliceAction::BlockReload { block })
}

pub fn page_lifecycle(store: &Store) -> Option<PageLifecycleState> {
    PAGE_KEY.get_from(store)?.lifecycle
}
