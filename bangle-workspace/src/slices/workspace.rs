//! The `workspace-context` slice
//!
//! Holds the current location and the file listing of every workspace
//! seen so far. The workspace name and the opened wsPaths are derived
//! from the location, never stored.

use crate::operations::{self, WorkspaceEnv};
use crate::ws_path::{pathname_to_ws_name, OpenedWsPaths};
use bangle_store::{
    AbortSignal, SideEffect, Slice, SliceAction, SliceError, SliceKey, Store, StoreConfig,
    WeakStore,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, warn};

pub const WORKSPACE_SLICE_KEY_NAME: &str = "workspace-context";

pub const WORKSPACE_KEY: SliceKey<WorkspaceSliceState> = SliceKey::new(WORKSPACE_SLICE_KEY_NAME);

/// Upper bound on remembered recently used notes per workspace
pub const MAX_RECENTLY_USED_WS_PATHS: usize = 15;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", content = "value")]
pub enum WorkspaceSliceAction {
    /// `ws_paths` is `None` when the listing failed
    #[serde(
        rename = "action::workspace-context:update-ws-paths",
        rename_all = "camelCase"
    )]
    UpdateWsPaths {
        ws_name: String,
        ws_paths: Option<Vec<String>>,
    },

    #[serde(
        rename = "action::workspace-context:update-location",
        rename_all = "camelCase"
    )]
    UpdateLocation {
        location_pathname: String,
        location_search_query: String,
    },

    #[serde(
        rename = "action::workspace-context:update-recently-used-ws-paths",
        rename_all = "camelCase"
    )]
    UpdateRecentlyUsedWsPaths {
        ws_name: String,
        ws_paths: Vec<String>,
    },
}

impl SliceAction for WorkspaceSliceAction {
    const NAMES: &'static [&'static str] = &[
        "action::workspace-context:update-ws-paths",
        "action::workspace-context:update-location",
        "action::workspace-context:update-recently-used-ws-paths",
    ];
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkspaceSliceState {
    location_pathname: String,
    location_search_query: String,
    ws_paths: BTreeMap<String, Option<Vec<String>>>,
    recently_used_ws_paths: BTreeMap<String, Vec<String>>,
}

impl WorkspaceSliceState {
    pub fn location_pathname(&self) -> &str {
        &self.location_pathname
    }

    pub fn location_search_query(&self) -> &str {
        &self.location_search_query
    }

    /// Workspace named by the current location
    pub fn ws_name(&self) -> Option<String> {
        pathname_to_ws_name(&self.location_pathname)
    }

    pub fn opened_ws_paths(&self) -> OpenedWsPaths {
        OpenedWsPaths::from_location(&self.location_pathname, &self.location_search_query)
    }

    /// Listing of `ws_name`; `None` if unknown or the listing failed
    pub fn ws_paths_of(&self, ws_name: &str) -> Option<&[String]> {
        self.ws_paths.get(ws_name)?.as_deref()
    }

    /// Listing of the current workspace
    pub fn ws_paths(&self) -> Option<&[String]> {
        self.ws_paths_of(&self.ws_name()?)
    }

    pub fn recently_used_ws_paths(&self, ws_name: &str) -> &[String] {
        self.recently_used_ws_paths
            .get(ws_name)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// Builds the `workspace-context` slice
///
/// Without an environment the slice only holds state. With one it also
/// refreshes the file listing whenever the current workspace changes and
/// tracks recently opened notes; compose it that way in exactly one
/// context.
#[derive(Default)]
pub struct WorkspaceSlice {
    env: Option<WorkspaceEnv>,
    initial_pathname: String,
    initial_search: String,
}

impl WorkspaceSlice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_effects(env: WorkspaceEnv) -> Self {
        Self {
            env: Some(env),
            ..Self::default()
        }
    }

    /// Start at `pathname?search` instead of the empty location
    pub fn initial_location(mut self, pathname: impl Into<String>, search: impl Into<String>) -> Self {
        self.initial_pathname = pathname.into();
        self.initial_search = search.into();
        self
    }
}

impl Slice for WorkspaceSlice {
    type State = WorkspaceSliceState;
    type Action = WorkspaceSliceAction;

    fn key(&self) -> SliceKey<WorkspaceSliceState> {
        WORKSPACE_KEY
    }

    fn init(&self, _config: &StoreConfig) -> Result<WorkspaceSliceState, SliceError> {
        Ok(WorkspaceSliceState {
            location_pathname: self.initial_pathname.clone(),
            location_search_query: self.initial_search.clone(),
            ..WorkspaceSliceState::default()
        })
    }

    fn apply(
        &self,
        action: &WorkspaceSliceAction,
        state: &Arc<WorkspaceSliceState>,
    ) -> Result<Arc<WorkspaceSliceState>, SliceError> {
        let mut next = (**state).clone();
        match action {
            WorkspaceSliceAction::UpdateWsPaths { ws_name, ws_paths } => {
                next.ws_paths.insert(ws_name.clone(), ws_paths.clone());
            }
            WorkspaceSliceAction::UpdateLocation {
                location_pathname,
                location_search_query,
            } => {
                next.location_pathname = location_pathname.clone();
                next.location_search_query = location_search_query.clone();
            }
            WorkspaceSliceAction::UpdateRecentlyUsedWsPaths { ws_name, ws_paths } => {
                let mut deduped: Vec<String> = Vec::with_capacity(ws_paths.len());
                for path in ws_paths {
                    if !deduped.contains(path) {
                        deduped.push(path.clone());
                    }
                }
                deduped.truncate(MAX_RECENTLY_USED_WS_PATHS);
                next.recently_used_ws_paths.insert(ws_name.clone(), deduped);
            }
        }
        Ok(Arc::new(next))
    }

    fn side_effects(&self) -> Vec<SideEffect> {
        let Some(env) = self.env.clone() else {
            return Vec::new();
        };

        let startup_env = env.clone();
        let startup_ws = pathname_to_ws_name(&self.initial_pathname);
        let reactor_fired = Arc::new(AtomicBool::new(false));
        let fired = reactor_fired.clone();
        let refresh = WORKSPACE_KEY
            .reactor(
                "refresh-ws-paths",
                vec![WORKSPACE_KEY.select("wsName", |s: &WorkspaceSliceState| s.ws_name())],
                move |store, _values| {
                    fired.store(true, Ordering::SeqCst);
                    spawn_refresh(store, env.clone());
                    Ok(())
                },
            )
            // The reactor only sees changes, so list a starting workspace once
            .deferred_once(move |store, signal| async move {
                let Some(ws_name) = startup_ws else {
                    return;
                };
                let unlisted = WORKSPACE_KEY.get_from(&store).is_some_and(|s| {
                    s.ws_name().as_deref() == Some(ws_name.as_str())
                        && s.ws_paths_of(&ws_name).is_none()
                });
                if reactor_fired.load(Ordering::SeqCst) || !unlisted {
                    return;
                }
                let weak = store.downgrade();
                drop(store);
                refresh_detached(weak, signal, startup_env, ws_name).await;
            });

        let recently_used = WORKSPACE_KEY.reactor(
            "recently-used",
            vec![WORKSPACE_KEY.select("primaryWsPath", |s: &WorkspaceSliceState| {
                s.opened_ws_paths().primary().map(String::from)
            })],
            |store, values| {
                let Some(Some(primary)) = values.get::<Option<String>>("primaryWsPath") else {
                    return Ok(());
                };
                let Some(state) = WORKSPACE_KEY.get_from(store) else {
                    return Ok(());
                };
                let Some(ws_name) = state.ws_name() else {
                    return Ok(());
                };
                let mut ws_paths = vec![primary.clone()];
                ws_paths.extend(state.recently_used_ws_paths(&ws_name).iter().cloned());
                store.dispatch_action(&WorkspaceSliceAction::UpdateRecentlyUsedWsPaths {
                    ws_name,
                    ws_paths,
                })?;
                Ok(())
            },
        );

        vec![refresh, recently_used]
    }
}

fn spawn_refresh(store: &Store, env: WorkspaceEnv) {
    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
        warn!(store = %store.name(), "No runtime to refresh wsPaths on");
        return;
    };
    let Some(ws_name) = operations::current_ws_name(store) else {
        return;
    };
    runtime.spawn(refresh_detached(
        store.downgrade(),
        store.abort_signal(),
        env,
        ws_name,
    ));
}

/// List `ws_name` without keeping the store alive
///
/// Teardown cancels the listing; the store is only upgraded to record
/// the result.
async fn refresh_detached(store: WeakStore, signal: AbortSignal, env: WorkspaceEnv, ws_name: String) {
    let listing = tokio::select! {
        _ = signal.aborted() => {
            debug!(ws = %ws_name, "Store torn down, dropping wsPaths refresh");
            return;
        }
        listing = env.file_ops.list_all_files(&ws_name) => listing,
    };
    let Some(store) = store.upgrade().filter(|store| !store.is_destroyed()) else {
        return;
    };
    if let Err(err) = operations::apply_ws_paths_listing(&store, &env, ws_name, listing) {
        error!(store = %store.name(), error = %err, "Refreshing wsPaths failed");
    }
}
