//! The workspaces-manager slice: the registry of known workspaces
//!
//! The registry is persisted in a `KeyValueStore`; the slice mirrors it.
//! Writers go through the operations below, which persist first and then
//! dispatch the changed entries.

use crate::error::{Result, WorkspaceError, WorkspaceErrorCode};
use crate::kv::KeyValueStore;
use crate::ws_path::valid_ws_name;
use bangle_store::{SideEffect, Slice, SliceAction, SliceError, SliceKey, Store, StoreConfig};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info};

pub const WORKSPACES_SLICE_KEY_NAME: &str = "@bangle.io/slice-workspaces-manager";

pub const WORKSPACES_KEY: SliceKey<WorkspacesSliceState> = SliceKey::new(WORKSPACES_SLICE_KEY_NAME);

pub type WorkspaceInfoStore = dyn KeyValueStore<WorkspaceInfo>;

/// Where a workspace's notes are stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkspaceType {
    Browser,
    NativeFs,
    HelpFs,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub ws_type: WorkspaceType,
    pub last_modified: DateTime<Utc>,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl WorkspaceInfo {
    pub fn new(name: impl Into<String>, ws_type: WorkspaceType) -> Self {
        Self {
            name: name.into(),
            ws_type,
            last_modified: Utc::now(),
            deleted: false,
            metadata: serde_json::Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", content = "value")]
pub enum WorkspacesSliceAction {
    #[serde(
        rename = "action::@bangle.io/slice-workspaces-manager:set-workspace-infos",
        rename_all = "camelCase"
    )]
    SetWorkspaceInfos {
        workspace_infos: BTreeMap<String, WorkspaceInfo>,
    },
}

impl SliceAction for WorkspacesSliceAction {
    const NAMES: &'static [&'static str] =
        &["action::@bangle.io/slice-workspaces-manager:set-workspace-infos"];
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkspacesSliceState {
    /// `None` until the registry has been loaded
    workspace_infos: Option<BTreeMap<String, WorkspaceInfo>>,
}

impl WorkspacesSliceState {
    pub fn workspace_infos(&self) -> Option<&BTreeMap<String, WorkspaceInfo>> {
        self.workspace_infos.as_ref()
    }

    pub fn workspace_info(&self, ws_name: &str) -> Option<&WorkspaceInfo> {
        self.workspace_infos.as_ref()?.get(ws_name)
    }

    /// Names of workspaces that are not deleted
    pub fn ws_names(&self) -> Vec<&str> {
        self.workspace_infos
            .iter()
            .flat_map(|infos| infos.values())
            .filter(|info| !info.deleted)
            .map(|info| info.name.as_str())
            .collect()
    }
}

/// Merge `incoming` into `existing`; the later `last_modified` wins
pub fn merge_ws_info_registries(
    existing: &BTreeMap<String, WorkspaceInfo>,
    incoming: &BTreeMap<String, WorkspaceInfo>,
) -> BTreeMap<String, WorkspaceInfo> {
    let mut merged = existing.clone();
    for (name, info) in incoming {
        let keep_existing = merged
            .get(name)
            .is_some_and(|current| current.last_modified > info.last_modified);
        if !keep_existing {
            merged.insert(name.clone(), info.clone());
        }
    }
    merged
}

/// Builds the workspaces-manager slice
///
/// With a backing store the slice loads the registry once after creation.
#[derive(Default)]
pub struct WorkspacesSlice {
    infos: Option<Arc<WorkspaceInfoStore>>,
}

impl WorkspacesSlice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_effects(infos: Arc<WorkspaceInfoStore>) -> Self {
        Self { infos: Some(infos) }
    }
}

impl Slice for WorkspacesSlice {
    type State = WorkspacesSliceState;
    type Action = WorkspacesSliceAction;

    fn key(&self) -> SliceKey<WorkspacesSliceState> {
        WORKSPACES_KEY
    }

    fn init(&self, _config: &StoreConfig) -> std::result::Result<WorkspacesSliceState, SliceError> {
        Ok(WorkspacesSliceState::default())
    }

    fn apply(
        &self,
        action: &WorkspacesSliceAction,
        state: &Arc<WorkspacesSliceState>,
    ) -> std::result::Result<Arc<WorkspacesSliceState>, SliceError> {
        match action {
            WorkspacesSliceAction::SetWorkspaceInfos { workspace_infos } => {
                let existing = state.workspace_infos.clone().unwrap_or_default();
                Ok(Arc::new(WorkspacesSliceState {
                    workspace_infos: Some(merge_ws_info_registries(&existing, workspace_infos)),
                }))
            }
        }
    }

    fn side_effects(&self) -> Vec<SideEffect> {
        let Some(infos) = self.infos.clone() else {
            return Vec::new();
        };
        vec![WORKSPACES_KEY
            .effect("refresh-workspaces")
            .deferred_once(|store, signal| async move {
                let weak = store.downgrade();
                drop(store);
                let records = tokio::select! {
                    _ = signal.aborted() => {
                        debug!("Store torn down, dropping workspaces refresh");
                        return;
                    }
                    records = infos.get_all() => records,
                };
                let Some(store) = weak.upgrade().filter(|store| !store.is_destroyed()) else {
                    return;
                };
                let loaded = records.and_then(|records| {
                    dispatch_infos(&store, records.into_iter().map(|r| r.value))
                });
                if let Err(err) = loaded {
                    error!(store = %store.name(), error = %err, "Loading workspaces failed");
                }
            })]
    }
}

fn dispatch_infos(store: &Store, infos: impl IntoIterator<Item = WorkspaceInfo>) -> Result<()> {
    let workspace_infos = infos
        .into_iter()
        .map(|info| (info.name.clone(), info))
        .collect();
    store.dispatch_action(&WorkspacesSliceAction::SetWorkspaceInfos { workspace_infos })?;
    Ok(())
}

/// Load every workspace from `infos` into the slice
pub async fn list_workspaces(store: &Store, infos: &WorkspaceInfoStore) -> Result<Vec<WorkspaceInfo>> {
    let records = infos.get_all().await?;
    let all: Vec<WorkspaceInfo> = records.into_iter().map(|r| r.value).collect();
    dispatch_infos(store, all.iter().cloned())?;
    Ok(all.into_iter().filter(|info| !info.deleted).collect())
}

pub async fn get_workspace_info(infos: &WorkspaceInfoStore, ws_name: &str) -> Result<WorkspaceInfo> {
    match infos.get(ws_name).await? {
        None => Err(WorkspaceError::not_found(ws_name).into()),
        Some(info) if info.deleted => Err(WorkspaceError::deleted_modify(ws_name).into()),
        Some(info) => Ok(info),
    }
}

pub async fn create_workspace(
    store: &Store,
    infos: &WorkspaceInfoStore,
    ws_name: &str,
    ws_type: WorkspaceType,
    metadata: serde_json::Map<String, serde_json::Value>,
) -> Result<WorkspaceInfo> {
    valid_ws_name(ws_name)?;
    if infos.get(ws_name).await?.is_some() {
        return Err(WorkspaceError::already_exists(ws_name).into());
    }
    let info = WorkspaceInfo {
        metadata,
        ..WorkspaceInfo::new(ws_name, ws_type)
    };
    infos.put(ws_name, info.clone()).await?;
    dispatch_infos(store, [info.clone()])?;
    info!(ws = %ws_name, "Workspace created");
    Ok(info)
}

/// Mark a workspace deleted; the record is kept so peers see the deletion
pub async fn delete_workspace(store: &Store, infos: &WorkspaceInfoStore, ws_name: &str) -> Result<()> {
    let mut info = get_workspace_info(infos, ws_name).await?;
    if info.ws_type == WorkspaceType::HelpFs {
        return Err(WorkspaceError::new(
            WorkspaceErrorCode::DeletedModify,
            format!("Cannot delete the help workspace {ws_name}"),
        )
        .into());
    }
    info.deleted = true;
    info.last_modified = Utc::now();
    infos.put(ws_name, info.clone()).await?;
    dispatch_infos(store, [info])?;
    info!(ws = %ws_name, "Workspace deleted");
    Ok(())
}
