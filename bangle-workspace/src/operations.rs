//! Workspace operations
//!
//! Everything that reads or writes notes, or moves the user between
//! them, goes through here. Operations read the store, call the storage
//! and navigation collaborators, and report back by dispatching
//! `workspace-context` actions. None of them holds a lock across an
//! await.

use crate::error::{OperationError, Result, WorkspaceError, WorkspaceErrorCode};
use crate::file_ops::FileOps;
use crate::navigator::Navigator;
use crate::slices::workspace::{WorkspaceSliceAction, WORKSPACE_KEY};
use crate::ws_path::{
    validate_file_ws_path, ws_auth_route, ws_invalid_path_route, ws_not_found_route,
    ws_path_to_pathname, OpenedWsPaths,
};
use bangle_store::Store;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Workspace holding the bundled help documents; it is read-only
pub const HELP_FS_WORKSPACE_NAME: &str = "bangle-help";

/// Collaborators operations talk to
#[derive(Clone)]
pub struct WorkspaceEnv {
    pub file_ops: Arc<dyn FileOps>,
    pub navigator: Arc<dyn Navigator>,
}

impl WorkspaceEnv {
    pub fn new(file_ops: Arc<dyn FileOps>, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            file_ops,
            navigator,
        }
    }
}

impl fmt::Debug for WorkspaceEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkspaceEnv").finish_non_exhaustive()
    }
}

/// Record a location change reported by the host
pub fn update_location(store: &Store, pathname: &str, search: &str) -> Result<()> {
    store.dispatch_action(&WorkspaceSliceAction::UpdateLocation {
        location_pathname: pathname.to_string(),
        location_search_query: search.to_string(),
    })?;
    Ok(())
}

pub fn current_ws_name(store: &Store) -> Option<String> {
    WORKSPACE_KEY.get_from(store)?.ws_name()
}

pub fn is_current_ws_name(store: &Store, ws_name: &str) -> bool {
    current_ws_name(store).as_deref() == Some(ws_name)
}

pub fn current_opened_ws_paths(store: &Store) -> OpenedWsPaths {
    WORKSPACE_KEY
        .get_from(store)
        .map(|s| s.opened_ws_paths())
        .unwrap_or_default()
}

/// Re-list the current workspace's files into the store
///
/// A failed listing is recorded as an unknown listing. Permission and
/// missing-workspace failures also redirect to their error routes.
pub async fn refresh_ws_paths(store: &Store, env: &WorkspaceEnv) -> Result<()> {
    let Some(ws_name) = current_ws_name(store) else {
        return Ok(());
    };
    let listing = env.file_ops.list_all_files(&ws_name).await;
    apply_ws_paths_listing(store, env, ws_name, listing)
}

/// Record the outcome of listing `ws_name`
///
/// The second half of `refresh_ws_paths`, for callers that list without
/// holding the store.
pub fn apply_ws_paths_listing(
    store: &Store,
    env: &WorkspaceEnv,
    ws_name: String,
    listing: Result<Vec<String>>,
) -> Result<()> {
    match listing {
        Ok(ws_paths) => {
            debug!(ws = %ws_name, count = ws_paths.len(), "Refreshed wsPaths");
            store.dispatch_action(&WorkspaceSliceAction::UpdateWsPaths {
                ws_name,
                ws_paths: Some(ws_paths),
            })?;
        }
        Err(err) => {
            store.dispatch_action(&WorkspaceSliceAction::UpdateWsPaths {
                ws_name: ws_name.clone(),
                ws_paths: None,
            })?;
            match &err {
                OperationError::FileSystem(fs_err) if fs_err.is_permission_error() => {
                    env.navigator
                        .go_to_location(&ws_auth_route(&ws_name, fs_err.code.as_str()), true);
                }
                OperationError::Workspace(ws_err) if ws_err.code == WorkspaceErrorCode::NotFound => {
                    env.navigator
                        .go_to_location(&ws_not_found_route(&ws_name), true);
                }
                _ => warn!(ws = %ws_name, error = %err, "Listing workspace files failed"),
            }
        }
    }
    Ok(())
}

/// Replace the opened wsPaths with `updater`'s result
///
/// Returns false without navigating when there is no workspace or the
/// paths are unchanged. Paths that are malformed or belong to another
/// workspace redirect to the invalid-path route.
pub fn update_opened_ws_paths(
    store: &Store,
    env: &WorkspaceEnv,
    updater: impl FnOnce(&OpenedWsPaths) -> OpenedWsPaths,
    replace: bool,
) -> bool {
    let Some(ws_name) = current_ws_name(store) else {
        return false;
    };
    let current = current_opened_ws_paths(store);
    let next = updater(&current);
    if next == current {
        return false;
    }

    let all_valid = next
        .all_ws_paths()
        .iter()
        .all(|path| validate_file_ws_path(path).is_ok());
    if !all_valid || !next.all_belong_to_ws(&ws_name) {
        warn!(ws = %ws_name, opened = ?next.to_array(), "Refusing invalid wsPaths");
        env.navigator
            .go_to_location(&ws_invalid_path_route(&ws_name), true);
        return false;
    }

    env.navigator
        .history_update_opened_ws_paths(&next, &ws_name, replace);
    true
}

/// Open `ws_path` in the primary or secondary editor, or in a new tab
pub fn push_ws_path(
    store: &Store,
    env: &WorkspaceEnv,
    ws_path: &str,
    new_tab: bool,
    secondary: bool,
) -> Result<()> {
    if new_tab {
        env.navigator.open_new_tab(&ws_path_to_pathname(ws_path)?);
        return Ok(());
    }
    let index = usize::from(secondary);
    update_opened_ws_paths(
        store,
        env,
        |opened| opened.update_by_index(index, Some(ws_path)),
        false,
    );
    Ok(())
}

/// Rename a note and follow it in any editor showing it
///
/// Returns false when there is no current workspace.
pub async fn rename_note(
    store: &Store,
    env: &WorkspaceEnv,
    old_ws_path: &str,
    new_ws_path: &str,
) -> Result<bool> {
    let Some(ws_name) = current_ws_name(store) else {
        return Ok(false);
    };
    if ws_name == HELP_FS_WORKSPACE_NAME {
        return Err(
            WorkspaceError::new(WorkspaceErrorCode::HelpDocRename, "Cannot rename a help document")
                .into(),
        );
    }

    env.file_ops.rename_file(old_ws_path, new_ws_path).await?;
    info!(from = %old_ws_path, to = %new_ws_path, "Renamed note");
    refresh_ws_paths(store, env).await?;

    update_opened_ws_paths(
        store,
        env,
        |opened| {
            opened.map_paths(|path| {
                Some(if path == old_ws_path {
                    new_ws_path.to_string()
                } else {
                    path.to_string()
                })
            })
        },
        true,
    );
    Ok(true)
}

/// Read a note; `None` when there is no current workspace
pub async fn get_note(store: &Store, env: &WorkspaceEnv, ws_path: &str) -> Result<Option<String>> {
    if current_ws_name(store).is_none() {
        return Ok(None);
    }
    Ok(Some(env.file_ops.get_doc(ws_path).await?))
}

/// Create a note unless it already exists, then optionally open it
///
/// Returns false when there is no current workspace.
pub async fn create_note(
    store: &Store,
    env: &WorkspaceEnv,
    ws_path: &str,
    doc: &str,
    open: bool,
) -> Result<bool> {
    if current_ws_name(store).is_none() {
        return Ok(false);
    }

    if env.file_ops.check_file_exists(ws_path).await? {
        debug!(ws_path = %ws_path, "Note exists, not overwriting");
    } else {
        env.file_ops.save_doc(ws_path, doc).await?;
        info!(ws_path = %ws_path, "Created note");
    }
    refresh_ws_paths(store, env).await?;

    if open {
        update_opened_ws_paths(
            store,
            env,
            |opened| opened.update_primary(Some(ws_path)),
            false,
        );
    }
    Ok(true)
}

/// Delete notes and close any editor showing one of them
///
/// Returns false when there is no current workspace.
pub async fn delete_note(store: &Store, env: &WorkspaceEnv, ws_paths: &[&str]) -> Result<bool> {
    if current_ws_name(store).is_none() {
        return Ok(false);
    }

    for ws_path in ws_paths {
        env.file_ops.delete_file(ws_path).await?;
        info!(ws_path = %ws_path, "Deleted note");
    }

    update_opened_ws_paths(
        store,
        env,
        |opened| {
            opened.map_paths(|path| {
                let deleted = ws_paths.iter().any(|deleted| *deleted == path);
                (!deleted).then(|| path.to_string())
            })
        },
        true,
    );
    refresh_ws_paths(store, env).await?;
    Ok(true)
}

pub async fn check_file_exists(env: &WorkspaceEnv, ws_path: &str) -> Result<bool> {
    env.file_ops.check_file_exists(ws_path).await
}
