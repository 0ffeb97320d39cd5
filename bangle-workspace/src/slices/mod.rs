//! Slices shared by the window and worker stores

pub mod page;
pub mod workspace;
pub mod workspaces_manager;

pub use page::{PageLifecycleState, PageSlice, PageSliceAction, PageSliceState, PAGE_KEY};
pub use workspace::{
    WorkspaceSlice, WorkspaceSliceAction, WorkspaceSliceState, WORKSPACE_KEY,
    WORKSPACE_SLICE_KEY_NAME,
};
pub use workspaces_manager::{
    WorkspaceInfo, WorkspaceType, WorkspacesSlice, WorkspacesSliceAction, WorkspacesSliceState,
    WORKSPACES_KEY, WORKSPACES_SLICE_KEY_NAME,
};
