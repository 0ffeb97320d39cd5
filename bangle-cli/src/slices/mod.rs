//! Slices that only run in the window store

pub mod editor_manager;
pub mod page_lifecycle;

pub use editor_manager::{
    Editor, EditorManagerAction, EditorManagerSlice, EditorManagerState, EDITOR_MANAGER_KEY,
};
pub use page_lifecycle::{PageLifecycleSlice, PageLifecycleSource, PAGE_LIFECYCLE_KEY};
