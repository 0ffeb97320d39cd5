//! Bangle workspace - workspaces, notes and the slices that track them
//!
//! - `ws_path`: parsing and validation of `wsName:filePath` strings and
//!   of locations
//! - `file_ops`, `kv`, `navigator`: the collaborators operations consume
//! - `slices`: the `workspace-context`, workspaces-manager and page slices
//! - `operations`: note and navigation operations over a `Store`
//!
//! ```
//! use bangle_workspace::ws_path::resolve_path;
//!
//! let resolved = resolve_path("my-ws:notes/today.md").unwrap();
//! assert_eq!(resolved.ws_name, "my-ws");
//! assert_eq!(resolved.dir_path, "notes");
//! assert_eq!(resolved.file_name_without_ext, "today");
//! ```

pub mod error;
pub mod file_ops;
pub mod kv;
pub mod navigator;
pub mod operations;
pub mod slices;
pub mod ws_path;

pub use error::{
    FileSystemError, FileSystemErrorCode, OperationError, PathValidationError, Result,
    WorkspaceError, WorkspaceErrorCode,
};
pub use file_ops::{DiskFileOps, FileOpCall, FileOps, InjectedFailure, MemoryFileOps};
pub use kv::{DbRecord, KeyValueStore, MemoryKeyValueStore};
pub use navigator::{NavigationEvent, Navigator, RecordingNavigator, StoreNavigator};
pub use operations::{WorkspaceEnv, HELP_FS_WORKSPACE_NAME};
pub use ws_path::{Location, OpenedWsPaths, ResolvedPath};
