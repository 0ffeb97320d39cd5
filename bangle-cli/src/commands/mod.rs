//! CLI command implementations.

pub mod resolve;
pub mod sync;
pub mod validate;

pub use resolve::resolve_ws_path;
pub use sync::{sync_workspace, SyncOptions};
pub use validate::validate_ws_path;
