//! Application-wide constants

/// Action prefixes replicated between the window and the worker
pub const WORKER_SYNC_WHITELISTED_ACTIONS: &[&str] = &[
    "action::@bangle.io/slice-page:",
    "action::@bangle.io/slice-workspaces-manager:",
    "action::workspace-context:",
];

/// Most wsPaths a file listing shows
pub const FILE_PALETTE_MAX_FILES: usize = 200;
