//! Error types for the store

use bangle_types::ActionCodecError;
use thiserror::Error;

/// Top-level store error
#[derive(Debug, Error)]
pub enum StoreError {
    /// Two slices registered under the same key
    #[error("Duplicate slice key {0}")]
    DuplicateSliceKey(String),

    /// A slice declares an action name outside its key's namespace
    #[error("Slice {slice} declares action {action} outside its namespace")]
    ForeignActionName { slice: String, action: String },

    /// A slice's `init` failed
    #[error("Slice {slice} failed to initialize: {source}")]
    Init {
        slice: String,
        #[source]
        source: SliceError,
    },

    /// A slice's `apply` failed; the dispatch was not committed
    #[error("Slice {slice} failed to apply {action}: {source}")]
    Apply {
        slice: String,
        action: String,
        #[source]
        source: SliceError,
    },

    /// A known action name carried a payload the slice could not decode
    #[error("Slice {slice} could not decode action: {source}")]
    Decode {
        slice: String,
        #[source]
        source: ActionCodecError,
    },

    /// A typed action could not be turned into an envelope
    #[error("Action encoding failed: {0}")]
    Encode(#[from] ActionCodecError),

    /// The store's sub-state for a key had an unexpected type
    #[error("Slice {0} state has an unexpected type")]
    StateType(String),

    /// The store was torn down
    #[error("Store {0} has been destroyed")]
    Destroyed(String),

    /// Deferred side effects were registered outside a tokio runtime
    #[error("Deferred side effects require a tokio runtime")]
    NoRuntime,
}

/// Error returned by a slice's `init` or `apply`
#[derive(Debug, Error)]
#[error("{message}")]
pub struct SliceError {
    message: String,
}

impl SliceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Result type using StoreError
pub type Result<T> = std::result::Result<T, StoreError>;
