//! Error types for store synchronization

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    /// A whitelist prefix matches no action declared by the store
    #[error("Whitelisted prefix {0} matches no known action")]
    UnknownWhitelistPrefix(String),

    /// A whitelist prefix would let the sync protocol's own actions cross
    #[error("Whitelisted prefix {0} matches internal store-sync actions")]
    InternalActionWhitelisted(String),

    #[error("Failed to serialize sync message: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("Failed to parse sync message: {0}")]
    Deserialize(#[source] serde_json::Error),

    /// The peer end of the port is gone
    #[error("Message port is closed")]
    PortClosed,

    /// The slice was asked to bind a port it no longer holds
    #[error("Message port was already bound")]
    PortAlreadyBound,
}

pub type Result<T> = std::result::Result<T, SyncError>;
