//! Wire messages exchanged by the store-sync listeners

use crate::error::{Result, SyncError};
use bangle_types::{Action, ExecutionContext};
use serde::{Deserialize, Serialize};

/// One message on a sync port, carried as a JSON string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SyncMessage {
    /// Sent once by each side when its listener attaches
    Hello { context: ExecutionContext },
    /// Reply to a peer's `Hello`
    HelloAck { context: ExecutionContext },
    /// A replicated action
    Action {
        from: ExecutionContext,
        action: Action,
    },
}

impl SyncMessage {
    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self).map_err(SyncError::Serialize)
    }

    pub fn decode(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(SyncError::Deserialize)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SyncMessage::Hello { .. } => "hello",
            SyncMessage::HelloAck { .. } => "hello-ack",
            SyncMessage::Action { .. } => "action",
        }
    }
}
