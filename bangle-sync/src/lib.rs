//! Bangle sync - replicate store actions across execution contexts
//!
//! Two stores, one per context, are joined by a `MessageChannel`. Each
//! store carries a `StoreSyncSlice` holding its end of the channel:
//!
//! ```text
//!   window store                                   worker store
//!  ┌──────────────┐      Hello / HelloAck        ┌──────────────┐
//!  │ store-sync   │ ◄──────────────────────────► │ store-sync   │
//!  │  update ─────┼── Action (send_filter) ────► │  listener ───┼─► dispatch_remote
//!  │  listener ◄──┼─── Action (send_filter) ─────┼─ update      │
//!  └──────────────┘                              └──────────────┘
//! ```
//!
//! - Only locally dispatched actions are forwarded, so a replayed action
//!   never bounces back.
//! - Forwarding waits for the handshake. Until then matching actions are
//!   queued, up to `max_pending`, and flushed in dispatch order.
//! - A closed port moves the side to `TornDown`; later sends are dropped.

pub mod channel;
pub mod error;
pub mod filter;
pub mod message;
pub mod slice;

pub use channel::{MessageChannel, MessagePort, PortReceiver, PortSender};
pub use error::{Result, SyncError};
pub use filter::ActionFilter;
pub use message::SyncMessage;
pub use slice::{
    StoreSyncAction, StoreSyncConfig, StoreSyncSlice, StoreSyncState, SyncPhase,
    DEFAULT_MAX_PENDING, STORE_SYNC_KEY, STORE_SYNC_KEY_NAME,
};
