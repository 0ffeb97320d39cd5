//! The store-sync slice
//!
//! Each context adds one `StoreSyncSlice` to its store. The slice owns that
//! context's `MessagePort` and drives a small state machine:
//!
//! ```text
//! PortBound ──(Hello / HelloAck)──► Syncing ──(peer closed)──► TornDown
//!     └──────────────────(peer closed)─────────────────────────────┘
//! ```
//!
//! Phase changes only happen by dispatching this slice's own actions, which
//! are never whitelisted and so never cross the channel.

use crate::channel::{MessagePort, PortReceiver, PortSender};
use crate::filter::ActionFilter;
use crate::message::SyncMessage;
use bangle_store::{
    AbortSignal, Action, DispatchedAction, ExecutionContext, SideEffect, Slice, SliceAction,
    SliceError, SliceKey, Store, StoreConfig, StoreState,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const STORE_SYNC_KEY_NAME: &str = "store-sync";

pub const STORE_SYNC_KEY: SliceKey<StoreSyncState> = SliceKey::new(STORE_SYNC_KEY_NAME);

/// Default bound on actions buffered before the handshake completes
pub const DEFAULT_MAX_PENDING: usize = 1024;

/// Where this side is in the sync protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncPhase {
    /// Port held, listener attached or attaching, peer not yet confirmed
    PortBound,
    /// Handshake complete; actions flow both ways
    Syncing,
    /// Peer gone; outbound actions are dropped
    TornDown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "name", content = "value")]
pub enum StoreSyncAction {
    #[serde(rename = "action::store-sync:remote-ready")]
    RemoteReady { peer: ExecutionContext },
    #[serde(rename = "action::store-sync:port-closed")]
    PortClosed,
}

impl SliceAction for StoreSyncAction {
    const NAMES: &'static [&'static str] = &[
        "action::store-sync:remote-ready",
        "action::store-sync:port-closed",
    ];
}

/// Settings for one end of a sync channel
pub struct StoreSyncConfig {
    pub port: MessagePort,
    pub send_filter: ActionFilter,
    pub receive_filter: ActionFilter,
    pub max_pending: usize,
}

impl StoreSyncConfig {
    /// Use one filter for both directions
    pub fn symmetric(port: MessagePort, filter: ActionFilter) -> Self {
        Self {
            port,
            send_filter: filter.clone(),
            receive_filter: filter,
            max_pending: DEFAULT_MAX_PENDING,
        }
    }

    pub fn with_max_pending(mut self, max_pending: usize) -> Self {
        self.max_pending = max_pending;
        self
    }
}

/// Port halves and the pre-handshake queue, shared by every state version
#[derive(Clone)]
struct SyncLink {
    sender: PortSender,
    receiver: Arc<Mutex<Option<PortReceiver>>>,
    pending: Arc<Mutex<VecDeque<Action>>>,
    max_pending: usize,
}

impl SyncLink {
    fn post(&self, message: &SyncMessage) {
        let result = message.encode().and_then(|raw| self.sender.post(raw));
        if let Err(err) = result {
            debug!(kind = message.kind(), error = %err, "Dropping sync message");
        }
    }
}

/// Sub-state of the store-sync slice
#[derive(Clone)]
pub struct StoreSyncState {
    phase: SyncPhase,
    peer: Option<ExecutionContext>,
    send_filter: ActionFilter,
    receive_filter: ActionFilter,
    link: SyncLink,
}

impl StoreSyncState {
    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    pub fn peer(&self) -> Option<ExecutionContext> {
        self.peer
    }

    pub fn send_filter(&self) -> &ActionFilter {
        &self.send_filter
    }

    pub fn receive_filter(&self) -> &ActionFilter {
        &self.receive_filter
    }

    /// Actions waiting for the handshake
    pub fn pending_len(&self) -> usize {
        self.link.pending.lock().len()
    }

    fn with_phase(&self, phase: SyncPhase, peer: Option<ExecutionContext>) -> Self {
        Self {
            phase,
            peer,
            ..self.clone()
        }
    }
}

impl fmt::Debug for StoreSyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreSyncState")
            .field("phase", &self.phase)
            .field("peer", &self.peer)
            .field("send_filter", &self.send_filter)
            .field("receive_filter", &self.receive_filter)
            .finish()
    }
}

/// Replicates whitelisted actions to the store on the other end of a port
pub struct StoreSyncSlice {
    config: Mutex<Option<StoreSyncConfig>>,
}

impl StoreSyncSlice {
    pub fn new(config: StoreSyncConfig) -> Self {
        Self {
            config: Mutex::new(Some(config)),
        }
    }
}

impl Slice for StoreSyncSlice {
    type State = StoreSyncState;
    type Action = StoreSyncAction;

    fn key(&self) -> SliceKey<StoreSyncState> {
        STORE_SYNC_KEY
    }

    fn init(&self, _config: &StoreConfig) -> Result<StoreSyncState, SliceError> {
        let Some(config) = self.config.lock().take() else {
            return Err(SliceError::new(crate::SyncError::PortAlreadyBound.to_string()));
        };
        let (sender, receiver) = config.port.split();
        Ok(StoreSyncState {
            phase: SyncPhase::PortBound,
            peer: None,
            send_filter: config.send_filter,
            receive_filter: config.receive_filter,
            link: SyncLink {
                sender,
                receiver: Arc::new(Mutex::new(Some(receiver))),
                pending: Arc::new(Mutex::new(VecDeque::new())),
                max_pending: config.max_pending,
            },
        })
    }

    fn apply(
        &self,
        action: &StoreSyncAction,
        state: &Arc<StoreSyncState>,
    ) -> Result<Arc<StoreSyncState>, SliceError> {
        match action {
            StoreSyncAction::RemoteReady { peer } => match state.phase {
                SyncPhase::PortBound => {
                    Ok(Arc::new(state.with_phase(SyncPhase::Syncing, Some(*peer))))
                }
                SyncPhase::Syncing | SyncPhase::TornDown => Ok(state.clone()),
            },
            StoreSyncAction::PortClosed => match state.phase {
                SyncPhase::TornDown => Ok(state.clone()),
                _ => Ok(Arc::new(state.with_phase(SyncPhase::TornDown, state.peer))),
            },
        }
    }

    fn side_effects(&self) -> Vec<SideEffect> {
        vec![
            STORE_SYNC_KEY.effect("listener").deferred_once(listen),
            STORE_SYNC_KEY.effect("outbound").update(forward_outbound),
        ]
    }
}

async fn listen(store: Store, signal: AbortSignal) {
    let Some(state) = STORE_SYNC_KEY.get_from(&store) else {
        return;
    };
    let Some(mut receiver) = state.link.receiver.lock().take() else {
        warn!(store = %store.name(), "Sync listener already attached");
        return;
    };
    let link = state.link.clone();
    let context = store.context();

    link.post(&SyncMessage::Hello { context });

    loop {
        tokio::select! {
            _ = signal.aborted() => {
                link.sender.close();
                debug!(store = %store.name(), "Sync listener stopped");
                break;
            }
            raw = receiver.recv() => {
                let Some(raw) = raw else {
                    info!(store = %store.name(), "Sync peer closed the port");
                    if let Err(err) = store.dispatch_action(&StoreSyncAction::PortClosed) {
                        debug!(store = %store.name(), error = %err, "Could not record port close");
                    }
                    link.sender.close();
                    break;
                };
                handle_message(&store, &link, &raw);
            }
        }
    }
}

fn handle_message(store: &Store, link: &SyncLink, raw: &str) {
    let message = match SyncMessage::decode(raw) {
        Ok(message) => message,
        Err(err) => {
            warn!(store = %store.name(), error = %err, "Ignoring malformed sync message");
            return;
        }
    };

    match message {
        SyncMessage::Hello { context } => {
            link.post(&SyncMessage::HelloAck {
                context: store.context(),
            });
            mark_remote_ready(store, context);
        }
        SyncMessage::HelloAck { context } => mark_remote_ready(store, context),
        SyncMessage::Action { from, action } => {
            let allowed = STORE_SYNC_KEY
                .get_from(store)
                .is_some_and(|state| state.receive_filter.allows(&action));
            if !allowed {
                debug!(store = %store.name(), action = %action, "Rejected inbound action");
                return;
            }
            debug!(store = %store.name(), action = %action, from = %from, "Replaying remote action");
            if let Err(err) = store.dispatch_remote(action, from) {
                warn!(store = %store.name(), error = %err, "Remote action failed to apply");
            }
        }
    }
}

fn mark_remote_ready(store: &Store, peer: ExecutionContext) {
    let already = STORE_SYNC_KEY
        .get_from(store)
        .is_some_and(|state| state.phase != SyncPhase::PortBound);
    if already {
        return;
    }
    if let Err(err) = store.dispatch_action(&StoreSyncAction::RemoteReady { peer }) {
        warn!(store = %store.name(), error = %err, "Could not record sync handshake");
    }
}

fn forward_outbound(
    store: &Store,
    dispatched: &DispatchedAction,
    _prev: &StoreState,
) -> anyhow::Result<()> {
    let Some(state) = STORE_SYNC_KEY.get_from(store) else {
        return Ok(());
    };
    let context = store.context();

    if let Ok(Some(StoreSyncAction::RemoteReady { peer })) =
        dispatched.action.decode::<StoreSyncAction>()
    {
        let queued: Vec<Action> = state.link.pending.lock().drain(..).collect();
        info!(
            store = %store.name(),
            peer = %peer,
            flushed = queued.len(),
            "Sync handshake complete"
        );
        for action in queued {
            state.link.post(&SyncMessage::Action {
                from: context,
                action,
            });
        }
        return Ok(());
    }

    if !dispatched.origin.is_local() || !state.send_filter.allows(&dispatched.action) {
        return Ok(());
    }

    match state.phase {
        SyncPhase::Syncing => state.link.post(&SyncMessage::Action {
            from: context,
            action: dispatched.action.clone(),
        }),
        SyncPhase::PortBound => {
            let mut pending = state.link.pending.lock();
            if pending.len() >= state.link.max_pending {
                warn!(
                    store = %store.name(),
                    action = %dispatched.action,
                    max_pending = state.link.max_pending,
                    "Sync queue full, dropping action"
                );
            } else {
                pending.push_back(dispatched.action.clone());
            }
        }
        SyncPhase::TornDown => {
            debug!(store = %store.name(), action = %dispatched.action, "Peer gone, dropping action");
        }
    }
    Ok(())
}
