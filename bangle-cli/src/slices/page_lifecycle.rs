//! Window-only bridge between the host's page lifecycle and the page slice
//!
//! The host owns a `PageLifecycleSource`. This slice subscribes to it for
//! the lifetime of the store and mirrors every transition into
//! `@bangle.io/slice-page`. In the other direction, a blocked reload is
//! reported back to the source as a pending unsaved change so the host can
//! warn before the page goes away.

use bangle_store::{NoAction, SideEffect, Slice, SliceError, SliceKey, Store, StoreConfig};
use bangle_workspace::slices::{PageLifecycleState, PageSliceAction, PageSliceState, PAGE_KEY};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

pub const PAGE_LIFECYCLE_KEY_NAME: &str = "page-lifecycle";

pub const PAGE_LIFECYCLE_KEY: SliceKey<()> = SliceKey::new(PAGE_LIFECYCLE_KEY_NAME);

/// Marker registered while the page slice blocks reloads
pub const PENDING_WRITES_MARKER: &str = "pending-writes";

const LIFECYCLE_CHANNEL_CAPACITY: usize = 32;

struct SourceShared {
    current: Mutex<Option<PageLifecycleState>>,
    unsaved: Mutex<BTreeSet<String>>,
}

/// Host-side emitter of page lifecycle transitions
#[derive(Clone)]
pub struct PageLifecycleSource {
    tx: broadcast::Sender<PageLifecycleState>,
    shared: Arc<SourceShared>,
}

impl PageLifecycleSource {
    pub fn new(initial: Option<PageLifecycleState>) -> Self {
        let (tx, _) = broadcast::channel(LIFECYCLE_CHANNEL_CAPACITY);
        Self {
            tx,
            shared: Arc::new(SourceShared {
                current: Mutex::new(initial),
                unsaved: Mutex::new(BTreeSet::new()),
            }),
        }
    }

    pub fn current(&self) -> Option<PageLifecycleState> {
        *self.shared.current.lock()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PageLifecycleState> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Record a transition and notify subscribers
    pub fn set_state(&self, state: PageLifecycleState) {
        *self.shared.current.lock() = Some(state);
        if self.tx.send(state).is_err() {
            debug!(state = %state, "No lifecycle subscribers");
        }
    }

    pub fn add_unsaved_changes(&self, marker: &str) {
        self.shared.unsaved.lock().insert(marker.to_string());
    }

    pub fn remove_unsaved_changes(&self, marker: &str) {
        self.shared.unsaved.lock().remove(marker);
    }

    pub fn has_unsaved_changes(&self) -> bool {
        !self.shared.unsaved.lock().is_empty()
    }
}

impl Default for PageLifecycleSource {
    fn default() -> Self {
        Self::new(None)
    }
}

impl std::fmt::Debug for PageLifecycleSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageLifecycleSource")
            .field("current", &self.current())
            .field("unsaved", &self.has_unsaved_changes())
            .finish()
    }
}

pub struct PageLifecycleSlice {
    source: PageLifecycleSource,
}

impl PageLifecycleSlice {
    pub fn new(source: PageLifecycleSource) -> Self {
        Self { source }
    }
}

fn dispatch_lifecycle(store: &Store, current: Option<PageLifecycleState>) -> bool {
    let previous = PAGE_KEY.get_from(store).and_then(|page| page.lifecycle);
    let action = PageSliceAction::UpdatePageLifecycleState { current, previous };
    match store.dispatch_action(&action) {
        Ok(()) => true,
        Err(err) => {
            warn!(store = %store.name(), error = %err, "Could not record page lifecycle");
            false
        }
    }
}

impl Slice for PageLifecycleSlice {
    type State = ();
    type Action = NoAction;

    fn key(&self) -> SliceKey<()> {
        PAGE_LIFECYCLE_KEY
    }

    fn init(&self, _config: &StoreConfig) -> Result<(), SliceError> {
        Ok(())
    }

    fn side_effects(&self) -> Vec<SideEffect> {
        let source = self.source.clone();
        let watch = PAGE_LIFECYCLE_KEY
            .effect("watch-lifecycle")
            .deferred_once(move |store, signal| async move {
                let mut rx = source.subscribe();
                if !dispatch_lifecycle(&store, source.current()) {
                    return;
                }
                loop {
                    tokio::select! {
                        _ = signal.aborted() => break,
                        received = rx.recv() => match received {
                            Ok(state) => {
                                if !dispatch_lifecycle(&store, Some(state)) {
                                    break;
                                }
                            }
                            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                                warn!(skipped, "Page lifecycle events dropped");
                                if !dispatch_lifecycle(&store, source.current()) {
                                    break;
                                }
                            }
                            Err(broadcast::error::RecvError::Closed) => break,
                        },
                    }
                }
                debug!(store = %store.name(), "Stopped watching page lifecycle");
            });

        let source = self.source.clone();
        let guard = PAGE_LIFECYCLE_KEY.reactor(
            "block-reload",
            vec![PAGE_KEY.select("blockReload", |s: &PageSliceState| s.block_reload)],
            move |_store, values| {
                if values.get::<bool>("blockReload").copied().unwrap_or(false) {
                    source.add_unsaved_changes(PENDING_WRITES_MARKER);
                } else {
                    source.remove_unsaved_changes(PENDING_WRITES_MARKER);
                }
                Ok(())
            },
        );

        vec![watch, guard]
    }
}
