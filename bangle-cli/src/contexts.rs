//! Window and worker ("naukar") store composition
//!
//! Both contexts carry the same shared slices in their own order. The
//! shared slices run their side effects in the worker only; store-sync is
//! the exception and runs on both ends of the channel.
//!
//! ```text
//!  window thread                           naukar thread
//!  page                                    store-sync
//!  page-lifecycle                          page
//!  store-sync   ◄──── MessageChannel ────► workspace-context (effects)
//!  workspace-context                       workspaces-manager (effects)
//!  workspaces-manager
//!  editor-manager
//! ```

use crate::config::AppConfig;
use crate::constants::WORKER_SYNC_WHITELISTED_ACTIONS;
use crate::slices::{Editor, EditorManagerSlice, PageLifecycleSlice, PageLifecycleSource};
use bangle_store::{
    declared_action_names, AnySlice, ExecutionContext, ResourceRegistry, Slice, Store,
    StoreConfig, StoreError,
};
use bangle_sync::{
    ActionFilter, MessageChannel, MessagePort, StoreSyncConfig, StoreSyncSlice, SyncError,
};
use bangle_workspace::slices::workspaces_manager::WorkspaceInfoStore;
use bangle_workspace::slices::{PageSlice, WorkspaceSlice, WorkspacesSlice};
use bangle_workspace::{FileOps, StoreNavigator, WorkspaceEnv};
use std::sync::Arc;
use std::thread::JoinHandle;
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

pub const WINDOW_STORE_NAME: &str = "bangle-store";
pub const NAUKAR_STORE_NAME: &str = "naukar-store";

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("Invalid sync whitelist: {0}")]
    Whitelist(#[from] SyncError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Failed to start naukar: {0}")]
    WorkerStart(String),

    #[error("Naukar thread panicked")]
    WorkerPanicked,
}

pub type Result<T> = std::result::Result<T, ContextError>;

/// The filter both ends of the window/worker channel use
pub fn sync_filter() -> ActionFilter {
    ActionFilter::new(WORKER_SYNC_WHITELISTED_ACTIONS.iter().copied())
}

fn sync_slice(port: MessagePort, config: &AppConfig) -> StoreSyncSlice {
    StoreSyncSlice::new(
        StoreSyncConfig::symmetric(port, sync_filter()).with_max_pending(config.sync.max_pending),
    )
}

/// Collaborators owned by the window context
#[derive(Debug, Clone, Default)]
pub struct WindowParts {
    pub lifecycle: PageLifecycleSource,
    pub editors: ResourceRegistry<Editor>,
}

pub fn window_slices(
    port: MessagePort,
    config: &AppConfig,
    parts: &WindowParts,
) -> Vec<Box<dyn AnySlice>> {
    vec![
        PageSlice.boxed(),
        PageLifecycleSlice::new(parts.lifecycle.clone()).boxed(),
        sync_slice(port, config).boxed(),
        WorkspaceSlice::new().boxed(),
        WorkspacesSlice::new().boxed(),
        EditorManagerSlice::new(parts.editors.clone()).boxed(),
    ]
}

pub fn naukar_slices(
    port: MessagePort,
    config: &AppConfig,
    env: WorkspaceEnv,
    workspace_infos: Arc<WorkspaceInfoStore>,
) -> Vec<Box<dyn AnySlice>> {
    vec![
        sync_slice(port, config).boxed(),
        PageSlice.boxed(),
        WorkspaceSlice::with_effects(env).boxed(),
        WorkspacesSlice::with_effects(workspace_infos).boxed(),
    ]
}

/// Check the whitelist against the slices' actions, then build the store
pub fn create_store(
    slices: Vec<Box<dyn AnySlice>>,
    name: &str,
    context: ExecutionContext,
) -> Result<Store> {
    sync_filter().validate_against(&declared_action_names(&slices))?;
    Ok(Store::create(slices, StoreConfig::new(name, context))?)
}

/// Create the window store on the current runtime
pub fn create_window_store(
    port: MessagePort,
    config: &AppConfig,
    parts: &WindowParts,
) -> Result<Store> {
    let store = create_store(
        window_slices(port, config, parts),
        WINDOW_STORE_NAME,
        ExecutionContext::Window,
    )?;
    debug!(tab = %config.tab_id(), "Window store ready");
    Ok(store)
}

/// What the worker needs from the outside world
pub struct NaukarOptions {
    pub config: AppConfig,
    pub file_ops: Arc<dyn FileOps>,
    pub workspace_infos: Arc<WorkspaceInfoStore>,
}

/// The window's end of a running naukar
///
/// Dropping the handle terminates the worker.
#[derive(Debug)]
pub struct NaukarHandle {
    port: Option<MessagePort>,
    shutdown: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl NaukarHandle {
    /// The window's end of the channel; `None` once taken
    pub fn take_port(&mut self) -> Option<MessagePort> {
        self.port.take()
    }

    /// Destroy the worker store and wait for its thread to exit
    pub async fn terminate(mut self) -> Result<()> {
        self.signal_shutdown();
        let Some(thread) = self.thread.take() else {
            return Ok(());
        };
        match tokio::task::spawn_blocking(move || thread.join()).await {
            Ok(Ok(())) => Ok(()),
            _ => Err(ContextError::WorkerPanicked),
        }
    }

    fn signal_shutdown(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            // An error means the worker already stopped on its own.
            let _ = shutdown.send(());
        }
    }
}

impl Drop for NaukarHandle {
    fn drop(&mut self) {
        self.signal_shutdown();
        let Some(thread) = self.thread.take() else {
            return;
        };
        let join = move || {
            if thread.join().is_err() {
                warn!("Naukar thread panicked");
            }
        };
        // Never block a runtime thread on the join
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn_blocking(join);
            }
            Err(_) => join(),
        }
    }
}

/// Start the worker store on its own thread and runtime
///
/// Resolves once the worker store exists, so the window can start
/// dispatching right away; anything sent before the handshake is queued.
pub async fn spawn_naukar(options: NaukarOptions) -> Result<NaukarHandle> {
    let (window_port, worker_port) = MessageChannel::new().into_ports();
    let (ready_tx, ready_rx) = oneshot::channel::<Result<()>>();
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let thread = std::thread::Builder::new()
        .name("naukar".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(err) => {
                    let _ = ready_tx.send(Err(ContextError::WorkerStart(err.to_string())));
                    return;
                }
            };

            runtime.block_on(async move {
                let navigator = Arc::new(StoreNavigator::new());
                let env = WorkspaceEnv::new(options.file_ops, navigator.clone());
                let slices =
                    naukar_slices(worker_port, &options.config, env, options.workspace_infos);
                let store = match create_store(slices, NAUKAR_STORE_NAME, ExecutionContext::Worker)
                {
                    Ok(store) => store,
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                        return;
                    }
                };
                navigator.bind(&store);
                info!(store = %store.name(), "Naukar started");
                let _ = ready_tx.send(Ok(()));

                // Resolves on terminate() or when the handle is dropped
                let _ = shutdown_rx.await;
                store.destroy();
                // Let the sync listener see the abort and close its port
                tokio::task::yield_now().await;
                info!(store = %store.name(), "Naukar stopped");
            });
        })
        .map_err(|err| ContextError::WorkerStart(err.to_string()))?;

    let handle = NaukarHandle {
        port: Some(window_port),
        shutdown: Some(shutdown_tx),
        thread: Some(thread),
    };

    match ready_rx.await {
        Ok(Ok(())) => Ok(handle),
        Ok(Err(err)) => {
            handle.terminate().await?;
            Err(err)
        }
        Err(_) => {
            handle.terminate().await?;
            Err(ContextError::WorkerPanicked)
        }
    }
}
