//! Sync command implementation
//!
//! Runs both contexts in one process: the window store on the caller's
//! runtime, the naukar on its own thread. The window only navigates; the
//! file listing it prints was produced by the naukar and arrived over the
//! sync channel.

use crate::config::AppConfig;
use crate::constants::FILE_PALETTE_MAX_FILES;
use crate::contexts::{create_window_store, spawn_naukar, NaukarOptions, WindowParts};
use anyhow::{anyhow, bail, Context, Result};
use bangle_store::Store;
use bangle_sync::{SyncPhase, STORE_SYNC_KEY};
use bangle_workspace::operations::update_location;
use bangle_workspace::slices::{WorkspaceInfo, WORKSPACE_KEY};
use bangle_workspace::ws_path::{valid_ws_name, ws_name_to_pathname};
use bangle_workspace::{DiskFileOps, MemoryKeyValueStore};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub root: Option<PathBuf>,
    pub ws_name: String,
    pub timeout: Duration,
    pub json: bool,
}

enum Outcome {
    Listed(Vec<String>),
    Redirected(String),
}

/// List a workspace through the window/naukar pair
pub async fn sync_workspace(config: &AppConfig, opts: SyncOptions) -> Result<()> {
    let root = opts
        .root
        .clone()
        .or_else(|| config.workspaces_root.clone())
        .ok_or_else(|| anyhow!("No workspaces root given; pass --root or set workspaces_root"))?;
    valid_ws_name(&opts.ws_name)?;

    let mut naukar = spawn_naukar(NaukarOptions {
        config: config.clone(),
        file_ops: Arc::new(DiskFileOps::new(&root)),
        workspace_infos: Arc::new(MemoryKeyValueStore::<WorkspaceInfo>::new()),
    })
    .await
    .context("Failed to start naukar")?;
    let port = naukar
        .take_port()
        .ok_or_else(|| anyhow!("Naukar port already taken"))?;

    let window = create_window_store(port, config, &WindowParts::default())?;
    info!(root = %root.display(), ws = %opts.ws_name, "Opening workspace");
    update_location(&window, &ws_name_to_pathname(&opts.ws_name), "")?;

    let outcome =
        tokio::time::timeout(opts.timeout, wait_for_listing(&window, &opts.ws_name)).await;

    window.destroy();
    naukar.terminate().await?;

    let ws_paths = match outcome {
        Ok(Outcome::Listed(ws_paths)) => ws_paths,
        Ok(Outcome::Redirected(pathname)) => {
            bail!("Workspace {} could not be opened ({pathname})", opts.ws_name)
        }
        Err(_) => bail!(
            "Timed out after {:?} waiting for workspace {}",
            opts.timeout,
            opts.ws_name
        ),
    };

    print_listing(&ws_paths, opts.json)
}

async fn wait_for_listing(window: &Store, ws_name: &str) -> Outcome {
    loop {
        if let Some(state) = WORKSPACE_KEY.get_from(window) {
            if let Some(ws_paths) = state.ws_paths_of(ws_name) {
                return Outcome::Listed(ws_paths.to_vec());
            }
            // The naukar navigates away when the workspace cannot be read
            if state.ws_name().as_deref() != Some(ws_name) {
                return Outcome::Redirected(state.location_pathname().to_string());
            }
        }
        let phase = STORE_SYNC_KEY.get_from(window).map(|s| s.phase());
        debug!(phase = ?phase, "Waiting for workspace listing");
        if phase == Some(SyncPhase::TornDown) {
            return Outcome::Redirected("naukar stopped".to_string());
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

fn print_listing(ws_paths: &[String], json: bool) -> Result<()> {
    let shown = &ws_paths[..ws_paths.len().min(FILE_PALETTE_MAX_FILES)];
    if json {
        println!("{}", serde_json::to_string_pretty(shown)?);
        return Ok(());
    }

    if ws_paths.is_empty() {
        println!("No files found");
        return Ok(());
    }
    for ws_path in shown {
        println!("{ws_path}");
    }
    if ws_paths.len() > shown.len() {
        println!("... and {} more", ws_paths.len() - shown.len());
    }
    Ok(())
}
