//! Window and naukar stores running side by side

use bangle_cli::contexts::{create_window_store, naukar_slices, spawn_naukar, window_slices};
use bangle_cli::slices::PageLifecycleSource;
use bangle_cli::{AppConfig, NaukarOptions, WindowParts};
use bangle_store::{AnySlice, ExecutionContext, Store};
use bangle_sync::{MessageChannel, SyncPhase, STORE_SYNC_KEY};
use bangle_workspace::operations::update_location;
use bangle_workspace::slices::page::page_lifecycle;
use bangle_workspace::slices::{
    PageLifecycleState, WorkspaceInfo, WorkspaceType, WORKSPACES_KEY, WORKSPACE_KEY,
};
use bangle_workspace::{
    KeyValueStore, MemoryFileOps, MemoryKeyValueStore, RecordingNavigator, WorkspaceEnv,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

async fn eventually(check: impl Fn() -> bool) -> bool {
    for _ in 0..1000 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    check()
}

fn find<'a>(slices: &'a [Box<dyn AnySlice>], key: &str) -> Option<&'a dyn AnySlice> {
    slices.iter().find(|s| s.key_name() == key).map(|s| s.as_ref())
}

#[test]
fn test_shared_slices_run_effects_in_naukar_only() {
    let config = AppConfig::default();
    let (a, b) = MessageChannel::new().into_ports();
    let window = window_slices(a, &config, &WindowParts::default());
    let env = WorkspaceEnv::new(
        Arc::new(MemoryFileOps::new()),
        Arc::new(RecordingNavigator::new()),
    );
    let infos = Arc::new(MemoryKeyValueStore::<WorkspaceInfo>::new());
    let naukar = naukar_slices(b, &config, env, infos);

    let common: Vec<&str> = window
        .iter()
        .map(|s| s.key_name())
        .filter(|key| find(&naukar, key).is_some())
        .collect();
    assert_eq!(
        common,
        vec![
            "@bangle.io/slice-page",
            "store-sync",
            "workspace-context",
            "@bangle.io/slice-workspaces-manager",
        ]
    );

    for key in ["workspace-context", "@bangle.io/slice-workspaces-manager"] {
        assert!(find(&window, key).unwrap().effects().is_empty(), "{key} in window");
        assert!(!find(&naukar, key).unwrap().effects().is_empty(), "{key} in naukar");
    }
    // store sync needs its effects on both ends
    assert!(!find(&window, "store-sync").unwrap().effects().is_empty());
    assert!(!find(&naukar, "store-sync").unwrap().effects().is_empty());
}

async fn start(
    files: MemoryFileOps,
    infos: Arc<MemoryKeyValueStore<WorkspaceInfo>>,
    parts: &WindowParts,
) -> (Store, bangle_cli::NaukarHandle) {
    let config = AppConfig::default();
    let mut naukar = spawn_naukar(NaukarOptions {
        config: config.clone(),
        file_ops: Arc::new(files),
        workspace_infos: infos,
    })
    .await
    .unwrap();
    let window = create_window_store(naukar.take_port().unwrap(), &config, parts).unwrap();
    (window, naukar)
}

#[tokio::test]
async fn test_window_receives_naukar_listing() {
    let files = MemoryFileOps::new()
        .with_file("my-ws:one.md", "# one")
        .with_file("my-ws:dir/two.md", "# two");
    let infos = Arc::new(MemoryKeyValueStore::new());
    infos
        .put("my-ws", WorkspaceInfo::new("my-ws", WorkspaceType::NativeFs))
        .await
        .unwrap();
    let (window, naukar) = start(files, infos, &WindowParts::default()).await;

    update_location(&window, "/ws/my-ws/one.md", "").unwrap();

    assert!(
        eventually(|| {
            WORKSPACE_KEY
                .get_from(&window)
                .and_then(|s| s.ws_paths_of("my-ws").map(<[String]>::to_vec))
                == Some(vec!["my-ws:dir/two.md".to_string(), "my-ws:one.md".to_string()])
        })
        .await
    );
    assert!(
        eventually(|| WORKSPACES_KEY
            .get_from(&window)
            .is_some_and(|s| s.workspace_info("my-ws").is_some()))
        .await
    );

    let sync = STORE_SYNC_KEY.get_from(&window).unwrap();
    assert_eq!(sync.phase(), SyncPhase::Syncing);
    assert_eq!(sync.peer(), Some(ExecutionContext::Worker));

    naukar.terminate().await.unwrap();
    assert!(
        eventually(|| STORE_SYNC_KEY
            .get_from(&window)
            .is_some_and(|s| s.phase() == SyncPhase::TornDown))
        .await
    );
    window.destroy();
}

#[tokio::test]
async fn test_missing_workspace_redirects_window() {
    let (window, naukar) = start(
        MemoryFileOps::new(),
        Arc::new(MemoryKeyValueStore::new()),
        &WindowParts::default(),
    )
    .await;

    update_location(&window, "/ws/ghost", "").unwrap();
    assert!(
        eventually(|| WORKSPACE_KEY
            .get_from(&window)
            .is_some_and(|s| s.location_pathname() == "/ws-not-found/ghost"))
        .await
    );

    window.destroy();
    naukar.terminate().await.unwrap();
}

#[tokio::test]
async fn test_window_tracks_page_lifecycle() {
    let parts = WindowParts {
        lifecycle: PageLifecycleSource::new(Some(PageLifecycleState::Active)),
        ..WindowParts::default()
    };
    let (window, naukar) = start(
        MemoryFileOps::new(),
        Arc::new(MemoryKeyValueStore::new()),
        &parts,
    )
    .await;

    assert!(eventually(|| page_lifecycle(&window) == Some(PageLifecycleState::Active)).await);
    assert!(eventually(|| parts.lifecycle.subscriber_count() == 1).await);
    parts.lifecycle.set_state(PageLifecycleState::Passive);
    assert!(eventually(|| page_lifecycle(&window) == Some(PageLifecycleState::Passive)).await);

    window.destroy();
    assert!(eventually(|| parts.lifecycle.subscriber_count() == 0).await);
    naukar.terminate().await.unwrap();
}

#[tokio::test]
async fn test_naukar_start_and_stop_leave_runtime_free() {
    let ticks = Arc::new(AtomicUsize::new(0));
    let ticker = tokio::spawn({
        let ticks = ticks.clone();
        async move {
            loop {
                ticks.fetch_add(1, Ordering::SeqCst);
                tokio::task::yield_now().await;
            }
        }
    });

    let naukar = spawn_naukar(NaukarOptions {
        config: AppConfig::default(),
        file_ops: Arc::new(MemoryFileOps::new()),
        workspace_infos: Arc::new(MemoryKeyValueStore::<WorkspaceInfo>::new()),
    })
    .await
    .unwrap();
    naukar.terminate().await.unwrap();

    // Both awaits yielded to the single-threaded runtime
    assert!(ticks.load(Ordering::SeqCst) > 0);
    ticker.abort();
}
