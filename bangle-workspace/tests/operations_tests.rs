//! Workspace operations against an in-memory file system

use bangle_store::{
    Action, NoAction, SideEffect, Slice, SliceAction, SliceError, SliceKey, Store, StoreConfig,
};
use bangle_workspace::operations::{
    check_file_exists, create_note, delete_note, get_note, is_current_ws_name, push_ws_path,
    refresh_ws_paths, rename_note, update_location, update_opened_ws_paths,
};
use bangle_workspace::slices::{WorkspaceSlice, WORKSPACE_KEY};
use bangle_workspace::ws_path::{ws_name_to_pathname, ws_path_to_pathname};
use bangle_workspace::{
    FileOpCall, FileSystemError, MemoryFileOps, NavigationEvent, OpenedWsPaths,
    RecordingNavigator, WorkspaceEnv, WorkspaceError, WorkspaceErrorCode, HELP_FS_WORKSPACE_NAME,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const UPDATE_WS_PATHS: &str = "action::workspace-context:update-ws-paths";

/// Records the name of every committed action
struct RecorderSlice(Arc<Mutex<Vec<String>>>);

impl Slice for RecorderSlice {
    type State = ();
    type Action = NoAction;

    fn key(&self) -> SliceKey<()> {
        SliceKey::new("recorder")
    }

    fn init(&self, _config: &StoreConfig) -> Result<(), SliceError> {
        Ok(())
    }

    fn side_effects(&self) -> Vec<SideEffect> {
        let names = self.0.clone();
        vec![SideEffect::new("recorder/names").update(move |_, dispatched, _| {
            names.lock().push(dispatched.action.name.clone());
            Ok(())
        })]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "name", content = "value")]
enum SecondaryAction {
    #[serde(rename = "action::secondary-path:set")]
    Set { ws_path: Option<String> },
}

impl SliceAction for SecondaryAction {
    const NAMES: &'static [&'static str] = &["action::secondary-path:set"];
}

const SECONDARY: SliceKey<Option<String>> = SliceKey::new("secondary-path");

/// An unrelated slice that must not be touched by workspace actions
struct SecondaryPathSlice;

impl Slice for SecondaryPathSlice {
    type State = Option<String>;
    type Action = SecondaryAction;

    fn key(&self) -> SliceKey<Option<String>> {
        SECONDARY
    }

    fn init(&self, _config: &StoreConfig) -> Result<Option<String>, SliceError> {
        Ok(None)
    }

    fn apply(
        &self,
        action: &SecondaryAction,
        _state: &Arc<Option<String>>,
    ) -> Result<Arc<Option<String>>, SliceError> {
        match action {
            SecondaryAction::Set { ws_path } => Ok(Arc::new(ws_path.clone())),
        }
    }
}

struct Harness {
    store: Store,
    env: WorkspaceEnv,
    files: Arc<MemoryFileOps>,
    navigator: Arc<RecordingNavigator>,
    dispatched: Arc<Mutex<Vec<String>>>,
}

impl Harness {
    fn new(pathname: &str, search: &str) -> Self {
        Self::with_files(
            pathname,
            search,
            MemoryFileOps::new()
                .with_workspace("my-ws")
                .with_file("my-ws:test-note.md", "# test"),
        )
    }

    fn with_files(pathname: &str, search: &str, files: MemoryFileOps) -> Self {
        let dispatched = Arc::new(Mutex::new(Vec::new()));
        let store = Store::create(
            vec![
                WorkspaceSlice::new()
                    .initial_location(pathname, search)
                    .boxed(),
                SecondaryPathSlice.boxed(),
                RecorderSlice(dispatched.clone()).boxed(),
            ],
            StoreConfig::new("test", bangle_store::ExecutionContext::Window),
        )
        .unwrap();
        let files = Arc::new(files);
        let navigator = Arc::new(RecordingNavigator::new());
        let env = WorkspaceEnv::new(files.clone(), navigator.clone());
        Harness {
            store,
            env,
            files,
            navigator,
            dispatched,
        }
    }

    fn dispatched(&self) -> Vec<String> {
        self.dispatched.lock().clone()
    }

    fn history_updates(&self) -> Vec<(OpenedWsPaths, String, bool)> {
        self.navigator
            .events()
            .into_iter()
            .filter_map(|event| match event {
                NavigationEvent::UpdateOpenedWsPaths {
                    opened,
                    ws_name,
                    replace,
                } => Some((opened, ws_name, replace)),
                _ => None,
            })
            .collect()
    }

    fn ws_paths(&self) -> Option<Vec<String>> {
        WORKSPACE_KEY
            .get_from(&self.store)
            .and_then(|s| s.ws_paths_of("my-ws").map(<[String]>::to_vec))
    }
}

fn secondary_search(ws_path: &str) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .append_pair("secondary", ws_path)
        .finish()
}

#[test]
fn test_update_ws_paths_leaves_other_slices_alone() {
    let h = Harness::new("", "");
    let before = h.store.state();

    h.store
        .dispatch(Action::new(
            UPDATE_WS_PATHS,
            serde_json::json!({"wsName": "my-ws", "wsPaths": ["my-ws:one.md"]}),
        ))
        .unwrap();

    assert_eq!(h.ws_paths(), Some(vec!["my-ws:one.md".to_string()]));
    assert!(h.store.state().same_slice_state(&before, "secondary-path"));
    assert!(!h.store.state().same_slice_state(&before, "workspace-context"));
}

#[test]
fn test_update_location_dispatches_once() {
    let h = Harness::new("", "");
    update_location(&h.store, "test-pathname", "test-search").unwrap();
    assert_eq!(
        h.dispatched(),
        vec!["action::workspace-context:update-location"]
    );
}

#[test]
fn test_is_current_ws_name() {
    let h = Harness::new(&ws_name_to_pathname("my-workspace"), "");
    assert!(is_current_ws_name(&h.store, "my-workspace"));
    assert!(!is_current_ws_name(&h.store, "not"));
}

mod refresh {
    use super::*;

    #[tokio::test]
    async fn test_lists_current_workspace() {
        let h = Harness::new(&ws_name_to_pathname("my-ws"), "");
        refresh_ws_paths(&h.store, &h.env).await.unwrap();

        assert_eq!(h.files.calls(), vec![FileOpCall::ListAllFiles("my-ws".to_string())]);
        assert_eq!(h.dispatched(), vec![UPDATE_WS_PATHS]);
        assert_eq!(h.ws_paths(), Some(vec!["my-ws:test-note.md".to_string()]));
    }

    #[tokio::test]
    async fn test_nothing_without_workspace() {
        let h = Harness::new("", "");
        refresh_ws_paths(&h.store, &h.env).await.unwrap();

        assert!(h.files.calls().is_empty());
        assert!(h.dispatched().is_empty());
    }

    #[tokio::test]
    async fn test_error_clears_listing() {
        let h = Harness::new(&ws_name_to_pathname("my-ws"), "");
        h.files
            .fail_listing(FileSystemError::new(bangle_workspace::FileSystemErrorCode::Io, "test-error"));
        refresh_ws_paths(&h.store, &h.env).await.unwrap();

        assert_eq!(h.dispatched(), vec![UPDATE_WS_PATHS]);
        assert_eq!(h.ws_paths(), None);
        assert!(h.navigator.events().is_empty());
    }

    #[tokio::test]
    async fn test_permission_error_redirects_to_auth() {
        let h = Harness::new(&ws_name_to_pathname("my-ws"), "");
        h.files
            .fail_listing(FileSystemError::permission_denied("test-error"));
        refresh_ws_paths(&h.store, &h.env).await.unwrap();

        assert_eq!(h.dispatched(), vec![UPDATE_WS_PATHS]);
        assert_eq!(
            h.navigator.events(),
            vec![NavigationEvent::GoToLocation {
                location: "/ws-auth/my-ws?code=BABY_FS_NATIVE_BROWSER_USER_ABORTED_ERROR"
                    .to_string(),
                replace: true,
            }]
        );
    }

    #[tokio::test]
    async fn test_missing_workspace_redirects_to_not_found() {
        let h = Harness::new(&ws_name_to_pathname("my-ws"), "");
        h.files.fail_listing(WorkspaceError::not_found("my-ws"));
        refresh_ws_paths(&h.store, &h.env).await.unwrap();

        assert_eq!(h.dispatched(), vec![UPDATE_WS_PATHS]);
        assert_eq!(
            h.navigator.events(),
            vec![NavigationEvent::GoToLocation {
                location: "/ws-not-found/my-ws".to_string(),
                replace: true,
            }]
        );
    }
}

mod opened_ws_paths {
    use super::*;

    #[test]
    fn test_false_without_workspace() {
        let h = Harness::new("", "");
        assert!(!update_opened_ws_paths(&h.store, &h.env, |r| r.clone(), false));
        assert!(h.navigator.events().is_empty());
    }

    #[test]
    fn test_updates_history() {
        let h = Harness::new(&ws_name_to_pathname("my-ws"), "");
        let opened = OpenedWsPaths::from_array([Some("my-ws:one.md"), None]);

        assert!(update_opened_ws_paths(&h.store, &h.env, |_| opened.clone(), false));
        assert_eq!(
            h.history_updates(),
            vec![(opened, "my-ws".to_string(), false)]
        );
        // History belongs to the navigator; the store is untouched
        assert!(h.dispatched().is_empty());
    }

    #[test]
    fn test_respects_replace() {
        let h = Harness::new(&ws_name_to_pathname("my-ws"), "");
        let opened = OpenedWsPaths::from_array([Some("my-ws:one.md"), None]);

        assert!(update_opened_ws_paths(&h.store, &h.env, |_| opened.clone(), true));
        assert!(h.history_updates()[0].2);
    }

    #[test]
    fn test_updater_sees_current_paths() {
        let h = Harness::new(&ws_path_to_pathname("my-ws:test-note.md").unwrap(), "");
        let seen = Mutex::new(None);

        let updated = update_opened_ws_paths(
            &h.store,
            &h.env,
            |current| {
                *seen.lock() = Some(current.clone());
                current.update_by_index(0, Some("my-ws:two.md"))
            },
            false,
        );

        assert!(updated);
        assert_eq!(
            seen.lock().as_ref().map(|o| o.to_array()),
            Some([Some("my-ws:test-note.md"), None])
        );
        assert_eq!(
            h.history_updates()[0].0.to_array(),
            [Some("my-ws:two.md"), None]
        );
    }

    #[test]
    fn test_existing_broken_paths_are_left_alone() {
        let h = Harness::new("/ws/my-ws/test-notemd", "");
        assert!(!update_opened_ws_paths(&h.store, &h.env, |r| r.clone(), false));
        assert!(h.dispatched().is_empty());
        assert!(h.navigator.events().is_empty());
    }

    #[test]
    fn test_invalid_secondary_redirects() {
        let h = Harness::new(&ws_path_to_pathname("my-ws:test-note.md").unwrap(), "");
        let updated = update_opened_ws_paths(
            &h.store,
            &h.env,
            |r| r.update_by_index(1, Some("my-ws-hello")),
            false,
        );

        assert!(!updated);
        assert_eq!(
            h.navigator.events(),
            vec![NavigationEvent::GoToLocation {
                location: "/ws-invalid-path/my-ws".to_string(),
                replace: true,
            }]
        );
    }

    #[test]
    fn test_paths_of_other_workspace_redirect() {
        let h = Harness::new(&ws_name_to_pathname("my-ws"), "");
        let updated = update_opened_ws_paths(
            &h.store,
            &h.env,
            |r| r.update_by_index(0, Some("other-ws:note.md")),
            false,
        );
        assert!(!updated);
        assert!(h.history_updates().is_empty());
    }
}

mod rename {
    use super::*;

    #[tokio::test]
    async fn test_false_without_workspace() {
        let h = Harness::new("", "");
        let renamed = rename_note(&h.store, &h.env, "my-ws:test-note.md", "my-ws:new-test-note.md")
            .await
            .unwrap();
        assert!(!renamed);
        assert!(h.dispatched().is_empty());
        assert!(h.files.calls().is_empty());
    }

    #[tokio::test]
    async fn test_follows_note_opened_in_primary() {
        let h = Harness::new(&ws_path_to_pathname("my-ws:test-note.md").unwrap(), "");
        rename_note(&h.store, &h.env, "my-ws:test-note.md", "my-ws:new-test-note.md")
            .await
            .unwrap();

        assert_eq!(
            h.files.calls()[0],
            FileOpCall::RenameFile(
                "my-ws:test-note.md".to_string(),
                "my-ws:new-test-note.md".to_string()
            )
        );
        assert_eq!(h.dispatched(), vec![UPDATE_WS_PATHS]);
        assert_eq!(h.ws_paths(), Some(vec!["my-ws:new-test-note.md".to_string()]));

        let updates = h.history_updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].0.to_array(), [Some("my-ws:new-test-note.md"), None]);
        assert_eq!(updates[0].1, "my-ws");
        assert!(updates[0].2);
    }

    #[tokio::test]
    async fn test_follows_note_opened_in_secondary() {
        let h = Harness::new(
            &ws_name_to_pathname("my-ws"),
            &secondary_search("my-ws:test-note.md"),
        );
        rename_note(&h.store, &h.env, "my-ws:test-note.md", "my-ws:new-test-note.md")
            .await
            .unwrap();

        let updates = h.history_updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].0.to_array(), [None, Some("my-ws:new-test-note.md")]);
        assert!(updates[0].2);
    }

    #[tokio::test]
    async fn test_note_not_opened() {
        let h = Harness::new(&ws_path_to_pathname("my-ws:my-other-file.md").unwrap(), "");
        rename_note(&h.store, &h.env, "my-ws:test-note.md", "my-ws:new-test-note.md")
            .await
            .unwrap();

        assert_eq!(h.dispatched(), vec![UPDATE_WS_PATHS]);
        assert!(h.history_updates().is_empty());
    }

    #[tokio::test]
    async fn test_same_path() {
        let h = Harness::new(&ws_path_to_pathname("my-ws:test-note.md").unwrap(), "");
        rename_note(&h.store, &h.env, "my-ws:test-note.md", "my-ws:test-note.md")
            .await
            .unwrap();

        assert_eq!(h.dispatched(), vec![UPDATE_WS_PATHS]);
        assert!(h.history_updates().is_empty());
    }

    #[tokio::test]
    async fn test_primary_and_secondary_same() {
        let h = Harness::new(
            &ws_path_to_pathname("my-ws:test-note.md").unwrap(),
            &secondary_search("my-ws:test-note.md"),
        );
        rename_note(&h.store, &h.env, "my-ws:test-note.md", "my-ws:new-test-note.md")
            .await
            .unwrap();

        let updates = h.history_updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(
            updates[0].0.to_array(),
            [Some("my-ws:new-test-note.md"), Some("my-ws:new-test-note.md")]
        );
    }

    #[tokio::test]
    async fn test_help_documents_cannot_be_renamed() {
        let h = Harness::new(&ws_name_to_pathname(HELP_FS_WORKSPACE_NAME), "");
        let err = rename_note(&h.store, &h.env, "my-ws:test-note.md", "my-ws:new-test-note.md")
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Cannot rename a help document");
        assert_eq!(err.workspace_code(), Some(WorkspaceErrorCode::HelpDocRename));
        assert!(h.history_updates().is_empty());
        assert!(h.files.calls().is_empty());
    }
}

mod notes {
    use super::*;

    #[tokio::test]
    async fn test_get_note() {
        let h = Harness::new(&ws_name_to_pathname("my-ws"), "");
        let doc = get_note(&h.store, &h.env, "my-ws:test-note.md").await.unwrap();
        assert_eq!(doc.as_deref(), Some("# test"));
        assert!(h.dispatched().is_empty());
    }

    #[tokio::test]
    async fn test_get_note_without_workspace() {
        let h = Harness::new("", "");
        let doc = get_note(&h.store, &h.env, "my-ws:test-note.md").await.unwrap();
        assert_eq!(doc, None);
        assert!(h.files.calls().is_empty());
    }

    #[tokio::test]
    async fn test_create_note_when_missing() {
        let h = Harness::new(&ws_path_to_pathname("my-ws:test-note.md").unwrap(), "");
        let wsp = "my-ws:new-test-note.md";
        assert!(create_note(&h.store, &h.env, wsp, "fresh", true).await.unwrap());

        assert_eq!(
            &h.files.calls()[..2],
            &[
                FileOpCall::CheckFileExists(wsp.to_string()),
                FileOpCall::SaveDoc(wsp.to_string()),
            ]
        );
        assert_eq!(h.files.doc(wsp).as_deref(), Some("fresh"));
        assert_eq!(h.dispatched(), vec![UPDATE_WS_PATHS]);
        let updates = h.history_updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].0.primary(), Some(wsp));
    }

    #[tokio::test]
    async fn test_create_note_keeps_existing() {
        let h = Harness::new(&ws_path_to_pathname("my-ws:other.md").unwrap(), "");
        let wsp = "my-ws:test-note.md";
        create_note(&h.store, &h.env, wsp, "overwritten?", true)
            .await
            .unwrap();

        assert!(!h.files.calls().contains(&FileOpCall::SaveDoc(wsp.to_string())));
        assert_eq!(h.files.doc(wsp).as_deref(), Some("# test"));
        assert_eq!(h.dispatched(), vec![UPDATE_WS_PATHS]);
        assert_eq!(h.history_updates().len(), 1);
    }

    #[tokio::test]
    async fn test_create_note_without_workspace() {
        let h = Harness::new("", "");
        let created = create_note(&h.store, &h.env, "my-ws:new-test-note.md", "x", false)
            .await
            .unwrap();
        assert!(!created);
        assert!(h.dispatched().is_empty());
    }

    #[tokio::test]
    async fn test_create_note_without_opening() {
        let h = Harness::new(&ws_path_to_pathname("my-ws:test-note.md").unwrap(), "");
        create_note(&h.store, &h.env, "my-ws:new-test-note.md", "x", false)
            .await
            .unwrap();
        assert_eq!(h.dispatched(), vec![UPDATE_WS_PATHS]);
        assert!(h.history_updates().is_empty());
    }

    #[tokio::test]
    async fn test_delete_opened_note() {
        let h = Harness::new(&ws_path_to_pathname("my-ws:test-note.md").unwrap(), "");
        delete_note(&h.store, &h.env, &["my-ws:test-note.md"])
            .await
            .unwrap();

        assert_eq!(
            h.files.calls()[0],
            FileOpCall::DeleteFile("my-ws:test-note.md".to_string())
        );
        assert_eq!(h.dispatched(), vec![UPDATE_WS_PATHS]);
        assert_eq!(h.ws_paths(), Some(Vec::new()));

        let updates = h.history_updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].0.to_array(), [None, None]);
        assert!(updates[0].2);
    }

    #[tokio::test]
    async fn test_delete_unopened_note() {
        let h = Harness::new(
            &ws_path_to_pathname("my-ws:some-other-test-note.md").unwrap(),
            "",
        );
        delete_note(&h.store, &h.env, &["my-ws:test-note.md"])
            .await
            .unwrap();
        assert_eq!(h.dispatched(), vec![UPDATE_WS_PATHS]);
        assert!(h.history_updates().is_empty());
    }

    #[tokio::test]
    async fn test_delete_many() {
        let files = MemoryFileOps::new()
            .with_file("my-ws:test-note1.md", "1")
            .with_file("my-ws:test-note2.md", "2");
        let h = Harness::with_files(
            &ws_path_to_pathname("my-ws:some-other-test-note.md").unwrap(),
            "",
            files,
        );
        delete_note(
            &h.store,
            &h.env,
            &["my-ws:test-note1.md", "my-ws:test-note2.md"],
        )
        .await
        .unwrap();

        assert_eq!(
            &h.files.calls()[..2],
            &[
                FileOpCall::DeleteFile("my-ws:test-note1.md".to_string()),
                FileOpCall::DeleteFile("my-ws:test-note2.md".to_string()),
            ]
        );
        assert_eq!(h.dispatched(), vec![UPDATE_WS_PATHS]);
    }

    #[tokio::test]
    async fn test_check_file_exists() {
        let h = Harness::new("", "");
        assert!(check_file_exists(&h.env, "my-ws:test-note.md").await.unwrap());
        assert!(!check_file_exists(&h.env, "my-ws:nope.md").await.unwrap());
        assert!(h.dispatched().is_empty());
        assert!(h.history_updates().is_empty());
    }
}

mod push {
    use super::*;

    #[test]
    fn test_new_tab() {
        let h = Harness::new(
            &ws_path_to_pathname("my-ws:some-other-test-note.md").unwrap(),
            "",
        );
        push_ws_path(&h.store, &h.env, "my-ws:test-note.md", true, false).unwrap();

        assert!(h.dispatched().is_empty());
        assert_eq!(
            h.navigator.events(),
            vec![NavigationEvent::OpenNewTab("/ws/my-ws/test-note.md".to_string())]
        );
    }

    #[test]
    fn test_same_tab() {
        let h = Harness::new(
            &ws_path_to_pathname("my-ws:some-other-test-note.md").unwrap(),
            "",
        );
        push_ws_path(&h.store, &h.env, "my-ws:test-note.md", false, false).unwrap();

        assert!(h.dispatched().is_empty());
        let updates = h.history_updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].0.to_array(), [Some("my-ws:test-note.md"), None]);
        assert!(!updates[0].2);
    }

    #[test]
    fn test_secondary() {
        let h = Harness::new(
            &ws_path_to_pathname("my-ws:some-other-test-note.md").unwrap(),
            "",
        );
        push_ws_path(&h.store, &h.env, "my-ws:test-note.md", false, true).unwrap();
        assert_eq!(
            h.history_updates()[0].0.to_array(),
            [Some("my-ws:some-other-test-note.md"), Some("my-ws:test-note.md")]
        );
    }
}
