//! Navigation collaborator
//!
//! Operations change what the user sees by asking a `Navigator`; the
//! navigator owns history and reports location changes back to the store
//! by dispatching `update-location`.

use crate::slices::workspace::WorkspaceSliceAction;
use crate::ws_path::OpenedWsPaths;
use bangle_store::{Store, WeakStore};
use parking_lot::{Mutex, RwLock};
use tracing::{info, warn};

pub trait Navigator: Send + Sync {
    /// Go to an arbitrary route, e.g. an error page
    fn go_to_location(&self, location: &str, replace: bool);

    /// Show `opened` inside `ws_name`
    fn history_update_opened_ws_paths(&self, opened: &OpenedWsPaths, ws_name: &str, replace: bool);

    fn open_new_tab(&self, href: &str);
}

/// One recorded navigation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationEvent {
    GoToLocation {
        location: String,
        replace: bool,
    },
    UpdateOpenedWsPaths {
        opened: OpenedWsPaths,
        ws_name: String,
        replace: bool,
    },
    OpenNewTab(String),
}

/// Navigator that only records what it was asked to do
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    events: Mutex<Vec<NavigationEvent>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<NavigationEvent> {
        self.events.lock().clone()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl Navigator for RecordingNavigator {
    fn go_to_location(&self, location: &str, replace: bool) {
        self.events.lock().push(NavigationEvent::GoToLocation {
            location: location.to_string(),
            replace,
        });
    }

    fn history_update_opened_ws_paths(&self, opened: &OpenedWsPaths, ws_name: &str, replace: bool) {
        self.events.lock().push(NavigationEvent::UpdateOpenedWsPaths {
            opened: opened.clone(),
            ws_name: ws_name.to_string(),
            replace,
        });
    }

    fn open_new_tab(&self, href: &str) {
        self.events
            .lock()
            .push(NavigationEvent::OpenNewTab(href.to_string()));
    }
}

/// Navigator that applies every navigation to a store's location
///
/// Built before the store it drives, so it is bound afterwards and only
/// holds a weak handle.
#[derive(Debug, Default)]
pub struct StoreNavigator {
    store: RwLock<WeakStore>,
}

impl StoreNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&self, store: &Store) {
        *self.store.write() = store.downgrade();
    }

    fn set_location(&self, pathname: &str, search: &str) {
        let Some(store) = self.store.read().upgrade() else {
            warn!(pathname = %pathname, "Navigation before a store was bound");
            return;
        };
        let action = WorkspaceSliceAction::UpdateLocation {
            location_pathname: pathname.to_string(),
            location_search_query: search.to_string(),
        };
        if let Err(err) = store.dispatch_action(&action) {
            warn!(store = %store.name(), error = %err, "Navigation dispatch failed");
        }
    }
}

impl Navigator for StoreNavigator {
    fn go_to_location(&self, location: &str, _replace: bool) {
        let (pathname, search) = location.split_once('?').unwrap_or((location, ""));
        self.set_location(pathname, search);
    }

    fn history_update_opened_ws_paths(&self, opened: &OpenedWsPaths, ws_name: &str, _replace: bool) {
        let location = opened.to_location(ws_name);
        self.set_location(&location.pathname, &location.search);
    }

    fn open_new_tab(&self, href: &str) {
        info!(href = %href, "New tab requested");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slices::{WorkspaceSlice, WORKSPACE_KEY};
    use bangle_store::{Slice, StoreConfig};

    #[test]
    fn test_store_navigator_updates_location() {
        let store = Store::create(vec![WorkspaceSlice::new().boxed()], StoreConfig::default()).unwrap();
        let navigator = StoreNavigator::new();
        navigator.go_to_location("/ws/early", false);
        assert_eq!(WORKSPACE_KEY.get_from(&store).unwrap().ws_name(), None);

        navigator.bind(&store);
        navigator.go_to_location("/ws-auth/my-ws?code=X", true);
        let state = WORKSPACE_KEY.get_from(&store).unwrap();
        assert_eq!(state.location_pathname(), "/ws-auth/my-ws");
        assert_eq!(state.location_search_query(), "code=X");

        let opened = OpenedWsPaths::from_array([Some("my-ws:a.md"), Some("my-ws:b.md")]);
        navigator.history_update_opened_ws_paths(&opened, "my-ws", false);
        let state = WORKSPACE_KEY.get_from(&store).unwrap();
        assert_eq!(state.opened_ws_paths(), opened);
    }

    #[test]
    fn test_recording_navigator() {
        let navigator = RecordingNavigator::new();
        navigator.open_new_tab("/ws/my-ws/a.md");
        assert_eq!(
            navigator.events(),
            vec![NavigationEvent::OpenNewTab("/ws/my-ws/a.md".to_string())]
        );
        navigator.clear();
        assert!(navigator.events().is_empty());
    }
}
