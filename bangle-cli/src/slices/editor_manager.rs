//! Window-only editor manager
//!
//! The slice state only records which editor sits in which pane, as
//! `ResourceId`s. The editors themselves live in a `ResourceRegistry`
//! owned by the slice, so replacing or clearing a pane releases the
//! editor and any id still held elsewhere resolves to nothing.

use bangle_store::{
    ResourceId, ResourceRegistry, SideEffect, Slice, SliceAction, SliceError, SliceKey, Store,
    StoreConfig, StoreError,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

pub const EDITOR_MANAGER_KEY_NAME: &str = "editor-manager";

pub const EDITOR_MANAGER_KEY: SliceKey<EditorManagerState> =
    SliceKey::new(EDITOR_MANAGER_KEY_NAME);

/// Number of editor panes: primary and secondary
pub const MAX_OPEN_EDITORS: usize = 2;

/// An open editor
#[derive(Debug, Clone, PartialEq)]
pub struct Editor {
    pub ws_path: String,
    pub doc: String,
}

impl Editor {
    pub fn new(ws_path: impl Into<String>, doc: impl Into<String>) -> Self {
        Self {
            ws_path: ws_path.into(),
            doc: doc.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "name", content = "value")]
pub enum EditorManagerAction {
    #[serde(rename = "action::editor-manager:set-editor")]
    SetEditor {
        index: usize,
        #[serde(rename = "editorId")]
        editor_id: Option<ResourceId>,
    },
}

impl SliceAction for EditorManagerAction {
    const NAMES: &'static [&'static str] = &["action::editor-manager:set-editor"];
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditorManagerState {
    editors: [Option<ResourceId>; MAX_OPEN_EDITORS],
}

impl EditorManagerState {
    pub fn editor_id(&self, index: usize) -> Option<ResourceId> {
        self.editors.get(index).copied().flatten()
    }

    pub fn primary_editor(&self) -> Option<ResourceId> {
        self.editor_id(0)
    }

    pub fn secondary_editor(&self) -> Option<ResourceId> {
        self.editor_id(1)
    }

    fn holds(&self, id: ResourceId) -> bool {
        self.editors.contains(&Some(id))
    }
}

pub struct EditorManagerSlice {
    registry: ResourceRegistry<Editor>,
}

impl EditorManagerSlice {
    pub fn new(registry: ResourceRegistry<Editor>) -> Self {
        Self { registry }
    }
}

impl Slice for EditorManagerSlice {
    type State = EditorManagerState;
    type Action = EditorManagerAction;

    fn key(&self) -> SliceKey<EditorManagerState> {
        EDITOR_MANAGER_KEY
    }

    fn init(&self, _config: &StoreConfig) -> Result<EditorManagerState, SliceError> {
        Ok(EditorManagerState::default())
    }

    fn apply(
        &self,
        action: &EditorManagerAction,
        state: &Arc<EditorManagerState>,
    ) -> Result<Arc<EditorManagerState>, SliceError> {
        match action {
            EditorManagerAction::SetEditor { index, .. } if *index >= MAX_OPEN_EDITORS => Err(
                SliceError::new(format!("editor index {index} is out of range")),
            ),
            EditorManagerAction::SetEditor { index, editor_id }
                if state.editors[*index] == *editor_id =>
            {
                Ok(state.clone())
            }
            EditorManagerAction::SetEditor { index, editor_id } => {
                let mut next = (**state).clone();
                next.editors[*index] = *editor_id;
                Ok(Arc::new(next))
            }
        }
    }

    fn side_effects(&self) -> Vec<SideEffect> {
        let registry = self.registry.clone();
        let release = EDITOR_MANAGER_KEY
            .effect("release-replaced")
            .update(move |store, _dispatched, prev| {
                let (Some(before), Some(after)) =
                    (EDITOR_MANAGER_KEY.get(prev), EDITOR_MANAGER_KEY.get_from(store))
                else {
                    return Ok(());
                };
                if Arc::ptr_eq(&before, &after) {
                    return Ok(());
                }
                for id in before.editors.iter().flatten() {
                    if !after.holds(*id) && registry.release(*id).is_some() {
                        debug!(editor = %id, "Editor closed");
                    }
                }
                Ok(())
            });

        let registry = self.registry.clone();
        let teardown = EDITOR_MANAGER_KEY
            .effect("teardown")
            .deferred_once(move |_store, signal| async move {
                signal.on_abort(move || {
                    let released = registry.clear();
                    debug!(released, "Editors released on teardown");
                });
            });

        vec![release, teardown]
    }
}

/// Open `editor` in pane `index`, replacing whatever was there
pub fn set_editor(
    store: &Store,
    registry: &ResourceRegistry<Editor>,
    index: usize,
    editor: Editor,
) -> Result<ResourceId, StoreError> {
    let id = registry.insert(editor);
    let action = EditorManagerAction::SetEditor {
        index,
        editor_id: Some(id),
    };
    if let Err(err) = store.dispatch_action(&action) {
        registry.release(id);
        return Err(err);
    }
    Ok(id)
}

pub fn close_editor(store: &Store, index: usize) -> Result<(), StoreError> {
    store.dispatch_action(&EditorManagerAction::SetEditor {
        index,
        editor_id: None,
    })
}

/// The wsPath shown in pane `index`, if its editor is still live
pub fn editor_ws_path(
    store: &Store,
    registry: &ResourceRegistry<Editor>,
    index: usize,
) -> Option<String> {
    let id = EDITOR_MANAGER_KEY.get_from(store)?.editor_id(index)?;
    registry.with(id, |editor| editor.ws_path.clone())
}
