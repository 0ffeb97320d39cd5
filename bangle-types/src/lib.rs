//! Shared types for the bangle store
//!
//! This crate provides the wire-level action envelope that every store
//! dispatches, the identity types attached to it, and the `SliceAction`
//! trait that lets each slice declare a closed set of actions which are
//! decoded from the envelope exactly once at the store boundary.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Prefix shared by every action name.
pub const ACTION_NAME_PREFIX: &str = "action::";

/// Build the action-name prefix owned by a namespace, e.g.
/// `action::workspace-context:`.
pub fn action_prefix(namespace: &str) -> String {
    format!("{ACTION_NAME_PREFIX}{namespace}:")
}

/// Per-dispatch identity, used for tracing only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionId(pub Uuid);

impl ActionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ActionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a:{}", &self.0.to_string()[..8])
    }
}

/// A named, serializable message describing a state transition.
///
/// The payload is plain JSON so an action can always cross the worker
/// boundary; it never holds a live reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub name: String,
    #[serde(default)]
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ActionId>,
}

impl Action {
    /// Create an action with a fresh id.
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
            id: Some(ActionId::new()),
        }
    }

    /// Encode a slice's typed action into an envelope.
    pub fn encode<A: SliceAction>(action: &A) -> Result<Self, ActionCodecError> {
        let json = serde_json::to_value(action).map_err(ActionCodecError::Encode)?;
        let Value::Object(mut fields) = json else {
            return Err(ActionCodecError::NotAnObject);
        };
        let name = match fields.remove("name") {
            Some(Value::String(name)) => name,
            _ => return Err(ActionCodecError::MissingName),
        };
        let value = fields.remove("value").unwrap_or(Value::Null);
        Ok(Self::new(name, value))
    }

    /// Decode the envelope into a slice's typed action.
    ///
    /// Returns `Ok(None)` when the name is not one of `A::NAMES`; a known
    /// name with a malformed payload is an error.
    pub fn decode<A: SliceAction>(&self) -> Result<Option<A>, ActionCodecError> {
        if !A::NAMES.contains(&self.name.as_str()) {
            return Ok(None);
        }
        let mut fields = Map::new();
        fields.insert("name".to_string(), Value::String(self.name.clone()));
        if !self.value.is_null() {
            fields.insert("value".to_string(), self.value.clone());
        }
        serde_json::from_value(Value::Object(fields))
            .map(Some)
            .map_err(|source| ActionCodecError::Decode {
                name: self.name.clone(),
                source,
            })
    }

    /// Drop the per-dispatch id, keeping name and payload.
    pub fn without_id(mut self) -> Self {
        self.id = None;
        self
    }

    /// Whether the name starts with any of the given prefixes.
    pub fn matches_prefix<S: AsRef<str>>(&self, prefixes: &[S]) -> bool {
        prefixes
            .iter()
            .any(|prefix| self.name.starts_with(prefix.as_ref()))
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "{} ({})", self.name, id),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Errors raised while converting between typed actions and envelopes
#[derive(Debug, Error)]
pub enum ActionCodecError {
    #[error("Failed to encode action: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Failed to decode action {name}: {source}")]
    Decode {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Encoded action is not an object")]
    NotAnObject,

    #[error("Encoded action has no name")]
    MissingName,
}

/// A closed set of actions owned by one slice.
///
/// Implementations are serde enums tagged by `name` with their payload
/// under `value`:
///
/// ```
/// use bangle_types::{Action, SliceAction};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// #[serde(tag = "name", content = "value")]
/// enum CounterAction {
///     #[serde(rename = "action::counter:increment")]
///     Increment { by: u32 },
/// }
///
/// impl SliceAction for CounterAction {
///     const NAMES: &'static [&'static str] = &["action::counter:increment"];
/// }
///
/// let action = Action::encode(&CounterAction::Increment { by: 2 }).unwrap();
/// assert_eq!(action.name, "action::counter:increment");
/// assert!(matches!(action.decode::<CounterAction>().unwrap(), Some(CounterAction::Increment { by: 2 })));
/// ```
pub trait SliceAction:
    Serialize + DeserializeOwned + Clone + fmt::Debug + Send + Sync + 'static
{
    /// Every action name this type can decode.
    const NAMES: &'static [&'static str];
}

/// Action type for slices that only carry state or side effects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum NoAction {}

impl SliceAction for NoAction {
    const NAMES: &'static [&'static str] = &[];
}

/// The execution context a store lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionContext {
    Window,
    Worker,
}

impl fmt::Display for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionContext::Window => write!(f, "window"),
            ExecutionContext::Worker => write!(f, "worker"),
        }
    }
}

/// Where a dispatched action came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionOrigin {
    /// Dispatched by code running in this context
    Local,
    /// Replayed from the store in another context
    Remote(ExecutionContext),
}

impl ActionOrigin {
    pub fn is_local(&self) -> bool {
        matches!(self, ActionOrigin::Local)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(tag = "name", content = "value")]
    enum TestAction {
        #[serde(rename = "action::test:set")]
        Set { value: u32 },
        #[serde(rename = "action::test:reset")]
        Reset,
    }

    impl SliceAction for TestAction {
        const NAMES: &'static [&'static str] = &["action::test:set", "action::test:reset"];
    }

    #[test]
    fn test_action_prefix() {
        assert_eq!(action_prefix("workspace-context"), "action::workspace-context:");
    }

    #[test]
    fn test_encode_struct_variant() {
        let action = Action::encode(&TestAction::Set { value: 3 }).unwrap();
        assert_eq!(action.name, "action::test:set");
        assert_eq!(action.value, json!({ "value": 3 }));
        assert!(action.id.is_some());
    }

    #[test]
    fn test_unit_variant_has_null_value() {
        let action = Action::encode(&TestAction::Reset).unwrap();
        assert_eq!(action.name, "action::test:reset");
        assert!(action.value.is_null());
        assert_eq!(action.decode::<TestAction>().unwrap(), Some(TestAction::Reset));
    }

    #[test]
    fn test_decode_unknown_name_is_none() {
        let action = Action::new("action::other:thing", json!({}));
        assert_eq!(action.decode::<TestAction>().unwrap(), None);
        assert!(action.decode::<NoAction>().unwrap().is_none());
    }

    #[test]
    fn test_decode_malformed_payload_errors() {
        let action = Action::new("action::test:set", json!({ "value": "nope" }));
        let err = action.decode::<TestAction>().unwrap_err();
        assert!(matches!(err, ActionCodecError::Decode { .. }));
    }

    #[test]
    fn test_wire_format_omits_missing_id() {
        let action = Action::new("action::test:reset", Value::Null).without_id();
        let wire = serde_json::to_string(&action).unwrap();
        assert_eq!(wire, r#"{"name":"action::test:reset","value":null}"#);

        let back: Action = serde_json::from_str(r#"{"name":"action::test:reset"}"#).unwrap();
        assert_eq!(back, action);
    }

    #[test]
    fn test_matches_prefix() {
        let action = Action::new("action::workspace-context:update-ws-paths", Value::Null);
        assert!(action.matches_prefix(&["action::workspace-context:"]));
        assert!(!action.matches_prefix(&["action::@bangle.io/slice-page:"]));
    }

    #[test]
    fn test_origin() {
        assert!(ActionOrigin::Local.is_local());
        assert!(!ActionOrigin::Remote(ExecutionContext::Worker).is_local());
        assert_eq!(ExecutionContext::Worker.to_string(), "worker");
    }
}
