//! Action whitelist shared by both ends of a sync channel

use crate::error::{Result, SyncError};
use bangle_types::{action_prefix, Action};
use std::fmt;

/// A set of action-name prefixes allowed to cross the context boundary
///
/// Both contexts build their send and receive filters from the same
/// prefix list, so what one side sends the other always accepts.
#[derive(Clone, PartialEq, Eq)]
pub struct ActionFilter {
    prefixes: Vec<String>,
}

impl ActionFilter {
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }

    /// A filter that lets nothing through
    pub fn deny_all() -> Self {
        Self {
            prefixes: Vec::new(),
        }
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    pub fn allows(&self, action: &Action) -> bool {
        self.allows_name(&action.name)
    }

    pub fn allows_name(&self, name: &str) -> bool {
        self.prefixes.iter().any(|prefix| name.starts_with(prefix))
    }

    /// Check the prefixes against the action names a store declares
    ///
    /// Every prefix must match at least one declared name, and none may
    /// match the sync protocol's own actions.
    pub fn validate_against(&self, declared: &[&str]) -> Result<()> {
        let internal = action_prefix(crate::slice::STORE_SYNC_KEY_NAME);
        for prefix in &self.prefixes {
            if internal.starts_with(prefix.as_str()) || prefix.starts_with(&internal) {
                return Err(SyncError::InternalActionWhitelisted(prefix.clone()));
            }
            if !declared.iter().any(|name| name.starts_with(prefix.as_str())) {
                return Err(SyncError::UnknownWhitelistPrefix(prefix.clone()));
            }
        }
        Ok(())
    }
}

impl fmt::Debug for ActionFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.prefixes).finish()
    }
}
