//! Process-wide bearer token and the unauthorized event.

use std::{
    fmt,
    sync::{Arc, PoisonError, RwLock},
};
use tracing::warn;

/// Raised once per rejected token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnauthorizedEvent {
    /// Request that observed the 401.
    pub endpoint: String,
}

pub type UnauthorizedHook = Arc<dyn Fn(&UnauthorizedEvent) + Send + Sync>;

/// Holds the bearer token shared by every outgoing request.
///
/// Any request may invalidate the token after a 401. Only the first
/// invalidation of a given token clears it and fires the hook, so a burst of
/// concurrent 401s ends the session exactly once.
#[derive(Default)]
pub struct Session {
    token: RwLock<Option<String>>,
    hook: RwLock<Option<UnauthorizedHook>>,
}

impl Session {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: RwLock::new(token.filter(|t| !t.is_empty())),
            hook: RwLock::new(None),
        }
    }

    pub fn token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    pub fn set_token(&self, token: Option<String>) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) =
            token.filter(|t| !t.is_empty());
    }

    /// Drop the token without raising the unauthorized event (logout).
    pub fn clear(&self) {
        self.set_token(None);
    }

    /// Register the handler that ends the current session view.
    pub fn on_unauthorized<F>(&self, hook: F)
    where
        F: Fn(&UnauthorizedEvent) + Send + Sync + 'static,
    {
        *self.hook.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(hook));
    }

    /// Clear `rejected` after a 401 and fire the hook.
    ///
    /// Returns false, without firing, when the token was already cleared or
    /// replaced by a newer one.
    pub fn invalidate(&self, rejected: &str, endpoint: &str) -> bool {
        {
            let mut token = self.token.write().unwrap_or_else(PoisonError::into_inner);
            if token.as_deref() != Some(rejected) {
                return false;
            }
            *token = None;
        }

        warn!(endpoint, "bearer token rejected; session cleared");
        let hook = self
            .hook
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(hook) = hook {
            hook(&UnauthorizedEvent {
                endpoint: endpoint.to_string(),
            });
        }
        true
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}
