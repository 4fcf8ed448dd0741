//! Per-call session credential check.

use crate::error::session::SessionError;
use crate::session::{ConnectionStore, SessionState};

use log::{debug, warn};

/// Rejects delegated calls whose credential is not the current session
/// credential.
///
/// Before the first handshake there is no session credential, so every
/// delegated call fails.
#[derive(Clone)]
pub struct AuthorizationGuard {
    store: ConnectionStore,
}

impl AuthorizationGuard {
    pub fn new(store: ConnectionStore) -> Self {
        Self { store }
    }

    /// # Errors
    ///
    /// [`SessionError::Auth`] when `presented` does not match. The caller
    /// must not run `operation` in that case.
    pub async fn authorize(&self, operation: &str, presented: &str) -> Result<(), SessionError> {
        if self.store.session_token_matches(presented).await {
            debug!("{operation} authorized");
            return Ok(());
        }

        match self.store.state().await {
            SessionState::Unestablished => {
                warn!("{operation} rejected: no session established");
                Err(SessionError::auth(format!(
                    "{operation}: no session established"
                )))
            }
            SessionState::Established => {
                warn!("{operation} rejected: session credential mismatch");
                Err(SessionError::auth(format!("{operation}: auth failure")))
            }
        }
    }
}
