//! In-memory credential store
//!
//! [`CredentialStore`] holds at most one live [`Session`]. It is shared as an
//! `Arc` between the API client and the login flow. Every operation swaps a
//! whole `Arc<Session>` under a short lock, so readers observe either the old
//! or the new session and never a partial one.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::session::Session;

/// Process-wide holder of the current session token.
///
/// # Examples
///
/// ```
/// use payload_mcp::auth::session::{Session, SessionSource};
/// use payload_mcp::auth::store::CredentialStore;
///
/// let store = CredentialStore::new();
/// assert!(store.get().is_none());
///
/// store.set(Session::new("tok", SessionSource::Static));
/// assert_eq!(store.get().unwrap().token(), "tok");
///
/// store.clear();
/// assert!(store.get().is_none());
/// ```
#[derive(Debug, Default)]
pub struct CredentialStore {
    current: RwLock<Option<Arc<Session>>>,
}

impl CredentialStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store seeded with a session.
    pub fn with_session(session: Session) -> Self {
        Self {
            current: RwLock::new(Some(Arc::new(session))),
        }
    }

    /// Returns the current session, if any.
    pub fn get(&self) -> Option<Arc<Session>> {
        self.read().clone()
    }

    /// Replaces the current session.
    pub fn set(&self, session: Session) {
        self.set_shared(Arc::new(session));
    }

    /// Replaces the current session with an already shared one.
    pub fn set_shared(&self, session: Arc<Session>) {
        tracing::debug!(source = %session.source(), "Storing session");
        *self.write() = Some(session);
    }

    /// Removes the current session.
    pub fn clear(&self) {
        if self.write().take().is_some() {
            tracing::debug!("Session cleared");
        }
    }

    /// Removes the current session only if it still holds `token`.
    ///
    /// Returns `true` when a session was removed. A caller rejected with a
    /// stale token therefore cannot discard a session that another caller
    /// has stored in the meantime.
    pub fn invalidate(&self, token: &str) -> bool {
        let mut guard = self.write();
        match guard.as_ref() {
            Some(current) if current.token() == token => {
                *guard = None;
                tracing::info!("Session invalidated after unauthorized response");
                true
            }
            _ => false,
        }
    }

    // A panic while holding the lock cannot leave a partial session behind,
    // so poisoned guards are recovered.
    fn read(&self) -> RwLockReadGuard<'_, Option<Arc<Session>>> {
        self.current.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<Arc<Session>>> {
        self.current.write().unwrap_or_else(|e| e.into_inner())
    }
}
