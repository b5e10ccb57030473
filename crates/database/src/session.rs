use std::sync::{Arc, PoisonError, RwLock};

use core_types::SessionInfo;

/// Login state for one role (administrator or end user).
///
/// The state machine has two states: logged out (`None`) and logged in
/// (`Some(SessionInfo)`). The only transitions are a successful credential
/// verification, an explicit logout, and connection teardown, which resets
/// both roles. There is no expiry or timeout.
///
/// Handles are cheap clones over shared state, so the same instance can be
/// given to an auth service and to the [`crate::ConnectionManager`] that
/// must reset it on disconnect. Each `Services` set constructs its own pair;
/// nothing here is process-global.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    inner: Arc<RwLock<Option<SessionInfo>>>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a successful login.
    pub(crate) fn begin(&self, info: SessionInfo) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = Some(info);
    }

    /// Returns to the logged-out state. Safe to call at any time.
    pub(crate) fn clear(&self) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn is_logged_in(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// The identity recorded by the last successful login, if any.
    pub fn current(&self) -> Option<SessionInfo> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(name: &str) -> SessionInfo {
        SessionInfo {
            id: 7,
            name: name.to_string(),
            email: None,
        }
    }

    #[test]
    fn starts_logged_out() {
        let session = SessionState::new();
        assert!(!session.is_logged_in());
        assert!(session.current().is_none());
    }

    #[test]
    fn login_then_logout_round_trip() {
        let session = SessionState::new();
        session.begin(info("alice"));
        assert!(session.is_logged_in());
        assert_eq!(session.current().unwrap().name, "alice");

        session.clear();
        assert!(!session.is_logged_in());
        assert!(session.current().is_none());
    }

    #[test]
    fn clones_share_state() {
        let session = SessionState::new();
        let handle = session.clone();
        session.begin(info("alice"));
        assert!(handle.is_logged_in());
        handle.clear();
        assert!(!session.is_logged_in());
    }

    #[test]
    fn independent_instances_are_isolated() {
        let admin = SessionState::new();
        let user = SessionState::new();
        user.begin(info("alice"));
        assert!(!admin.is_logged_in());
        assert!(user.is_logged_in());
    }
}
