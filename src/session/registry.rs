//! # Active Session Registry
//!
//! Tracks which credentials currently have a provisioning session so a
//! second session for the same name is rejected before any remote call.

use crate::crd::CredentialKind;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

/// Identity of a credential: one active session per key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub namespace: String,
    pub kind: CredentialKind,
    pub name: String,
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.kind, self.namespace, self.name)
    }
}

#[derive(Debug)]
struct ActiveSession {
    session_id: Uuid,
    cancel: CancellationToken,
}

#[derive(Debug, Default)]
pub struct ActiveSessionRegistry {
    sessions: Mutex<HashMap<SessionKey, ActiveSession>>,
}

impl ActiveSessionRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<SessionKey, ActiveSession>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claim `key` for a session
    ///
    /// Returns `None` if another session already holds it. The claim lasts
    /// until the returned guard is dropped.
    pub fn try_register(
        self: &Arc<Self>,
        key: SessionKey,
        session_id: Uuid,
        cancel: CancellationToken,
    ) -> Option<RegistrationGuard> {
        let mut sessions = self.sessions();
        if sessions.contains_key(&key) {
            return None;
        }
        debug!(session.id = %session_id, "Registered session for {}", key);
        sessions.insert(key.clone(), ActiveSession { session_id, cancel });
        Some(RegistrationGuard {
            registry: Arc::clone(self),
            key,
            session_id,
        })
    }

    pub fn is_active(&self, key: &SessionKey) -> bool {
        self.sessions().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.sessions().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions().is_empty()
    }

    /// Cancel every active session, returning how many were signalled
    pub fn cancel_all(&self) -> usize {
        let sessions = self.sessions();
        for (key, session) in sessions.iter() {
            info!(session.id = %session.session_id, "Cancelling session for {}", key);
            session.cancel.cancel();
        }
        sessions.len()
    }
}

/// Releases a session's claim on drop
#[derive(Debug)]
pub struct RegistrationGuard {
    registry: Arc<ActiveSessionRegistry>,
    key: SessionKey,
    session_id: Uuid,
}

impl Drop for RegistrationGuard {
    fn drop(&mut self) {
        let mut sessions = self.registry.sessions();
        // only remove our own entry
        if sessions
            .get(&self.key)
            .is_some_and(|s| s.session_id == self.session_id)
        {
            sessions.remove(&self.key);
            debug!(session.id = %self.session_id, "Released session for {}", self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(name: &str) -> SessionKey {
        SessionKey {
            namespace: "migration-system".to_string(),
            kind: CredentialKind::VMware,
            name: name.to_string(),
        }
    }

    #[test]
    fn test_duplicate_rejected_until_released() {
        let registry = ActiveSessionRegistry::new();
        let guard = registry
            .try_register(key("vc-lab"), Uuid::new_v4(), CancellationToken::new())
            .unwrap();

        assert!(registry
            .try_register(key("vc-lab"), Uuid::new_v4(), CancellationToken::new())
            .is_none());
        assert!(registry
            .try_register(key("vc-other"), Uuid::new_v4(), CancellationToken::new())
            .is_some());

        drop(guard);
        assert!(!registry.is_active(&key("vc-lab")));
        assert!(registry
            .try_register(key("vc-lab"), Uuid::new_v4(), CancellationToken::new())
            .is_some());
    }

    #[test]
    fn test_same_name_different_kind_is_distinct() {
        let registry = ActiveSessionRegistry::new();
        let _vmware = registry
            .try_register(key("lab"), Uuid::new_v4(), CancellationToken::new())
            .unwrap();
        let openstack = SessionKey {
            kind: CredentialKind::OpenStack,
            ..key("lab")
        };
        assert!(registry
            .try_register(openstack, Uuid::new_v4(), CancellationToken::new())
            .is_some());
    }

    #[test]
    fn test_cancel_all_signals_tokens() {
        let registry = ActiveSessionRegistry::new();
        let a = CancellationToken::new();
        let b = CancellationToken::new();
        let _ga = registry.try_register(key("a"), Uuid::new_v4(), a.clone());
        let _gb = registry.try_register(key("b"), Uuid::new_v4(), b.clone());

        assert_eq!(registry.cancel_all(), 2);
        assert!(a.is_cancelled());
        assert!(b.is_cancelled());
    }
}
