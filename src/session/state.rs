//! Session state machine, the per-session record, and state listeners.

use crate::compensation::{CompensationResult, CompensationTarget, DeleteOutcome};
use crate::crd::CredentialKind;
use chrono::{DateTime, Utc};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tracing::warn;
use uuid::Uuid;

/// Lifecycle state of a provisioning session
///
/// States only move forward. The four outcome states share a rank, so a
/// session reaches exactly one of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Idle,
    BuildingSpec,
    CreatingSecret,
    CreatingResource,
    Polling,
    Validated,
    Failed,
    TimedOut,
    Cancelled,
    Compensating,
    Closed,
}

impl SessionState {
    fn rank(self) -> u8 {
        match self {
            SessionState::Idle => 0,
            SessionState::BuildingSpec => 1,
            SessionState::CreatingSecret => 2,
            SessionState::CreatingResource => 3,
            SessionState::Polling => 4,
            SessionState::Validated
            | SessionState::Failed
            | SessionState::TimedOut
            | SessionState::Cancelled => 5,
            SessionState::Compensating => 6,
            SessionState::Closed => 7,
        }
    }

    pub fn can_advance_to(self, next: SessionState) -> bool {
        next.rank() > self.rank()
    }

    /// True once the session has an outcome (or is past it)
    pub fn is_settled(self) -> bool {
        self.rank() >= 5
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Idle => "Idle",
            SessionState::BuildingSpec => "BuildingSpec",
            SessionState::CreatingSecret => "CreatingSecret",
            SessionState::CreatingResource => "CreatingResource",
            SessionState::Polling => "Polling",
            SessionState::Validated => "Validated",
            SessionState::Failed => "Failed",
            SessionState::TimedOut => "TimedOut",
            SessionState::Cancelled => "Cancelled",
            SessionState::Compensating => "Compensating",
            SessionState::Closed => "Closed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The outcome states a session can end in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TerminalState {
    Validated,
    Failed,
    TimedOut,
    Cancelled,
}

impl From<TerminalState> for SessionState {
    fn from(state: TerminalState) -> Self {
        match state {
            TerminalState::Validated => SessionState::Validated,
            TerminalState::Failed => SessionState::Failed,
            TerminalState::TimedOut => SessionState::TimedOut,
            TerminalState::Cancelled => SessionState::Cancelled,
        }
    }
}

impl fmt::Display for TerminalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        SessionState::from(*self).fmt(f)
    }
}

/// Record of one provisioning attempt, owned by the session task
#[derive(Debug, Clone)]
pub struct ProvisioningSession {
    pub session_id: Uuid,
    pub kind: CredentialKind,
    pub namespace: String,
    pub resource_name: String,
    pub secret_name: String,
    pub state: SessionState,
    pub created_secret: bool,
    pub created_resource: bool,
    pub attempts: u32,
    pub last_status_message: Option<String>,
    pub started_at: DateTime<Utc>,
    pub deadline_at: DateTime<Utc>,
}

impl ProvisioningSession {
    pub fn new(
        session_id: Uuid,
        kind: CredentialKind,
        namespace: &str,
        resource_name: &str,
        secret_name: &str,
        poll_budget: Duration,
    ) -> Self {
        let started_at = Utc::now();
        let deadline_at = chrono::Duration::from_std(poll_budget)
            .ok()
            .and_then(|budget| started_at.checked_add_signed(budget))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self {
            session_id,
            kind,
            namespace: namespace.to_string(),
            resource_name: resource_name.to_string(),
            secret_name: secret_name.to_string(),
            state: SessionState::Idle,
            created_secret: false,
            created_resource: false,
            attempts: 0,
            last_status_message: None,
            started_at,
            deadline_at,
        }
    }

    pub fn has_side_effects(&self) -> bool {
        self.created_secret || self.created_resource
    }

    pub fn compensation_target(&self) -> CompensationTarget {
        CompensationTarget {
            kind: self.kind,
            namespace: self.namespace.clone(),
            resource_name: self.resource_name.clone(),
            secret_name: self.secret_name.clone(),
            created_resource: self.created_resource,
            created_secret: self.created_secret,
        }
    }

    /// Clear the created flags for every side that is confirmed gone
    pub fn apply_compensation(&mut self, result: &CompensationResult) {
        let gone = |outcome: &DeleteOutcome| {
            matches!(outcome, DeleteOutcome::Deleted | DeleteOutcome::AlreadyGone)
        };
        if gone(&result.resource) {
            self.created_resource = false;
        }
        if gone(&result.secret) {
            self.created_secret = false;
        }
    }
}

type Listener = Arc<dyn Fn(SessionState) + Send + Sync>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(u64, Listener)>,
}

/// Publishes state transitions to registered listeners
///
/// Listeners run synchronously on the session task, in registration order,
/// and must not register or unsubscribe listeners themselves. A listener
/// that panics is dropped; the session carries on.
pub(crate) struct StateBroadcaster {
    state: watch::Sender<SessionState>,
    listeners: Mutex<Listeners>,
}

impl StateBroadcaster {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            state: watch::Sender::new(SessionState::Idle),
            listeners: Mutex::new(Listeners::default()),
        })
    }

    pub(crate) fn current(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Move to `next` and notify listeners; backward moves are refused
    pub(crate) fn advance(&self, next: SessionState) -> bool {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        let current = self.current();
        if !current.can_advance_to(next) {
            warn!("Refusing state transition {} -> {}", current, next);
            return false;
        }
        self.state.send_replace(next);
        listeners.entries.retain(|(id, listener)| {
            let delivered = panic::catch_unwind(AssertUnwindSafe(|| listener(next))).is_ok();
            if !delivered {
                warn!(listener.id = *id, "State listener panicked on {}, removing it", next);
            }
            delivered
        });
        true
    }

    pub(crate) fn subscribe(
        self: &Arc<Self>,
        listener: impl Fn(SessionState) + Send + Sync + 'static,
    ) -> Unsubscribe {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        listener(self.current());
        let id = listeners.next_id;
        listeners.next_id += 1;
        listeners.entries.push((id, Arc::new(listener)));
        Unsubscribe {
            broadcaster: Arc::downgrade(self),
            id,
        }
    }
}

/// Token returned by `on_state_change`; call [`Unsubscribe::unsubscribe`] to
/// stop receiving transitions
pub struct Unsubscribe {
    broadcaster: Weak<StateBroadcaster>,
    id: u64,
}

impl fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unsubscribe").field("id", &self.id).finish()
    }
}

impl Unsubscribe {
    pub fn unsubscribe(self) {
        if let Some(broadcaster) = self.broadcaster.upgrade() {
            broadcaster
                .listeners
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .entries
                .retain(|(id, _)| *id != self.id);
        }
    }
}
