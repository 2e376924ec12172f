//! # Credential Provisioning Session
//!
//! Drives one credential from draft to a validated (or fully cleaned up)
//! remote resource.
//!
//! [`CredentialProvisioner::start`] builds the payloads, claims the name in
//! the [`ActiveSessionRegistry`] and spawns a task running the saga:
//!
//! ```text
//! Idle -> BuildingSpec -> CreatingSecret -> CreatingResource -> Polling
//!      -> Validated | Failed | TimedOut | Cancelled -> [Compensating] -> Closed
//! ```
//!
//! The returned [`SessionHandle`] observes the session and can cancel it.

mod error;
mod registry;
mod saga;
mod state;

pub use error::{ProvisioningError, StartError};
pub use registry::{ActiveSessionRegistry, RegistrationGuard, SessionKey};
pub use state::{ProvisioningSession, SessionState, TerminalState, Unsubscribe};

use crate::builder::{self, CredentialDraft};
use crate::compensation::{CompensationError, CompensationResult};
use crate::config::ProvisionerConfig;
use crate::crd::CredentialKind;
use crate::gateway::RemoteResourceGateway;
use crate::observability::metrics;
use saga::{Saga, Tracker};
use state::StateBroadcaster;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

/// How a session ended
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOutcome {
    pub session_id: Uuid,
    pub state: TerminalState,
    /// Human-readable summary; the validation message on success
    pub message: String,
    /// Failure reason for every state except `Validated`
    pub error: Option<ProvisioningError>,
    /// Present when compensation ran
    pub compensation: Option<CompensationResult>,
}

impl SessionOutcome {
    pub fn is_validated(&self) -> bool {
        self.state == TerminalState::Validated
    }

    /// Compensating deletes that failed, if any
    pub fn compensation_errors(&self) -> Vec<CompensationError> {
        self.compensation
            .as_ref()
            .map(CompensationResult::errors)
            .unwrap_or_default()
    }
}

/// Starts provisioning sessions against a gateway
pub struct CredentialProvisioner {
    gateway: Arc<dyn RemoteResourceGateway>,
    registry: Arc<ActiveSessionRegistry>,
    config: ProvisionerConfig,
}

impl std::fmt::Debug for CredentialProvisioner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialProvisioner")
            .field("config", &self.config)
            .field("active_sessions", &self.registry.len())
            .finish_non_exhaustive()
    }
}

impl CredentialProvisioner {
    pub fn new(gateway: Arc<dyn RemoteResourceGateway>, config: ProvisionerConfig) -> Self {
        Self {
            gateway,
            registry: ActiveSessionRegistry::new(),
            config,
        }
    }

    /// Share a registry with other provisioners
    #[must_use]
    pub fn with_registry(mut self, registry: Arc<ActiveSessionRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn config(&self) -> &ProvisionerConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ActiveSessionRegistry> {
        &self.registry
    }

    /// Validate a draft and start provisioning it
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    /// Returns [`StartError::Build`] for an invalid draft and
    /// [`StartError::DuplicateSession`] if the credential already has an
    /// active session. No remote call is made in either case.
    pub fn start(&self, draft: &CredentialDraft) -> Result<SessionHandle, StartError> {
        let session_id = Uuid::new_v4();
        let broadcaster = StateBroadcaster::new();
        broadcaster.advance(SessionState::BuildingSpec);

        let payload = builder::build(draft, &self.config.namespace).map_err(|e| {
            metrics::increment_sessions_rejected("invalid_draft");
            warn!("Rejected {} credential draft: {}", draft.kind, e);
            e
        })?;

        let kind = payload.kind;
        let namespace = payload.namespace.clone();
        let resource_name = payload.resource_name.clone();
        let key = SessionKey {
            namespace: namespace.clone(),
            kind,
            name: resource_name.clone(),
        };

        let cancel = CancellationToken::new();
        let Some(guard) = self
            .registry
            .try_register(key, session_id, cancel.clone())
        else {
            metrics::increment_sessions_rejected("duplicate_session");
            warn!(
                "Session already active for {} credential {}/{}",
                kind, namespace, resource_name
            );
            return Err(StartError::DuplicateSession {
                kind,
                namespace,
                name: resource_name,
            });
        };

        metrics::increment_sessions_started(kind.as_str());

        let mut record = ProvisioningSession::new(
            session_id,
            kind,
            &namespace,
            &resource_name,
            &payload.secret_name,
            self.config.poll_timeout(),
        );
        record.state = SessionState::BuildingSpec;

        let span = info_span!(
            "provisioning.session",
            session.id = %session_id,
            credential.kind = kind.as_str(),
            credential.name = %resource_name,
            namespace = %namespace
        );
        span.in_scope(|| {
            info!(
                "Starting session, deadline {}",
                record.deadline_at.to_rfc3339()
            );
        });

        let saga = Saga {
            gateway: Arc::clone(&self.gateway),
            payload,
            poll_interval: self.config.poll_interval(),
            max_poll_attempts: self.config.max_poll_attempts,
            cancel: cancel.clone(),
            tracker: Tracker {
                record,
                broadcaster: Arc::clone(&broadcaster),
            },
        };

        let (outcome_tx, outcome_rx) = watch::channel(None);
        tokio::spawn(
            async move {
                let outcome = saga.run(guard).await;
                outcome_tx.send_replace(Some(outcome));
            }
            .instrument(span),
        );

        Ok(SessionHandle {
            session_id,
            kind,
            namespace,
            resource_name,
            broadcaster,
            cancel,
            outcome: outcome_rx,
        })
    }

    /// Cancel every active session, returning how many were signalled
    pub fn cancel_all(&self) -> usize {
        self.registry.cancel_all()
    }
}

/// Caller's view of a running session
#[derive(Clone)]
pub struct SessionHandle {
    session_id: Uuid,
    kind: CredentialKind,
    namespace: String,
    resource_name: String,
    broadcaster: Arc<StateBroadcaster>,
    cancel: CancellationToken,
    outcome: watch::Receiver<Option<SessionOutcome>>,
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("session_id", &self.session_id)
            .field("kind", &self.kind)
            .field("namespace", &self.namespace)
            .field("resource_name", &self.resource_name)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl SessionHandle {
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn kind(&self) -> CredentialKind {
        self.kind
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn resource_name(&self) -> &str {
        &self.resource_name
    }

    pub fn state(&self) -> SessionState {
        self.broadcaster.current()
    }

    /// Request cancellation
    ///
    /// Safe to call repeatedly. Once the session has an outcome the request
    /// is ignored.
    pub fn cancel(&self) {
        if self.state().is_settled() || self.cancel.is_cancelled() {
            return;
        }
        info!(session.id = %self.session_id, "Cancellation requested");
        self.cancel.cancel();
    }

    /// Register a listener for state transitions
    ///
    /// The listener is called immediately with the current state, then once
    /// per transition. It runs on the session task and must not block. If it
    /// panics during a transition it is unregistered and the session,
    /// including any cleanup, continues without it.
    pub fn on_state_change(
        &self,
        listener: impl Fn(SessionState) + Send + Sync + 'static,
    ) -> Unsubscribe {
        self.broadcaster.subscribe(listener)
    }

    /// Wait for the session to close and return its outcome
    pub async fn wait(&self) -> SessionOutcome {
        let mut outcome = self.outcome.clone();
        if let Ok(published) = outcome.wait_for(Option::is_some).await {
            if let Some(result) = published.as_ref() {
                return result.clone();
            }
        }
        SessionOutcome {
            session_id: self.session_id,
            state: TerminalState::Failed,
            message: "session task ended without reporting an outcome".to_string(),
            error: None,
            compensation: None,
        }
    }
}
