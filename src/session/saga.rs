//! The provisioning saga run by each session task.
//!
//! Forward steps: create the secret, create the resource, poll its status.
//! Any non-success ending that left something behind is compensated before
//! the session closes.

use super::error::ProvisioningError;
use super::registry::RegistrationGuard;
use super::state::{ProvisioningSession, SessionState, StateBroadcaster, TerminalState};
use super::SessionOutcome;
use crate::builder::ProvisioningPayload;
use crate::compensation::CompensationExecutor;
use crate::crd::CredentialStatus;
use crate::gateway::{GatewayError, GatewayOperation, RemoteResourceGateway};
use crate::observability::metrics;
use crate::poller::{classify_validation_status, PollOutcome, PollVerdict, StatusPoller};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Session record plus the channel its transitions are published on
pub(super) struct Tracker {
    pub(super) record: ProvisioningSession,
    pub(super) broadcaster: Arc<StateBroadcaster>,
}

impl Tracker {
    fn transition(&mut self, next: SessionState) {
        if self.broadcaster.advance(next) {
            self.record.state = next;
        }
    }
}

struct Failure {
    error: ProvisioningError,
    compensate: bool,
}

impl Failure {
    fn gateway(operation: GatewayOperation, source: GatewayError) -> Self {
        Self {
            error: ProvisioningError::Gateway { operation, source },
            compensate: true,
        }
    }

    fn cancelled() -> Self {
        Self {
            error: ProvisioningError::Cancelled,
            compensate: true,
        }
    }
}

fn terminal_state(error: &ProvisioningError) -> TerminalState {
    match error {
        ProvisioningError::Cancelled => TerminalState::Cancelled,
        ProvisioningError::TimedOut(_) => TerminalState::TimedOut,
        ProvisioningError::Gateway { .. }
        | ProvisioningError::AlreadyExists { .. }
        | ProvisioningError::ValidationFailed { .. } => TerminalState::Failed,
    }
}

/// Stop before the next forward step once cancellation is requested
fn checkpoint(cancel: &CancellationToken) -> Result<(), Failure> {
    if cancel.is_cancelled() {
        Err(Failure::cancelled())
    } else {
        Ok(())
    }
}

pub(super) struct Saga {
    pub(super) gateway: Arc<dyn RemoteResourceGateway>,
    pub(super) payload: ProvisioningPayload,
    pub(super) poll_interval: Duration,
    pub(super) max_poll_attempts: u32,
    pub(super) cancel: CancellationToken,
    pub(super) tracker: Tracker,
}

impl Saga {
    pub(super) async fn run(mut self, guard: RegistrationGuard) -> SessionOutcome {
        let started = Instant::now();

        let (state, message, error, compensate) = match self.drive().await {
            Ok(message) => (TerminalState::Validated, message, None, false),
            Err(Failure { error, compensate }) => {
                (terminal_state(&error), error.to_string(), Some(error), compensate)
            }
        };
        self.tracker.transition(state.into());

        match state {
            TerminalState::Validated => info!("✅ Credential validated: {}", message),
            TerminalState::Cancelled => info!("Provisioning cancelled"),
            TerminalState::Failed | TerminalState::TimedOut => {
                warn!("❌ Provisioning ended in {}: {}", state, message);
            }
        }

        let compensation = if compensate && self.tracker.record.has_side_effects() {
            self.tracker.transition(SessionState::Compensating);
            let target = self.tracker.record.compensation_target();
            let result = CompensationExecutor::new(self.gateway.as_ref())
                .compensate(&target)
                .await;
            self.tracker.record.apply_compensation(&result);
            Some(result)
        } else {
            None
        };

        let record = &self.tracker.record;
        metrics::record_session_outcome(
            record.kind.as_str(),
            state.to_string().as_str(),
            started.elapsed().as_secs_f64(),
        );

        let outcome = SessionOutcome {
            session_id: record.session_id,
            state,
            message,
            error,
            compensation,
        };

        drop(guard);
        self.tracker.transition(SessionState::Closed);
        outcome
    }

    /// Run the forward steps, returning the success message or why they stopped
    async fn drive(&mut self) -> Result<String, Failure> {
        let gateway = self.gateway.as_ref();
        let payload = &self.payload;
        let cancel = &self.cancel;
        let tracker = &mut self.tracker;
        let kind = payload.kind;
        let namespace = payload.namespace.as_str();
        let name = payload.resource_name.as_str();

        checkpoint(cancel)?;

        if let Some(secret) = &payload.secret {
            tracker.transition(SessionState::CreatingSecret);
            // a dispatched create always runs to completion so its effect is known
            let created = gateway.create_secret(namespace, secret).await;
            if created.is_ok() {
                tracker.record.created_secret = true;
                info!("Created secret {}/{}", namespace, payload.secret_name);
            }
            // a cancel that landed mid-call wins over the call's own result
            checkpoint(cancel)?;
            created.map_err(|source| Failure::gateway(GatewayOperation::CreateSecret, source))?;
        }

        tracker.transition(SessionState::CreatingResource);
        let created = gateway
            .create_resource(kind, namespace, &payload.resource)
            .await;
        if created.is_ok() {
            tracker.record.created_resource = true;
            info!("Created {} {}/{}", kind.resource_kind(), namespace, name);
        }
        checkpoint(cancel)?;
        if let Err(e) = created {
            if e.is_conflict() {
                warn!("{} {}/{} already exists: {}", kind.resource_kind(), namespace, name, e);
                return Err(Failure {
                    error: ProvisioningError::AlreadyExists {
                        kind,
                        name: name.to_string(),
                    },
                    compensate: false,
                });
            }
            return Err(Failure::gateway(GatewayOperation::CreateResource, e));
        }

        tracker.transition(SessionState::Polling);
        let poller = StatusPoller::new(self.poll_interval, self.max_poll_attempts, cancel.clone());
        let last_message = Mutex::new(None::<String>);

        let outcome = poller
            .poll(
                move || async move {
                    gateway
                        .get_resource(kind, name, namespace)
                        .await
                        .map(|obj| CredentialStatus::from_object(&obj))
                },
                |snapshot: &Result<CredentialStatus, serde_json::Error>| {
                    let status = match snapshot {
                        Ok(status) => status,
                        Err(e) => {
                            warn!(
                                "Unreadable status on {} {}/{}: {}",
                                kind.resource_kind(),
                                namespace,
                                name,
                                e
                            );
                            return PollVerdict::Failed;
                        }
                    };
                    if let Some(message) = status.validation_message.as_ref().filter(|m| !m.is_empty()) {
                        *last_message.lock().unwrap_or_else(PoisonError::into_inner) =
                            Some(message.clone());
                    }
                    classify_validation_status(status.validation_status.as_deref())
                },
            )
            .await;

        tracker.record.attempts = outcome.attempts();
        tracker.record.last_status_message =
            last_message.into_inner().unwrap_or_else(PoisonError::into_inner);
        metrics::observe_poll_attempts(outcome.attempts());

        let non_blank = |value: Option<String>| value.filter(|v| !v.trim().is_empty());
        match outcome {
            PollOutcome::Succeeded { snapshot, .. } => Ok(snapshot
                .ok()
                .and_then(|status| non_blank(status.validation_message))
                .unwrap_or_else(|| "credentials validated".to_string())),
            PollOutcome::Failed { snapshot, .. } => {
                let message = match snapshot {
                    Ok(status) => non_blank(status.validation_message)
                        .or(status.validation_status)
                        .unwrap_or_else(|| "validation failed".to_string()),
                    Err(e) => format!("unreadable status: {e}"),
                };
                Err(Failure {
                    error: ProvisioningError::ValidationFailed { message },
                    compensate: true,
                })
            }
            PollOutcome::TimedOut(e) => {
                metrics::increment_poll_timeouts();
                Err(Failure {
                    error: ProvisioningError::TimedOut(e),
                    compensate: true,
                })
            }
            PollOutcome::Cancelled { .. } => Err(Failure::cancelled()),
        }
    }
}
