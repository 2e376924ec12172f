//! # Status Poller
//!
//! Bounded, cancellable polling of a credential's validation status.
//!
//! The poller waits one interval, fetches a snapshot, classifies it, and
//! repeats. The next wait starts only after the fetch settles, so there is
//! never more than one fetch in flight. After `max_attempts` non-terminal
//! attempts it gives up, which makes the effective timeout
//! `interval * max_attempts`.

use crate::constants::{
    VALIDATION_STATUS_AWAITING_CREDENTIALS, VALIDATION_STATUS_PENDING,
    VALIDATION_STATUS_SUCCEEDED, VALIDATION_STATUS_VALIDATING,
};
use crate::gateway::GatewayError;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Classification of one status snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollVerdict {
    Pending,
    Succeeded,
    Failed,
}

/// Polling gave up without a terminal verdict
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no terminal status after {attempts} attempts ({}s){}",
    .elapsed.as_secs(),
    .last_error.as_ref().map(|e| format!("; last fetch error: {e}")).unwrap_or_default())]
pub struct PollTimeoutError {
    pub attempts: u32,
    pub elapsed: Duration,
    /// Most recent fetch failure, if the last attempts errored
    pub last_error: Option<GatewayError>,
}

/// How a poll ended
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome<S> {
    Succeeded { snapshot: S, attempts: u32 },
    Failed { snapshot: S, attempts: u32 },
    TimedOut(PollTimeoutError),
    Cancelled { attempts: u32 },
}

impl<S> PollOutcome<S> {
    pub fn attempts(&self) -> u32 {
        match self {
            PollOutcome::Succeeded { attempts, .. }
            | PollOutcome::Failed { attempts, .. }
            | PollOutcome::Cancelled { attempts } => *attempts,
            PollOutcome::TimedOut(e) => e.attempts,
        }
    }
}

/// Default classification of `status.validationStatus`
///
/// Only the known in-progress values keep polling; any other value is
/// treated as a failure.
pub fn classify_validation_status(status: Option<&str>) -> PollVerdict {
    match status.map(str::trim) {
        None | Some("") => PollVerdict::Pending,
        Some(
            VALIDATION_STATUS_AWAITING_CREDENTIALS
            | VALIDATION_STATUS_VALIDATING
            | VALIDATION_STATUS_PENDING,
        ) => PollVerdict::Pending,
        Some(VALIDATION_STATUS_SUCCEEDED) => PollVerdict::Succeeded,
        Some(_) => PollVerdict::Failed,
    }
}

#[derive(Debug, Clone)]
pub struct StatusPoller {
    interval: Duration,
    max_attempts: u32,
    cancel: CancellationToken,
}

impl StatusPoller {
    pub fn new(interval: Duration, max_attempts: u32, cancel: CancellationToken) -> Self {
        Self {
            interval,
            max_attempts,
            cancel,
        }
    }

    /// Poll until `classify` returns a terminal verdict, the attempt budget
    /// runs out, or the cancellation token fires
    ///
    /// A fetch error counts as an attempt and polling continues.
    pub async fn poll<S, F, Fut, C>(&self, mut fetch: F, classify: C) -> PollOutcome<S>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<S, GatewayError>>,
        C: Fn(&S) -> PollVerdict,
    {
        let mut attempts = 0;
        let mut last_error = None;

        while attempts < self.max_attempts {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => return PollOutcome::Cancelled { attempts },
                () = tokio::time::sleep(self.interval) => {}
            }

            let result = tokio::select! {
                biased;
                () = self.cancel.cancelled() => return PollOutcome::Cancelled { attempts },
                result = fetch() => result,
            };
            attempts += 1;

            match result {
                Ok(snapshot) => {
                    last_error = None;
                    match classify(&snapshot) {
                        PollVerdict::Pending => {
                            debug!(attempt = attempts, "Status still pending");
                        }
                        PollVerdict::Succeeded => {
                            return PollOutcome::Succeeded { snapshot, attempts };
                        }
                        PollVerdict::Failed => {
                            return PollOutcome::Failed { snapshot, attempts };
                        }
                    }
                }
                Err(e) => {
                    warn!(attempt = attempts, "Status fetch failed, will retry: {}", e);
                    last_error = Some(e);
                }
            }
        }

        PollOutcome::TimedOut(PollTimeoutError {
            attempts,
            elapsed: self.interval.saturating_mul(attempts),
            last_error,
        })
    }
}
