//! Readiness polling for asynchronously provisioned resources
//!
//! A create call returns as soon as the service accepts it; provisioning
//! continues in the background. `ReadinessPoller` re-queries the status
//! until the resource reports ready. A failed status query ends the wait
//! immediately and is never retried. Without a deadline or cancellation
//! token the wait is unbounded.
//!
//! Author: hephaex@gmail.com

use pinecone_core::{
    CollectionDescription, ControlPlane, IndexDescription, PineconeError, PollingConfig,
    ProvisioningStatus,
};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Interval between status queries when none is configured
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

// ============================================================================
// Outcomes and Errors
// ============================================================================

/// Result of a single poll cycle
#[derive(Debug)]
pub enum PollOutcome<T> {
    /// Terminal: the resource reported ready
    Ready(T),
    /// Terminal: the status query itself failed
    Failed(PineconeError),
    /// Not ready yet; another cycle follows
    Pending(T),
}

impl<T: ProvisioningStatus> PollOutcome<T> {
    /// Classify the result of one status query
    pub fn from_query(result: pinecone_core::Result<T>) -> Self {
        match result {
            Ok(status) if status.status_snapshot().is_ready() => Self::Ready(status),
            Ok(status) => Self::Pending(status),
            Err(e) => Self::Failed(e),
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending(_))
    }
}

/// Why a readiness wait ended without a ready resource
#[derive(Debug, Error)]
pub enum ReadinessError {
    #[error("resource name must not be empty")]
    InvalidName,

    #[error("failed to query status of '{name}': {source}")]
    Query {
        name: String,
        #[source]
        source: PineconeError,
    },

    #[error("'{name}' is still provisioning (last state '{last_state}') after {waited:?}; gave up waiting")]
    TimedOut {
        name: String,
        waited: Duration,
        last_state: String,
    },

    #[error("stopped waiting for '{name}' to become ready: cancelled")]
    Cancelled { name: String },
}

impl ReadinessError {
    /// The resource may still finish provisioning; only the wait was abandoned
    pub fn is_still_provisioning(&self) -> bool {
        matches!(self, Self::TimedOut { .. } | Self::Cancelled { .. })
    }
}

// ============================================================================
// Poller
// ============================================================================

/// Drives a submitted creation to a terminal state
#[derive(Debug, Clone)]
pub struct ReadinessPoller {
    interval: Duration,
    max_wait: Option<Duration>,
    cancel: Option<CancellationToken>,
}

impl Default for ReadinessPoller {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}

impl ReadinessPoller {
    /// Create an unbounded poller with the given interval
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            max_wait: None,
            cancel: None,
        }
    }

    /// Create from config
    pub fn from_config(config: &PollingConfig) -> Self {
        Self::new(config.interval()).with_max_wait(config.max_wait())
    }

    /// Give up once `max_wait` has elapsed since the first query
    pub fn with_max_wait(mut self, max_wait: Option<Duration>) -> Self {
        self.max_wait = max_wait;
        self
    }

    /// Abort the wait when `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn max_wait(&self) -> Option<Duration> {
        self.max_wait
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map(|token| token.is_cancelled())
            .unwrap_or(false)
    }

    /// Query `name` until it reports ready
    ///
    /// Cycles are strictly sequential: the next query is issued only after
    /// the previous one completed and one interval elapsed. Cancellation is
    /// checked before each query and during the wait; a query already in
    /// flight always completes and its result is honoured.
    pub async fn wait_until_ready<T, F, Fut>(
        &self,
        name: &str,
        mut query: F,
    ) -> Result<T, ReadinessError>
    where
        T: ProvisioningStatus,
        F: FnMut() -> Fut,
        Fut: Future<Output = pinecone_core::Result<T>>,
    {
        if name.trim().is_empty() {
            return Err(ReadinessError::InvalidName);
        }

        let started = Instant::now();
        let deadline = self.max_wait.map(|max_wait| started + max_wait);
        let mut attempts: u32 = 0;

        loop {
            if self.is_cancelled() {
                info!(name, attempts, "Readiness wait cancelled");
                return Err(ReadinessError::Cancelled {
                    name: name.to_string(),
                });
            }

            attempts += 1;
            let snapshot = match PollOutcome::from_query(query().await) {
                PollOutcome::Ready(status) => {
                    info!(name, attempts, elapsed = ?started.elapsed(), "Resource is ready");
                    return Ok(status);
                }
                PollOutcome::Failed(source) => {
                    warn!(name, attempts, error = %source, "Status query failed");
                    return Err(ReadinessError::Query {
                        name: name.to_string(),
                        source,
                    });
                }
                PollOutcome::Pending(status) => status.status_snapshot(),
            };

            debug!(
                name,
                attempts,
                state = %snapshot.state,
                ready = snapshot.ready,
                "Resource not ready yet"
            );

            let wait = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        warn!(name, attempts, "Gave up waiting for readiness");
                        return Err(ReadinessError::TimedOut {
                            name: name.to_string(),
                            waited: started.elapsed(),
                            last_state: snapshot.state,
                        });
                    }
                    self.interval.min(deadline - now)
                }
                None => self.interval,
            };

            self.pause(name, wait).await?;
        }
    }

    async fn pause(&self, name: &str, wait: Duration) -> Result<(), ReadinessError> {
        let Some(token) = &self.cancel else {
            sleep_or_yield(wait).await;
            return Ok(());
        };

        tokio::select! {
            biased;
            _ = token.cancelled() => {
                info!(name, "Readiness wait cancelled");
                Err(ReadinessError::Cancelled { name: name.to_string() })
            }
            _ = sleep_or_yield(wait) => Ok(()),
        }
    }

    /// Wait until the index reports ready, returning its final description
    pub async fn wait_for_index<C>(
        &self,
        client: &C,
        name: &str,
    ) -> Result<IndexDescription, ReadinessError>
    where
        C: ControlPlane + ?Sized,
    {
        self.wait_until_ready(name, move || client.describe_index(name))
            .await
    }

    /// Wait until the collection reports ready, returning its final description
    pub async fn wait_for_collection<C>(
        &self,
        client: &C,
        name: &str,
    ) -> Result<CollectionDescription, ReadinessError>
    where
        C: ControlPlane + ?Sized,
    {
        self.wait_until_ready(name, move || client.describe_collection(name))
            .await
    }
}

// A zero interval still yields so a pending loop cannot starve the runtime.
async fn sleep_or_yield(wait: Duration) {
    if wait.is_zero() {
        tokio::task::yield_now().await;
    } else {
        tokio::time::sleep(wait).await;
    }
}

// ============================================================================
// Tests
// ============================================================================
