//! Change Router: bridges the account change stream to connected clients.
//!
//! One long-lived task owns the subscription. Events are handled strictly one
//! at a time in emission order; each lookup-and-enqueue runs to completion
//! before the next event is read or shutdown is observed.
//!
//! Lifecycle: `Starting` → `Healthy` ⇄ `Reconnecting { attempt }` → `Stopped`,
//! or `Failed` once reconnect attempts are exhausted.

use std::{sync::Arc, time::Duration};

use futures_util::StreamExt;
use thiserror::Error;
use tokio::{
    sync::{oneshot, watch},
    task::JoinHandle,
};

use crate::{
    domain::{AccountChangeSource, AccountChangeStream, ChangeStreamError, ConnectionRegistry},
    usecase::{RouteAccountChangeUseCase, RouteOutcome},
};

/// Observable lifecycle state of the change router
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterState {
    /// Opening the first subscription
    Starting,
    /// Subscribed and routing events
    Healthy,
    /// Waiting before reconnect attempt `attempt`
    Reconnecting { attempt: u32 },
    /// Shut down on request
    Stopped,
    /// Gave up after exhausting reconnect attempts
    Failed,
}

/// Exponential backoff for resubscribing after a disruption
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    /// Consecutive failed attempts tolerated before giving up
    pub max_attempts: u32,
    /// Delay before the first reconnect attempt
    pub initial_backoff: Duration,
    /// Upper bound on the delay between attempts
    pub max_backoff: Duration,
    /// Growth factor applied after every failed attempt
    pub multiplier: f64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before reconnect attempt `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let millis = self.initial_backoff.as_millis() as f64 * self.multiplier.powi(exponent);
        let capped = millis.min(self.max_backoff.as_millis() as f64);
        Duration::from_millis(capped as u64)
    }
}

#[derive(Debug, Error)]
pub enum RouterError {
    #[error("account change stream unavailable after {attempts} reconnect attempts: {last_error}")]
    ReconnectExhausted {
        attempts: u32,
        last_error: ChangeStreamError,
    },

    #[error("change router task failed: {0}")]
    Task(String),
}

enum PumpExit {
    Shutdown,
    Disrupted(ChangeStreamError),
}

/// The router task itself. Created and started through [`ChangeRouter::spawn`].
pub struct ChangeRouter {
    source: Arc<dyn AccountChangeSource>,
    usecase: RouteAccountChangeUseCase,
    policy: ReconnectPolicy,
    state: watch::Sender<RouterState>,
}

/// Control handle for a running router.
///
/// Dropping the handle without calling [`ChangeRouterHandle::shutdown`] also
/// stops the router.
pub struct ChangeRouterHandle {
    state: watch::Receiver<RouterState>,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<Result<(), RouterError>>,
}

impl ChangeRouter {
    /// Start routing changes from `source` to the connections in `registry`.
    pub fn spawn(
        source: Arc<dyn AccountChangeSource>,
        registry: Arc<dyn ConnectionRegistry>,
        policy: ReconnectPolicy,
    ) -> ChangeRouterHandle {
        let (state_tx, state_rx) = watch::channel(RouterState::Starting);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let router = Self {
            source,
            usecase: RouteAccountChangeUseCase::new(registry),
            policy,
            state: state_tx,
        };
        let task = tokio::spawn(router.run(shutdown_rx));

        ChangeRouterHandle {
            state: state_rx,
            shutdown: Some(shutdown_tx),
            task,
        }
    }

    async fn run(self, mut shutdown: oneshot::Receiver<()>) -> Result<(), RouterError> {
        let mut attempt: u32 = 0;

        loop {
            let subscribed = tokio::select! {
                biased;
                _ = &mut shutdown => break,
                result = self.source.subscribe() => result,
            };

            let error = match subscribed {
                Ok(stream) => {
                    attempt = 0;
                    self.set_state(RouterState::Healthy);
                    tracing::info!("Subscribed to account change stream");
                    match self.pump(stream, &mut shutdown).await {
                        PumpExit::Shutdown => break,
                        PumpExit::Disrupted(error) => error,
                    }
                }
                Err(error) => error,
            };

            attempt += 1;
            if attempt > self.policy.max_attempts {
                tracing::error!(
                    "Account change stream lost, giving up after {} reconnect attempts: {}",
                    self.policy.max_attempts,
                    error
                );
                self.set_state(RouterState::Failed);
                return Err(RouterError::ReconnectExhausted {
                    attempts: self.policy.max_attempts,
                    last_error: error,
                });
            }

            let delay = self.policy.backoff(attempt);
            tracing::warn!(
                "Account change stream disrupted ({}), reconnect attempt {}/{} in {:?}",
                error,
                attempt,
                self.policy.max_attempts,
                delay
            );
            self.set_state(RouterState::Reconnecting { attempt });

            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        self.set_state(RouterState::Stopped);
        tracing::info!("Change router stopped");
        Ok(())
    }

    async fn pump(
        &self,
        mut stream: AccountChangeStream,
        shutdown: &mut oneshot::Receiver<()>,
    ) -> PumpExit {
        loop {
            let next = tokio::select! {
                biased;
                _ = &mut *shutdown => return PumpExit::Shutdown,
                next = stream.next() => next,
            };

            match next {
                Some(Ok(change)) => {
                    let user_id = change.user_id.clone();
                    tracing::info!("User changed: {}", user_id);
                    if let RouteOutcome::Delivered(connection_id) = self.usecase.execute(change).await {
                        tracing::info!("Pushed user-updated for '{}' to {}", user_id, connection_id);
                    }
                }
                Some(Err(error)) if !error.is_disruption() => {
                    tracing::warn!("Skipping account change: {}", error);
                }
                Some(Err(error)) => return PumpExit::Disrupted(error),
                None => {
                    return PumpExit::Disrupted(ChangeStreamError::Stream(
                        "change stream closed by the store".to_string(),
                    ));
                }
            }
        }
    }

    fn set_state(&self, state: RouterState) {
        self.state.send_replace(state);
    }
}

impl ChangeRouterHandle {
    /// Current lifecycle state.
    pub fn state(&self) -> RouterState {
        *self.state.borrow()
    }

    /// Receiver that observes every lifecycle transition.
    pub fn subscribe_state(&self) -> watch::Receiver<RouterState> {
        self.state.clone()
    }

    /// Stop the router and wait for it to finish.
    ///
    /// The event being routed when shutdown is requested is completed first.
    /// Returns the router's own error if it had already failed.
    pub async fn shutdown(mut self) -> Result<(), RouterError> {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        self.task
            .await
            .map_err(|e| RouterError::Task(e.to_string()))?
    }
}
