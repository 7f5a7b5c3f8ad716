//! Connection lifecycle management.
//!
//! [`ConnectionManager`] owns the single subscribing session and is the
//! only component allowed to hold it across operations. Everything else
//! goes through [`ConnectionManager::with_connection`], which guarantees:
//!
//! - **Mutual exclusion, non-blocking**: an atomic busy flag makes a second
//!   concurrent caller a no-op ([`AcquireStatus::Busy`]) instead of queuing
//!   it. This matches the skip-if-running cadence of the periodic receiver.
//! - **Transparent reconnection**: when no session is live, the manager
//!   retries connect-and-subscribe with capped exponential backoff until it
//!   succeeds or the bus shuts down, then runs the guarded action.
//! - **Failure-threshold teardown**: every failed action increments a
//!   consecutive-error counter; any success resets it. Once the counter
//!   exceeds the threshold the session is closed and the state returns to
//!   disconnected, forcing a fresh connect on the next acquisition.
//!
//! Connect failures never count toward the teardown threshold; they are
//! absorbed by the backoff loop.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use crate::error::BusError;
use crate::health::HealthStatus;
use crate::metrics::BusMetrics;
use crate::retry::ReconnectPolicy;
use crate::session::{NotificationSession, SessionFactory};

/// Work to run against the live session under the manager's guard.
///
/// The session is borrowed only for the scope of one call; implementations
/// must not stash the handle.
#[async_trait]
pub trait SessionAction<S>: Send + Sync {
    /// Runs the action against the live session.
    ///
    /// # Errors
    ///
    /// Any error returned here counts as one consecutive execution failure
    /// in the manager's accounting.
    async fn run(&self, session: &mut S) -> Result<(), BusError>;
}

/// Outcome of one [`ConnectionManager::with_connection`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireStatus {
    /// The action ran and returned `Ok`.
    Completed,

    /// The action ran and returned `Err`; the failure was recorded.
    Failed,

    /// Another caller held the guard; this call did nothing.
    Busy,

    /// The manager is shut down; this call did nothing.
    ShutDown,
}

/// Owns the single subscribing session and serializes access to it.
pub struct ConnectionManager<F: SessionFactory> {
    factory: F,
    policy: ReconnectPolicy,
    error_threshold: u32,
    session: Mutex<Option<F::Session>>,
    busy: AtomicBool,
    errors: AtomicU32,
    connected: AtomicBool,
    ever_connected: AtomicBool,
    shut_down: AtomicBool,
    shutdown_signal: Notify,
    metrics: Arc<BusMetrics>,
}

impl<F: SessionFactory> ConnectionManager<F> {
    /// Creates a new manager in the disconnected state.
    ///
    /// The first `with_connection` call triggers the initial
    /// connect-and-subscribe.
    #[must_use]
    pub fn new(
        factory: F,
        policy: ReconnectPolicy,
        error_threshold: u32,
        metrics: Arc<BusMetrics>,
    ) -> Self {
        Self {
            factory,
            policy,
            error_threshold,
            session: Mutex::new(None),
            busy: AtomicBool::new(false),
            errors: AtomicU32::new(0),
            connected: AtomicBool::new(false),
            ever_connected: AtomicBool::new(false),
            shut_down: AtomicBool::new(false),
            shutdown_signal: Notify::new(),
            metrics,
        }
    }

    /// Runs `action` against the live session, connecting first if needed.
    ///
    /// Calls are mutually exclusive; an overlapping call returns
    /// [`AcquireStatus::Busy`] without touching the session.
    pub async fn with_connection(&self, action: &dyn SessionAction<F::Session>) -> AcquireStatus {
        if self.shut_down.load(Ordering::SeqCst) {
            return AcquireStatus::ShutDown;
        }
        if self.busy.swap(true, Ordering::SeqCst) {
            return AcquireStatus::Busy;
        }

        let status = self.run_guarded(action).await;
        self.busy.store(false, Ordering::SeqCst);
        status
    }

    async fn run_guarded(&self, action: &dyn SessionAction<F::Session>) -> AcquireStatus {
        let mut slot = self.session.lock().await;

        if slot.is_none() && !self.wait_for_session(&mut slot).await {
            return AcquireStatus::ShutDown;
        }
        let Some(session) = slot.as_mut() else {
            return AcquireStatus::ShutDown;
        };

        match action.run(session).await {
            Ok(()) => {
                self.errors.store(0, Ordering::SeqCst);
                AcquireStatus::Completed
            }
            Err(error) => {
                self.record_execution_error(&mut slot, &error).await;
                AcquireStatus::Failed
            }
        }
    }

    /// Retries connect-and-subscribe with capped backoff until it succeeds
    /// or shutdown is requested. Returns `false` on shutdown.
    async fn wait_for_session(&self, slot: &mut Option<F::Session>) -> bool {
        let mut attempt: u32 = 0;
        loop {
            if self.shut_down.load(Ordering::SeqCst) {
                return false;
            }

            match self.factory.connect().await {
                Ok(session) => {
                    *slot = Some(session);
                    self.connected.store(true, Ordering::SeqCst);
                    self.ever_connected.store(true, Ordering::SeqCst);
                    self.metrics.record_reconnect();
                    if attempt > 0 {
                        tracing::info!(attempt, "database connection re-established");
                    }
                    return true;
                }
                Err(error) => {
                    let delay = self.policy.delay_for_attempt(attempt);
                    tracing::error!(
                        error = %error,
                        attempt,
                        delay_secs = delay.as_secs(),
                        "error while acquiring database connection, backing off"
                    );
                    tokio::select! {
                        () = tokio::time::sleep(delay) => {}
                        () = self.shutdown_signal.notified() => {}
                    }
                    attempt = attempt.saturating_add(1);
                }
            }
        }
    }

    async fn record_execution_error(&self, slot: &mut Option<F::Session>, error: &BusError) {
        let errors = self.errors.fetch_add(1, Ordering::SeqCst) + 1;
        self.metrics.record_execution_failure();
        tracing::error!(error = %error, consecutive = errors, "guarded execution failed");

        if errors > self.error_threshold {
            if let Some(mut session) = slot.take() {
                session.close().await;
            }
            self.connected.store(false, Ordering::SeqCst);
            self.errors.store(0, Ordering::SeqCst);
            self.metrics.record_session_discarded();
            tracing::warn!(
                threshold = self.error_threshold,
                "error threshold exceeded, session discarded"
            );
        }
    }

    /// Returns `true` while a live session is held.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Returns the current consecutive execution failure count.
    #[must_use]
    pub fn consecutive_errors(&self) -> u32 {
        self.errors.load(Ordering::SeqCst)
    }

    /// Reports the health of the subscribing connection.
    #[must_use]
    pub fn health_check(&self) -> HealthStatus {
        if self.shut_down.load(Ordering::SeqCst) {
            return HealthStatus::Unhealthy("shut down".to_string());
        }
        if self.connected.load(Ordering::SeqCst) {
            let errors = self.errors.load(Ordering::SeqCst);
            if errors == 0 {
                HealthStatus::Healthy
            } else {
                HealthStatus::Degraded(format!("{errors} consecutive execution failures"))
            }
        } else if self.ever_connected.load(Ordering::SeqCst) {
            HealthStatus::Unhealthy("disconnected".to_string())
        } else {
            HealthStatus::Unknown
        }
    }

    /// Shuts the manager down.
    ///
    /// Pending `with_connection` calls become no-ops; an in-flight guarded
    /// call is allowed to finish (or to observe the flag and abandon its
    /// reconnect loop) before the session is closed.
    pub async fn shutdown(&self) {
        self.shut_down.store(true, Ordering::SeqCst);
        self.shutdown_signal.notify_waiters();

        let mut slot = self.session.lock().await;
        if let Some(mut session) = slot.take() {
            session.close().await;
        }
        self.connected.store(false, Ordering::SeqCst);
        self.errors.store(0, Ordering::SeqCst);
    }
}
