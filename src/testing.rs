//! Testing utilities.
//!
//! Provides a scripted mock session and factory for exercising the
//! lifecycle manager and receiver without a database, plus small helpers
//! shared by the crate's own tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::BusError;
use crate::session::{Notification, NotificationSession, SessionFactory};

/// Payload type used throughout the crate's tests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestMessage {
    /// Opaque message body.
    pub payload: String,
}

impl TestMessage {
    /// Creates a new test message.
    #[must_use]
    pub fn new(payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
        }
    }
}

/// Scripted in-memory session.
///
/// Poll outcomes are queued up front; once the script is exhausted, polls
/// return an empty batch. Clones share the same script and state, so a
/// clone kept by the test observes a session that was moved into the
/// manager.
#[derive(Debug, Clone, Default)]
pub struct MockSession {
    polls: Arc<Mutex<VecDeque<Result<Vec<Notification>, String>>>>,
    closed: Arc<AtomicBool>,
    poll_count: Arc<AtomicU64>,
}

impl MockSession {
    /// Creates a new session with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a successful poll returning the given batch.
    pub fn push_notifications(&self, batch: Vec<Notification>) {
        self.polls.lock().push_back(Ok(batch));
    }

    /// Queues a failing poll.
    pub fn push_poll_error(&self, message: &str) {
        self.polls.lock().push_back(Err(message.to_string()));
    }

    /// Returns `true` once the session has been closed.
    #[must_use]
    pub fn was_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Returns the number of polls performed so far.
    #[must_use]
    pub fn poll_count(&self) -> u64 {
        self.poll_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NotificationSession for MockSession {
    async fn poll_notifications(
        &mut self,
        _timeout: Duration,
    ) -> Result<Vec<Notification>, BusError> {
        self.poll_count.fetch_add(1, Ordering::SeqCst);
        match self.polls.lock().pop_front() {
            Some(Ok(batch)) => Ok(batch),
            Some(Err(message)) => Err(BusError::Poll(message)),
            None => Ok(Vec::new()),
        }
    }

    async fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Scripted session factory.
///
/// Connect outcomes are queued up front; once the script is exhausted,
/// connects fail. Clones share the same script and counters.
#[derive(Debug, Clone, Default)]
pub struct MockSessionFactory {
    outcomes: Arc<Mutex<VecDeque<Result<MockSession, String>>>>,
    attempts: Arc<AtomicU64>,
}

impl MockSessionFactory {
    /// Creates a new factory with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a successful connect producing the given session.
    pub fn queue_session(&self, session: MockSession) {
        self.outcomes.lock().push_back(Ok(session));
    }

    /// Queues a failing connect.
    pub fn queue_connect_error(&self, message: &str) {
        self.outcomes.lock().push_back(Err(message.to_string()));
    }

    /// Returns the number of connect attempts performed so far.
    #[must_use]
    pub fn connect_attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionFactory for MockSessionFactory {
    type Session = MockSession;

    async fn connect(&self) -> Result<MockSession, BusError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        match self.outcomes.lock().pop_front() {
            Some(Ok(session)) => Ok(session),
            Some(Err(message)) => Err(BusError::Connect(message)),
            None => Err(BusError::Connect("no scripted session".to_string())),
        }
    }
}
