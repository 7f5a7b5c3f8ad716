//! Session traits.
//!
//! The lifecycle manager and receiver are written against these seams so
//! they can be exercised without a database (see [`crate::testing`]). The
//! production implementation lives in [`crate::postgres`].

use std::time::Duration;

use async_trait::async_trait;

use crate::error::BusError;

/// A notification delivered to a subscribed session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// The channel the notification was published on.
    pub channel: String,

    /// The raw textual payload.
    pub payload: String,
}

impl Notification {
    /// Creates a new notification.
    #[must_use]
    pub fn new(channel: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            payload: payload.into(),
        }
    }
}

/// One live, subscribed database session.
///
/// Implementations hold whatever native handle is needed to poll for
/// notifications. A session is owned exclusively by the lifecycle manager
/// and only ever borrowed for the scope of one guarded operation.
#[async_trait]
pub trait NotificationSession: Send {
    /// Polls for pending notifications, waiting at most `timeout` for the
    /// first one to arrive.
    ///
    /// An empty result is not an error; it means the wait elapsed with
    /// nothing pending.
    ///
    /// # Errors
    ///
    /// Returns `BusError::Poll` when the session itself has failed. This is
    /// the one failure class the lifecycle manager counts toward its
    /// teardown threshold.
    async fn poll_notifications(&mut self, timeout: Duration)
        -> Result<Vec<Notification>, BusError>;

    /// Closes the session, releasing its resources.
    async fn close(&mut self);
}

/// Opens new subscribed sessions.
///
/// `connect` performs the whole connect-and-subscribe sequence: a session
/// returned here is already listening on every registered channel.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    /// The session type this factory produces.
    type Session: NotificationSession + 'static;

    /// Opens a new session and subscribes it to every registered channel.
    ///
    /// # Errors
    ///
    /// Returns `BusError::Connect` when any step fails; partially opened
    /// resources are released before returning.
    async fn connect(&self) -> Result<Self::Session, BusError>;
}
