//! Bus error types.
//!
//! One error kind per failure class, so propagation policy is decided by
//! kind rather than by where in the call stack a handler happens to sit:
//!
//! - [`BusError::Connect`] and [`BusError::Poll`] are session-level and feed
//!   the lifecycle manager's reconnect machinery.
//! - [`BusError::UnknownChannel`] and [`BusError::Decode`] are
//!   per-notification, always logged and skipped, never escalated.
//! - [`BusError::Send`] is surfaced to the caller of
//!   [`send`](crate::sender::NotificationSender::send).

use thiserror::Error;

/// Errors that can occur during bus operations.
#[derive(Debug, Error)]
pub enum BusError {
    /// Establishing a new session or issuing its LISTEN directives failed.
    ///
    /// Non-fatal; the lifecycle manager retries with backoff.
    #[error("connect failed: {0}")]
    Connect(String),

    /// The live session failed during a poll for notifications.
    ///
    /// Counted toward the consecutive-error threshold; the session is only
    /// torn down once the threshold is exceeded.
    #[error("poll failed: {0}")]
    Poll(String),

    /// A notification arrived for a channel the registry does not know.
    #[error("unknown channel '{channel}'")]
    UnknownChannel {
        /// The channel name as delivered by the server.
        channel: String,
    },

    /// A notification payload could not be decoded as the channel's type.
    #[error("decode failed on channel '{channel}': {message}")]
    Decode {
        /// The channel whose codec rejected the payload.
        channel: String,
        /// Details from the underlying deserializer.
        message: String,
    },

    /// Encoding or publishing a message failed in the sender.
    #[error("send failed: {0}")]
    Send(String),

    /// Invalid bus or channel configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// The bus has been shut down.
    #[error("bus shut down")]
    ShutDown,
}
