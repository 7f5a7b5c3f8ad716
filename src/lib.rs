//! # pgbus
//!
//! At-least-once, in-process fan-out of PostgreSQL LISTEN/NOTIFY events.
//!
//! One long-lived session stays subscribed to every registered channel; a
//! periodic receive tick drains pending notifications and routes each to a
//! typed in-process subscriber, while senders publish onto the same
//! channels over short-lived sessions. The hard part — keeping exactly one
//! subscribing session alive under unreliable conditions — lives in
//! [`connection::ConnectionManager`].
//!
//! ## Data Flow
//!
//! ```text
//! NotificationSender ──NOTIFY──▶ PostgreSQL channel
//!                                      │
//!                                      ▼ (LISTEN)
//! ConnectionManager ──guard──▶ NotificationReceiver
//!                                      │ registry lookup + decode
//!                                      ▼
//!                                  EventBus ──▶ typed subscribers
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use pgbus::{
//!     BusConfig, ChannelRegistry, ChannelSpec, ConnectionManager, EventBus,
//!     NotificationReceiver, PgSessionFactory,
//! };
//!
//! let config = BusConfig::new("localhost", "app");
//! let registry = Arc::new(
//!     ChannelRegistry::builder()
//!         .channel(ChannelSpec::json::<Message>("messages", "messages.events"))
//!         .build()?,
//! );
//! let metrics = Arc::new(pgbus::BusMetrics::new());
//!
//! let factory = PgSessionFactory::new(config.clone(), Arc::clone(&registry));
//! let manager = Arc::new(ConnectionManager::new(
//!     factory,
//!     config.reconnect_policy(),
//!     config.error_threshold,
//!     Arc::clone(&metrics),
//! ));
//! let receiver = Arc::new(NotificationReceiver::new(
//!     manager,
//!     registry,
//!     EventBus::default(),
//!     config.receive_timeout,
//!     metrics,
//! ));
//! let handle = pgbus::runtime::spawn_receiver(receiver, config.tick_interval);
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
// Common test patterns that are acceptable
#![cfg_attr(
    test,
    allow(
        clippy::field_reassign_with_default,
        clippy::needless_pass_by_value,
        clippy::unused_async
    )
)]

/// Bus error types.
pub mod error;

/// Bus configuration.
pub mod config;

/// Reconnect backoff policy.
pub mod retry;

/// Channel registry.
pub mod registry;

/// In-process event dispatch.
pub mod dispatch;

/// Session traits.
pub mod session;

/// PostgreSQL session implementation.
pub mod postgres;

/// Connection lifecycle management.
pub mod connection;

/// Notification receiving.
pub mod receiver;

/// Notification sending.
pub mod sender;

/// Receiver tick loop.
pub mod runtime;

/// Bus metrics.
pub mod metrics;

/// Health status reporting.
pub mod health;

/// Testing utilities (mock sessions, helpers).
pub mod testing;

// Re-export primary types at crate level.
pub use config::BusConfig;
pub use connection::{AcquireStatus, ConnectionManager, SessionAction};
pub use dispatch::{Dispatch, DispatchPayload, EventBus};
pub use error::BusError;
pub use health::HealthStatus;
pub use metrics::{BusMetrics, MetricsSnapshot};
pub use postgres::{PgSession, PgSessionFactory};
pub use receiver::NotificationReceiver;
pub use registry::{ChannelRegistry, ChannelSpec};
pub use retry::ReconnectPolicy;
pub use runtime::{spawn_receiver, ReceiverHandle};
pub use sender::NotificationSender;
pub use session::{Notification, NotificationSession, SessionFactory};
