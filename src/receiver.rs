//! Notification receiving.
//!
//! [`NotificationReceiver::on_tick`] is the periodically invoked receive
//! operation: under the lifecycle manager's guard it polls the session with
//! a bounded wait, resolves each notification against the channel registry,
//! decodes the payload and dispatches it on the event bus.
//!
//! Per-notification problems (unregistered channel, malformed payload) are
//! logged and skipped without aborting the rest of the batch and without
//! touching the manager's error accounting. Only a failure of the poll
//! itself propagates, as a single execution failure.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::connection::{AcquireStatus, ConnectionManager, SessionAction};
use crate::dispatch::EventBus;
use crate::error::BusError;
use crate::metrics::BusMetrics;
use crate::registry::ChannelRegistry;
use crate::session::{Notification, NotificationSession, SessionFactory};

/// Polls the subscribing session and routes notifications to subscribers.
pub struct NotificationReceiver<F: SessionFactory> {
    manager: Arc<ConnectionManager<F>>,
    registry: Arc<ChannelRegistry>,
    bus: EventBus,
    receive_timeout: Duration,
    metrics: Arc<BusMetrics>,
}

impl<F: SessionFactory> NotificationReceiver<F> {
    /// Creates a new receiver.
    #[must_use]
    pub fn new(
        manager: Arc<ConnectionManager<F>>,
        registry: Arc<ChannelRegistry>,
        bus: EventBus,
        receive_timeout: Duration,
        metrics: Arc<BusMetrics>,
    ) -> Self {
        Self {
            manager,
            registry,
            bus,
            receive_timeout,
            metrics,
        }
    }

    /// Runs one receive tick.
    ///
    /// Always completes normally; session-level failures are absorbed by
    /// the lifecycle manager's accounting and surface only in the returned
    /// status. The caller must not start a new tick while a previous one is
    /// still running (the manager drops the overlap regardless).
    pub async fn on_tick(&self) -> AcquireStatus {
        self.manager.with_connection(self).await
    }

    /// Returns the event bus this receiver dispatches on.
    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    fn route(&self, notification: &Notification) {
        self.metrics.record_notification();

        let spec = match self.registry.resolve(&notification.channel) {
            Ok(spec) => spec,
            Err(error) => {
                tracing::error!(
                    channel = %notification.channel,
                    payload = %notification.payload,
                    %error,
                    "received notification for unregistered channel"
                );
                self.metrics.record_unknown_channel();
                return;
            }
        };

        match spec.decode(&notification.payload) {
            Ok(payload) => {
                self.bus.publish(spec.routing_key(), payload);
                self.metrics.record_dispatch();
            }
            Err(error) => {
                tracing::error!(
                    channel = %notification.channel,
                    payload = %notification.payload,
                    %error,
                    "notification payload decode failed"
                );
                self.metrics.record_decode_failure();
            }
        }
    }
}

#[async_trait]
impl<F: SessionFactory> SessionAction<F::Session> for NotificationReceiver<F> {
    async fn run(&self, session: &mut F::Session) -> Result<(), BusError> {
        let notifications = session
            .poll_notifications(self.receive_timeout)
            .await
            .map_err(|error| {
                self.metrics.record_poll_error();
                error
            })?;

        for notification in &notifications {
            self.route(notification);
        }
        Ok(())
    }
}
