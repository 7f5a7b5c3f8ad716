//! PostgreSQL session implementation.
//!
//! [`PgSessionFactory`] performs the connect-and-subscribe sequence over
//! `tokio-postgres`: open a connection, spawn the task that drives it,
//! issue `LISTEN` for every registered channel, and hand the resulting
//! [`PgSession`] to the lifecycle manager.
//!
//! Notifications arrive as `AsyncMessage::Notification` on the connection
//! task and are forwarded into an unbounded channel; polling drains that
//! channel with a bounded wait. TLS is not supported — the bus connects
//! with `NoTls` only.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::poll_fn;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_postgres::{AsyncMessage, NoTls};

use crate::config::BusConfig;
use crate::error::BusError;
use crate::registry::ChannelRegistry;
use crate::session::{Notification, NotificationSession, SessionFactory};

/// A live `tokio-postgres` session subscribed to every registered channel.
pub struct PgSession {
    client: tokio_postgres::Client,
    notifications: mpsc::UnboundedReceiver<Notification>,
    driver: JoinHandle<()>,
}

#[async_trait]
impl NotificationSession for PgSession {
    async fn poll_notifications(
        &mut self,
        timeout: Duration,
    ) -> Result<Vec<Notification>, BusError> {
        if self.client.is_closed() {
            return Err(BusError::Poll("session closed by server".to_string()));
        }

        match tokio::time::timeout(timeout, self.notifications.recv()).await {
            // Wait elapsed with nothing pending
            Err(_) => Ok(Vec::new()),
            // Driver task ended: the connection is gone
            Ok(None) => Err(BusError::Poll("notification stream ended".to_string())),
            Ok(Some(first)) => {
                let mut drained = vec![first];
                while let Ok(notification) = self.notifications.try_recv() {
                    drained.push(notification);
                }
                Ok(drained)
            }
        }
    }

    async fn close(&mut self) {
        self.driver.abort();
    }
}

/// Opens [`PgSession`]s for the channels in a [`ChannelRegistry`].
pub struct PgSessionFactory {
    config: BusConfig,
    registry: Arc<ChannelRegistry>,
}

impl PgSessionFactory {
    /// Creates a new factory.
    #[must_use]
    pub fn new(config: BusConfig, registry: Arc<ChannelRegistry>) -> Self {
        Self { config, registry }
    }
}

#[async_trait]
impl SessionFactory for PgSessionFactory {
    type Session = PgSession;

    async fn connect(&self) -> Result<PgSession, BusError> {
        let (client, mut connection) =
            tokio_postgres::connect(&self.config.connection_string(), NoTls)
                .await
                .map_err(|e| BusError::Connect(format!("PostgreSQL connect: {e}")))?;

        let (tx, rx) = mpsc::unbounded_channel();
        let driver = tokio::spawn(async move {
            let mut messages = poll_fn(move |cx| connection.poll_message(cx));
            while let Some(message) = messages.next().await {
                match message {
                    Ok(AsyncMessage::Notification(n)) => {
                        // Send fails only when the session was dropped; the
                        // driver ends with it either way.
                        let _ = tx.send(Notification::new(n.channel(), n.payload()));
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::error!(error = %e, "PostgreSQL connection error");
                        break;
                    }
                }
            }
        });

        for spec in self.registry.channels() {
            if let Err(e) = client.batch_execute(&listen_statement(spec.name())).await {
                driver.abort();
                return Err(BusError::Connect(format!(
                    "LISTEN {}: {e}",
                    spec.name()
                )));
            }
        }

        Ok(PgSession {
            client,
            notifications: rx,
            driver,
        })
    }
}

fn listen_statement(channel: &str) -> String {
    format!("LISTEN {channel}")
}
