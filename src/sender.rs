//! Notification sending.
//!
//! [`NotificationSender`] publishes one message to one channel over a
//! short-lived session. Publishing does not require a persistent
//! subscription, so the sender never contends with the receiver (or with
//! other senders) for the lifecycle manager's long-lived session.
//!
//! The payload is interpolated into the `NOTIFY` statement as a string
//! literal and must therefore be escaped first; see [`escape_literal`].

use std::sync::Arc;

use serde::Serialize;
use tokio_postgres::NoTls;

use crate::config::BusConfig;
use crate::error::BusError;
use crate::metrics::BusMetrics;
use crate::registry::ChannelSpec;

/// Publishes messages onto notification channels.
pub struct NotificationSender {
    config: BusConfig,
    metrics: Arc<BusMetrics>,
}

impl NotificationSender {
    /// Creates a new sender.
    #[must_use]
    pub fn new(config: BusConfig, metrics: Arc<BusMetrics>) -> Self {
        Self { config, metrics }
    }

    /// Encodes `message` and publishes it on `channel`.
    ///
    /// Opens a fresh session, issues the `NOTIFY`, and closes the session
    /// regardless of outcome.
    ///
    /// # Errors
    ///
    /// Returns `BusError::Send` when encoding or the database round trip
    /// fails. Fire-and-forget callers may log and continue; callers that
    /// need the publish to happen must retry.
    pub async fn send<T>(&self, channel: &ChannelSpec, message: &T) -> Result<(), BusError>
    where
        T: Serialize + Sync,
    {
        self.metrics.record_send();

        let result = self.try_send(channel, message).await;
        if result.is_err() {
            self.metrics.record_send_failure();
        }
        result
    }

    async fn try_send<T>(&self, channel: &ChannelSpec, message: &T) -> Result<(), BusError>
    where
        T: Serialize + Sync,
    {
        let encoded = serde_json::to_string(message).map_err(|e| {
            BusError::Send(format!("encode for channel '{}': {e}", channel.name()))
        })?;
        let statement = notify_statement(channel.name(), &encoded);

        let (client, connection) =
            tokio_postgres::connect(&self.config.connection_string(), NoTls)
                .await
                .map_err(|e| BusError::Send(format!("PostgreSQL connect: {e}")))?;
        let driver = tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!(error = %e, "PostgreSQL send connection error");
            }
        });

        let result = client
            .batch_execute(&statement)
            .await
            .map_err(|e| BusError::Send(format!("NOTIFY {}: {e}", channel.name())));

        drop(client);
        let _ = driver.await;
        result
    }
}

/// Builds the `NOTIFY` statement for a channel and an already-encoded
/// payload.
fn notify_statement(channel: &str, payload: &str) -> String {
    format!("NOTIFY {channel}, '{}'", escape_literal(payload))
}

/// Escapes a payload for inclusion in a single-quoted string literal.
///
/// Doubling single quotes is sufficient under `standard_conforming_strings`,
/// which is the server default; backslashes carry no special meaning there.
fn escape_literal(payload: &str) -> String {
    payload.replace('\'', "''")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_literal_doubles_quotes() {
        assert_eq!(escape_literal("plain"), "plain");
        assert_eq!(escape_literal("it's"), "it''s");
        assert_eq!(escape_literal("''"), "''''");
    }

    #[test]
    fn test_notify_statement() {
        assert_eq!(
            notify_statement("messages", r#"{"payload":"a"}"#),
            r#"NOTIFY messages, '{"payload":"a"}'"#
        );
    }

    #[test]
    fn test_notify_statement_resists_quote_injection() {
        // A payload trying to break out of the literal stays inside it
        let hostile = "x', 'y'); DROP TABLE users; --";
        let statement = notify_statement("messages", hostile);
        assert_eq!(
            statement,
            "NOTIFY messages, 'x'', ''y''); DROP TABLE users; --'"
        );
    }

    #[test]
    fn test_json_payload_with_quotes_survives_encoding() {
        let encoded = serde_json::to_string(&crate::testing::TestMessage::new("o'clock")).unwrap();
        let statement = notify_statement("messages", &encoded);
        assert!(statement.contains("o''clock"));
    }
}
