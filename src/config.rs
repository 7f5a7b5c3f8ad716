//! Bus configuration.
//!
//! Provides [`BusConfig`] with the connection descriptor and the tuning
//! knobs for the lifecycle manager, receiver and sender.

use std::time::Duration;

use crate::error::BusError;
use crate::retry::ReconnectPolicy;

/// Configuration for the notification bus.
#[derive(Debug, Clone)]
pub struct BusConfig {
    // ── Connection ──
    /// PostgreSQL host address.
    pub host: String,

    /// PostgreSQL port.
    pub port: u16,

    /// Database name.
    pub database: String,

    /// Username for authentication.
    pub username: String,

    /// Password for authentication.
    pub password: Option<String>,

    // ── Tuning ──
    /// Bounded wait for pending notifications on each poll.
    pub receive_timeout: Duration,

    /// Cadence at which the receiver tick loop runs.
    pub tick_interval: Duration,

    /// Consecutive execution failures tolerated before the session is
    /// discarded. The session is torn down on failure number
    /// `error_threshold + 1`.
    pub error_threshold: u32,

    /// Exponential base for reconnect backoff.
    pub backoff_base: u32,

    /// Cap on the reconnect backoff delay.
    pub max_backoff: Duration,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            database: "postgres".to_string(),
            username: "postgres".to_string(),
            password: None,
            receive_timeout: Duration::from_millis(250),
            tick_interval: Duration::from_secs(1),
            error_threshold: 5,
            backoff_base: 2,
            max_backoff: Duration::from_secs(64),
        }
    }
}

impl BusConfig {
    /// Creates a new config for the given host and database.
    #[must_use]
    pub fn new(host: &str, database: &str) -> Self {
        Self {
            host: host.to_string(),
            database: database.to_string(),
            ..Self::default()
        }
    }

    /// Builds a PostgreSQL connection string.
    #[must_use]
    pub fn connection_string(&self) -> String {
        use std::fmt::Write;
        let mut s = format!(
            "host={} port={} dbname={} user={}",
            self.host, self.port, self.database, self.username
        );
        if let Some(ref pw) = self.password {
            let _ = write!(s, " password={pw}");
        }
        s
    }

    /// Builds the reconnect policy from the backoff settings.
    #[must_use]
    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy::new(self.backoff_base, self.max_backoff)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `BusError::Config` for invalid settings.
    pub fn validate(&self) -> Result<(), BusError> {
        if self.host.is_empty() {
            return Err(BusError::Config("host must not be empty".to_string()));
        }
        if self.database.is_empty() {
            return Err(BusError::Config("database must not be empty".to_string()));
        }
        if self.receive_timeout.is_zero() {
            return Err(BusError::Config(
                "receive_timeout must be > 0".to_string(),
            ));
        }
        if self.tick_interval.is_zero() {
            return Err(BusError::Config("tick_interval must be > 0".to_string()));
        }
        if self.backoff_base < 2 {
            return Err(BusError::Config("backoff_base must be >= 2".to_string()));
        }
        if self.max_backoff.is_zero() {
            return Err(BusError::Config("max_backoff must be > 0".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = BusConfig::default();
        assert_eq!(config.receive_timeout, Duration::from_millis(250));
        assert_eq!(config.tick_interval, Duration::from_secs(1));
        assert_eq!(config.error_threshold, 5);
        assert_eq!(config.backoff_base, 2);
        assert_eq!(config.max_backoff, Duration::from_secs(64));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_connection_string() {
        let mut config = BusConfig::new("pg.local", "events");
        config.port = 5433;
        config.username = "listener".to_string();
        assert_eq!(
            config.connection_string(),
            "host=pg.local port=5433 dbname=events user=listener"
        );

        config.password = Some("secret".to_string());
        assert!(config.connection_string().ends_with(" password=secret"));
    }

    #[test]
    fn test_validate_rejects_empty_host() {
        let mut config = BusConfig::default();
        config.host = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_timeouts() {
        let mut config = BusConfig::default();
        config.receive_timeout = Duration::ZERO;
        assert!(config.validate().is_err());

        let mut config = BusConfig::default();
        config.tick_interval = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_degenerate_backoff() {
        let mut config = BusConfig::default();
        config.backoff_base = 1;
        assert!(config.validate().is_err());
    }
}
