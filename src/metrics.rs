//! Bus metrics.
//!
//! Lock-free atomic counters shared by the lifecycle manager, receiver and
//! sender. All counters use relaxed ordering; they are observational only.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for bus activity.
#[derive(Debug, Default)]
pub struct BusMetrics {
    /// Total notifications received from the database.
    pub notifications_received: AtomicU64,

    /// Total decoded messages dispatched to subscribers.
    pub messages_dispatched: AtomicU64,

    /// Total notifications skipped because their channel was unregistered.
    pub unknown_channels: AtomicU64,

    /// Total notifications skipped because their payload failed to decode.
    pub decode_failures: AtomicU64,

    /// Total poll calls that failed at the session level.
    pub poll_errors: AtomicU64,

    /// Total guarded executions that failed (all error kinds).
    pub execution_failures: AtomicU64,

    /// Total sessions discarded after exceeding the error threshold.
    pub sessions_discarded: AtomicU64,

    /// Total successful connect-and-subscribe sequences.
    pub reconnects: AtomicU64,

    /// Total send attempts.
    pub sends: AtomicU64,

    /// Total send attempts that failed.
    pub send_failures: AtomicU64,
}

impl BusMetrics {
    /// Creates a new metrics instance with all counters at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one received notification.
    pub fn record_notification(&self) {
        self.notifications_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Records one dispatched message.
    pub fn record_dispatch(&self) {
        self.messages_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a notification skipped for an unregistered channel.
    pub fn record_unknown_channel(&self) {
        self.unknown_channels.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a notification skipped for a payload decode failure.
    pub fn record_decode_failure(&self) {
        self.decode_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a session-level poll failure.
    pub fn record_poll_error(&self) {
        self.poll_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a failed guarded execution.
    pub fn record_execution_failure(&self) {
        self.execution_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a session discarded after repeated failures.
    pub fn record_session_discarded(&self) {
        self.sessions_discarded.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a successful connect-and-subscribe.
    pub fn record_reconnect(&self) {
        self.reconnects.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a send attempt.
    pub fn record_send(&self) {
        self.sends.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a failed send attempt.
    pub fn record_send_failure(&self) {
        self.send_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Takes a point-in-time snapshot of all counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            notifications_received: self.notifications_received.load(Ordering::Relaxed),
            messages_dispatched: self.messages_dispatched.load(Ordering::Relaxed),
            unknown_channels: self.unknown_channels.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            poll_errors: self.poll_errors.load(Ordering::Relaxed),
            execution_failures: self.execution_failures.load(Ordering::Relaxed),
            sessions_discarded: self.sessions_discarded.load(Ordering::Relaxed),
            reconnects: self.reconnects.load(Ordering::Relaxed),
            sends: self.sends.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of [`BusMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Total notifications received from the database.
    pub notifications_received: u64,
    /// Total decoded messages dispatched to subscribers.
    pub messages_dispatched: u64,
    /// Total notifications skipped for an unregistered channel.
    pub unknown_channels: u64,
    /// Total notifications skipped for a payload decode failure.
    pub decode_failures: u64,
    /// Total session-level poll failures.
    pub poll_errors: u64,
    /// Total failed guarded executions.
    pub execution_failures: u64,
    /// Total sessions discarded after repeated failures.
    pub sessions_discarded: u64,
    /// Total successful connect-and-subscribe sequences.
    pub reconnects: u64,
    /// Total send attempts.
    pub sends: u64,
    /// Total failed send attempts.
    pub send_failures: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_operations() {
        let m = BusMetrics::new();
        m.record_notification();
        m.record_notification();
        m.record_dispatch();
        m.record_unknown_channel();
        m.record_decode_failure();
        m.record_poll_error();
        m.record_execution_failure();
        m.record_session_discarded();
        m.record_reconnect();
        m.record_send();
        m.record_send_failure();

        let s = m.snapshot();
        assert_eq!(s.notifications_received, 2);
        assert_eq!(s.messages_dispatched, 1);
        assert_eq!(s.unknown_channels, 1);
        assert_eq!(s.decode_failures, 1);
        assert_eq!(s.poll_errors, 1);
        assert_eq!(s.execution_failures, 1);
        assert_eq!(s.sessions_discarded, 1);
        assert_eq!(s.reconnects, 1);
        assert_eq!(s.sends, 1);
        assert_eq!(s.send_failures, 1);
    }

    #[test]
    fn test_fresh_snapshot_is_zeroed() {
        assert_eq!(BusMetrics::new().snapshot(), MetricsSnapshot::default());
    }
}
