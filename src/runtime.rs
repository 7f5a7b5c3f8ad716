//! Receiver tick loop.
//!
//! [`spawn_receiver`] is the crate-side half of the scheduler boundary: a
//! background task driving [`NotificationReceiver::on_tick`] at a fixed
//! cadence. Ticks are awaited to completion before the next one fires, and
//! missed ticks are skipped rather than bursted, which together give the
//! skip-if-running semantics the receiver relies on.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::connection::AcquireStatus;
use crate::receiver::NotificationReceiver;
use crate::session::SessionFactory;

/// Handle to a running receiver tick loop.
#[derive(Debug)]
pub struct ReceiverHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
    task_handle: Option<JoinHandle<()>>,
}

impl ReceiverHandle {
    /// Signals the tick loop to stop after the current tick.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }

    /// Waits for the tick loop task to finish.
    pub async fn join(mut self) {
        if let Some(handle) = self.task_handle.take() {
            let _ = handle.await;
        }
    }
}

/// Spawns the receiver tick loop on the current tokio runtime.
///
/// The loop ends when [`ReceiverHandle::shutdown`] is called or when the
/// lifecycle manager reports that it has shut down.
pub fn spawn_receiver<F>(
    receiver: Arc<NotificationReceiver<F>>,
    tick_interval: Duration,
) -> ReceiverHandle
where
    F: SessionFactory + 'static,
{
    let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

    let task_handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = &mut shutdown_rx => break,
                _ = ticker.tick() => {
                    if receiver.on_tick().await == AcquireStatus::ShutDown {
                        break;
                    }
                }
            }
        }
    });

    ReceiverHandle {
        shutdown_tx: Some(shutdown_tx),
        task_handle: Some(task_handle),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::ConnectionManager;
    use crate::dispatch::EventBus;
    use crate::metrics::BusMetrics;
    use crate::registry::{ChannelRegistry, ChannelSpec};
    use crate::retry::ReconnectPolicy;
    use crate::session::Notification;
    use crate::testing::{MockSession, MockSessionFactory, TestMessage};

    fn receiver_with_session(
        session: MockSession,
    ) -> Arc<NotificationReceiver<MockSessionFactory>> {
        let factory = MockSessionFactory::new();
        factory.queue_session(session);

        let metrics = Arc::new(BusMetrics::new());
        let manager = Arc::new(ConnectionManager::new(
            factory,
            ReconnectPolicy::default(),
            5,
            Arc::clone(&metrics),
        ));
        let registry = Arc::new(
            ChannelRegistry::builder()
                .channel(ChannelSpec::json::<TestMessage>("messages", "messages.events"))
                .build()
                .unwrap(),
        );
        Arc::new(NotificationReceiver::new(
            manager,
            registry,
            EventBus::default(),
            Duration::from_millis(250),
            metrics,
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_ticks_and_dispatches() {
        let session = MockSession::new();
        session.push_notifications(vec![Notification::new(
            "messages",
            r#"{"payload":"a"}"#,
        )]);
        let receiver = receiver_with_session(session.clone());
        let mut rx = receiver.bus().subscribe();

        let mut handle = spawn_receiver(Arc::clone(&receiver), Duration::from_secs(1));

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(session.poll_count() >= 1);
        assert!(rx.try_recv().is_ok());

        handle.shutdown();
        handle.join().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_the_loop() {
        let receiver = receiver_with_session(MockSession::new());

        let mut handle = spawn_receiver(Arc::clone(&receiver), Duration::from_secs(1));
        tokio::time::sleep(Duration::from_millis(100)).await;

        handle.shutdown();
        handle.join().await;
    }
}
