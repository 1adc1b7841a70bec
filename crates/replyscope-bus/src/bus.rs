// SPDX-FileCopyrightText: 2026 Replyscope Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Broadcast-backed event bus with isolated listener tasks.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use replyscope_core::BoxError;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::notification::{Envelope, Notification};

/// Fan-out of [`Notification`]s to any number of subscribers.
///
/// Publishing never blocks. Slow subscribers lose the oldest events once
/// their buffer of `capacity` fills and are told how many they missed.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Envelope>,
    sequence: Arc<AtomicU64>,
}

impl EventBus {
    /// Create a new event bus with the given per-subscriber buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Stamp and broadcast a notification. Returns its sequence number.
    pub fn publish(&self, notification: Notification) -> u64 {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let envelope = Envelope {
            id: uuid::Uuid::new_v4().to_string(),
            sequence,
            emitted_at: Utc::now(),
            notification,
        };
        // No subscribers is not an error.
        let _ = self.sender.send(envelope);
        sequence
    }

    /// Raw receiver for callers that drive their own loop.
    pub fn subscribe(&self) -> broadcast::Receiver<Envelope> {
        self.sender.subscribe()
    }

    /// Number of live receivers, listeners included.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Run `handler` for every notification in a dedicated task.
    ///
    /// A handler error is logged and the listener keeps going, so one failing
    /// listener never affects the others or the publisher.
    pub fn register_listener<F, Fut>(&self, name: impl Into<String>, handler: F) -> ListenerHandle
    where
        F: Fn(Envelope) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        let name = name.into();
        let mut rx = self.sender.subscribe();
        let task_name = name.clone();
        let task = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(envelope) => {
                        let sequence = envelope.sequence;
                        if let Err(e) = handler(envelope).await {
                            warn!(listener = %task_name, sequence, error = %e, "listener failed");
                        }
                    }
                    Err(RecvError::Lagged(missed)) => {
                        warn!(
                            listener = %task_name,
                            missed,
                            "listener lagged, notifications dropped"
                        );
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            debug!(listener = %task_name, "listener stopped");
        });
        ListenerHandle { name, task }
    }
}

/// Owner handle for a registered listener task.
#[derive(Debug)]
pub struct ListenerHandle {
    name: String,
    task: JoinHandle<()>,
}

impl ListenerHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stop the listener without waiting for queued notifications.
    pub fn abort(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the listener to end (after the bus is dropped or the task aborted).
    pub async fn join(self) {
        let _ = self.task.await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use super::*;
    use replyscope_core::SessionId;
    use tracing_test::traced_test;

    fn open(session: &str) -> Notification {
        Notification::Open {
            session_id: SessionId::from(session),
            address: "1@s.whatsapp.net".into(),
        }
    }

    async fn wait_for(counter: &AtomicUsize, expected: usize) {
        for _ in 0..200 {
            if counter.load(Ordering::SeqCst) >= expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("counter stuck at {}", counter.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn subscribers_receive_in_publish_order() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        assert_eq!(bus.publish(open("a")), 1);
        assert_eq!(bus.publish(open("b")), 2);

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.sequence, 1);
        assert_eq!(first.notification.session_id().as_str(), "a");
        assert_eq!(second.sequence, 2);
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_fine() {
        let bus = EventBus::new(4);
        assert_eq!(bus.subscriber_count(), 0);
        bus.publish(open("a"));
    }

    #[tokio::test]
    #[traced_test]
    async fn failing_listener_does_not_affect_others() {
        let bus = EventBus::new(16);
        let healthy = Arc::new(AtomicUsize::new(0));
        let failing = Arc::new(AtomicUsize::new(0));

        let h = healthy.clone();
        let _ok = bus.register_listener("healthy", move |_env| {
            let h = h.clone();
            async move {
                h.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });
        let f = failing.clone();
        let _bad = bus.register_listener("broken", move |_env| {
            let f = f.clone();
            async move {
                f.fetch_add(1, Ordering::SeqCst);
                Err::<(), BoxError>("boom".into())
            }
        });

        for s in ["a", "b", "c"] {
            bus.publish(open(s));
        }

        wait_for(&healthy, 3).await;
        wait_for(&failing, 3).await;
        assert!(logs_contain("listener failed"));
    }

    #[tokio::test]
    async fn aborted_listener_finishes() {
        let bus = EventBus::new(4);
        let handle = bus.register_listener("noop", |_env| async { Ok(()) });
        assert_eq!(handle.name(), "noop");
        handle.abort();
        handle.join().await;
    }

    #[tokio::test]
    async fn listener_stops_when_bus_dropped() {
        let bus = EventBus::new(4);
        let handle = bus.register_listener("noop", |_env| async { Ok(()) });
        drop(bus);
        tokio::time::timeout(Duration::from_secs(1), handle.join())
            .await
            .expect("listener should stop once all senders are gone");
    }
}
