//! The monitor worker: an explicit receive loop over one channel's queue.
//!
//! Each worker instance exclusively owns its window - no state is shared
//! across instances or channels; all coordination goes through the broker.
//! A message is acknowledged only after the window update and rule
//! evaluation complete, so a crash before the ack redelivers the message to
//! another instance (at-least-once).
//!
//! A malformed message body is reported and discarded without requeueing:
//! redelivering it would fail identically forever. Decode failures never
//! terminate the worker.
//!
//! The delivery layer allows several instances to compete on one queue, but
//! the trailing-window semantics are only meaningful when a single instance
//! consumes a channel; extra instances each see a fragment of the stream.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};

use pitwatch_adapters::{Broker, BrokerError};
use pitwatch_types::{wire, AlertReason, AlertStatus, Channel, Reading, Window};

/// An alert raised by a worker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Alert {
    /// The channel whose window matched.
    pub channel: Channel,
    /// Which pattern matched.
    pub reason: AlertReason,
    /// The reading whose insertion triggered the match.
    pub reading: Reading,
}

/// Destination for alert signals.
///
/// The worker stays agnostic about where alerts go: the binary logs them,
/// tests and embedders capture them on a channel.
pub trait AlertSink: Send {
    /// Deliver one alert.
    fn emit(&mut self, alert: Alert);
}

/// Sink that reports alerts through tracing at warn level.
#[derive(Debug, Default)]
pub struct LogSink;

impl AlertSink for LogSink {
    fn emit(&mut self, alert: Alert) {
        warn!(
            channel = %alert.channel,
            reason = %alert.reason,
            at = %alert.reading.at,
            value = alert.reading.value,
            "[!] alert"
        );
    }
}

/// Sink that forwards alerts over an unbounded channel.
#[derive(Debug)]
pub struct ChannelSink {
    sender: mpsc::UnboundedSender<Alert>,
}

impl ChannelSink {
    /// Create a receiver/sink pair.
    pub fn create() -> (mpsc::UnboundedReceiver<Alert>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (rx, Self { sender: tx })
    }
}

impl AlertSink for ChannelSink {
    fn emit(&mut self, alert: Alert) {
        // Receiver dropped just means nobody is listening anymore.
        let _ = self.sender.send(alert);
    }
}

/// Per-instance worker state: one channel, one owned window, one sink.
#[derive(Debug)]
pub struct Worker<S> {
    channel: Channel,
    window: Window,
    sink: S,
}

impl<S: AlertSink> Worker<S> {
    /// Create a worker with the window the registry prescribes for
    /// `channel`.
    pub fn new(channel: Channel, sink: S) -> Self {
        Self {
            channel,
            window: Window::for_channel(channel),
            sink,
        }
    }

    /// Process one message body: decode, push into the window, emit on a
    /// rule match.
    ///
    /// A decode error is returned for reporting; the window is untouched.
    pub fn handle(&mut self, body: &[u8]) -> Result<AlertStatus, wire::WireError> {
        let reading = wire::decode(body)?;
        let status = self.window.push(reading);
        if let AlertStatus::Alert(reason) = status {
            self.sink.emit(Alert { channel: self.channel, reason, reading });
        }
        Ok(status)
    }
}

/// Run a worker until `shutdown` resolves or the subscription ends.
///
/// States: connect/subscribe, then ready - each received message is
/// processed and acknowledged before the next is taken (prefetch = 1). On
/// shutdown the in-flight message finishes and is settled before the
/// session closes cleanly. Returns the number of messages acknowledged.
pub async fn run<S, F>(
    broker: Arc<dyn Broker>,
    channel: Channel,
    sink: S,
    shutdown: F,
) -> Result<u64, BrokerError>
where
    S: AlertSink,
    F: Future<Output = ()>,
{
    let mut worker = Worker::new(channel, sink);
    let tag = format!("pitwatch-{}", channel.label());
    let mut subscription = broker.subscribe(channel.queue_name(), &tag).await?;
    info!(%channel, queue = channel.queue_name(), "ready for work");

    tokio::pin!(shutdown);
    let mut processed = 0u64;

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!(%channel, "shutdown requested, draining");
                break;
            }
            next = subscription.next() => match next? {
                None => break,
                Some(delivery) => match worker.handle(delivery.payload()) {
                    Ok(status) => {
                        info!(%channel, ?status, "processed reading");
                        delivery.ack().await?;
                        processed += 1;
                    }
                    Err(e) => {
                        // Local to this message: settle it out of the queue
                        // and keep consuming.
                        warn!(%channel, error = %e, "discarding undecodable message");
                        delivery.discard().await?;
                    }
                },
            },
        }
    }

    subscription.close().await?;
    info!(%channel, processed, "worker stopped");
    Ok(processed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pitwatch_adapters::memory::MemoryBroker;
    use pitwatch_types::Moment;

    fn encoded_series(values: &[f64]) -> Vec<String> {
        let start = Moment::parse("07/04/2024 08:00").unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, v)| wire::encode(&Reading::new(start.plus_minutes(i as i64), *v)))
            .collect()
    }

    #[test]
    fn test_handle_emits_alert_once_window_matches() {
        let (mut alerts, sink) = ChannelSink::create();
        let mut worker = Worker::new(Channel::Smoker, sink);

        for body in encoded_series(&[100.0, 95.0, 90.0, 88.0, 84.0]) {
            worker.handle(body.as_bytes()).unwrap();
        }

        let alert = alerts.try_recv().unwrap();
        assert_eq!(alert.channel, Channel::Smoker);
        assert_eq!(alert.reason, AlertReason::RapidDecline);
        assert_eq!(alert.reading.value, 84.0);
    }

    #[test]
    fn test_handle_is_quiet_below_threshold() {
        let (mut alerts, sink) = ChannelSink::create();
        let mut worker = Worker::new(Channel::Smoker, sink);

        for body in encoded_series(&[100.0, 95.0, 92.0, 90.0, 88.0]) {
            let status = worker.handle(body.as_bytes()).unwrap();
            assert_ne!(status, AlertStatus::Alert(AlertReason::RapidDecline));
        }
        assert!(alerts.try_recv().is_err());
    }

    #[test]
    fn test_handle_rejects_garbage_without_touching_window() {
        let (_alerts, sink) = ChannelSink::create();
        let mut worker = Worker::new(Channel::Smoker, sink);

        worker.handle(b"07/04/2024 08:00, 100.0").unwrap();
        assert!(worker.handle(b"not a reading").is_err());
        assert_eq!(worker.window.len(), 1);
    }

    #[tokio::test]
    async fn test_worker_processes_and_acks_from_queue() {
        let broker = MemoryBroker::new();
        broker.declare_queue(Channel::Smoker.queue_name()).await.unwrap();
        for body in encoded_series(&[100.0, 95.0, 90.0, 88.0, 84.0]) {
            broker
                .publish(Channel::Smoker.queue_name(), body.as_bytes())
                .await
                .unwrap();
        }

        let shared: Arc<dyn Broker> = Arc::new(broker.clone());
        let (mut alerts, sink) = ChannelSink::create();
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

        let handle = tokio::spawn(run(shared, Channel::Smoker, sink, async move {
            let _ = stop_rx.await;
        }));

        // The fifth reading fills the window and fires the decline rule.
        let alert = alerts.recv().await.unwrap();
        assert_eq!(alert.reason, AlertReason::RapidDecline);

        stop_tx.send(()).unwrap();
        let processed = handle.await.unwrap().unwrap();
        assert_eq!(processed, 5);
        assert_eq!(broker.depth(Channel::Smoker.queue_name()), Some(0));
    }

    #[tokio::test]
    async fn test_worker_survives_undecodable_message() {
        let broker = MemoryBroker::new();
        broker.declare_queue(Channel::Smoker.queue_name()).await.unwrap();
        broker
            .publish(Channel::Smoker.queue_name(), b"\xff\xfe garbage")
            .await
            .unwrap();
        for body in encoded_series(&[100.0, 95.0, 90.0, 88.0, 84.0]) {
            broker
                .publish(Channel::Smoker.queue_name(), body.as_bytes())
                .await
                .unwrap();
        }

        let shared: Arc<dyn Broker> = Arc::new(broker.clone());
        let (mut alerts, sink) = ChannelSink::create();
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

        let handle = tokio::spawn(run(shared, Channel::Smoker, sink, async move {
            let _ = stop_rx.await;
        }));

        // The garbage message is discarded, not retried, and the worker
        // still reaches the alert.
        let alert = alerts.recv().await.unwrap();
        assert_eq!(alert.reason, AlertReason::RapidDecline);

        stop_tx.send(()).unwrap();
        let processed = handle.await.unwrap().unwrap();
        assert_eq!(processed, 5);
        assert_eq!(broker.depth(Channel::Smoker.queue_name()), Some(0));
    }

    #[tokio::test]
    async fn test_shutdown_with_empty_queue_exits_cleanly() {
        let broker = MemoryBroker::new();
        broker.declare_queue(Channel::FoodA.queue_name()).await.unwrap();

        let shared: Arc<dyn Broker> = Arc::new(broker);
        let (_alerts, sink) = ChannelSink::create();
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

        let handle = tokio::spawn(run(shared, Channel::FoodA, sink, async move {
            let _ = stop_rx.await;
        }));

        stop_tx.send(()).unwrap();
        let processed = handle.await.unwrap().unwrap();
        assert_eq!(processed, 0);
    }
}
