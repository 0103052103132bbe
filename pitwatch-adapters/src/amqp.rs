//! RabbitMQ adapter over AMQP 0.9.1 using [`lapin`].
//!
//! Queues are declared durable and messages are published with the
//! persistence flag, so an unacknowledged message survives a broker
//! restart. Each subscription runs on its own AMQP channel with
//! `prefetch = 1`, which is what lets multiple worker instances compete
//! fairly on one queue.
//!
//! The initial connect fails fast with the host and underlying cause in
//! the error. Mid-run publish failures go through a bounded
//! reconnect-with-backoff policy; once the attempts are exhausted the
//! error surfaces to the caller.
//!
//! ## Example
//!
//! ```rust,no_run
//! use pitwatch_adapters::{Broker, amqp::AmqpBroker};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let broker = AmqpBroker::builder()
//!         .uri("amqp://localhost:5672/%2f")
//!         .reconnect(5, Duration::from_secs(1))
//!         .build()
//!         .await?;
//!
//!     broker.declare_queue("01-smoker").await?;
//!     broker.publish("01-smoker", b"07/04/2024 08:30, 225.5").await?;
//!     Ok(())
//! }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicPublishOptions, BasicQosOptions,
    QueueDeclareOptions, QueueDeleteOptions,
};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, Consumer};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::{Broker, BrokerError, Delivery, Subscription};

/// Persistent delivery mode per AMQP 0.9.1.
const PERSISTENT: u8 = 2;

/// Bounded retry policy for re-establishing a lost connection mid-run.
#[derive(Debug, Clone, Copy)]
pub struct ReconnectPolicy {
    /// Maximum reconnect attempts before the failure surfaces.
    pub attempts: u32,
    /// Base delay, doubled on each successive attempt.
    pub backoff: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { attempts: 5, backoff: Duration::from_secs(1) }
    }
}

/// RabbitMQ-backed implementation of the delivery contract.
///
/// Holds one long-lived connection reused across the run; subscriptions get
/// their own channel so prefetch applies per consumer.
pub struct AmqpBroker {
    uri: String,
    policy: ReconnectPolicy,
    state: Mutex<AmqpState>,
}

struct AmqpState {
    connection: Connection,
    channel: Channel,
}

async fn connect(uri: &str) -> Result<AmqpState, BrokerError> {
    let connection = Connection::connect(uri, ConnectionProperties::default())
        .await
        .map_err(|e| BrokerError::Connect { host: uri.to_string(), reason: e.to_string() })?;
    let channel = connection
        .create_channel()
        .await
        .map_err(|e| BrokerError::Connect { host: uri.to_string(), reason: e.to_string() })?;
    Ok(AmqpState { connection, channel })
}

impl AmqpBroker {
    /// Create a new builder for configuring the broker.
    pub fn builder() -> AmqpBrokerBuilder {
        AmqpBrokerBuilder::default()
    }

    /// The URI this broker is connected to.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    async fn try_publish(channel: &Channel, queue: &str, payload: &[u8]) -> Result<(), lapin::Error> {
        channel
            .basic_publish(
                "",
                queue,
                BasicPublishOptions::default(),
                payload,
                BasicProperties::default().with_delivery_mode(PERSISTENT),
            )
            .await?
            .await?;
        Ok(())
    }

    /// Rebuild the connection and channel under the bounded policy.
    async fn reconnect(&self, state: &mut AmqpState) -> Result<(), BrokerError> {
        let mut last = None;
        for attempt in 1..=self.policy.attempts {
            let delay = self.policy.backoff * 2u32.saturating_pow(attempt - 1);
            warn!(
                uri = %self.uri,
                attempt,
                max = self.policy.attempts,
                delay_ms = delay.as_millis() as u64,
                "broker connection lost, reconnecting"
            );
            tokio::time::sleep(delay).await;
            match connect(&self.uri).await {
                Ok(fresh) => {
                    *state = fresh;
                    debug!(uri = %self.uri, "reconnected to broker");
                    return Ok(());
                }
                Err(e) => last = Some(e),
            }
        }
        Err(last.unwrap_or_else(|| BrokerError::Connect {
            host: self.uri.clone(),
            reason: "reconnect attempts exhausted".to_string(),
        }))
    }
}

#[async_trait]
impl Broker for AmqpBroker {
    async fn declare_queue(&self, queue: &str) -> Result<(), BrokerError> {
        let state = self.state.lock().await;
        state
            .channel
            .queue_declare(
                queue,
                QueueDeclareOptions { durable: true, ..Default::default() },
                FieldTable::default(),
            )
            .await
            .map_err(|e| BrokerError::Queue { queue: queue.to_string(), reason: e.to_string() })?;
        debug!(queue, "declared durable queue");
        Ok(())
    }

    async fn reset_queue(&self, queue: &str) -> Result<(), BrokerError> {
        let state = self.state.lock().await;
        state
            .channel
            .queue_delete(queue, QueueDeleteOptions::default())
            .await
            .map_err(|e| BrokerError::Queue { queue: queue.to_string(), reason: e.to_string() })?;
        state
            .channel
            .queue_declare(
                queue,
                QueueDeclareOptions { durable: true, ..Default::default() },
                FieldTable::default(),
            )
            .await
            .map_err(|e| BrokerError::Queue { queue: queue.to_string(), reason: e.to_string() })?;
        warn!(queue, "queue reset: backlog discarded");
        Ok(())
    }

    async fn publish(&self, queue: &str, payload: &[u8]) -> Result<(), BrokerError> {
        let mut state = self.state.lock().await;
        match Self::try_publish(&state.channel, queue, payload).await {
            Ok(()) => Ok(()),
            Err(first) => {
                // One bounded reconnect pass, then a single retry. If the
                // retry fails too, the run is over.
                warn!(queue, error = %first, "publish failed");
                self.reconnect(&mut state).await?;
                Self::try_publish(&state.channel, queue, payload).await.map_err(|e| {
                    BrokerError::Publish { queue: queue.to_string(), reason: e.to_string() }
                })
            }
        }
    }

    async fn subscribe(
        &self,
        queue: &str,
        consumer_tag: &str,
    ) -> Result<Box<dyn Subscription>, BrokerError> {
        let state = self.state.lock().await;
        let channel = state.connection.create_channel().await.map_err(|e| {
            BrokerError::Consume { queue: queue.to_string(), reason: e.to_string() }
        })?;

        // One unacked message in flight per consumer: the broker spreads
        // load across competing instances on its own.
        channel
            .basic_qos(1, BasicQosOptions::default())
            .await
            .map_err(|e| BrokerError::Consume { queue: queue.to_string(), reason: e.to_string() })?;

        let consumer = channel
            .basic_consume(
                queue,
                consumer_tag,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| BrokerError::Consume { queue: queue.to_string(), reason: e.to_string() })?;

        debug!(queue, consumer_tag, "subscribed with prefetch=1");
        Ok(Box::new(AmqpSubscription {
            channel,
            consumer,
            queue: queue.to_string(),
            closed: false,
        }))
    }
}

impl std::fmt::Debug for AmqpBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AmqpBroker")
            .field("uri", &self.uri)
            .field("policy", &self.policy)
            .finish()
    }
}

struct AmqpSubscription {
    channel: Channel,
    consumer: Consumer,
    queue: String,
    closed: bool,
}

#[async_trait]
impl Subscription for AmqpSubscription {
    async fn next(&mut self) -> Result<Option<Box<dyn Delivery>>, BrokerError> {
        if self.closed {
            return Ok(None);
        }
        match self.consumer.next().await {
            Some(Ok(delivery)) => Ok(Some(Box::new(AmqpDelivery { inner: delivery }))),
            Some(Err(e)) => Err(BrokerError::Consume {
                queue: self.queue.clone(),
                reason: e.to_string(),
            }),
            None => Ok(None),
        }
    }

    async fn close(&mut self) -> Result<(), BrokerError> {
        self.closed = true;
        self.channel
            .close(200, "worker shutdown")
            .await
            .map_err(|e| BrokerError::Consume { queue: self.queue.clone(), reason: e.to_string() })
    }
}

struct AmqpDelivery {
    inner: lapin::message::Delivery,
}

#[async_trait]
impl Delivery for AmqpDelivery {
    fn payload(&self) -> &[u8] {
        &self.inner.data
    }

    async fn ack(self: Box<Self>) -> Result<(), BrokerError> {
        self.inner
            .ack(BasicAckOptions::default())
            .await
            .map_err(|e| BrokerError::Settle(e.to_string()))
    }

    async fn discard(self: Box<Self>) -> Result<(), BrokerError> {
        self.inner
            .nack(BasicNackOptions { multiple: false, requeue: false })
            .await
            .map_err(|e| BrokerError::Settle(e.to_string()))
    }
}

/// Builder for [`AmqpBroker`].
#[derive(Debug, Default)]
pub struct AmqpBrokerBuilder {
    uri: Option<String>,
    policy: Option<ReconnectPolicy>,
}

impl AmqpBrokerBuilder {
    /// Set the AMQP URI (default: `amqp://localhost:5672/%2f`).
    pub fn uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    /// Set the mid-run reconnect policy (default: 5 attempts, 1s base).
    pub fn reconnect(mut self, attempts: u32, backoff: Duration) -> Self {
        self.policy = Some(ReconnectPolicy { attempts, backoff });
        self
    }

    /// Connect and build the broker. Fails fast if the broker is
    /// unreachable, naming the host and the underlying cause.
    pub async fn build(self) -> Result<AmqpBroker, BrokerError> {
        let uri = self.uri.unwrap_or_else(|| "amqp://localhost:5672/%2f".to_string());
        let policy = self.policy.unwrap_or_default();
        let state = connect(&uri).await?;
        Ok(AmqpBroker { uri, policy, state: Mutex::new(state) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let builder = AmqpBroker::builder();
        assert!(builder.uri.is_none());
        assert!(builder.policy.is_none());

        let policy = ReconnectPolicy::default();
        assert_eq!(policy.attempts, 5);
        assert_eq!(policy.backoff, Duration::from_secs(1));
    }

    #[test]
    fn test_builder_custom() {
        let builder = AmqpBroker::builder()
            .uri("amqp://rabbit.local:5672/%2f")
            .reconnect(3, Duration::from_millis(200));

        assert_eq!(builder.uri.as_deref(), Some("amqp://rabbit.local:5672/%2f"));
        let policy = builder.policy.unwrap();
        assert_eq!(policy.attempts, 3);
        assert_eq!(policy.backoff, Duration::from_millis(200));
    }
}
