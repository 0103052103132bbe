//! # pitwatch-adapters
//!
//! The delivery contract between the pitwatch publisher and its monitor
//! workers, plus concrete broker adapters implementing it.
//!
//! The contract is deliberately narrow: durable named queues, persistent
//! publishes, subscriptions capped at one unacknowledged message in flight
//! (prefetch = 1), and explicit acknowledgment after processing. Together
//! these give at-least-once processing and fair load distribution across
//! competing consumers, with no coordination between worker instances - the
//! broker performs the load balancing.
//!
//! ## Adapters
//!
//! - **AMQP** (`amqp` feature, on by default) - RabbitMQ via [`lapin`],
//!   with a bounded reconnect-with-backoff policy on mid-run failures
//! - **Memory** (always available) - an in-process broker backed by tokio
//!   primitives, used by tests and demos to exercise the ack/redelivery
//!   semantics without a running broker
//!
//! ## Quick Start (memory adapter)
//!
//! ```rust
//! use pitwatch_adapters::{Broker, memory::MemoryBroker};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let broker = MemoryBroker::new();
//!     broker.declare_queue("01-smoker").await?;
//!     broker.publish("01-smoker", b"07/04/2024 08:30, 225.5").await?;
//!
//!     let mut sub = broker.subscribe("01-smoker", "demo").await?;
//!     let delivery = sub.next().await?.expect("one message queued");
//!     assert_eq!(delivery.payload(), b"07/04/2024 08:30, 225.5");
//!     delivery.ack().await?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod memory;

#[cfg(feature = "amqp")]
pub mod amqp;

pub use error::BrokerError;

use async_trait::async_trait;

/// A durable, named-queue publish/subscribe primitive.
///
/// Implementations must guarantee:
/// - queues declared through this trait are durable, and published messages
///   are persisted until acknowledged;
/// - an unacknowledged delivery returns to its queue when the consumer
///   drops or disconnects (at-least-once - a message may be seen twice if
///   the ack is lost after successful processing);
/// - multiple subscriptions on one queue each receive a fair share of
///   messages, with at most one unacknowledged delivery per subscription.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Declare a durable queue with ensure-exists semantics.
    ///
    /// Safe to call concurrently from any number of publishers and workers.
    async fn declare_queue(&self, queue: &str) -> Result<(), BrokerError>;

    /// Delete and redeclare a queue, discarding any backlog.
    ///
    /// Destructive: any messages waiting in the queue are lost. Only a
    /// designated initializer should call this, never every producer
    /// instance as a matter of routine.
    async fn reset_queue(&self, queue: &str) -> Result<(), BrokerError>;

    /// Publish a message to a queue with the persistence flag set.
    async fn publish(&self, queue: &str, payload: &[u8]) -> Result<(), BrokerError>;

    /// Subscribe to a queue with at most one unacknowledged message in
    /// flight (prefetch = 1).
    async fn subscribe(
        &self,
        queue: &str,
        consumer_tag: &str,
    ) -> Result<Box<dyn Subscription>, BrokerError>;
}

/// An open consumer session on one queue.
#[async_trait]
pub trait Subscription: Send {
    /// Wait for the next delivery.
    ///
    /// Suspends until a message is available; returns `Ok(None)` once the
    /// session has been closed by either side.
    async fn next(&mut self) -> Result<Option<Box<dyn Delivery>>, BrokerError>;

    /// Close the session cleanly. Any delivery still unacknowledged
    /// returns to the queue.
    async fn close(&mut self) -> Result<(), BrokerError>;
}

/// One in-flight message awaiting settlement.
///
/// Dropping a delivery without settling it counts as a consumer failure:
/// the broker requeues the message for another instance.
#[async_trait]
pub trait Delivery: Send {
    /// The raw message body.
    fn payload(&self) -> &[u8];

    /// Settle the message as fully processed; the broker discards it.
    async fn ack(self: Box<Self>) -> Result<(), BrokerError>;

    /// Settle the message as unprocessable and drop it without requeueing.
    ///
    /// Used for malformed bodies that would fail identically on redelivery.
    async fn discard(self: Box<Self>) -> Result<(), BrokerError>;
}
