//! Error types for broker adapters.

use thiserror::Error;

/// Errors that can occur at the delivery layer.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// Could not reach the broker. Fatal at startup; recoverable mid-run
    /// only through an adapter's explicit, bounded reconnect policy.
    #[error("connection to broker at {host} failed: {reason}")]
    Connect { host: String, reason: String },

    /// A queue declare, delete, or reset failed.
    #[error("queue '{queue}' operation failed: {reason}")]
    Queue { queue: String, reason: String },

    /// A publish was not accepted by the broker.
    #[error("publish to '{queue}' failed: {reason}")]
    Publish { queue: String, reason: String },

    /// The consumer session failed.
    #[error("consume from '{queue}' failed: {reason}")]
    Consume { queue: String, reason: String },

    /// An ack or discard could not be delivered to the broker.
    #[error("settlement failed: {0}")]
    Settle(String),

    /// The queue was never declared on this broker.
    #[error("queue '{0}' is not declared")]
    UnknownQueue(String),
}
