//! # pitwatch
//!
//! Sliding-window temperature alerting over durable per-sensor message
//! queues. A publisher replays a CSV feed of smoker and food-probe readings
//! into one durable queue per channel at a fixed real-time pace; independent
//! monitor workers consume their channel's queue, maintain a bounded
//! trailing window of readings, and raise an alert when the window matches a
//! pattern (rapid decline, or prolonged stagnation).
//!
//! ## Architecture
//!
//! ```text
//! feed (CSV) ──▶ publisher ──▶ broker (durable queues, ack-gated)
//!                                  │ 01-smoker   02-food-A   03-food-B
//!                                  ▼
//!                            monitor worker (per channel)
//!                                  │ decode ▶ window push ▶ rule ▶ ack
//!                                  ▼
//!                              alert sink (log / channel)
//! ```
//!
//! - **[`feed`]**: parses the ordered source table of readings
//! - **[`publish`]**: routes readings to queues at a fixed pace over one
//!   long-lived broker connection
//! - **[`monitor`]**: the worker receive loop - decode, window update, rule
//!   evaluation, alert emission, acknowledgment
//! - **[`pacing`]**: human-friendly duration parsing for CLI flags
//!
//! The pure window engine, channel registry, and wire codec live in
//! `pitwatch-types`; the broker adapters (RabbitMQ via lapin, plus an
//! in-process adapter for tests) live in `pitwatch-adapters`.
//!
//! ## Delivery semantics
//!
//! Processing is at-least-once: a worker acknowledges a message only after
//! the window update and rule evaluation complete, so a crash before the
//! ack redelivers the message to another instance. The delivery layer
//! supports competing consumers per queue, but the window semantics assume
//! a single active instance per channel - extra instances each see only a
//! fragment of the stream.

pub mod feed;
pub mod monitor;
pub mod pacing;
pub mod publish;

pub use feed::{read_feed, FeedError, FeedRow};
pub use monitor::{Alert, AlertSink, ChannelSink, LogSink, Worker};
