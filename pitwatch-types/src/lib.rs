//! # pitwatch-types
//!
//! Core types for pit telemetry alerting. This crate defines the pure,
//! I/O-free vocabulary shared by the publisher and the monitor workers:
//! timestamped readings, the static channel registry, the text wire codec,
//! and the sliding-window alerting engine.
//!
//! ## Design Goals
//!
//! - **Pure logic**: no broker, no filesystem, no clock - everything here is
//!   deterministic and unit-testable in isolation
//! - **Static registry**: channels, queue names, window capacities, and alert
//!   rules are fixed at compile time; there is no runtime reconfiguration
//! - **Optional serialization**: enable the `serde` feature to derive
//!   `Serialize`/`Deserialize` on the core types
//!
//! ## Example
//!
//! ```rust
//! use pitwatch_types::{AlertStatus, Channel, Moment, Reading, Window};
//!
//! let mut window = Window::for_channel(Channel::Smoker);
//! let start = Moment::parse("07/04/2024 08:00").unwrap();
//!
//! // The rule never fires on a partially filled window.
//! for (i, temp) in [230.0, 228.5, 227.0, 226.0].iter().enumerate() {
//!     let reading = Reading::new(start.plus_minutes(i as i64), *temp);
//!     assert_eq!(window.push(reading), AlertStatus::NotFull);
//! }
//!
//! // The fifth reading fills the window; from here on every push evaluates.
//! let reading = Reading::new(start.plus_minutes(4), 225.5);
//! assert_eq!(window.push(reading), AlertStatus::NoAlert);
//! ```

mod channel;
mod moment;
mod reading;
pub mod wire;
mod window;

pub use channel::Channel;
pub use moment::{Moment, MomentError, WIRE_TIME_FORMAT};
pub use reading::Reading;
pub use window::{AlertReason, AlertRule, AlertStatus, Window};
