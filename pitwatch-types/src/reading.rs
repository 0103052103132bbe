//! A single timestamped sensor reading.

use crate::Moment;

/// One temperature reading from one channel's sensor.
///
/// Readings are immutable once created; the window engine only ever copies
/// them. Timestamps are expected to arrive monotonically non-decreasing per
/// channel - out-of-order input is a data-quality problem upstream, not
/// something the engine corrects.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Reading {
    /// When the sensor was sampled.
    pub at: Moment,
    /// The measured value, degrees Fahrenheit in the reference deployment.
    pub value: f64,
}

impl Reading {
    /// Create a new reading.
    pub fn new(at: Moment, value: f64) -> Self {
        Self { at, value }
    }
}
