//! The bounded sliding-window alerting engine.
//!
//! A [`Window`] holds the most recent `capacity` readings for one channel
//! and re-evaluates its [`AlertRule`] after every insertion once full. It is
//! owned exclusively by one monitor worker instance; nothing here is shared
//! or synchronized.

use std::collections::VecDeque;
use std::fmt;

use crate::channel::Channel;
use crate::reading::Reading;

/// Result of pushing one reading into a [`Window`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertStatus {
    /// The window has fewer than `capacity` readings; the rule was not
    /// evaluated. An alert can never fire on a partially filled window.
    NotFull,
    /// The window is full and the rule did not match.
    NoAlert,
    /// The window is full and the rule matched.
    Alert(AlertReason),
}

/// Why an alert fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertReason {
    /// The value dropped by at least the decline threshold between the
    /// oldest and newest reading in the window.
    RapidDecline,
    /// Every value in the window sits inside the stagnation band.
    Stagnation,
}

impl fmt::Display for AlertReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertReason::RapidDecline => f.write_str("rapid decline"),
            AlertReason::Stagnation => f.write_str("stagnation"),
        }
    }
}

/// A pure pattern-detection rule over a full window.
///
/// Both thresholds are inclusive at the boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AlertRule {
    /// Fire when `oldest.value - newest.value >= threshold`. Only the two
    /// endpoints of the window are examined; the series in between may be
    /// monotonic or noisy.
    Decline { threshold: f64 },
    /// Fire when `max(values) - min(values) <= band`.
    Stagnation { band: f64 },
}

impl AlertRule {
    /// Evaluate the rule over a full window's readings.
    ///
    /// Pure and total: a well-formed full window always yields a verdict.
    fn evaluate(&self, readings: &VecDeque<Reading>) -> Option<AlertReason> {
        match *self {
            AlertRule::Decline { threshold } => {
                let oldest = readings.front()?;
                let newest = readings.back()?;
                if oldest.value - newest.value >= threshold {
                    Some(AlertReason::RapidDecline)
                } else {
                    None
                }
            }
            AlertRule::Stagnation { band } => {
                let mut values = readings.iter().map(|r| r.value);
                let first = values.next()?;
                let (min, max) = values.fold((first, first), |(min, max), v| {
                    (min.min(v), max.max(v))
                });
                if max - min <= band {
                    Some(AlertReason::Stagnation)
                } else {
                    None
                }
            }
        }
    }
}

/// Fixed-capacity trailing sequence of the most recent readings for one
/// channel, evaluated after each insertion.
///
/// Invariants:
/// - `len() <= capacity` always
/// - once full, every push evicts exactly the oldest reading (strict
///   sliding; the window never resets)
/// - the rule is evaluated on every push once full, not only when the
///   window first fills
#[derive(Debug, Clone)]
pub struct Window {
    capacity: usize,
    rule: AlertRule,
    readings: VecDeque<Reading>,
}

impl Window {
    /// Create a window with an explicit capacity and rule.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero: a zero-capacity window could never
    /// hold the reading being pushed, let alone satisfy `len <= capacity`.
    pub fn new(capacity: usize, rule: AlertRule) -> Self {
        assert!(capacity >= 1, "window capacity must be at least 1");
        Self {
            capacity,
            rule,
            readings: VecDeque::with_capacity(capacity),
        }
    }

    /// Create the window the registry prescribes for `channel`.
    pub fn for_channel(channel: Channel) -> Self {
        Self::new(channel.capacity(), channel.rule())
    }

    /// Number of readings currently held.
    pub fn len(&self) -> usize {
        self.readings.len()
    }

    /// True while no reading has been pushed.
    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// True once `capacity` readings are held.
    pub fn is_full(&self) -> bool {
        self.readings.len() == self.capacity
    }

    /// Append a reading, evicting the oldest if the window is already full,
    /// then evaluate the rule.
    ///
    /// The caller is responsible for feeding readings in timestamp order;
    /// the window does not re-order.
    pub fn push(&mut self, reading: Reading) -> AlertStatus {
        if self.readings.len() == self.capacity {
            self.readings.pop_front();
        }
        self.readings.push_back(reading);
        self.evaluate()
    }

    /// Re-evaluate the rule over the current contents without pushing.
    ///
    /// Idempotent: evaluating the same window twice yields the same status.
    pub fn evaluate(&self) -> AlertStatus {
        if !self.is_full() {
            return AlertStatus::NotFull;
        }
        match self.rule.evaluate(&self.readings) {
            Some(reason) => AlertStatus::Alert(reason),
            None => AlertStatus::NoAlert,
        }
    }
}
