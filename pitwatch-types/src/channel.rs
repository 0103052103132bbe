//! The static channel registry.
//!
//! Every sensor channel is statically bound to a durable queue name, a
//! window capacity, and an alert rule. The registry never mutates at
//! runtime: the publisher uses it to route feed columns to queues, and each
//! monitor worker uses it to construct its window engine.

use std::fmt;

use crate::window::AlertRule;

/// A named category of sensor readings with its own queue, window capacity,
/// and alert rule.
///
/// Capacities are a proxy for a fixed trailing duration: readings arrive at
/// a 30-second cadence, so 5 readings cover 2.5 minutes (smoker) and 20
/// readings cover 10 minutes (food probes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Channel {
    /// The smoker chamber probe, watched for rapid temperature decline.
    Smoker,
    /// Food probe A, watched for temperature stagnation (the stall).
    FoodA,
    /// Food probe B, watched for temperature stagnation.
    FoodB,
}

impl Channel {
    /// All channels, in feed-column order.
    pub const ALL: [Channel; 3] = [Channel::Smoker, Channel::FoodA, Channel::FoodB];

    /// The durable queue this channel publishes to and consumes from.
    pub fn queue_name(self) -> &'static str {
        match self {
            Channel::Smoker => "01-smoker",
            Channel::FoodA => "02-food-A",
            Channel::FoodB => "03-food-B",
        }
    }

    /// Maximum number of readings retained in this channel's window.
    pub fn capacity(self) -> usize {
        match self {
            Channel::Smoker => 5,
            Channel::FoodA | Channel::FoodB => 20,
        }
    }

    /// The pattern-detection rule evaluated over this channel's window.
    pub fn rule(self) -> AlertRule {
        match self {
            Channel::Smoker => AlertRule::Decline { threshold: 15.0 },
            Channel::FoodA | Channel::FoodB => AlertRule::Stagnation { band: 1.0 },
        }
    }

    /// Short human-readable label used in logs.
    pub fn label(self) -> &'static str {
        match self {
            Channel::Smoker => "smoker",
            Channel::FoodA => "food-A",
            Channel::FoodB => "food-B",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_names_are_fixed() {
        assert_eq!(Channel::Smoker.queue_name(), "01-smoker");
        assert_eq!(Channel::FoodA.queue_name(), "02-food-A");
        assert_eq!(Channel::FoodB.queue_name(), "03-food-B");
    }

    #[test]
    fn test_capacities_match_trailing_durations() {
        // 2.5 min and 10 min at one reading per 30 seconds.
        assert_eq!(Channel::Smoker.capacity(), 5);
        assert_eq!(Channel::FoodA.capacity(), 20);
        assert_eq!(Channel::FoodB.capacity(), 20);
    }

    #[test]
    fn test_rules_per_channel() {
        assert_eq!(Channel::Smoker.rule(), AlertRule::Decline { threshold: 15.0 });
        assert_eq!(Channel::FoodA.rule(), AlertRule::Stagnation { band: 1.0 });
        assert_eq!(Channel::FoodB.rule(), AlertRule::Stagnation { band: 1.0 });
    }

    #[test]
    fn test_all_covers_every_channel() {
        assert_eq!(Channel::ALL.len(), 3);
        assert_eq!(Channel::ALL[0], Channel::Smoker);
    }
}
