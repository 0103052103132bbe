//! The publisher: routes feed rows to per-channel queues at a fixed pace.
//!
//! One long-lived broker connection is reused across the whole run. A
//! publish failure surfaces after the adapter's bounded reconnect policy is
//! exhausted and terminates the run - messages are never silently dropped.

use std::time::Duration;

use tracing::info;

use pitwatch_adapters::{Broker, BrokerError};
use pitwatch_types::{wire, Reading};

use crate::feed::FeedRow;

/// Publish every reading in `rows` to its channel's queue, sleeping `pace`
/// between successive rows to simulate real-time arrival.
///
/// The pace is a simulation knob, not a delivery-contract requirement.
/// Returns the number of messages sent.
pub async fn run(broker: &dyn Broker, rows: &[FeedRow], pace: Duration) -> Result<u64, BrokerError> {
    let mut sent = 0u64;
    for (index, row) in rows.iter().enumerate() {
        for (channel, value) in &row.readings {
            let body = wire::encode(&Reading::new(row.at, *value));
            broker.publish(channel.queue_name(), body.as_bytes()).await?;
            info!(queue = channel.queue_name(), body = %body, "sent reading");
            sent += 1;
        }
        // No trailing sleep after the final row.
        if index + 1 < rows.len() && !pace.is_zero() {
            tokio::time::sleep(pace).await;
        }
    }
    Ok(sent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pitwatch_adapters::memory::MemoryBroker;
    use pitwatch_types::{Channel, Moment};

    fn rows() -> Vec<FeedRow> {
        let start = Moment::parse("07/04/2024 08:00").unwrap();
        vec![
            FeedRow {
                at: start,
                readings: vec![(Channel::Smoker, 248.5)],
            },
            FeedRow {
                at: start.plus_minutes(1),
                readings: vec![
                    (Channel::Smoker, 247.0),
                    (Channel::FoodA, 120.0),
                    (Channel::FoodB, 85.5),
                ],
            },
            FeedRow {
                at: start.plus_minutes(2),
                readings: vec![],
            },
        ]
    }

    async fn broker_with_queues() -> MemoryBroker {
        let broker = MemoryBroker::new();
        for channel in Channel::ALL {
            broker.declare_queue(channel.queue_name()).await.unwrap();
        }
        broker
    }

    #[tokio::test]
    async fn test_routes_readings_to_their_queues() {
        let broker = broker_with_queues().await;
        let sent = run(&broker, &rows(), Duration::ZERO).await.unwrap();

        assert_eq!(sent, 4);
        assert_eq!(broker.depth(Channel::Smoker.queue_name()), Some(2));
        assert_eq!(broker.depth(Channel::FoodA.queue_name()), Some(1));
        assert_eq!(broker.depth(Channel::FoodB.queue_name()), Some(1));
    }

    #[tokio::test]
    async fn test_published_bodies_are_wire_encoded() {
        let broker = broker_with_queues().await;
        run(&broker, &rows()[..1], Duration::ZERO).await.unwrap();

        let mut sub = broker.subscribe(Channel::Smoker.queue_name(), "t").await.unwrap();
        let delivery = sub.next().await.unwrap().unwrap();
        assert_eq!(delivery.payload(), b"07/04/2024 08:00, 248.5");
        delivery.ack().await.unwrap();
    }

    #[tokio::test]
    async fn test_publish_failure_is_fatal() {
        // Queues never declared: the first publish errors and the run stops.
        let broker = MemoryBroker::new();
        let err = run(&broker, &rows(), Duration::ZERO).await.unwrap_err();
        assert!(matches!(err, BrokerError::UnknownQueue(_)));
    }

    #[tokio::test]
    async fn test_empty_feed_sends_nothing() {
        let broker = broker_with_queues().await;
        let sent = run(&broker, &[], Duration::ZERO).await.unwrap();
        assert_eq!(sent, 0);
    }
}
