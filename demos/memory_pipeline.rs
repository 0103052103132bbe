//! End-to-end pipeline over the in-process broker.
//!
//! Publishes a declining smoker series through a memory queue, runs one
//! monitor worker against it, and prints the alert the window engine
//! raises. No RabbitMQ required:
//!
//! ```bash
//! cargo run --example memory_pipeline
//! ```

use std::sync::Arc;
use std::time::Duration;

use pitwatch::feed::FeedRow;
use pitwatch::monitor::{self, ChannelSink};
use pitwatch::publish;
use pitwatch_adapters::{memory::MemoryBroker, Broker};
use pitwatch_types::{Channel, Moment};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().init();

    let broker = MemoryBroker::new();
    broker.declare_queue(Channel::Smoker.queue_name()).await?;

    // Smoker dropping 16 degrees across the five-reading window.
    let start = Moment::parse("07/04/2024 08:00")?;
    let temps = [248.0, 245.0, 240.0, 236.0, 232.0];
    let rows: Vec<FeedRow> = temps
        .iter()
        .enumerate()
        .map(|(i, temp)| FeedRow {
            at: start.plus_minutes(i as i64),
            readings: vec![(Channel::Smoker, *temp)],
        })
        .collect();

    let shared: Arc<dyn Broker> = Arc::new(broker);
    let (mut alerts, sink) = ChannelSink::create();
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

    let worker = tokio::spawn(monitor::run(
        Arc::clone(&shared),
        Channel::Smoker,
        sink,
        async move {
            let _ = stop_rx.await;
        },
    ));

    publish::run(shared.as_ref(), &rows, Duration::ZERO).await?;

    let alert = alerts.recv().await.expect("worker emits one alert");
    println!(
        "ALERT on {}: {} at {} ({}F)",
        alert.channel, alert.reason, alert.reading.at, alert.reading.value
    );

    let _ = stop_tx.send(());
    worker.await??;
    Ok(())
}
