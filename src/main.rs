// Binary includes library modules - some public API items are only for library consumers
#![allow(unused)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};

mod feed;
mod monitor;
mod pacing;
mod publish;

use monitor::LogSink;
use pitwatch_adapters::{amqp::AmqpBroker, Broker};
use pitwatch_types::Channel;

#[derive(Parser, Debug)]
#[command(name = "pitwatch")]
#[command(about = "Sliding-window temperature alerting over durable per-sensor queues")]
struct Args {
    /// AMQP broker URI
    #[arg(long, global = true, default_value = "amqp://localhost:5672/%2f")]
    broker: String,

    /// Mid-run reconnect attempts before a connection failure is fatal
    #[arg(long, global = true, default_value = "5")]
    reconnect_attempts: u32,

    /// Base reconnect backoff, doubled per attempt (e.g. "1s", "500ms")
    #[arg(long, global = true, default_value = "1s")]
    reconnect_backoff: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay the CSV feed into the per-channel queues at a fixed pace
    Publish {
        /// Path to the feed file
        #[arg(short, long, default_value = "smoker-temps.csv")]
        file: PathBuf,

        /// Delay between successive feed rows (e.g. "30s", "0s")
        #[arg(short, long, default_value = "30s")]
        pace: String,
    },

    /// Run one monitor worker for a channel. Start one instance per
    /// channel; extra instances split the stream and fragment the window.
    Monitor {
        /// Channel to monitor
        #[arg(short, long, value_enum)]
        channel: ChannelArg,
    },

    /// Delete and redeclare every queue, discarding stale backlog.
    /// Destructive: run only as a designated initializer before a session.
    Reset,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ChannelArg {
    Smoker,
    FoodA,
    FoodB,
}

impl From<ChannelArg> for Channel {
    fn from(arg: ChannelArg) -> Self {
        match arg {
            ChannelArg::Smoker => Channel::Smoker,
            ChannelArg::FoodA => Channel::FoodA,
            ChannelArg::FoodB => Channel::FoodB,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let backoff =
        pacing::parse_duration(&args.reconnect_backoff).context("invalid --reconnect-backoff")?;
    let broker = AmqpBroker::builder()
        .uri(&args.broker)
        .reconnect(args.reconnect_attempts, backoff)
        .build()
        .await
        .context("verify the broker is running and reachable")?;
    let broker: Arc<dyn Broker> = Arc::new(broker);

    match args.command {
        Command::Publish { file, pace } => {
            let pace = pacing::parse_duration(&pace).context("invalid --pace")?;
            for channel in Channel::ALL {
                broker.declare_queue(channel.queue_name()).await?;
            }
            // Informational only; the console is not part of the contract.
            info!("broker console (if management plugin enabled): http://localhost:15672/#/queues");

            let rows = feed::read_feed(&file)
                .with_context(|| format!("reading feed {}", file.display()))?;
            info!(rows = rows.len(), pace_secs = pace.as_secs_f64(), "publishing feed");
            let sent = publish::run(broker.as_ref(), &rows, pace).await?;
            info!(sent, "feed complete");
        }

        Command::Monitor { channel } => {
            let channel = Channel::from(channel);
            // Ensure-exists declare; never destructive from a worker.
            broker.declare_queue(channel.queue_name()).await?;

            let shutdown = async {
                let _ = tokio::signal::ctrl_c().await;
            };
            monitor::run(Arc::clone(&broker), channel, LogSink, shutdown).await?;
        }

        Command::Reset => {
            for channel in Channel::ALL {
                broker.reset_queue(channel.queue_name()).await?;
                warn!(queue = channel.queue_name(), "queue reset, backlog discarded");
            }
        }
    }

    Ok(())
}
