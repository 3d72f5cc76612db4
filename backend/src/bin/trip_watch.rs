//! Follow one trip from a JSON dataset and print every itinerary view.
//!
//! Each view is written to stdout as one JSON line; user-facing errors go to
//! stderr. The feed runs until `--updates` views were printed or it ends.

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use tripboard::domain::{FeedState, TripFeed, UserId};
use tripboard::inbound::ws::messages::FeedMessage;
use tripboard::inbound::ws::sink::ChannelSink;
use tripboard::outbound::memory::{InMemoryTripStore, load_dataset};

#[derive(Debug, Parser)]
#[command(name = "trip-watch", about = "Print live itinerary views of one trip")]
struct Args {
    /// JSON dataset seeding the store.
    #[arg(long)]
    dataset: PathBuf,
    /// Slug of the trip to follow.
    #[arg(long)]
    slug: String,
    /// Identity to read the trip as.
    #[arg(long)]
    user: String,
    /// Stop after printing this many views.
    #[arg(long)]
    updates: Option<usize>,
}

#[tokio::main]
async fn main() -> io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let args = Args::parse();
    let dataset = load_dataset(&args.dataset).map_err(io::Error::other)?;
    let caller = UserId::new(args.user).map_err(io::Error::other)?;
    let store = InMemoryTripStore::from_dataset(dataset);

    let (sink, mut frames) = ChannelSink::channel();
    let mut feed = TripFeed::new(Arc::new(store)).start(&args.slug, Some(caller), Arc::new(sink));

    let mut printed = 0;
    while let Some(frame) = frames.recv().await {
        match frame {
            FeedMessage::Days { days } => {
                let mut out = io::stdout().lock();
                serde_json::to_writer(&mut out, &days)?;
                writeln!(out)?;
                printed += 1;
                if args.updates.is_some_and(|limit| printed >= limit) {
                    break;
                }
            }
            FeedMessage::Error { error } => eprintln!("error: {error}"),
            FeedMessage::Trip { .. } | FeedMessage::Loading { .. } => {}
        }
    }

    feed.stop();
    feed.finished().await;
    info!(views = printed, "trip watch finished");
    match feed.state() {
        FeedState::Failed(code) => Err(io::Error::other(format!(
            "trip feed failed: {code:?}"
        ))),
        _ => Ok(()),
    }
}
