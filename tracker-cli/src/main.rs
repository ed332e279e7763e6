//! # tradetracker
//!
//! Generates trades, builds positions from stored trades and queries them.

mod apps;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use log::{info, warn};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracker::InstrumentId;
use tracker_core::args::CommonArgs;
use tracker_core::logging;
use tracker_core::repo::SqliteRepo;

#[derive(Parser, Debug)]
#[command(name = "tradetracker", author, version, about = "Tracks trades and the positions built from them")]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate random trades and store them
    Trade {
        /// Number of trades to generate
        num: usize,
        /// Instruments the trades are drawn for
        #[arg(required = true)]
        instrument_ids: Vec<InstrumentId>,
    },
    /// Rebuild the positions of an instrument from its stored trades
    Position {
        instrument_id: InstrumentId,
        /// Replay trades from this RFC3339 timestamp onwards
        #[arg(default_value = "2000-01-01T00:00:00Z")]
        timestamp: DateTime<Utc>,
    },
    /// Show the position of an instrument at a point in time
    Query {
        instrument_id: InstrumentId,
        /// RFC3339 timestamp, defaults to now
        timestamp: Option<DateTime<Utc>>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    cli.common.validate()?;
    logging::init(cli.common.get_log_level());
    info!(
        "=== tradetracker starting env={} database={} ===",
        cli.common.get_env(),
        cli.common.get_database().display()
    );

    let repo = Arc::new(SqliteRepo::open(cli.common.get_database()).context("open database failed")?);

    // Ctrl-C cancels whatever command is running.
    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, shutting down");
            interrupt.cancel();
        }
    });

    match cli.command {
        Command::Trade {
            num,
            instrument_ids,
        } => apps::trade::run(repo, num, instrument_ids, &cancel).await,
        Command::Position {
            instrument_id,
            timestamp,
        } => {
            let bucket_width = cli.common.get_bucket_width();
            apps::position::run(repo, instrument_id, timestamp, bucket_width, &cancel).await
        }
        Command::Query {
            instrument_id,
            timestamp,
        } => apps::query::run(repo.as_ref(), instrument_id, timestamp.unwrap_or_else(Utc::now))
            .await
            .map(|_| ()),
    }
}
