use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use hma_common::{output_schemas, Config, RecordKind};
use hma_query::QueryFacade;
use hma_store::{FsDatasetStore, PgRecordStore};

#[derive(Parser)]
#[command(name = "hma-query", about = "Query content matches and signal datasets")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List matches, optionally only those since an RFC 3339 timestamp
    Matches {
        #[arg(long)]
        since: Option<DateTime<Utc>>,
    },
    /// Match details with signal metadata for one content id
    Match { content_id: String },
    /// Hash recorded for one content id
    Hash { content_id: String },
    /// Per-dataset signal summary
    Signals,
    /// Total and last-24h counts for `hashes` or `matches`
    Counts { kind: RecordKind },
    /// Row count per dataset file
    HashCounts,
    /// Signal rows across all datasets
    SignalTotals,
    /// JSON Schema of each command's output
    Schema,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("hma=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Command::Schema = cli.command {
        return print_json(&output_schemas());
    }

    let config = Config::from_env()?;
    config.log_redacted();

    let records = PgRecordStore::connect(&config.database_url).await?;
    let datasets = FsDatasetStore::new(&config.dataset_root, &config.dataset_folder);
    let facade = QueryFacade::new(
        Arc::new(records),
        Arc::new(datasets),
        config.query_settings(),
    );

    match cli.command {
        Command::Matches { since } => print_json(&facade.list_matches(since).await?),
        Command::Match { content_id } => print_json(&facade.match_details(&content_id).await?),
        Command::Hash { content_id } => print_json(&facade.get_hash(&content_id).await?),
        Command::Signals => print_json(&facade.signal_summary().await?),
        Command::Counts { kind } => print_json(&facade.count_for(kind).await?),
        Command::HashCounts => print_json(&facade.signal_hash_counts().await?),
        Command::SignalTotals => print_json(&facade.signal_totals().await?),
        Command::Schema => print_json(&output_schemas()),
    }?;

    info!("Done");
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
