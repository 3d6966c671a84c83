//! Ingestion entry point.
//!
//! Run with: cargo run --bin vigil-ingest -- --limit 50 [ADAPTER ...]
//!
//! Exit code equals the number of failed adapters (capped), so schedulers
//! and the portal trigger can tell a clean run from a degraded one.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use vigil_common::sandbox::SandboxClient;
use vigil_common::settings::Settings;
use vigil_db::pg::PgStore;
use vigil_ingestion::pipeline::{run_ingestion, IngestOptions};
use vigil_ingestion::sources::select_adapters;

const MAX_EXIT_CODE: usize = 100;

#[derive(Parser, Debug)]
#[command(
    name = "vigil-ingest",
    about = "Ingest regulatory updates from the configured authorities"
)]
struct Args {
    /// Max items to request per adapter.
    #[arg(long, default_value_t = 50)]
    limit: usize,

    /// Adapters in flight at once.
    #[arg(long, default_value_t = 3)]
    concurrency: usize,

    /// Per-adapter timeout in seconds.
    #[arg(long, default_value_t = 60)]
    timeout: u64,

    /// Resumption token (ISO date) forwarded to the adapters.
    #[arg(long)]
    since: Option<String>,

    /// Adapter names to run; all when empty.
    adapters: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let settings = Settings::from_env()?;

    let store = PgStore::connect(&settings.database_url).await?;
    store.ensure_schema().await?;

    let client = SandboxClient::new()?;
    let adapters = select_adapters(&client, &args.adapters)?;

    let opts = IngestOptions {
        limit: args.limit,
        concurrency: args.concurrency,
        adapter_timeout: Duration::from_secs(args.timeout),
        since_cursor: args.since,
    };

    let result = run_ingestion(adapters, Arc::new(store), opts).await;

    println!("run finished in {} ms", result.duration_ms);
    for report in &result.adapters {
        match &report.error {
            None => println!(
                "  {:<14} fetched {:>4}  stored {:>4}  skipped {:>3}",
                report.name, report.items_fetched, report.items_stored, report.items_skipped
            ),
            Some(e) => println!("  {:<14} FAILED: {e}", report.name),
        }
    }
    println!(
        "total: fetched {}, stored {}, skipped {}, {} adapter(s) failed",
        result.total_fetched, result.total_stored, result.total_skipped, result.failed_adapters
    );

    if result.failed_adapters > 0 {
        std::process::exit(result.failed_adapters.min(MAX_EXIT_CODE) as i32);
    }
    Ok(())
}
