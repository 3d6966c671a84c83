//! Enrichment entry point.
//!
//! Run with: cargo run --bin vigil-enrich -- --batch 100
//!
//! Exit code equals the number of persist failures during the pass
//! (capped); fetch and parse skips are expected and stay at zero.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use vigil_common::sandbox::SandboxClient;
use vigil_common::settings::Settings;
use vigil_db::pg::PgStore;
use vigil_ingestion::enrich::{run_enrichment, EnrichOptions};

const MAX_EXIT_CODE: usize = 100;

#[derive(Parser, Debug)]
#[command(
    name = "vigil-enrich",
    about = "Fetch source pages for stored updates that lack body content"
)]
struct Args {
    /// Max candidate records per pass.
    #[arg(long, default_value_t = 100)]
    batch: usize,

    /// Page fetches in flight at once.
    #[arg(long, default_value_t = 3)]
    concurrency: usize,

    /// Per-fetch timeout in seconds.
    #[arg(long, default_value_t = 20)]
    timeout: u64,
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

    let client = SandboxClient::with_timeout(Duration::from_secs(args.timeout))?;
    let opts = EnrichOptions {
        batch: args.batch,
        concurrency: args.concurrency,
        fetch_timeout: Duration::from_secs(args.timeout),
    };

    let report = run_enrichment(Arc::new(store), &client, opts).await?;

    println!(
        "enrichment pass: {} candidates, {} enriched, {} skipped, {} errors ({} ms)",
        report.candidates,
        report.enriched,
        report.skipped,
        report.errors.len(),
        report.duration_ms
    );
    for error in &report.errors {
        println!("  persist failure: {error}");
    }

    if !report.errors.is_empty() {
        std::process::exit(report.errors.len().min(MAX_EXIT_CODE) as i32);
    }
    Ok(())
}
