//! Quality report entry point.
//!
//! Run with: cargo run --bin vigil-quality

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use vigil_common::settings::Settings;
use vigil_db::pg::PgStore;
use vigil_ingestion::quality::quality_report;

#[derive(Parser, Debug)]
#[command(
    name = "vigil-quality",
    about = "Print data-quality percentages for the stored updates"
)]
struct Args {}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let _args = Args::parse();
    let settings = Settings::from_env()?;

    let store = PgStore::connect(&settings.database_url).await?;
    store.ensure_schema().await?;

    let report = quality_report(Arc::new(store)).await?;
    print!("{report}");

    Ok(())
}
