//! Ingestion orchestrator.
//!
//! Runs the registered source adapters under bounded concurrency, each in
//! its own supervised task with a per-adapter deadline, then aggregates a
//! run result. One adapter's failure never aborts its siblings.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use vigil_db::store::UpdateStore;

use crate::models::{AdapterReport, FetchConfig, RunResult};
use crate::normalise;
use crate::sources::SourceAdapter;

/// Knobs for one ingestion run.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Max items to request per adapter.
    pub limit: usize,
    /// Adapters in flight at once; kept small to respect authority-side
    /// rate limits.
    pub concurrency: usize,
    /// Deadline for one adapter's whole fetch-normalise-store cycle.
    pub adapter_timeout: Duration,
    /// Optional resumption token forwarded to the adapters.
    pub since_cursor: Option<String>,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            limit: 50,
            concurrency: 3,
            adapter_timeout: Duration::from_secs(60),
            since_cursor: None,
        }
    }
}

/// Run every given adapter to completion and aggregate the outcome.
///
/// Adapter failures of any kind — fetch errors, deadline expiry, panics —
/// are converted into failed [`AdapterReport`]s; the run itself always
/// produces a result.
pub async fn run_ingestion(
    adapters: Vec<Arc<dyn SourceAdapter>>,
    store: Arc<dyn UpdateStore>,
    opts: IngestOptions,
) -> RunResult {
    let t0 = std::time::Instant::now();
    info!(
        adapters = adapters.len(),
        limit = opts.limit,
        concurrency = opts.concurrency,
        "starting ingestion run"
    );

    let reports: Vec<AdapterReport> = stream::iter(adapters)
        .map(|adapter| {
            let store = store.clone();
            let opts = opts.clone();
            async move {
                let name = adapter.name();
                let task = tokio::spawn(run_adapter(adapter, store, opts.clone()));
                let abort = task.abort_handle();
                match tokio::time::timeout(opts.adapter_timeout, task).await {
                    Ok(Ok(report)) => report,
                    // The task panicked or was torn down; record, don't propagate.
                    Ok(Err(join_err)) => {
                        AdapterReport::failure(name, format!("adapter task aborted: {join_err}"))
                    }
                    Err(_) => {
                        abort.abort();
                        AdapterReport::failure(
                            name,
                            format!("adapter timed out after {:?}", opts.adapter_timeout),
                        )
                    }
                }
            }
        })
        .buffer_unordered(opts.concurrency.max(1))
        .collect()
        .await;

    let result = RunResult {
        total_fetched: reports.iter().map(|r| r.items_fetched).sum(),
        total_stored: reports.iter().map(|r| r.items_stored).sum(),
        total_skipped: reports.iter().map(|r| r.items_skipped).sum(),
        failed_adapters: reports.iter().filter(|r| !r.succeeded).count(),
        adapters: reports,
        duration_ms: t0.elapsed().as_millis() as u64,
    };

    info!(
        total_fetched = result.total_fetched,
        total_stored = result.total_stored,
        total_skipped = result.total_skipped,
        failed = result.failed_adapters,
        duration_ms = result.duration_ms,
        "ingestion run complete"
    );

    result
}

/// One adapter's full cycle: fetch, normalise each item, upsert.
///
/// Item-level failures are counted and skipped. A dead persistence
/// connection fails the adapter outright instead of grinding through
/// every remaining item.
async fn run_adapter(
    adapter: Arc<dyn SourceAdapter>,
    store: Arc<dyn UpdateStore>,
    opts: IngestOptions,
) -> AdapterReport {
    let name = adapter.name();
    let cfg = FetchConfig {
        limit: opts.limit,
        since_cursor: opts.since_cursor.clone(),
    };

    let batch = match adapter.fetch(&cfg).await {
        Ok(batch) => batch,
        Err(e) => {
            warn!(adapter = name, transient = e.is_transient(), error = %e, "adapter fetch failed");
            return AdapterReport::failure(name, e.to_string());
        }
    };

    let mut report = AdapterReport {
        name: name.to_string(),
        items_fetched: batch.items.len() + batch.skipped,
        items_skipped: batch.skipped,
        items_stored: 0,
        succeeded: true,
        error: None,
    };

    for item in &batch.items {
        let update = match normalise::normalise(adapter.authority(), item) {
            Ok(update) => update,
            Err(e) => {
                report.items_skipped += 1;
                debug!(adapter = name, error = %e, "dropping invalid item");
                continue;
            }
        };

        match store.upsert(&update).await {
            Ok(_) => report.items_stored += 1,
            Err(e) if e.is_connection_failure() => {
                warn!(adapter = name, error = %e, "persistence unreachable, aborting adapter");
                report.succeeded = false;
                report.error = Some(e.to_string());
                break;
            }
            Err(e) => {
                report.items_skipped += 1;
                warn!(
                    adapter = name,
                    source_id = %update.source_id,
                    error = %e,
                    "upsert failed, skipping record"
                );
            }
        }
    }

    info!(
        adapter = name,
        fetched = report.items_fetched,
        stored = report.items_stored,
        skipped = report.items_skipped,
        "adapter finished"
    );

    report
}
