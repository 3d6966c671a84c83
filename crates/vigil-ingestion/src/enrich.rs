//! Content enrichment worker.
//!
//! Selects stored records that still lack body text, re-fetches their
//! source pages, and extracts readable paragraphs. Any fetch or parse
//! trouble leaves the record untouched so a later pass can retry it.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use scraper::{Html, Selector};
use tracing::{debug, info, warn};

use vigil_common::sandbox::SandboxClient;
use vigil_common::Result;
use vigil_db::schema::{
    truncate_with_marker, RegulatoryUpdate, MAX_CONTENT_LEN, MAX_DESCRIPTION_LEN,
};
use vigil_db::store::UpdateStore;

use crate::models::EnrichmentReport;

/// Paragraphs shorter than this are navigation or boilerplate.
pub const MIN_PARAGRAPH_LEN: usize = 80;
/// At most this many qualifying paragraphs are kept as content.
pub const MAX_PARAGRAPHS: usize = 10;
/// Response bodies shorter than this are error pages, not documents.
pub const MIN_BODY_LEN: usize = 256;

/// Knobs for one enrichment pass.
#[derive(Debug, Clone)]
pub struct EnrichOptions {
    /// Max candidate records per pass.
    pub batch: usize,
    /// Page fetches in flight at once.
    pub concurrency: usize,
    /// Deadline per page fetch.
    pub fetch_timeout: Duration,
}

impl Default for EnrichOptions {
    fn default() -> Self {
        Self {
            batch: 100,
            concurrency: 3,
            fetch_timeout: Duration::from_secs(20),
        }
    }
}

/// Readable text pulled out of one fetched page.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    /// First qualifying paragraph; becomes the description fallback.
    pub lead: String,
    /// Qualifying paragraphs joined, bounded by `MAX_CONTENT_LEN`.
    pub content: String,
}

/// Collect paragraph blocks of at least [`MIN_PARAGRAPH_LEN`] characters
/// and keep the first [`MAX_PARAGRAPHS`] of them. `None` when the page
/// has no qualifying block at all.
pub fn extract_readable_text(html: &str) -> Option<Extraction> {
    let document = Html::parse_document(html);
    let paragraph = Selector::parse("p").unwrap();

    let blocks: Vec<String> = document
        .select(&paragraph)
        .map(|p| {
            p.text()
                .collect::<String>()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|text| text.chars().count() >= MIN_PARAGRAPH_LEN)
        .take(MAX_PARAGRAPHS)
        .collect();

    let first = blocks.first()?;
    let lead: String = first.chars().take(MAX_DESCRIPTION_LEN).collect();
    let content = truncate_with_marker(&blocks.join("\n\n"), MAX_CONTENT_LEN);
    Some(Extraction { lead, content })
}

/// Apply one extraction to a stored record. The description fallback only
/// fires when the record had none; content is always set — the store's
/// merge rule is what protects previously enriched records.
pub fn apply_extraction(record: &RegulatoryUpdate, extraction: Extraction) -> RegulatoryUpdate {
    let mut enriched = record.clone();
    if enriched.description.as_deref().map_or(true, str::is_empty) {
        enriched.description = Some(extraction.lead);
    }
    enriched.content = Some(extraction.content);
    enriched.authority_verified = true;
    enriched.cost_data_available = false;
    enriched
}

enum Outcome {
    Enriched,
    Skipped,
    Failed(String),
}

/// Run one enrichment pass over the store.
pub async fn run_enrichment(
    store: Arc<dyn UpdateStore>,
    client: &SandboxClient,
    opts: EnrichOptions,
) -> Result<EnrichmentReport> {
    let t0 = std::time::Instant::now();
    let candidates = store.pending_enrichment(opts.batch as i64).await?;
    info!(candidates = candidates.len(), "starting enrichment pass");

    let outcomes: Vec<Outcome> = stream::iter(candidates)
        .map(|record| {
            let store = store.clone();
            let client = client.clone();
            let timeout = opts.fetch_timeout;
            async move { enrich_one(&record, store, &client, timeout).await }
        })
        .buffer_unordered(opts.concurrency.max(1))
        .collect()
        .await;

    let mut report = EnrichmentReport {
        candidates: outcomes.len(),
        enriched: 0,
        skipped: 0,
        errors: Vec::new(),
        duration_ms: 0,
    };
    for outcome in outcomes {
        match outcome {
            Outcome::Enriched => report.enriched += 1,
            Outcome::Skipped => report.skipped += 1,
            Outcome::Failed(e) => report.errors.push(e),
        }
    }
    report.duration_ms = t0.elapsed().as_millis() as u64;

    info!(
        enriched = report.enriched,
        skipped = report.skipped,
        errors = report.errors.len(),
        duration_ms = report.duration_ms,
        "enrichment pass complete"
    );
    Ok(report)
}

/// Fetch and extract one candidate. Every early return leaves the record
/// exactly as it was, still eligible for the next pass.
async fn enrich_one(
    record: &RegulatoryUpdate,
    store: Arc<dyn UpdateStore>,
    client: &SandboxClient,
    fetch_timeout: Duration,
) -> Outcome {
    let request = match client.get(&record.source_url) {
        Ok(r) => r,
        Err(e) => {
            debug!(source_id = %record.source_id, error = %e, "source URL not fetchable");
            return Outcome::Skipped;
        }
    };

    let resp = match tokio::time::timeout(fetch_timeout, request.send()).await {
        Ok(Ok(resp)) => resp,
        Ok(Err(e)) => {
            debug!(source_id = %record.source_id, error = %e, "enrichment fetch failed");
            return Outcome::Skipped;
        }
        Err(_) => {
            debug!(source_id = %record.source_id, "enrichment fetch timed out");
            return Outcome::Skipped;
        }
    };

    if !resp.status().is_success() {
        debug!(source_id = %record.source_id, status = %resp.status(), "non-success page status");
        return Outcome::Skipped;
    }

    let body = match tokio::time::timeout(fetch_timeout, resp.text()).await {
        Ok(Ok(body)) => body,
        _ => {
            debug!(source_id = %record.source_id, "page body read failed");
            return Outcome::Skipped;
        }
    };
    if body.len() < MIN_BODY_LEN {
        debug!(source_id = %record.source_id, len = body.len(), "page body too short");
        return Outcome::Skipped;
    }

    let Some(extraction) = extract_readable_text(&body) else {
        debug!(source_id = %record.source_id, "no qualifying paragraphs");
        return Outcome::Skipped;
    };

    let enriched = apply_extraction(record, extraction);
    match store.upsert(&enriched).await {
        Ok(_) => {
            debug!(source_id = %record.source_id, "record enriched");
            Outcome::Enriched
        }
        Err(e) => {
            warn!(source_id = %record.source_id, error = %e, "enrichment persist failed");
            Outcome::Failed(format!("{}: {e}", record.source_id))
        }
    }
}
