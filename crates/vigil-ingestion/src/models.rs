//! Data models for the ingestion pipeline.

use serde::{Deserialize, Serialize};

/// An item as one adapter saw it on the wire, before normalization.
/// Everything is optional here; the normalizer decides what is fatal.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawItem {
    /// Source-native identifier (K number, recall number, slug, guid).
    pub native_id: Option<String>,
    pub title: Option<String>,
    pub category: Option<String>,
    pub jurisdiction: Option<String>,
    /// Publication date as the source printed it; coerced later.
    pub published: Option<String>,
    pub url: Option<String>,
    pub summary: Option<String>,
}

/// Options recognized by every adapter.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Max items to request from the source.
    pub limit: usize,
    /// Optional resumption token (ISO date lower bound).
    pub since_cursor: Option<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            limit: 50,
            since_cursor: None,
        }
    }
}

/// What one adapter produced: the items it could read, plus a count of
/// the malformed entries it skipped over.
#[derive(Debug, Clone, Default)]
pub struct FetchBatch {
    pub items: Vec<RawItem>,
    pub skipped: usize,
}

/// Per-adapter outcome of one ingestion run.
#[derive(Debug, Clone, Serialize)]
pub struct AdapterReport {
    pub name: String,
    /// Raw entries seen at the source, including ones later dropped.
    pub items_fetched: usize,
    /// Malformed, invalid, or unpersistable entries.
    pub items_skipped: usize,
    pub items_stored: usize,
    pub succeeded: bool,
    pub error: Option<String>,
}

impl AdapterReport {
    pub fn failure(name: &str, error: String) -> Self {
        Self {
            name: name.to_string(),
            items_fetched: 0,
            items_skipped: 0,
            items_stored: 0,
            succeeded: false,
            error: Some(error),
        }
    }
}

/// Aggregate result of one ingestion run.
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub total_fetched: usize,
    pub total_stored: usize,
    pub total_skipped: usize,
    pub failed_adapters: usize,
    pub adapters: Vec<AdapterReport>,
    pub duration_ms: u64,
}

/// Aggregate result of one enrichment pass.
#[derive(Debug, Clone, Serialize)]
pub struct EnrichmentReport {
    pub candidates: usize,
    pub enriched: usize,
    /// Fetch or parse trouble; these records stay eligible for the next pass.
    pub skipped: usize,
    /// Persist failures, one message per record.
    pub errors: Vec<String>,
    pub duration_ms: u64,
}
