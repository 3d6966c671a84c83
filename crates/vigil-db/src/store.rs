//! The store seam shared by the orchestrator, the enrichment worker, and
//! the quality reporter.

use async_trait::async_trait;
use vigil_common::Result;

use crate::schema::{Authority, QualitySlice, RegulatoryUpdate, UpsertOutcome};

#[async_trait]
pub trait UpdateStore: Send + Sync {
    /// Insert or merge one canonical update, keyed by `(authority, source_id)`.
    ///
    /// Insert writes every field. Update refreshes everything except `id`,
    /// the key, and `captured_at`; `content` and `authority_verified` are
    /// left untouched when the stored content is already non-empty, so a
    /// later ingestion pass can never regress enrichment. Atomic per key.
    async fn upsert(&self, update: &RegulatoryUpdate) -> Result<UpsertOutcome>;

    /// Records with empty content and a non-empty source URL, oldest
    /// capture first, capped at `limit`.
    async fn pending_enrichment(&self, limit: i64) -> Result<Vec<RegulatoryUpdate>>;

    /// Per (category, jurisdiction) quality counters.
    async fn quality_slices(&self) -> Result<Vec<QualitySlice>>;

    /// Total stored records.
    async fn count(&self) -> Result<i64>;

    /// Lookup by natural key.
    async fn find(
        &self,
        authority: Authority,
        source_id: &str,
    ) -> Result<Option<RegulatoryUpdate>>;
}
