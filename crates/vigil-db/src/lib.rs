//! vigil-db — deduplicated persistence for canonical regulatory updates.
//!
//! The natural key is `(authority, source_id)`; re-ingestion of the same
//! key updates in place under a monotonic merge rule (enriched content is
//! never regressed by a later ingestion pass).

pub mod memory;
pub mod pg;
pub mod schema;
pub mod store;

pub use memory::MemoryStore;
pub use pg::PgStore;
pub use schema::{
    ActionType, Authority, QualitySlice, RegulatoryUpdate, UpsertOutcome, MAX_CONTENT_LEN,
    MAX_DESCRIPTION_LEN, MAX_LABEL_LEN, MAX_TITLE_LEN, TRUNCATION_MARKER,
};
pub use store::UpdateStore;
