//! vigil-ingestion — regulatory update ingestion pipeline.
//! - Source discovery (openFDA, MHRA, Health Canada)
//! - Normalization into the canonical record shape
//! - Deduplicated persistence via vigil-db
//! - Content enrichment for records missing body text
//! - Quality reporting

pub mod enrich;
pub mod models;
pub mod normalise;
pub mod pipeline;
pub mod quality;
pub mod sources;
