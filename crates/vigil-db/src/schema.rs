//! Canonical record schema shared by the store and the ingestion pipeline.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Field bounds applied at normalization and enrichment time.
pub const MAX_TITLE_LEN: usize = 500;
pub const MAX_LABEL_LEN: usize = 120;
pub const MAX_DESCRIPTION_LEN: usize = 2_000;
pub const MAX_CONTENT_LEN: usize = 20_000;

/// Appended to `content` whenever extraction exceeded [`MAX_CONTENT_LEN`].
pub const TRUNCATION_MARKER: &str = " [truncated]";

/// An external regulatory body whose published updates are ingested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Authority {
    Fda,
    Mhra,
    HealthCanada,
}

impl Authority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Authority::Fda          => "fda",
            Authority::Mhra         => "mhra",
            Authority::HealthCanada => "health-canada",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "fda"           => Some(Authority::Fda),
            "mhra"          => Some(Authority::Mhra),
            "health-canada" => Some(Authority::HealthCanada),
            _ => None,
        }
    }

    /// Jurisdiction applied when the source item carries none of its own.
    pub fn jurisdiction(&self) -> &'static str {
        match self {
            Authority::Fda          => "US",
            Authority::Mhra         => "UK",
            Authority::HealthCanada => "CA",
        }
    }
}

/// Triage tag derived from `category` at normalization time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionType {
    Monitoring,
    Immediate,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Monitoring => "monitoring",
            ActionType::Immediate  => "immediate",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "monitoring" => Some(ActionType::Monitoring),
            "immediate"  => Some(ActionType::Immediate),
            _ => None,
        }
    }
}

/// The canonical unit record all sources are mapped into.
///
/// `(authority, source_id)` is the dedup key. `captured_at` is written at
/// first insert and never changes afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegulatoryUpdate {
    pub id: Uuid,
    pub authority: Authority,
    pub source_id: String,
    pub title: String,
    pub category: String,
    pub jurisdiction: String,
    pub published_date: Option<NaiveDate>,
    pub captured_at: DateTime<Utc>,
    /// Canonical link to the original document; empty when the source gave
    /// none. Enrichment only considers records with a non-empty URL.
    pub source_url: String,
    pub description: Option<String>,
    pub content: Option<String>,
    pub authority_verified: bool,
    pub cost_data_available: bool,
    pub action_type: ActionType,
}

impl RegulatoryUpdate {
    pub fn has_content(&self) -> bool {
        self.content.as_deref().is_some_and(|c| !c.is_empty())
    }
}

/// Result of a store upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// Per (category, jurisdiction) quality counters, read by the reporter.
#[derive(Debug, Clone, Serialize)]
pub struct QualitySlice {
    pub category: String,
    pub jurisdiction: String,
    pub total: i64,
    pub verified: i64,
    pub with_content: i64,
    pub with_description: i64,
    pub cost_data: i64,
    pub immediate: i64,
}

/// Clamp to at most `max` characters, ending with [`TRUNCATION_MARKER`]
/// when anything was cut. Operates on characters, not bytes.
pub fn truncate_with_marker(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let keep = max.saturating_sub(TRUNCATION_MARKER.chars().count());
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(TRUNCATION_MARKER);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authority_round_trip() {
        for a in [Authority::Fda, Authority::Mhra, Authority::HealthCanada] {
            assert_eq!(Authority::parse(a.as_str()), Some(a));
        }
        assert_eq!(Authority::parse("tga"), None);
    }

    #[test]
    fn test_truncate_within_bound_is_identity() {
        assert_eq!(truncate_with_marker("short", 10), "short");
    }

    #[test]
    fn test_truncate_appends_marker_and_respects_bound() {
        let long = "x".repeat(MAX_CONTENT_LEN + 500);
        let cut = truncate_with_marker(&long, MAX_CONTENT_LEN);
        assert!(cut.ends_with(TRUNCATION_MARKER));
        assert_eq!(cut.chars().count(), MAX_CONTENT_LEN);
    }

    #[test]
    fn test_truncate_is_char_boundary_safe() {
        let long = "é".repeat(100);
        let cut = truncate_with_marker(&long, 50);
        assert!(cut.ends_with(TRUNCATION_MARKER));
        assert!(cut.chars().count() <= 50);
    }
}
