//! Raw item → canonical record mapping.
//!
//! Pure functions only. Items rejected here are dropped and counted by
//! the orchestrator, never partially inserted.

use chrono::{DateTime, NaiveDate, Utc};
use url::Url;
use uuid::Uuid;

use vigil_common::{Result, VigilError};
use vigil_db::schema::{
    ActionType, Authority, RegulatoryUpdate, MAX_DESCRIPTION_LEN, MAX_LABEL_LEN, MAX_TITLE_LEN,
};

use crate::models::RawItem;

/// Category substrings that demand immediate attention rather than
/// routine monitoring. Matched case-insensitively.
const IMMEDIATE_CATEGORIES: &[&str] = &["recall", "safety alert", "field safety", "safety notice"];

/// Calendar formats the supported authorities print, beyond RFC 2822/3339.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y%m%d", "%d %B %Y", "%B %d, %Y", "%m/%d/%Y"];

/// Map one raw item into a canonical update for `authority`.
///
/// Fails with `VigilError::Validation` when the item has no title, or
/// neither a native id nor a URL to key on.
pub fn normalise(authority: Authority, item: &RawItem) -> Result<RegulatoryUpdate> {
    let title = item.title.as_deref().map(str::trim).unwrap_or("");
    if title.is_empty() {
        return Err(VigilError::Validation("item is missing a title".into()));
    }

    let canonical_url = item.url.as_deref().map(canonicalize_url);
    let source_id = match (&item.native_id, &canonical_url) {
        (Some(id), _) if !id.trim().is_empty() => id.trim().to_string(),
        (_, Some(url)) if !url.is_empty() => url.clone(),
        _ => {
            return Err(VigilError::Validation(
                "item has neither a native id nor a URL".into(),
            ))
        }
    };

    let category = clamp(
        item.category.as_deref().unwrap_or("Regulatory Update"),
        MAX_LABEL_LEN,
    );
    let jurisdiction = clamp(
        item.jurisdiction
            .as_deref()
            .unwrap_or_else(|| authority.jurisdiction()),
        MAX_LABEL_LEN,
    );
    let action_type = derive_action_type(&category);

    Ok(RegulatoryUpdate {
        id: Uuid::new_v4(),
        authority,
        source_id,
        title: clamp(title, MAX_TITLE_LEN),
        category,
        jurisdiction,
        published_date: item.published.as_deref().and_then(coerce_date),
        captured_at: Utc::now(),
        source_url: item.url.clone().unwrap_or_default(),
        description: item
            .summary
            .as_deref()
            .map(|s| clamp(s.trim(), MAX_DESCRIPTION_LEN))
            .filter(|s| !s.is_empty()),
        content: None,
        authority_verified: false,
        cost_data_available: false,
        action_type,
    })
}

/// Fixed category → action lookup; anything not on the immediate list
/// defaults to monitoring.
pub fn derive_action_type(category: &str) -> ActionType {
    let lowered = category.to_lowercase();
    if IMMEDIATE_CATEGORIES.iter().any(|k| lowered.contains(k)) {
        ActionType::Immediate
    } else {
        ActionType::Monitoring
    }
}

/// Canonical form of a source URL, used as the dedup key when the source
/// gives no native id: scheme and host lowercased, query and fragment
/// stripped, trailing slashes trimmed.
pub fn canonicalize_url(raw: &str) -> String {
    match Url::parse(raw.trim()) {
        Ok(mut url) => {
            url.set_query(None);
            url.set_fragment(None);
            url.to_string().trim_end_matches('/').to_string()
        }
        Err(_) => raw.trim().trim_end_matches('/').to_string(),
    }
}

/// Coerce a source-printed date into a calendar date.
pub fn coerce_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.date_naive());
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

/// Clamp to at most `max` characters, at a character boundary.
fn clamp(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw() -> RawItem {
        RawItem {
            native_id: Some("K260123".to_string()),
            title: Some("Powered wheelchair clearance".to_string()),
            category: Some("Device Clearance".to_string()),
            jurisdiction: None,
            published: Some("2026-02-14".to_string()),
            url: Some("https://www.accessdata.fda.gov/device/K260123".to_string()),
            summary: Some("Summary text.".to_string()),
        }
    }

    #[test]
    fn test_normalise_happy_path() {
        let update = normalise(Authority::Fda, &raw()).unwrap();
        assert_eq!(update.source_id, "K260123");
        assert_eq!(update.jurisdiction, "US");
        assert_eq!(update.action_type, ActionType::Monitoring);
        assert_eq!(
            update.published_date,
            Some(NaiveDate::from_ymd_opt(2026, 2, 14).unwrap())
        );
        assert!(!update.authority_verified);
        assert!(update.content.is_none());
    }

    #[test]
    fn test_missing_title_is_rejected() {
        let mut item = raw();
        item.title = None;
        assert!(matches!(
            normalise(Authority::Fda, &item),
            Err(VigilError::Validation(_))
        ));

        item.title = Some("   ".to_string());
        assert!(normalise(Authority::Fda, &item).is_err());
    }

    #[test]
    fn test_url_fallback_key_is_canonicalized() {
        let mut item = raw();
        item.native_id = None;
        item.url = Some("HTTPS://WWW.Gov.UK/drug-device-alerts/pump-notice/?utm=x#top".to_string());
        let update = normalise(Authority::Mhra, &item).unwrap();
        assert_eq!(
            update.source_id,
            "https://www.gov.uk/drug-device-alerts/pump-notice"
        );
    }

    #[test]
    fn test_missing_key_entirely_is_rejected() {
        let mut item = raw();
        item.native_id = None;
        item.url = None;
        assert!(normalise(Authority::Fda, &item).is_err());
    }

    #[test]
    fn test_recall_categories_map_to_immediate() {
        assert_eq!(derive_action_type("Device Recall (Class I)"), ActionType::Immediate);
        assert_eq!(derive_action_type("Field Safety Notice"), ActionType::Immediate);
        assert_eq!(derive_action_type("SAFETY ALERT"), ActionType::Immediate);
        assert_eq!(derive_action_type("Guidance Document"), ActionType::Monitoring);
    }

    #[test]
    fn test_date_coercion_formats() {
        let expected = NaiveDate::from_ymd_opt(2026, 2, 14).unwrap();
        for raw in [
            "2026-02-14",
            "20260214",
            "14 February 2026",
            "February 14, 2026",
            "02/14/2026",
            "2026-02-14T09:30:00Z",
            "Sat, 14 Feb 2026 09:30:00 +0000",
        ] {
            assert_eq!(coerce_date(raw), Some(expected), "failed for {raw}");
        }
        assert_eq!(coerce_date("not a date"), None);
    }

    #[test]
    fn test_long_fields_are_clamped() {
        let mut item = raw();
        item.title = Some("t".repeat(MAX_TITLE_LEN + 100));
        item.summary = Some("s".repeat(MAX_DESCRIPTION_LEN + 100));
        let update = normalise(Authority::Fda, &item).unwrap();
        assert_eq!(update.title.chars().count(), MAX_TITLE_LEN);
        assert_eq!(
            update.description.unwrap().chars().count(),
            MAX_DESCRIPTION_LEN
        );
    }

    #[test]
    fn test_blank_summary_becomes_none() {
        let mut item = raw();
        item.summary = Some("   ".to_string());
        let update = normalise(Authority::Fda, &item).unwrap();
        assert!(update.description.is_none());
    }
}
