//! openFDA device API adapter.
//!
//! Endpoints:
//!   clearances: https://api.fda.gov/device/510k.json
//!   recalls:    https://api.fda.gov/device/enforcement.json
//!
//! Both endpoints page with `limit`/`skip` and answer an empty result set
//! with HTTP 404. `since_cursor` narrows the listing to records decided
//! or reported on or after that ISO date.

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use vigil_common::error::FetchError;
use vigil_common::sandbox::SandboxClient;
use vigil_db::schema::Authority;

use super::SourceAdapter;
use crate::models::{FetchBatch, FetchConfig, RawItem};

const FDA_510K_URL: &str = "https://api.fda.gov/device/510k.json";
const FDA_ENFORCEMENT_URL: &str = "https://api.fda.gov/device/enforcement.json";
const PAGE_SIZE: usize = 100;
/// Open upper bound for openFDA date-range searches.
const FAR_FUTURE: &str = "3000-01-01";

#[derive(Debug)]
pub struct OpenFdaAdapter {
    client: SandboxClient,
}

impl OpenFdaAdapter {
    pub fn new(client: SandboxClient) -> Self {
        Self { client }
    }

    /// Page through one endpoint until `limit` records or the listing ends.
    async fn fetch_pages(
        &self,
        url: &str,
        search: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Value>, FetchError> {
        let mut results: Vec<Value> = Vec::new();
        while results.len() < limit {
            let page = (limit - results.len()).min(PAGE_SIZE);
            let mut params = vec![
                ("limit", page.to_string()),
                ("skip", results.len().to_string()),
            ];
            if let Some(s) = search {
                params.push(("search", s.to_string()));
            }

            let resp = self.client.get(url)?.query(&params).send().await?;
            if resp.status() == reqwest::StatusCode::NOT_FOUND {
                break;
            }
            if !resp.status().is_success() {
                let status = resp.status();
                let msg = format!("openFDA returned HTTP {status} for {url}");
                return Err(if status.is_server_error() {
                    FetchError::Transient(msg)
                } else {
                    FetchError::Permanent(msg)
                });
            }

            let body: Value = resp.json().await?;
            let batch = body["results"].as_array().cloned().unwrap_or_default();
            if batch.is_empty() {
                break;
            }
            let n = batch.len();
            results.extend(batch);
            if n < page {
                break;
            }
        }
        Ok(results)
    }
}

#[async_trait]
impl SourceAdapter for OpenFdaAdapter {
    fn name(&self) -> &'static str {
        "openfda"
    }

    fn authority(&self) -> Authority {
        Authority::Fda
    }

    #[instrument(skip(self, cfg), fields(limit = cfg.limit))]
    async fn fetch(&self, cfg: &FetchConfig) -> Result<FetchBatch, FetchError> {
        // The per-adapter limit is split evenly between clearances and
        // recalls; either endpoint may come up short.
        let per_endpoint = (cfg.limit / 2).max(1);
        let since = cfg.since_cursor.as_deref();
        let clearance_search = since.map(|s| format!("decision_date:[{s} TO {FAR_FUTURE}]"));
        let recall_search = since.map(|s| format!("report_date:[{s} TO {FAR_FUTURE}]"));

        let mut items = Vec::new();
        let mut skipped = 0usize;

        let clearances = self
            .fetch_pages(FDA_510K_URL, clearance_search.as_deref(), per_endpoint)
            .await?;
        for rec in &clearances {
            match parse_clearance(rec) {
                Some(item) => items.push(item),
                None => {
                    skipped += 1;
                    warn!("skipping malformed 510(k) record");
                }
            }
        }

        let recalls = self
            .fetch_pages(FDA_ENFORCEMENT_URL, recall_search.as_deref(), per_endpoint)
            .await?;
        for rec in &recalls {
            match parse_enforcement(rec) {
                Some(item) => items.push(item),
                None => {
                    skipped += 1;
                    warn!("skipping malformed enforcement record");
                }
            }
        }

        debug!(items = items.len(), skipped, "openFDA listing fetched");
        Ok(FetchBatch { items, skipped })
    }
}

/// Map one 510(k) record; `None` when it lacks a K number or device name.
fn parse_clearance(rec: &Value) -> Option<RawItem> {
    let k_number = rec["k_number"].as_str().unwrap_or("").trim();
    let device_name = rec["device_name"].as_str().unwrap_or("").trim();
    if k_number.is_empty() || device_name.is_empty() {
        return None;
    }

    Some(RawItem {
        native_id: Some(k_number.to_string()),
        title: Some(device_name.to_string()),
        category: Some("Device Clearance".to_string()),
        jurisdiction: Some("US".to_string()),
        published: rec["decision_date"].as_str().map(String::from),
        url: Some(format!(
            "https://www.accessdata.fda.gov/scripts/cdrh/cfdocs/cfpmn/pmn.cfm?ID={k_number}"
        )),
        summary: rec["applicant"]
            .as_str()
            .map(|a| format!("510(k) clearance submitted by {a}.")),
    })
}

/// Map one enforcement record; `None` when it lacks a recall number or
/// product description.
fn parse_enforcement(rec: &Value) -> Option<RawItem> {
    let recall_number = rec["recall_number"].as_str().unwrap_or("").trim();
    let product = rec["product_description"].as_str().unwrap_or("").trim();
    if recall_number.is_empty() || product.is_empty() {
        return None;
    }

    let classification = rec["classification"].as_str().unwrap_or("").trim();
    let category = if classification.is_empty() {
        "Device Recall".to_string()
    } else {
        format!("Device Recall ({classification})")
    };

    Some(RawItem {
        native_id: Some(recall_number.to_string()),
        title: Some(product.to_string()),
        category: Some(category),
        jurisdiction: Some("US".to_string()),
        published: rec["report_date"].as_str().map(String::from),
        url: rec["event_id"].as_str().map(|id| {
            format!("https://www.accessdata.fda.gov/scripts/cdrh/cfdocs/cfres/res.cfm?id={id}")
        }),
        summary: rec["reason_for_recall"].as_str().map(String::from),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_clearance_maps_fields() {
        let rec = json!({
            "k_number": "K260123",
            "device_name": "Continuous Glucose Monitor",
            "decision_date": "2026-02-14",
            "applicant": "Acme Medical Inc"
        });
        let item = parse_clearance(&rec).unwrap();
        assert_eq!(item.native_id.as_deref(), Some("K260123"));
        assert_eq!(item.title.as_deref(), Some("Continuous Glucose Monitor"));
        assert_eq!(item.published.as_deref(), Some("2026-02-14"));
        assert!(item.url.unwrap().contains("K260123"));
        assert!(item.summary.unwrap().contains("Acme Medical Inc"));
    }

    #[test]
    fn test_parse_clearance_rejects_missing_key() {
        let rec = json!({ "device_name": "Nameless Device" });
        assert!(parse_clearance(&rec).is_none());
        let rec = json!({ "k_number": "K260999" });
        assert!(parse_clearance(&rec).is_none());
    }

    #[test]
    fn test_parse_enforcement_builds_classified_category() {
        let rec = json!({
            "recall_number": "Z-1234-2026",
            "product_description": "Infusion pump, model X",
            "classification": "Class I",
            "report_date": "20260214",
            "event_id": "98765",
            "reason_for_recall": "Battery may fail during infusion."
        });
        let item = parse_enforcement(&rec).unwrap();
        assert_eq!(item.category.as_deref(), Some("Device Recall (Class I)"));
        assert_eq!(item.published.as_deref(), Some("20260214"));
        assert!(item.url.unwrap().contains("98765"));
    }

    #[test]
    fn test_parse_enforcement_rejects_malformed() {
        assert!(parse_enforcement(&json!({ "product_description": "orphan" })).is_none());
    }

    #[tokio::test]
    #[ignore = "hits the live openFDA API"]
    async fn test_openfda_live_listing() {
        let adapter = OpenFdaAdapter::new(SandboxClient::new().unwrap());
        let batch = adapter
            .fetch(&FetchConfig {
                limit: 10,
                since_cursor: None,
            })
            .await
            .unwrap();
        assert!(!batch.items.is_empty());
    }
}
