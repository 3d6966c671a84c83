//! MHRA device safety alerts via the GOV.UK listing.
//!
//! Scrapes https://www.gov.uk/drug-device-alerts, which paginates with
//! `?page=N`. Each entry in the document list carries the alert link, a
//! one-line description, and a publication `<time>` element.

use async_trait::async_trait;
use scraper::{Html, Selector};
use tracing::{debug, instrument};

use vigil_common::error::FetchError;
use vigil_common::sandbox::SandboxClient;
use vigil_db::schema::Authority;

use super::SourceAdapter;
use crate::models::{FetchBatch, FetchConfig, RawItem};
use crate::normalise::coerce_date;

const MHRA_LIST_URL: &str = "https://www.gov.uk/drug-device-alerts";
/// Entries per GOV.UK listing page; fewer means the last page.
const LISTING_PAGE_SIZE: usize = 50;

#[derive(Debug)]
pub struct MhraAdapter {
    client: SandboxClient,
}

impl MhraAdapter {
    pub fn new(client: SandboxClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SourceAdapter for MhraAdapter {
    fn name(&self) -> &'static str {
        "mhra"
    }

    fn authority(&self) -> Authority {
        Authority::Mhra
    }

    #[instrument(skip(self, cfg), fields(limit = cfg.limit))]
    async fn fetch(&self, cfg: &FetchConfig) -> Result<FetchBatch, FetchError> {
        let since = cfg.since_cursor.as_deref().and_then(coerce_date);

        let mut items = Vec::new();
        let mut skipped = 0usize;
        let mut page = 1u32;

        'pages: while items.len() < cfg.limit {
            let resp = self
                .client
                .get(MHRA_LIST_URL)?
                .query(&[("page", page.to_string())])
                .send()
                .await?;
            if !resp.status().is_success() {
                let status = resp.status();
                let msg = format!("GOV.UK returned HTTP {status} for page {page}");
                return Err(if status.is_server_error() {
                    FetchError::Transient(msg)
                } else {
                    FetchError::Permanent(msg)
                });
            }

            let body = resp.text().await?;
            let (page_items, page_skipped) = parse_listing(&body);
            skipped += page_skipped;
            if page_items.is_empty() {
                break;
            }

            let page_len = page_items.len();
            for item in page_items {
                // The listing is newest first; once entries age past the
                // cursor there is nothing further down worth paging for.
                if let (Some(cursor), Some(published)) =
                    (since, item.published.as_deref().and_then(coerce_date))
                {
                    if published < cursor {
                        break 'pages;
                    }
                }
                items.push(item);
                if items.len() >= cfg.limit {
                    break 'pages;
                }
            }

            if page_len < LISTING_PAGE_SIZE {
                break;
            }
            page += 1;
        }

        debug!(items = items.len(), skipped, pages = page, "GOV.UK listing fetched");
        Ok(FetchBatch { items, skipped })
    }
}

/// Parse one GOV.UK listing page. Returns the readable entries plus the
/// count of entries lacking a usable link or title.
fn parse_listing(html: &str) -> (Vec<RawItem>, usize) {
    let document = Html::parse_document(html);
    let entry_sel = Selector::parse("li.gem-c-document-list__item").unwrap();
    let link_sel = Selector::parse("a").unwrap();
    let desc_sel = Selector::parse("p.gem-c-document-list__item-description").unwrap();
    let time_sel = Selector::parse("time").unwrap();

    let mut items = Vec::new();
    let mut skipped = 0usize;

    for entry in document.select(&entry_sel) {
        let Some(link) = entry.select(&link_sel).next() else {
            skipped += 1;
            continue;
        };
        let title = link.text().collect::<String>().trim().to_string();
        let href = link.value().attr("href").unwrap_or("").trim().to_string();
        if title.is_empty() || href.is_empty() {
            skipped += 1;
            continue;
        }

        let url = if href.starts_with('/') {
            format!("https://www.gov.uk{href}")
        } else {
            href.clone()
        };
        let native_id = href
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .map(String::from);
        let summary = entry
            .select(&desc_sel)
            .next()
            .map(|d| d.text().collect::<String>().trim().to_string())
            .filter(|s| !s.is_empty());
        let published = entry
            .select(&time_sel)
            .next()
            .and_then(|t| t.value().attr("datetime"))
            .map(String::from);

        items.push(RawItem {
            native_id,
            title: Some(title),
            category: Some("Safety Alert".to_string()),
            jurisdiction: Some("UK".to_string()),
            published,
            url: Some(url),
            summary,
        });
    }

    (items, skipped)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING_FIXTURE: &str = r#"
<ul class="gem-c-document-list">
  <li class="gem-c-document-list__item">
    <a class="govuk-link" href="/drug-device-alerts/field-safety-notice-infusion-pumps">
      Field safety notice: infusion pumps
    </a>
    <p class="gem-c-document-list__item-description">Certain pump batteries may deplete early.</p>
    <ul class="gem-c-document-list__item-metadata">
      <li class="gem-c-document-list__attribute"><time datetime="2026-02-14">14 February 2026</time></li>
    </ul>
  </li>
  <li class="gem-c-document-list__item">
    <a class="govuk-link" href="/drug-device-alerts/device-safety-information-ventilators">Device safety information: ventilators</a>
  </li>
  <li class="gem-c-document-list__item">
    <p class="gem-c-document-list__item-description">Orphan description with no link.</p>
  </li>
</ul>
"#;

    #[test]
    fn test_parse_listing_extracts_entries() {
        let (items, skipped) = parse_listing(LISTING_FIXTURE);
        assert_eq!(items.len(), 2);
        assert_eq!(skipped, 1);

        let first = &items[0];
        assert_eq!(
            first.native_id.as_deref(),
            Some("field-safety-notice-infusion-pumps")
        );
        assert_eq!(
            first.title.as_deref(),
            Some("Field safety notice: infusion pumps")
        );
        assert_eq!(
            first.url.as_deref(),
            Some("https://www.gov.uk/drug-device-alerts/field-safety-notice-infusion-pumps")
        );
        assert_eq!(first.published.as_deref(), Some("2026-02-14"));
        assert_eq!(
            first.summary.as_deref(),
            Some("Certain pump batteries may deplete early.")
        );
    }

    #[test]
    fn test_parse_listing_tolerates_missing_optionals() {
        let (items, _) = parse_listing(LISTING_FIXTURE);
        let second = &items[1];
        assert!(second.summary.is_none());
        assert!(second.published.is_none());
    }

    #[test]
    fn test_parse_empty_page() {
        let (items, skipped) = parse_listing("<html><body>No results</body></html>");
        assert!(items.is_empty());
        assert_eq!(skipped, 0);
    }

    #[tokio::test]
    #[ignore = "hits the live GOV.UK listing"]
    async fn test_mhra_live_listing() {
        let adapter = MhraAdapter::new(SandboxClient::new().unwrap());
        let batch = adapter
            .fetch(&FetchConfig {
                limit: 5,
                since_cursor: None,
            })
            .await
            .unwrap();
        assert!(!batch.items.is_empty());
    }
}
