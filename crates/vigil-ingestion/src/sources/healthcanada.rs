//! Health Canada recalls and safety alerts RSS adapter.
//!
//! The recalls site publishes one rolling RSS 2.0 feed; there is no
//! pagination, so `limit` simply caps how much of the feed is kept.

use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::{debug, instrument, warn};

use vigil_common::error::FetchError;
use vigil_common::sandbox::SandboxClient;
use vigil_db::schema::Authority;

use super::SourceAdapter;
use crate::models::{FetchBatch, FetchConfig, RawItem};
use crate::normalise::coerce_date;

const HC_FEED_URL: &str = "https://recalls-rappels.canada.ca/en/feed/medical-devices";

#[derive(Debug)]
pub struct HealthCanadaAdapter {
    client: SandboxClient,
}

impl HealthCanadaAdapter {
    pub fn new(client: SandboxClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SourceAdapter for HealthCanadaAdapter {
    fn name(&self) -> &'static str {
        "healthcanada"
    }

    fn authority(&self) -> Authority {
        Authority::HealthCanada
    }

    #[instrument(skip(self, cfg), fields(limit = cfg.limit))]
    async fn fetch(&self, cfg: &FetchConfig) -> Result<FetchBatch, FetchError> {
        let resp = self.client.get(HC_FEED_URL)?.send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let msg = format!("recall feed returned HTTP {status}");
            return Err(if status.is_server_error() {
                FetchError::Transient(msg)
            } else {
                FetchError::Permanent(msg)
            });
        }

        let xml = resp.text().await?;
        let (mut items, skipped) = parse_feed(&xml);

        if let Some(cursor) = cfg.since_cursor.as_deref().and_then(coerce_date) {
            items.retain(|item| {
                item.published
                    .as_deref()
                    .and_then(coerce_date)
                    .map(|d| d >= cursor)
                    .unwrap_or(true)
            });
        }
        items.truncate(cfg.limit);

        debug!(items = items.len(), skipped, "recall feed fetched");
        Ok(FetchBatch { items, skipped })
    }
}

/// Parse the RSS feed into raw items. Entries without a title, or with
/// neither a guid nor a link, are skipped and counted.
fn parse_feed(xml: &str) -> (Vec<RawItem>, usize) {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut items = Vec::new();
    let mut skipped = 0usize;

    // State machine over <item> children.
    let mut current: Option<RawItem> = None;
    let mut guid = String::new();
    let mut field: Option<&'static str> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"item" => {
                    current = Some(RawItem {
                        category: Some("Recall".to_string()),
                        jurisdiction: Some("CA".to_string()),
                        ..RawItem::default()
                    });
                    guid.clear();
                }
                b"title" => field = Some("title"),
                b"link" => field = Some("link"),
                b"guid" => field = Some("guid"),
                b"pubDate" => field = Some("pubDate"),
                b"description" => field = Some("description"),
                b"category" => field = Some("category"),
                _ => field = None,
            },
            Ok(Event::Text(ref e)) => {
                let text = e.unescape().unwrap_or_default().trim().to_string();
                apply_field(&mut current, &mut guid, field, text);
            }
            Ok(Event::CData(ref e)) => {
                let text = String::from_utf8_lossy(e).trim().to_string();
                apply_field(&mut current, &mut guid, field, text);
            }
            Ok(Event::End(ref e)) => {
                field = None;
                if e.name().as_ref() == b"item" {
                    if let Some(mut item) = current.take() {
                        if !guid.is_empty() {
                            item.native_id = Some(guid.clone());
                        }
                        let has_title =
                            item.title.as_deref().is_some_and(|t| !t.trim().is_empty());
                        let has_key = item.native_id.is_some() || item.url.is_some();
                        if has_title && has_key {
                            items.push(item);
                        } else {
                            skipped += 1;
                            warn!("skipping malformed feed entry");
                        }
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                warn!("feed parse error: {e}");
                break;
            }
            _ => {}
        }
    }

    (items, skipped)
}

fn apply_field(
    current: &mut Option<RawItem>,
    guid: &mut String,
    field: Option<&'static str>,
    text: String,
) {
    if text.is_empty() {
        return;
    }
    let Some(item) = current.as_mut() else {
        return;
    };
    match field {
        Some("title") => item.title = Some(text),
        Some("link") => item.url = Some(text),
        Some("guid") => *guid = text,
        Some("pubDate") => item.published = Some(text),
        Some("description") => item.summary = Some(text),
        Some("category") => item.category = Some(text),
        _ => {}
    }
}
