//! In-memory store backing the pipeline tests and local development.
//!
//! Applies the same per-key merge rule as [`crate::pg::PgStore`]; the
//! whole map sits behind one mutex, which trivially serializes concurrent
//! writers at the key.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use vigil_common::Result;

use crate::schema::{ActionType, Authority, QualitySlice, RegulatoryUpdate, UpsertOutcome};
use crate::store::UpdateStore;

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<HashMap<(Authority, String), RegulatoryUpdate>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UpdateStore for MemoryStore {
    async fn upsert(&self, update: &RegulatoryUpdate) -> Result<UpsertOutcome> {
        let mut map = self.inner.lock().unwrap();
        let key = (update.authority, update.source_id.clone());
        match map.get_mut(&key) {
            None => {
                map.insert(key, update.clone());
                Ok(UpsertOutcome::Inserted)
            }
            Some(existing) => {
                // id, the key, and captured_at survive; content and the
                // verified flag are monotonic once content is non-empty.
                let keep_content = existing.has_content();
                existing.title = update.title.clone();
                existing.category = update.category.clone();
                existing.jurisdiction = update.jurisdiction.clone();
                existing.published_date = update.published_date;
                existing.source_url = update.source_url.clone();
                existing.description = update.description.clone();
                if !keep_content {
                    existing.content = update.content.clone();
                    existing.authority_verified = update.authority_verified;
                }
                existing.cost_data_available = update.cost_data_available;
                existing.action_type = update.action_type;
                Ok(UpsertOutcome::Updated)
            }
        }
    }

    async fn pending_enrichment(&self, limit: i64) -> Result<Vec<RegulatoryUpdate>> {
        let map = self.inner.lock().unwrap();
        let mut pending: Vec<RegulatoryUpdate> = map
            .values()
            .filter(|u| !u.has_content() && !u.source_url.is_empty())
            .cloned()
            .collect();
        pending.sort_by_key(|u| u.captured_at);
        pending.truncate(limit.max(0) as usize);
        Ok(pending)
    }

    async fn quality_slices(&self) -> Result<Vec<QualitySlice>> {
        let map = self.inner.lock().unwrap();
        let mut slices: BTreeMap<(String, String), QualitySlice> = BTreeMap::new();
        for u in map.values() {
            let slice = slices
                .entry((u.category.clone(), u.jurisdiction.clone()))
                .or_insert_with(|| QualitySlice {
                    category: u.category.clone(),
                    jurisdiction: u.jurisdiction.clone(),
                    total: 0,
                    verified: 0,
                    with_content: 0,
                    with_description: 0,
                    cost_data: 0,
                    immediate: 0,
                });
            slice.total += 1;
            if u.authority_verified {
                slice.verified += 1;
            }
            if u.has_content() {
                slice.with_content += 1;
            }
            if u.description.as_deref().is_some_and(|d| !d.is_empty()) {
                slice.with_description += 1;
            }
            if u.cost_data_available {
                slice.cost_data += 1;
            }
            if u.action_type == ActionType::Immediate {
                slice.immediate += 1;
            }
        }
        Ok(slices.into_values().collect())
    }

    async fn count(&self) -> Result<i64> {
        Ok(self.inner.lock().unwrap().len() as i64)
    }

    async fn find(
        &self,
        authority: Authority,
        source_id: &str,
    ) -> Result<Option<RegulatoryUpdate>> {
        let map = self.inner.lock().unwrap();
        Ok(map.get(&(authority, source_id.to_string())).cloned())
    }
}
