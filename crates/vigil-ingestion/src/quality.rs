//! Read-only quality reporting over the store.
//!
//! Purely diagnostic: percentages of verified, enriched, and classified
//! records, broken down by category and jurisdiction.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use vigil_common::Result;
use vigil_db::schema::QualitySlice;
use vigil_db::store::UpdateStore;

#[derive(Debug, Clone, Serialize)]
pub struct QualityReport {
    pub total: i64,
    pub verified_pct: f64,
    pub content_pct: f64,
    pub description_pct: f64,
    pub cost_data_pct: f64,
    pub immediate_pct: f64,
    /// Slices summed over jurisdictions, one per category.
    pub by_category: Vec<QualitySlice>,
    /// Slices summed over categories, one per jurisdiction.
    pub by_jurisdiction: Vec<QualitySlice>,
}

pub async fn quality_report(store: Arc<dyn UpdateStore>) -> Result<QualityReport> {
    Ok(summarise(store.quality_slices().await?))
}

/// Fold raw store slices into the report shape.
pub fn summarise(slices: Vec<QualitySlice>) -> QualityReport {
    let mut totals = blank_slice("*", "*");
    let mut by_category: BTreeMap<String, QualitySlice> = BTreeMap::new();
    let mut by_jurisdiction: BTreeMap<String, QualitySlice> = BTreeMap::new();

    for slice in &slices {
        add(&mut totals, slice);
        add(
            by_category
                .entry(slice.category.clone())
                .or_insert_with(|| blank_slice(&slice.category, "*")),
            slice,
        );
        add(
            by_jurisdiction
                .entry(slice.jurisdiction.clone())
                .or_insert_with(|| blank_slice("*", &slice.jurisdiction)),
            slice,
        );
    }

    QualityReport {
        total: totals.total,
        verified_pct: pct(totals.verified, totals.total),
        content_pct: pct(totals.with_content, totals.total),
        description_pct: pct(totals.with_description, totals.total),
        cost_data_pct: pct(totals.cost_data, totals.total),
        immediate_pct: pct(totals.immediate, totals.total),
        by_category: by_category.into_values().collect(),
        by_jurisdiction: by_jurisdiction.into_values().collect(),
    }
}

fn blank_slice(category: &str, jurisdiction: &str) -> QualitySlice {
    QualitySlice {
        category: category.to_string(),
        jurisdiction: jurisdiction.to_string(),
        total: 0,
        verified: 0,
        with_content: 0,
        with_description: 0,
        cost_data: 0,
        immediate: 0,
    }
}

fn add(acc: &mut QualitySlice, slice: &QualitySlice) {
    acc.total += slice.total;
    acc.verified += slice.verified;
    acc.with_content += slice.with_content;
    acc.with_description += slice.with_description;
    acc.cost_data += slice.cost_data;
    acc.immediate += slice.immediate;
}

fn pct(part: i64, total: i64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 * 100.0 / total as f64
    }
}

impl fmt::Display for QualityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} records stored", self.total)?;
        writeln!(f, "  authority verified : {:>5.1}%", self.verified_pct)?;
        writeln!(f, "  content present    : {:>5.1}%", self.content_pct)?;
        writeln!(f, "  description present: {:>5.1}%", self.description_pct)?;
        writeln!(f, "  cost data available: {:>5.1}%", self.cost_data_pct)?;
        writeln!(f, "  immediate action   : {:>5.1}%", self.immediate_pct)?;

        writeln!(f, "by category:")?;
        for s in &self.by_category {
            writeln!(
                f,
                "  {:<40} {:>5}  verified {:>5.1}%  content {:>5.1}%",
                s.category,
                s.total,
                pct(s.verified, s.total),
                pct(s.with_content, s.total)
            )?;
        }

        writeln!(f, "by jurisdiction:")?;
        for s in &self.by_jurisdiction {
            writeln!(
                f,
                "  {:<40} {:>5}  verified {:>5.1}%  content {:>5.1}%",
                s.jurisdiction,
                s.total,
                pct(s.verified, s.total),
                pct(s.with_content, s.total)
            )?;
        }
        Ok(())
    }
}
