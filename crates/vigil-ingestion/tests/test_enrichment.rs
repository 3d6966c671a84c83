//! Enrichment worker behavior against the in-memory store. The unreachable
//! localhost endpoint stands in for a source that times out or refuses:
//! the candidate must come through the pass untouched and still eligible.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use vigil_common::sandbox::SandboxClient;
use vigil_db::schema::{ActionType, Authority, RegulatoryUpdate};
use vigil_db::{MemoryStore, UpdateStore};
use vigil_ingestion::enrich::{
    apply_extraction, run_enrichment, EnrichOptions, Extraction,
};

fn candidate(source_id: &str, source_url: &str) -> RegulatoryUpdate {
    RegulatoryUpdate {
        id: Uuid::new_v4(),
        authority: Authority::HealthCanada,
        source_id: source_id.to_string(),
        title: "Infusion sets recalled".to_string(),
        category: "Medical Device Recall".to_string(),
        jurisdiction: "CA".to_string(),
        published_date: None,
        captured_at: Utc::now(),
        source_url: source_url.to_string(),
        description: None,
        content: None,
        authority_verified: false,
        cost_data_available: false,
        action_type: ActionType::Immediate,
    }
}

#[tokio::test]
async fn test_unreachable_source_leaves_candidate_eligible() {
    let store: Arc<dyn UpdateStore> = Arc::new(MemoryStore::new());
    // Port 9 is the discard service; nothing listens there in CI.
    let record = candidate("RA-2026-1", "http://127.0.0.1:9/alert");
    store.upsert(&record).await.unwrap();

    let client = SandboxClient::with_timeout(Duration::from_secs(2)).unwrap();
    let opts = EnrichOptions {
        batch: 10,
        concurrency: 2,
        fetch_timeout: Duration::from_secs(2),
    };
    let report = run_enrichment(store.clone(), &client, opts.clone()).await.unwrap();

    assert_eq!(report.candidates, 1);
    assert_eq!(report.enriched, 0);
    assert_eq!(report.skipped, 1);
    assert!(report.errors.is_empty());

    // Untouched and still a candidate for the next pass.
    let stored = store
        .find(Authority::HealthCanada, "RA-2026-1")
        .await
        .unwrap()
        .unwrap();
    assert!(stored.content.is_none());
    assert!(!stored.authority_verified);

    let pending = store.pending_enrichment(10).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].source_id, "RA-2026-1");

    // A second pass sees the same candidate again.
    let report = run_enrichment(store.clone(), &client, opts).await.unwrap();
    assert_eq!(report.candidates, 1);
}

#[tokio::test]
async fn test_enriched_record_leaves_the_candidate_pool() {
    let store: Arc<dyn UpdateStore> = Arc::new(MemoryStore::new());
    let record = candidate("RA-2026-2", "https://recalls-rappels.canada.ca/en/x");
    store.upsert(&record).await.unwrap();

    let enriched = apply_extraction(
        &record,
        Extraction {
            lead: "Affected lots may leak.".to_string(),
            content: "Affected lots may leak.\n\nReturn units to the distributor.".to_string(),
        },
    );
    store.upsert(&enriched).await.unwrap();

    assert!(store.pending_enrichment(10).await.unwrap().is_empty());

    let stored = store
        .find(Authority::HealthCanada, "RA-2026-2")
        .await
        .unwrap()
        .unwrap();
    assert!(stored.authority_verified);
    assert_eq!(stored.description.as_deref(), Some("Affected lots may leak."));
}

#[tokio::test]
async fn test_verified_flag_never_set_without_content() {
    let store: Arc<dyn UpdateStore> = Arc::new(MemoryStore::new());
    for (i, url) in [
        "http://127.0.0.1:9/a",
        "http://127.0.0.1:9/b",
        "", // no URL at all: never even a candidate
    ]
    .iter()
    .enumerate()
    {
        store
            .upsert(&candidate(&format!("RA-2026-{i}"), url))
            .await
            .unwrap();
    }

    let client = SandboxClient::with_timeout(Duration::from_secs(2)).unwrap();
    run_enrichment(store.clone(), &client, EnrichOptions::default())
        .await
        .unwrap();

    for i in 0..3 {
        let stored = store
            .find(Authority::HealthCanada, &format!("RA-2026-{i}"))
            .await
            .unwrap()
            .unwrap();
        assert!(
            !stored.authority_verified,
            "record {i} was marked verified with empty content"
        );
    }
}

#[tokio::test]
async fn test_batch_size_caps_candidates() {
    let store: Arc<dyn UpdateStore> = Arc::new(MemoryStore::new());
    for i in 0..5 {
        store
            .upsert(&candidate(
                &format!("RA-2026-B{i}"),
                "http://127.0.0.1:9/x",
            ))
            .await
            .unwrap();
    }

    let client = SandboxClient::with_timeout(Duration::from_secs(2)).unwrap();
    let report = run_enrichment(
        store.clone(),
        &client,
        EnrichOptions {
            batch: 2,
            concurrency: 2,
            fetch_timeout: Duration::from_secs(2),
        },
    )
    .await
    .unwrap();

    assert_eq!(report.candidates, 2);
}
