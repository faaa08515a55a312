//! Match listing and enriched match details over the in-memory record store.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{Duration, Utc};
use hma_common::{
    ContentNamespace, HashRecord, HmaError, MatchRecord, Opinion, SignalMetadataRecord, SignalType,
};
use hma_query::opinion::RESERVED_TAGS;
use hma_query::MatchAggregator;
use hma_store::testing::MemoryRecordStore;

const NS: &str = "images/";

fn match_record(content_id: &str, signal_id: &str, signal_source: &str) -> MatchRecord {
    MatchRecord {
        content_id: format!("{NS}{content_id}"),
        content_hash: "a".repeat(64),
        signal_id: signal_id.to_string(),
        signal_hash: "b".repeat(64),
        signal_source: signal_source.to_string(),
        signal_type: SignalType::Pdq,
        created_at: Utc::now(),
    }
}

fn metadata(signal_id: &str, signal_source: &str, dataset: &str, tags: &[&str]) -> SignalMetadataRecord {
    SignalMetadataRecord {
        signal_id: signal_id.to_string(),
        signal_source: signal_source.to_string(),
        dataset_id: dataset.to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect::<BTreeSet<_>>(),
    }
}

fn aggregator(store: MemoryRecordStore) -> (MatchAggregator, Arc<MemoryRecordStore>) {
    let store = Arc::new(store);
    (
        MatchAggregator::new(store.clone(), ContentNamespace::new(NS)),
        store,
    )
}

#[tokio::test]
async fn single_match_with_true_positive_metadata() {
    let (agg, _) = aggregator(
        MemoryRecordStore::new()
            .with_match(match_record("img-1", "55", "te"))
            .with_metadata(metadata("55", "te", "ds1", &["true_positive", "nsfw"])),
    );

    let details = agg.match_details("img-1").await.unwrap();

    assert_eq!(details.len(), 1);
    let detail = &details[0];
    assert_eq!(detail.content_id, "img-1");
    assert_eq!(detail.signal_type, SignalType::Pdq);
    assert_eq!(detail.metadata.len(), 1);
    assert_eq!(detail.metadata[0].dataset, "ds1");
    assert_eq!(detail.metadata[0].tags, vec!["nsfw".to_string()]);
    assert_eq!(detail.metadata[0].opinion, Opinion::TruePositive);
    assert_eq!(detail.metadata[0].opinion.to_string(), "True Positive");
}

#[tokio::test]
async fn unmatched_content_is_empty_not_error() {
    let (agg, store) = aggregator(
        MemoryRecordStore::new().with_match(match_record("img-1", "55", "te")),
    );

    let details = agg.match_details("never-seen").await.unwrap();

    assert!(details.is_empty());
    assert_eq!(store.calls(), vec!["get_by_content_id".to_string()]);
}

#[tokio::test]
async fn match_without_metadata_keeps_its_own_fields() {
    let (agg, _) = aggregator(
        MemoryRecordStore::new().with_match(match_record("img-2", "77", "te")),
    );

    let details = agg.match_details("img-2").await.unwrap();

    assert_eq!(details.len(), 1);
    assert_eq!(details[0].signal_id, "77");
    assert_eq!(details[0].signal_hash, "b".repeat(64));
    assert!(details[0].metadata.is_empty());
}

#[tokio::test]
async fn one_entry_per_match_and_metadata_pair() {
    let (agg, _) = aggregator(
        MemoryRecordStore::new()
            .with_match(match_record("img-3", "1", "te"))
            .with_match(match_record("img-3", "2", "ncmec"))
            .with_metadata(metadata("1", "te", "ds-a", &["false_positive"]))
            .with_metadata(metadata("1", "te", "ds-b", &["disputed", "violence"]))
            .with_metadata(metadata("2", "ncmec", "ds-c", &[])),
    );

    let details = agg.match_details("img-3").await.unwrap();

    assert_eq!(details.len(), 2);
    let te = details.iter().find(|d| d.signal_source == "te").unwrap();
    let ncmec = details.iter().find(|d| d.signal_source == "ncmec").unwrap();

    let opinions: Vec<_> = te.metadata.iter().map(|m| (m.dataset.as_str(), m.opinion)).collect();
    assert!(opinions.contains(&("ds-a", Opinion::FalsePositive)));
    assert!(opinions.contains(&("ds-b", Opinion::Disputed)));
    assert_eq!(ncmec.metadata.len(), 1);
    assert_eq!(ncmec.metadata[0].opinion, Opinion::Unknown);
}

#[tokio::test]
async fn metadata_is_scoped_by_signal_source() {
    let (agg, _) = aggregator(
        MemoryRecordStore::new()
            .with_match(match_record("img-4", "55", "te"))
            .with_metadata(metadata("55", "te", "mine", &[]))
            .with_metadata(metadata("55", "elsewhere", "not-mine", &["true_positive"])),
    );

    let details = agg.match_details("img-4").await.unwrap();

    let datasets: Vec<_> = details[0].metadata.iter().map(|m| m.dataset.as_str()).collect();
    assert_eq!(datasets, vec!["mine"]);
}

#[tokio::test]
async fn repeated_signal_is_looked_up_once() {
    let mut older = match_record("img-5", "9", "te");
    older.created_at = Utc::now() - Duration::hours(3);
    let (agg, store) = aggregator(
        MemoryRecordStore::new()
            .with_match(older)
            .with_match(match_record("img-5", "9", "te"))
            .with_metadata(metadata("9", "te", "ds", &[])),
    );

    let details = agg.match_details("img-5").await.unwrap();

    assert_eq!(details.len(), 2);
    assert!(details.iter().all(|d| d.metadata.len() == 1));
    let lookups = store.calls().iter().filter(|c| *c == "get_by_signal").count();
    assert_eq!(lookups, 1);
}

#[tokio::test]
async fn reserved_tags_never_displayed() {
    let mut store = MemoryRecordStore::new().with_match(match_record("img-6", "1", "te"));
    let combos: [&[&str]; 4] = [
        &["true_positive", "false_positive", "disputed"],
        &["disputed", "a"],
        &["false_positive", "b", "c"],
        &["true_positive"],
    ];
    for (i, tags) in combos.iter().enumerate() {
        store = store.with_metadata(metadata("1", "te", &format!("ds{i}"), tags));
    }
    let (agg, _) = aggregator(store);

    let details = agg.match_details("img-6").await.unwrap();

    assert_eq!(details[0].metadata.len(), combos.len());
    for entry in &details[0].metadata {
        for tag in &entry.tags {
            assert!(!RESERVED_TAGS.contains(&tag.as_str()), "leaked {tag}");
        }
    }
}

#[tokio::test]
async fn list_matches_strips_namespace_and_honours_since() {
    let mut old = match_record("old", "1", "te");
    old.created_at = Utc::now() - Duration::days(3);
    let (agg, _) = aggregator(
        MemoryRecordStore::new()
            .with_match(old)
            .with_match(match_record("new", "2", "te")),
    );

    let all = agg.list_matches(None).await.unwrap();
    let ids: Vec<_> = all.iter().map(|m| m.content_id.as_str()).collect();
    assert_eq!(ids, vec!["old", "new"]);

    let recent = agg
        .list_matches(Some(Utc::now() - Duration::days(1)))
        .await
        .unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].content_id, "new");
}

#[tokio::test]
async fn get_hash_returns_latest_or_none() {
    let now = Utc::now();
    let hash = |h: &str, age: i64| HashRecord {
        content_id: format!("{NS}img-7"),
        content_hash: h.to_string(),
        signal_type: SignalType::Pdq,
        created_at: now - Duration::hours(age),
    };
    let (agg, _) = aggregator(
        MemoryRecordStore::new()
            .with_hash(hash("old", 5))
            .with_hash(hash("new", 1)),
    );

    let found = agg.get_hash("img-7").await.unwrap().unwrap();
    assert_eq!(found.content_id, "img-7");
    assert_eq!(found.content_hash, "new");

    assert!(agg.get_hash("missing").await.unwrap().is_none());
}

#[tokio::test]
async fn store_failure_surfaces_as_store_unavailable() {
    let (agg, _) = aggregator(MemoryRecordStore::new().unavailable());

    let err = agg.match_details("img-1").await.unwrap_err();
    assert!(matches!(err, HmaError::StoreUnavailable(_)));
}
