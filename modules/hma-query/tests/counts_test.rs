//! Dashboard counts and dataset summaries.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, TimeZone, Utc};
use hma_common::{
    DatasetExtension, HashRecord, HmaError, MatchRecord, QuerySettings, RecordKind, SignalType,
};
use hma_query::CountAggregator;
use hma_store::testing::{MemoryDatasetStore, MemoryRecordStore};

fn hash_aged(id: &str, age_hours: i64) -> HashRecord {
    HashRecord {
        content_id: format!("images/{id}"),
        content_hash: "c".repeat(64),
        signal_type: SignalType::Pdq,
        created_at: Utc::now() - Duration::hours(age_hours),
    }
}

fn match_aged(id: &str, age_hours: i64) -> MatchRecord {
    MatchRecord {
        content_id: format!("images/{id}"),
        content_hash: "c".repeat(64),
        signal_id: id.to_string(),
        signal_hash: "d".repeat(64),
        signal_source: "te".to_string(),
        signal_type: SignalType::Pdq,
        created_at: Utc::now() - Duration::hours(age_hours),
    }
}

fn settings(folder: &str) -> QuerySettings {
    QuerySettings {
        dataset_folder: folder.to_string(),
        ..QuerySettings::default()
    }
}

fn aggregator(
    records: MemoryRecordStore,
    datasets: MemoryDatasetStore,
    settings: QuerySettings,
) -> (CountAggregator, Arc<MemoryRecordStore>, Arc<MemoryDatasetStore>) {
    let records = Arc::new(records);
    let datasets = Arc::new(datasets);
    (
        CountAggregator::new(records.clone(), datasets.clone(), settings),
        records,
        datasets,
    )
}

#[tokio::test]
async fn counts_total_and_rolling_day() {
    let records = MemoryRecordStore::new()
        .with_hash(hash_aged("a", 72))
        .with_hash(hash_aged("b", 25))
        .with_hash(hash_aged("c", 23))
        .with_hash(hash_aged("d", 1))
        .with_match(match_aged("e", 2));
    let (agg, _, _) = aggregator(records, MemoryDatasetStore::new(), QuerySettings::default());

    let hashes = agg.count_for(RecordKind::Hash).await.unwrap();
    assert_eq!(hashes.total, 4);
    assert_eq!(hashes.today, 2);

    let matches = agg.count_for(RecordKind::Match).await.unwrap();
    assert_eq!(matches.total, 1);
    assert_eq!(matches.today, 1);
}

#[tokio::test]
async fn today_never_exceeds_total() {
    let mut records = MemoryRecordStore::new();
    for i in 0..20 {
        records = records.with_match(match_aged(&format!("m{i}"), i * 3));
    }
    let (agg, _, _) = aggregator(records, MemoryDatasetStore::new(), QuerySettings::default());

    for kind in [RecordKind::Hash, RecordKind::Match] {
        let count = agg.count_for(kind).await.unwrap();
        assert!(count.today <= count.total, "{kind}: {count:?}");
    }
}

#[tokio::test]
async fn empty_store_counts_zero() {
    let (agg, _, _) = aggregator(
        MemoryRecordStore::new(),
        MemoryDatasetStore::new(),
        QuerySettings::default(),
    );
    let count = agg.count_for(RecordKind::Hash).await.unwrap();
    assert_eq!((count.total, count.today), (0, 0));
}

#[tokio::test]
async fn summary_strips_folder_and_extension() {
    let datasets = MemoryDatasetStore::new()
        .on_rows("folder/dataset_a.pdq", 120)
        .on_rows("folder/dataset_b.pdq", 40);
    let (agg, _, _) = aggregator(MemoryRecordStore::new(), datasets, settings("folder/"));

    let counts = agg.signal_hash_counts().await.unwrap();
    assert_eq!(counts["folder/dataset_a.pdq"], 120);
    assert_eq!(counts["folder/dataset_b.pdq"], 40);

    let summary = agg.signal_summary().await.unwrap();
    assert_eq!(summary.len(), 2);
    assert_eq!(summary[0].name, "dataset_a");
    assert_eq!(summary[0].signals[0].signal_type, "HASH_PDQ");
    assert_eq!(summary[0].signals[0].count, 120);
    assert_eq!(summary[1].name, "dataset_b");
    assert_eq!(summary[1].signals[0].signal_type, "HASH_PDQ");
    assert_eq!(summary[1].signals[0].count, 40);
}

#[tokio::test]
async fn summary_uses_configured_extension_types() {
    let modified = Utc.with_ymd_and_hms(2021, 3, 1, 12, 0, 0).unwrap();
    let datasets = MemoryDatasetStore::new()
        .on_rows("te/photos.pdq", 2)
        .on_file_modified("te/files.md5", "d41d8cd98f00b204e9800998ecf8427e,1\n", modified)
        .on_rows("te/notes.txt", 5);
    let settings = QuerySettings {
        dataset_folder: "te/".into(),
        dataset_extensions: vec![
            DatasetExtension {
                extension: ".pdq".into(),
                signal_type: SignalType::Pdq,
            },
            DatasetExtension {
                extension: ".md5".into(),
                signal_type: SignalType::Md5,
            },
        ],
        ..QuerySettings::default()
    };
    let (agg, _, _) = aggregator(MemoryRecordStore::new(), datasets, settings);

    let summary = agg.signal_summary().await.unwrap();

    assert_eq!(summary.len(), 2);
    let files = summary.iter().find(|s| s.name == "files").unwrap();
    assert_eq!(files.signals[0].signal_type, "HASH_MD5");
    assert_eq!(files.updated_at, Some(modified));
    assert!(summary.iter().all(|s| s.name != "notes"));

    // Unmapped files still count as signal rows.
    assert_eq!(agg.signal_hash_counts().await.unwrap().len(), 3);
}

#[tokio::test]
async fn malformed_dataset_excluded_from_aggregates() {
    let datasets = MemoryDatasetStore::new()
        .on_rows("folder/good.pdq", 10)
        .on_file("folder/bad.pdq", "ffff,1\n<html>oops</html>\n");
    let (agg, _, _) = aggregator(MemoryRecordStore::new(), datasets, settings("folder/"));

    let counts = agg.signal_hash_counts().await.unwrap();
    assert_eq!(counts.len(), 1);
    assert_eq!(counts["folder/good.pdq"], 10);

    let scan = agg.dataset_counts().await.unwrap();
    assert_eq!(scan.failures.len(), 1);
    assert_eq!(scan.failures[0].file, "folder/bad.pdq");

    let totals = agg.signal_totals().await.unwrap();
    assert_eq!(totals.total, 10);
}

#[tokio::test]
async fn every_call_rescans_without_cache() {
    let (agg, _, datasets) = aggregator(
        MemoryRecordStore::new(),
        MemoryDatasetStore::new().on_rows("folder/a.pdq", 1),
        settings("folder/"),
    );

    agg.signal_hash_counts().await.unwrap();
    agg.signal_summary().await.unwrap();
    assert_eq!(datasets.load_count(), 2);
}

#[tokio::test]
async fn cache_serves_repeat_calls_within_ttl() {
    let settings = QuerySettings {
        count_cache_ttl: StdDuration::from_secs(3600),
        ..settings("folder/")
    };
    let (agg, records, datasets) = aggregator(
        MemoryRecordStore::new().with_hash(hash_aged("a", 1)),
        MemoryDatasetStore::new().on_rows("folder/a.pdq", 1),
        settings,
    );

    agg.signal_hash_counts().await.unwrap();
    agg.signal_totals().await.unwrap();
    // A later call may land in the next bucket; at most one extra scan.
    assert!(datasets.load_count() <= 2);

    let first = agg.count_for(RecordKind::Hash).await.unwrap();
    let calls_after_first = records.call_count();
    let second = agg.count_for(RecordKind::Hash).await.unwrap();
    assert!(records.call_count() - calls_after_first <= 2);
    assert_eq!(first.total, second.total);
}

#[tokio::test]
async fn dataset_store_failure_is_store_unavailable() {
    let (agg, _, _) = aggregator(
        MemoryRecordStore::new(),
        MemoryDatasetStore::new().unavailable(),
        QuerySettings::default(),
    );

    let err = agg.signal_summary().await.unwrap_err();
    assert!(matches!(err, HmaError::StoreUnavailable(_)));
}

#[tokio::test]
async fn cached_totals_keep_scan_time() {
    let settings = QuerySettings {
        count_cache_ttl: StdDuration::from_secs(3600),
        ..settings("folder/")
    };
    let (agg, _, datasets) = aggregator(
        MemoryRecordStore::new(),
        MemoryDatasetStore::new().on_rows("folder/a.pdq", 3),
        settings,
    );

    let first = agg.signal_totals().await.unwrap();
    tokio::time::sleep(StdDuration::from_millis(20)).await;
    let second = agg.signal_totals().await.unwrap();

    assert_eq!(second.total, 3);
    if datasets.load_count() == 1 {
        assert_eq!(first.as_of, second.as_of);
    } else {
        // Crossed a bucket boundary, so the second answer is a fresh scan.
        assert!(second.as_of > first.as_of);
    }
}

#[tokio::test]
async fn summary_accepts_folder_without_trailing_slash() {
    let datasets = MemoryDatasetStore::new().on_rows("folder/dataset_a.pdq", 7);
    let (agg, _, _) = aggregator(MemoryRecordStore::new(), datasets, settings("folder"));

    let summary = agg.signal_summary().await.unwrap();
    assert_eq!(summary.len(), 1);
    assert_eq!(summary[0].name, "dataset_a");
    assert_eq!(summary[0].signals[0].count, 7);
}
