//! Dashboard aggregates over records and signal datasets.
//!
//! Record counts scan the record store twice per call (all time, then the
//! rolling window). Dataset counts re-read every dataset file. Both are
//! optionally served from a `CountCache`; a cached answer is at most one TTL old.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use hma_common::{
    folder_prefix, DashboardCount, DatasetParseError, HmaError, QuerySettings, RecordKind,
    SignalSourceSummary, SignalSourceType, SignalTotals,
};
use hma_store::{DatasetStore, RecordStore};

use crate::cache::CountCache;

const CACHE_MAX_ENTRIES: usize = 64;

/// Row count and age of one dataset file.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetCount {
    pub rows: usize,
    pub last_modified: Option<DateTime<Utc>>,
}

/// Per-file row counts from one full dataset scan.
#[derive(Debug, Clone)]
pub struct DatasetCounts {
    pub files: BTreeMap<String, DatasetCount>,
    pub failures: Vec<DatasetParseError>,
    /// When the underlying scan ran. A cached scan keeps its original time.
    pub scanned_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct CountAggregator {
    records: Arc<dyn RecordStore>,
    datasets: Arc<dyn DatasetStore>,
    settings: QuerySettings,
    record_cache: CountCache<RecordKind, DashboardCount>,
    dataset_cache: CountCache<(), Arc<DatasetCounts>>,
}

impl CountAggregator {
    pub fn new(
        records: Arc<dyn RecordStore>,
        datasets: Arc<dyn DatasetStore>,
        settings: QuerySettings,
    ) -> Self {
        let ttl = settings.count_cache_ttl;
        Self {
            records,
            datasets,
            settings,
            record_cache: CountCache::new(CACHE_MAX_ENTRIES, ttl),
            dataset_cache: CountCache::new(CACHE_MAX_ENTRIES, ttl),
        }
    }

    /// Total and rolling-window counts for a record kind.
    pub async fn count_for(&self, kind: RecordKind) -> Result<DashboardCount, HmaError> {
        let now = Utc::now();
        if let Some(cached) = self.record_cache.get(&kind, now).await {
            debug!(kind = %kind, "Serving record count from cache");
            return Ok(cached);
        }

        let window = chrono::Duration::from_std(self.settings.today_window)
            .map_err(|e| HmaError::Config(format!("today window out of range: {e}")))?;
        let since = now - window;

        let (total, today) = tokio::try_join!(
            self.records.count_by_time_range(kind, None),
            self.records.count_by_time_range(kind, Some(since)),
        )?;

        // The two scans are not a snapshot; ingestion between them must not
        // push `today` past `total`.
        let count = DashboardCount {
            total,
            today: today.min(total),
            as_of: now,
        };
        self.record_cache.put(kind, now, count).await;
        Ok(count)
    }

    /// Row counts per dataset file, keyed by the file name as stored.
    pub async fn signal_hash_counts(&self) -> Result<BTreeMap<String, usize>, HmaError> {
        let counts = self.dataset_counts().await?;
        Ok(counts
            .files
            .iter()
            .map(|(name, count)| (name.clone(), count.rows))
            .collect())
    }

    /// One entry per dataset file with a known extension. The display name
    /// drops the folder prefix and the extension.
    pub async fn signal_summary(&self) -> Result<Vec<SignalSourceSummary>, HmaError> {
        let counts = self.dataset_counts().await?;
        let folder = folder_prefix(&self.settings.dataset_folder);

        Ok(counts
            .files
            .iter()
            .filter_map(|(file_name, count)| {
                let Some(extension) = self.settings.extension_for(file_name) else {
                    debug!(file = %file_name, "No signal type configured for dataset, skipping");
                    return None;
                };
                let name = file_name
                    .strip_prefix(folder.as_str())
                    .unwrap_or(file_name);
                let name = name
                    .strip_suffix(extension.extension.as_str())
                    .unwrap_or(name);

                Some(SignalSourceSummary {
                    name: name.to_string(),
                    signals: vec![SignalSourceType {
                        signal_type: extension.signal_type.indicator_type().to_string(),
                        count: count.rows,
                    }],
                    updated_at: count.last_modified,
                })
            })
            .collect())
    }

    /// Signal rows across every dataset.
    pub async fn signal_totals(&self) -> Result<SignalTotals, HmaError> {
        let counts = self.dataset_counts().await?;
        Ok(SignalTotals {
            total: counts.files.values().map(|c| c.rows).sum(),
            as_of: counts.scanned_at,
        })
    }

    /// Scan (or reuse a cached scan of) every dataset.
    pub async fn dataset_counts(&self) -> Result<Arc<DatasetCounts>, HmaError> {
        let now = Utc::now();
        if let Some(cached) = self.dataset_cache.get(&(), now).await {
            debug!("Serving dataset counts from cache");
            return Ok(cached);
        }

        let load = self.datasets.load_all_datasets().await?;
        if !load.failures.is_empty() {
            let files: Vec<&str> = load.failures.iter().map(|f| f.file.as_str()).collect();
            warn!(skipped = ?files, "Datasets excluded from counts");
        }

        let counts = Arc::new(DatasetCounts {
            files: load
                .datasets
                .into_iter()
                .map(|(name, dataset)| {
                    let count = DatasetCount {
                        rows: dataset.rows.len(),
                        last_modified: dataset.last_modified,
                    };
                    (name, count)
                })
                .collect(),
            failures: load.failures,
            scanned_at: now,
        });
        info!(
            datasets = counts.files.len(),
            failures = counts.failures.len(),
            "Counted signal datasets"
        );

        self.dataset_cache.put((), now, counts.clone()).await;
        Ok(counts)
    }
}
