use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::warn;

use hma_common::DatasetParseError;

use crate::error::Result;

/// One signal in a dataset export: the hash plus whatever columns follow it
/// (indicator id, last update, tags).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalRow {
    pub hash: String,
    pub fields: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignalDataset {
    pub file_name: String,
    pub rows: Vec<SignalRow>,
    pub last_modified: Option<DateTime<Utc>>,
}

/// Result of a full dataset scan. Files that failed to parse are listed in
/// `failures` and absent from `datasets`.
#[derive(Debug, Clone, Default)]
pub struct DatasetLoad {
    pub datasets: BTreeMap<String, SignalDataset>,
    pub failures: Vec<DatasetParseError>,
}

impl DatasetLoad {
    /// Parse one file body into the load, recording a failure instead of
    /// returning it.
    pub fn add_file(&mut self, file_name: &str, body: &[u8], last_modified: Option<DateTime<Utc>>) {
        let parsed = std::str::from_utf8(body)
            .map_err(|e| DatasetParseError::new(file_name, 0, format!("not UTF-8: {e}")))
            .and_then(|text| parse_dataset(file_name, text));

        match parsed {
            Ok(rows) => {
                self.datasets.insert(
                    file_name.to_string(),
                    SignalDataset {
                        file_name: file_name.to_string(),
                        rows,
                        last_modified,
                    },
                );
            }
            Err(failure) => self.add_failure(failure),
        }
    }

    /// Record a dataset that could not be loaded. It stays out of every aggregate.
    pub fn add_failure(&mut self, failure: DatasetParseError) {
        warn!(file = %failure.file, line = failure.line, reason = %failure.reason, "Skipping malformed dataset");
        self.failures.push(failure);
    }

    pub fn row_counts(&self) -> BTreeMap<String, usize> {
        self.datasets
            .iter()
            .map(|(name, dataset)| (name.clone(), dataset.rows.len()))
            .collect()
    }
}

/// Parse a ThreatExchange signal export: one comma-separated row per line,
/// hash first. Blank lines are ignored.
pub fn parse_dataset(file_name: &str, body: &str) -> std::result::Result<Vec<SignalRow>, DatasetParseError> {
    let mut rows = Vec::new();

    for (idx, line) in body.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let mut columns = line.split(',').map(str::trim);
        let hash = columns.next().unwrap_or_default();
        if hash.is_empty() {
            return Err(DatasetParseError::new(file_name, idx + 1, "empty hash"));
        }
        if !hash.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(DatasetParseError::new(
                file_name,
                idx + 1,
                format!("hash {hash:?} is not hexadecimal"),
            ));
        }

        rows.push(SignalRow {
            hash: hash.to_ascii_lowercase(),
            fields: columns.map(str::to_string).collect(),
        });
    }

    Ok(rows)
}

/// Bulk read access to signal datasets in a blob store.
#[async_trait]
pub trait DatasetStore: Send + Sync {
    /// Read every dataset file under the configured folder, keyed by file
    /// name with the folder prefix. No caching: each call re-reads everything.
    async fn load_all_datasets(&self) -> Result<DatasetLoad>;
}
