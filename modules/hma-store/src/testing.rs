// In-memory store backends for tests.
//
// - MemoryRecordStore (RecordStore) — fixed record vectors, call log
// - MemoryDatasetStore (DatasetStore) — file name → raw body, same parser as the real store
//
// Both can be switched to fail every call with StoreError::Unavailable.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use hma_common::{
    ContentRecord, HashRecord, MatchRecord, Record, RecordKind, SignalMetadataRecord,
};

use crate::datasets::{DatasetLoad, DatasetStore};
use crate::error::{Result, StoreError};
use crate::records::RecordStore;

// ---------------------------------------------------------------------------
// MemoryRecordStore
// ---------------------------------------------------------------------------

/// Builder pattern: `.with_hash()`, `.with_match()`, `.with_metadata()`.
#[derive(Default)]
pub struct MemoryRecordStore {
    hashes: Vec<HashRecord>,
    matches: Vec<MatchRecord>,
    metadata: Vec<SignalMetadataRecord>,
    unavailable: bool,
    calls: Mutex<Vec<String>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hash(mut self, record: HashRecord) -> Self {
        self.hashes.push(record);
        self
    }

    pub fn with_match(mut self, record: MatchRecord) -> Self {
        self.matches.push(record);
        self
    }

    pub fn with_metadata(mut self, record: SignalMetadataRecord) -> Self {
        self.metadata.push(record);
        self
    }

    /// Every call fails as if the database were unreachable.
    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    /// Names of the trait methods called so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls().len()
    }

    fn record_call(&self, name: &str) -> Result<()> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(name.to_string());
        }
        if self.unavailable {
            return Err(StoreError::Unavailable(format!("{name}: connection refused")));
        }
        Ok(())
    }

    fn all(&self, kind: RecordKind) -> Vec<Record> {
        let mut records: Vec<Record> = match kind {
            RecordKind::Hash => self.hashes.iter().cloned().map(Record::from).collect(),
            RecordKind::Match => self.matches.iter().cloned().map(Record::from).collect(),
        };
        records.sort_by_key(|r| r.created_at());
        records
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn get_by_time_range(
        &self,
        kind: RecordKind,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Record>> {
        self.record_call("get_by_time_range")?;
        Ok(self
            .all(kind)
            .into_iter()
            .filter(|r| since.map_or(true, |since| r.created_at() >= since))
            .collect())
    }

    async fn get_by_content_id(&self, kind: RecordKind, content_id: &str) -> Result<Vec<Record>> {
        self.record_call("get_by_content_id")?;
        Ok(self
            .all(kind)
            .into_iter()
            .filter(|r| r.content_id() == content_id)
            .collect())
    }

    async fn get_by_signal(
        &self,
        signal_id: &str,
        signal_source: &str,
    ) -> Result<Vec<SignalMetadataRecord>> {
        self.record_call("get_by_signal")?;
        Ok(self
            .metadata
            .iter()
            .filter(|m| m.signal_id == signal_id && m.signal_source == signal_source)
            .cloned()
            .collect())
    }
}

// ---------------------------------------------------------------------------
// MemoryDatasetStore
// ---------------------------------------------------------------------------

/// File name → raw body. Builder pattern: `.on_file()`.
#[derive(Default)]
pub struct MemoryDatasetStore {
    files: BTreeMap<String, (Vec<u8>, Option<DateTime<Utc>>)>,
    unavailable: bool,
    loads: AtomicUsize,
}

impl MemoryDatasetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_file(mut self, name: &str, body: impl AsRef<[u8]>) -> Self {
        self.files
            .insert(name.to_string(), (body.as_ref().to_vec(), None));
        self
    }

    pub fn on_file_modified(
        mut self,
        name: &str,
        body: impl AsRef<[u8]>,
        modified: DateTime<Utc>,
    ) -> Self {
        self.files
            .insert(name.to_string(), (body.as_ref().to_vec(), Some(modified)));
        self
    }

    /// A file of `rows` valid PDQ-shaped rows.
    pub fn on_rows(self, name: &str, rows: usize) -> Self {
        let body: String = (0..rows)
            .map(|i| format!("{i:064x},{i},2021-01-01T00:00:00+0000,\n"))
            .collect();
        self.on_file(name, body)
    }

    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    /// How many full scans have been requested.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DatasetStore for MemoryDatasetStore {
    async fn load_all_datasets(&self) -> Result<DatasetLoad> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self.unavailable {
            return Err(StoreError::Unavailable("blob store unreachable".into()));
        }

        let mut load = DatasetLoad::default();
        for (name, (body, modified)) in &self.files {
            load.add_file(name, body, *modified);
        }
        Ok(load)
    }
}
