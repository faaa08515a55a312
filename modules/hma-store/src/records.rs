use async_trait::async_trait;
use chrono::{DateTime, Utc};

use hma_common::{Record, RecordKind, SignalMetadataRecord};

use crate::error::Result;

/// Read-only access to hash, match and signal metadata records.
///
/// Content ids passed in and returned here are storage ids, namespace
/// prefix included. Absence is an empty `Vec`, never an error.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Records of `kind` created at or after `since`, oldest first.
    /// `None` returns every record of that kind.
    async fn get_by_time_range(
        &self,
        kind: RecordKind,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Record>>;

    /// Records of `kind` for an exact stored content id.
    async fn get_by_content_id(&self, kind: RecordKind, content_id: &str) -> Result<Vec<Record>>;

    /// Metadata records for one signal. Both fields are required: signal ids
    /// repeat across sources.
    async fn get_by_signal(
        &self,
        signal_id: &str,
        signal_source: &str,
    ) -> Result<Vec<SignalMetadataRecord>>;

    /// Number of records `get_by_time_range` would return.
    async fn count_by_time_range(
        &self,
        kind: RecordKind,
        since: Option<DateTime<Utc>>,
    ) -> Result<usize> {
        Ok(self.get_by_time_range(kind, since).await?.len())
    }
}
