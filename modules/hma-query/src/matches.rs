//! Match-level queries: raw match listings, enriched match details, hashes.
//!
//! Details join each `MatchRecord` against the signal metadata scoped to its
//! `(signal_id, signal_source)`. A match with no metadata still yields a
//! detail entry, just with an empty `metadata` list.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use tracing::debug;

use hma_common::{
    ContentNamespace, ContentRecord, HashSummary, HmaError, MatchDetail, MatchDetailsMetadata,
    MatchRecord, MatchSummary, RecordKind, SignalMetadataRecord,
};
use hma_store::RecordStore;

use crate::opinion::{classify, display_tags};

type SignalKey = (String, String);

#[derive(Clone)]
pub struct MatchAggregator {
    records: Arc<dyn RecordStore>,
    namespace: ContentNamespace,
}

impl MatchAggregator {
    pub fn new(records: Arc<dyn RecordStore>, namespace: ContentNamespace) -> Self {
        Self { records, namespace }
    }

    /// One summary per match record since `since`. No metadata join.
    pub async fn list_matches(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<MatchSummary>, HmaError> {
        let records = self
            .records
            .get_by_time_range(RecordKind::Match, since)
            .await?;

        Ok(records
            .into_iter()
            .filter_map(|r| r.into_match())
            .map(|r| MatchSummary {
                content_id: self.namespace.strip(&r.content_id).to_string(),
                signal_id: r.signal_id,
                signal_source: r.signal_source,
                updated_at: r.created_at,
            })
            .collect())
    }

    pub async fn match_details(&self, content_id: &str) -> Result<Vec<MatchDetail>, HmaError> {
        let stored_id = self.namespace.apply(content_id);
        let matches: Vec<MatchRecord> = self
            .records
            .get_by_content_id(RecordKind::Match, &stored_id)
            .await?
            .into_iter()
            .filter_map(|r| r.into_match())
            .collect();

        if matches.is_empty() {
            debug!(content_id, "No matches for content");
            return Ok(Vec::new());
        }

        let metadata = self.metadata_for(&matches).await?;

        Ok(matches
            .into_iter()
            .map(|m| {
                let entries = metadata
                    .get(&(m.signal_id.clone(), m.signal_source.clone()))
                    .map(|records| records.iter().map(to_metadata_entry).collect())
                    .unwrap_or_default();
                MatchDetail {
                    content_id: self.namespace.strip(&m.content_id).to_string(),
                    content_hash: m.content_hash,
                    signal_id: m.signal_id,
                    signal_hash: m.signal_hash,
                    signal_source: m.signal_source,
                    signal_type: m.signal_type,
                    updated_at: m.created_at,
                    metadata: entries,
                }
            })
            .collect())
    }

    /// Most recent hash recorded for the content, if any.
    pub async fn get_hash(&self, content_id: &str) -> Result<Option<HashSummary>, HmaError> {
        let stored_id = self.namespace.apply(content_id);
        let latest = self
            .records
            .get_by_content_id(RecordKind::Hash, &stored_id)
            .await?
            .into_iter()
            .filter_map(|r| r.into_hash())
            .max_by_key(|r| r.created_at());

        Ok(latest.map(|r| HashSummary {
            content_id: self.namespace.strip(&r.content_id).to_string(),
            content_hash: r.content_hash,
            updated_at: r.created_at,
        }))
    }

    /// Fetch metadata for every distinct signal referenced by `matches`,
    /// concurrently. Signals with an empty id or source are never looked up.
    async fn metadata_for(
        &self,
        matches: &[MatchRecord],
    ) -> Result<HashMap<SignalKey, Vec<SignalMetadataRecord>>, HmaError> {
        let keys: BTreeSet<SignalKey> = matches
            .iter()
            .filter(|m| !m.signal_id.is_empty() && !m.signal_source.is_empty())
            .map(|m| (m.signal_id.clone(), m.signal_source.clone()))
            .collect();

        let lookups = keys.into_iter().map(|(signal_id, signal_source)| async move {
            let records = self.records.get_by_signal(&signal_id, &signal_source).await?;
            Ok::<_, HmaError>(((signal_id, signal_source), records))
        });

        let resolved = try_join_all(lookups).await?;
        debug!(signals = resolved.len(), "Resolved signal metadata");
        Ok(resolved.into_iter().collect())
    }
}

fn to_metadata_entry(record: &SignalMetadataRecord) -> MatchDetailsMetadata {
    MatchDetailsMetadata {
        dataset: record.dataset_id.clone(),
        tags: display_tags(&record.tags),
        opinion: classify(&record.tags),
    }
}
