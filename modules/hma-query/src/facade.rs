use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use hma_common::{
    DashboardCount, HashSummary, HmaError, MatchDetail, MatchSummary, QuerySettings, RecordKind,
    SignalSourceSummary, SignalTotals,
};
use hma_store::{DatasetStore, RecordStore};

use crate::counts::CountAggregator;
use crate::matches::MatchAggregator;

/// Entry points for the API layer.
///
/// Holds only store handles and settings. Every operation is an independent
/// read, safe to run concurrently with any other.
#[derive(Clone)]
pub struct QueryFacade {
    matches: MatchAggregator,
    counts: CountAggregator,
}

impl QueryFacade {
    pub fn new(
        records: Arc<dyn RecordStore>,
        datasets: Arc<dyn DatasetStore>,
        settings: QuerySettings,
    ) -> Self {
        Self {
            matches: MatchAggregator::new(records.clone(), settings.namespace.clone()),
            counts: CountAggregator::new(records, datasets, settings),
        }
    }

    pub async fn list_matches(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<MatchSummary>, HmaError> {
        self.matches.list_matches(since).await
    }

    pub async fn match_details(&self, content_id: &str) -> Result<Vec<MatchDetail>, HmaError> {
        let content_id = validate_content_id(content_id)?;
        self.matches.match_details(content_id).await
    }

    pub async fn get_hash(&self, content_id: &str) -> Result<Option<HashSummary>, HmaError> {
        let content_id = validate_content_id(content_id)?;
        self.matches.get_hash(content_id).await
    }

    pub async fn signal_summary(&self) -> Result<Vec<SignalSourceSummary>, HmaError> {
        self.counts.signal_summary().await
    }

    pub async fn count_for(&self, kind: RecordKind) -> Result<DashboardCount, HmaError> {
        self.counts.count_for(kind).await
    }

    pub async fn signal_hash_counts(&self) -> Result<BTreeMap<String, usize>, HmaError> {
        self.counts.signal_hash_counts().await
    }

    pub async fn signal_totals(&self) -> Result<SignalTotals, HmaError> {
        self.counts.signal_totals().await
    }
}

fn validate_content_id(content_id: &str) -> Result<&str, HmaError> {
    if content_id.trim().is_empty() {
        return Err(HmaError::Validation("content_id must not be empty".into()));
    }
    Ok(content_id)
}
