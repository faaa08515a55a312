//! Postgres-backed `RecordStore`.
//!
//! Tables are written by the hashing/matching pipeline. This side only
//! reads, plus `migrate()` so a fresh database has the expected schema.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{debug, info};

use hma_common::{
    HashRecord, MatchRecord, Record, RecordKind, SignalMetadataRecord, SignalType,
};

use crate::error::{Result, StoreError};
use crate::records::RecordStore;

const MAX_CONNECTIONS: u32 = 10;

#[derive(Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect(database_url)
            .await?;
        info!("Connected to record store");
        Ok(Self::new(pool))
    }

    /// Run the embedded SQL migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

#[derive(Debug, sqlx::FromRow)]
struct HashRow {
    content_id: String,
    content_hash: String,
    signal_type: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct MatchRow {
    content_id: String,
    content_hash: String,
    signal_id: String,
    signal_hash: String,
    signal_source: String,
    signal_type: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct MetadataRow {
    signal_id: String,
    signal_source: String,
    dataset_id: String,
    tags: Vec<String>,
}

fn parse_signal_type(table: &'static str, raw: &str) -> Result<SignalType> {
    raw.parse().map_err(|_| StoreError::Corrupt {
        table,
        reason: format!("unknown signal_type {raw:?}"),
    })
}

impl TryFrom<HashRow> for Record {
    type Error = StoreError;

    fn try_from(row: HashRow) -> Result<Self> {
        Ok(Record::Hash(HashRecord {
            signal_type: parse_signal_type("hash_records", &row.signal_type)?,
            content_id: row.content_id,
            content_hash: row.content_hash,
            created_at: row.created_at,
        }))
    }
}

impl TryFrom<MatchRow> for Record {
    type Error = StoreError;

    fn try_from(row: MatchRow) -> Result<Self> {
        Ok(Record::Match(MatchRecord {
            signal_type: parse_signal_type("match_records", &row.signal_type)?,
            content_id: row.content_id,
            content_hash: row.content_hash,
            signal_id: row.signal_id,
            signal_hash: row.signal_hash,
            signal_source: row.signal_source,
            created_at: row.created_at,
        }))
    }
}

impl From<MetadataRow> for SignalMetadataRecord {
    fn from(row: MetadataRow) -> Self {
        Self {
            signal_id: row.signal_id,
            signal_source: row.signal_source,
            dataset_id: row.dataset_id,
            tags: row.tags.into_iter().collect::<BTreeSet<_>>(),
        }
    }
}

fn table_for(kind: RecordKind) -> &'static str {
    match kind {
        RecordKind::Hash => "hash_records",
        RecordKind::Match => "match_records",
    }
}

// ---------------------------------------------------------------------------
// RecordStore
// ---------------------------------------------------------------------------

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn get_by_time_range(
        &self,
        kind: RecordKind,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Record>> {
        let records = match kind {
            RecordKind::Hash => sqlx::query_as::<_, HashRow>(
                r#"
                SELECT content_id, content_hash, signal_type, created_at
                FROM hash_records
                WHERE ($1::timestamptz IS NULL OR created_at >= $1)
                ORDER BY created_at ASC
                "#,
            )
            .bind(since)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Record::try_from)
            .collect::<Result<Vec<_>>>()?,
            RecordKind::Match => sqlx::query_as::<_, MatchRow>(
                r#"
                SELECT content_id, content_hash, signal_id, signal_hash, signal_source,
                       signal_type, created_at
                FROM match_records
                WHERE ($1::timestamptz IS NULL OR created_at >= $1)
                ORDER BY created_at ASC
                "#,
            )
            .bind(since)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Record::try_from)
            .collect::<Result<Vec<_>>>()?,
        };

        debug!(kind = %kind, ?since, count = records.len(), "Read records by time range");
        Ok(records)
    }

    async fn get_by_content_id(&self, kind: RecordKind, content_id: &str) -> Result<Vec<Record>> {
        match kind {
            RecordKind::Hash => sqlx::query_as::<_, HashRow>(
                r#"
                SELECT content_id, content_hash, signal_type, created_at
                FROM hash_records
                WHERE content_id = $1
                ORDER BY created_at ASC
                "#,
            )
            .bind(content_id)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Record::try_from)
            .collect(),
            RecordKind::Match => sqlx::query_as::<_, MatchRow>(
                r#"
                SELECT content_id, content_hash, signal_id, signal_hash, signal_source,
                       signal_type, created_at
                FROM match_records
                WHERE content_id = $1
                ORDER BY created_at ASC
                "#,
            )
            .bind(content_id)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Record::try_from)
            .collect(),
        }
    }

    async fn get_by_signal(
        &self,
        signal_id: &str,
        signal_source: &str,
    ) -> Result<Vec<SignalMetadataRecord>> {
        let rows = sqlx::query_as::<_, MetadataRow>(
            r#"
            SELECT signal_id, signal_source, dataset_id, tags
            FROM signal_metadata
            WHERE signal_id = $1 AND signal_source = $2
            ORDER BY dataset_id ASC
            "#,
        )
        .bind(signal_id)
        .bind(signal_source)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn count_by_time_range(
        &self,
        kind: RecordKind,
        since: Option<DateTime<Utc>>,
    ) -> Result<usize> {
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE ($1::timestamptz IS NULL OR created_at >= $1)",
            table_for(kind)
        );
        let count = sqlx::query_scalar::<_, i64>(&sql)
            .bind(since)
            .fetch_one(&self.pool)
            .await?;

        Ok(usize::try_from(count).unwrap_or_default())
    }
}
