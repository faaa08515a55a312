use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::HmaError;

// --- Enums ---

/// Hash algorithm family a record or dataset belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SignalType {
    Pdq,
    Md5,
    VideoMd5,
}

impl SignalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdq => "pdq",
            Self::Md5 => "md5",
            Self::VideoMd5 => "video_md5",
        }
    }

    /// ThreatExchange indicator type, used when summarizing datasets.
    pub fn indicator_type(&self) -> &'static str {
        match self {
            Self::Pdq => "HASH_PDQ",
            Self::Md5 => "HASH_MD5",
            Self::VideoMd5 => "HASH_VIDEO_MD5",
        }
    }
}

impl fmt::Display for SignalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignalType {
    type Err = HmaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pdq" | "hash_pdq" => Ok(Self::Pdq),
            "md5" | "hash_md5" => Ok(Self::Md5),
            "video_md5" | "hash_video_md5" => Ok(Self::VideoMd5),
            other => Err(HmaError::Validation(format!("unknown signal type: {other}"))),
        }
    }
}

/// The record kinds that carry a content id and a timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Hash,
    Match,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hash => "hash",
            Self::Match => "match",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordKind {
    type Err = HmaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hash" | "hashes" => Ok(Self::Hash),
            "match" | "matches" => Ok(Self::Match),
            other => Err(HmaError::Validation(format!("unknown record kind: {other}"))),
        }
    }
}

/// Human opinion on a signal, derived from its classification tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum Opinion {
    #[serde(rename = "True Positive")]
    TruePositive,
    #[serde(rename = "False Positive")]
    FalsePositive,
    #[serde(rename = "Unknown (Disputed)")]
    Disputed,
    #[serde(rename = "Unknown")]
    Unknown,
}

impl Opinion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TruePositive => "True Positive",
            Self::FalsePositive => "False Positive",
            Self::Disputed => "Unknown (Disputed)",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Opinion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Records ---

/// Fields shared by every record keyed on content.
pub trait ContentRecord {
    /// Content id as stored, namespace prefix included.
    fn content_id(&self) -> &str;
    fn created_at(&self) -> DateTime<Utc>;
}

/// Perceptual hash computed for a content item by the ingestion pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HashRecord {
    pub content_id: String,
    pub content_hash: String,
    pub signal_type: SignalType,
    pub created_at: DateTime<Utc>,
}

/// A content hash that matched a known signal hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub content_id: String,
    pub content_hash: String,
    pub signal_id: String,
    pub signal_hash: String,
    pub signal_source: String,
    pub signal_type: SignalType,
    pub created_at: DateTime<Utc>,
}

impl ContentRecord for HashRecord {
    fn content_id(&self) -> &str {
        &self.content_id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl ContentRecord for MatchRecord {
    fn content_id(&self) -> &str {
        &self.content_id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record {
    Hash(HashRecord),
    Match(MatchRecord),
}

impl Record {
    pub fn into_hash(self) -> Option<HashRecord> {
        match self {
            Self::Hash(r) => Some(r),
            Self::Match(_) => None,
        }
    }

    pub fn into_match(self) -> Option<MatchRecord> {
        match self {
            Self::Match(r) => Some(r),
            Self::Hash(_) => None,
        }
    }
}

impl ContentRecord for Record {
    fn content_id(&self) -> &str {
        match self {
            Self::Hash(r) => r.content_id(),
            Self::Match(r) => r.content_id(),
        }
    }

    fn created_at(&self) -> DateTime<Utc> {
        match self {
            Self::Hash(r) => r.created_at(),
            Self::Match(r) => r.created_at(),
        }
    }
}

impl From<HashRecord> for Record {
    fn from(r: HashRecord) -> Self {
        Self::Hash(r)
    }
}

impl From<MatchRecord> for Record {
    fn from(r: MatchRecord) -> Self {
        Self::Match(r)
    }
}

/// Classification info a dataset asserts about a signal.
///
/// `signal_id` is only unique within a `signal_source`, so lookups always
/// use both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalMetadataRecord {
    pub signal_id: String,
    pub signal_source: String,
    pub dataset_id: String,
    pub tags: BTreeSet<String>,
}

// --- Query results ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MatchSummary {
    pub content_id: String,
    pub signal_id: String,
    pub signal_source: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct MatchDetailsMetadata {
    pub dataset: String,
    pub tags: Vec<String>,
    pub opinion: Opinion,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MatchDetail {
    pub content_id: String,
    pub content_hash: String,
    pub signal_id: String,
    pub signal_hash: String,
    pub signal_source: String,
    pub signal_type: SignalType,
    pub updated_at: DateTime<Utc>,
    pub metadata: Vec<MatchDetailsMetadata>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct HashSummary {
    pub content_id: String,
    pub content_hash: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SignalSourceType {
    #[serde(rename = "type")]
    pub signal_type: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SignalSourceSummary {
    pub name: String,
    pub signals: Vec<SignalSourceType>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DashboardCount {
    pub total: usize,
    pub today: usize,
    pub as_of: DateTime<Utc>,
}

/// Signal rows across all datasets. Not the number of unique hashes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SignalTotals {
    pub total: usize,
    pub as_of: DateTime<Utc>,
}
