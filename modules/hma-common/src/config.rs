use std::env;
use std::time::Duration;

use tracing::info;

use crate::error::HmaError;
use crate::namespace::ContentNamespace;
use crate::types::SignalType;

const DEFAULT_CONTENT_NAMESPACE: &str = "images/";
const DEFAULT_DATASET_FOLDER: &str = "threat_exchange_data/";
const DEFAULT_DATASET_EXTENSIONS: &str = ".pdq=pdq";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Record store
    pub database_url: String,

    // Dataset store
    pub dataset_root: String,
    pub dataset_folder: String,
    pub dataset_extensions: Vec<DatasetExtension>,

    // Query layer
    pub content_namespace: String,
    pub count_cache_ttl_secs: u64,
}

/// Maps a dataset file suffix to the signal type its rows hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetExtension {
    pub extension: String,
    pub signal_type: SignalType,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, HmaError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, HmaError> {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| HmaError::Config(format!("{key} environment variable is required")))
        };
        let optional = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let count_cache_ttl_secs = optional("HMA_COUNT_CACHE_TTL_SECS", "0")
            .parse()
            .map_err(|_| HmaError::Config("HMA_COUNT_CACHE_TTL_SECS must be a number".into()))?;

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            dataset_root: required("HMA_DATASET_ROOT")?,
            dataset_folder: folder_prefix(&optional("HMA_DATASET_FOLDER", DEFAULT_DATASET_FOLDER)),
            dataset_extensions: parse_extensions(&optional(
                "HMA_DATASET_EXTENSIONS",
                DEFAULT_DATASET_EXTENSIONS,
            ))?,
            content_namespace: optional("HMA_CONTENT_NAMESPACE", DEFAULT_CONTENT_NAMESPACE),
            count_cache_ttl_secs,
        })
    }

    pub fn query_settings(&self) -> QuerySettings {
        QuerySettings {
            namespace: ContentNamespace::new(self.content_namespace.clone()),
            dataset_folder: self.dataset_folder.clone(),
            dataset_extensions: self.dataset_extensions.clone(),
            count_cache_ttl: Duration::from_secs(self.count_cache_ttl_secs),
            ..QuerySettings::default()
        }
    }

    /// Log the effective configuration without credentials.
    pub fn log_redacted(&self) {
        let extensions: Vec<String> = self
            .dataset_extensions
            .iter()
            .map(|e| format!("{}={}", e.extension, e.signal_type))
            .collect();
        info!(
            database = %redact_url(&self.database_url),
            dataset_root = %self.dataset_root,
            dataset_folder = %self.dataset_folder,
            dataset_extensions = %extensions.join(","),
            content_namespace = %self.content_namespace,
            count_cache_ttl_secs = self.count_cache_ttl_secs,
            "Loaded configuration"
        );
    }
}

/// Everything the query layer needs besides its store handles.
#[derive(Debug, Clone)]
pub struct QuerySettings {
    pub namespace: ContentNamespace,
    pub dataset_folder: String,
    pub dataset_extensions: Vec<DatasetExtension>,
    /// Zero disables the count cache.
    pub count_cache_ttl: Duration,
    /// Width of the rolling "today" window.
    pub today_window: Duration,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            namespace: ContentNamespace::new(DEFAULT_CONTENT_NAMESPACE),
            dataset_folder: DEFAULT_DATASET_FOLDER.to_string(),
            dataset_extensions: vec![DatasetExtension {
                extension: ".pdq".to_string(),
                signal_type: SignalType::Pdq,
            }],
            count_cache_ttl: Duration::ZERO,
            today_window: Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl QuerySettings {
    /// The configured extension a dataset file name ends with. Longest suffix wins.
    pub fn extension_for(&self, file_name: &str) -> Option<&DatasetExtension> {
        self.dataset_extensions
            .iter()
            .filter(|e| file_name.ends_with(e.extension.as_str()))
            .max_by_key(|e| e.extension.len())
    }
}

/// Blob-store folder as a key prefix: no leading slash and exactly one
/// trailing slash, or empty for the bucket root.
pub fn folder_prefix(folder: &str) -> String {
    match folder.trim_matches('/') {
        "" => String::new(),
        folder => format!("{folder}/"),
    }
}

fn parse_extensions(raw: &str) -> Result<Vec<DatasetExtension>, HmaError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (extension, signal_type) = entry.split_once('=').ok_or_else(|| {
                HmaError::Config(format!("dataset extension entry {entry:?} is not ext=type"))
            })?;
            let signal_type = signal_type
                .parse::<SignalType>()
                .map_err(|e| HmaError::Config(e.to_string()))?;
            Ok(DatasetExtension {
                extension: extension.trim().to_string(),
                signal_type,
            })
        })
        .collect()
}

fn redact_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***{}", &url[..scheme_end], &url[at..])
        }
        _ => url.to_string(),
    }
}
