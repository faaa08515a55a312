use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HmaError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl HmaError {
    /// Only store failures are worth retrying. Every query is a read.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }
}

/// A dataset file that could not be parsed during a full scan.
///
/// Never fatal: the file is left out of aggregates and reported next to them.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("Malformed dataset {file} at line {line}: {reason}")]
pub struct DatasetParseError {
    pub file: String,
    pub line: usize,
    pub reason: String,
}

impl DatasetParseError {
    pub fn new(file: impl Into<String>, line: usize, reason: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line,
            reason: reason.into(),
        }
    }
}
