//! Filesystem-backed `DatasetStore`.
//!
//! The blob store is laid out as `root/folder/<file>`: a mounted bucket or a
//! local copy of the signal exports. Sub-directories are not descended into.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hma_common::{folder_prefix, DatasetParseError};
use tokio::fs;
use tracing::{debug, info};

use crate::datasets::{DatasetLoad, DatasetStore};
use crate::error::{Result, StoreError};

pub struct FsDatasetStore {
    root: PathBuf,
    folder: String,
}

impl FsDatasetStore {
    /// `folder` is the key prefix inside `root`, e.g. `threat_exchange_data/`.
    /// A missing trailing slash is added.
    pub fn new(root: impl AsRef<Path>, folder: impl AsRef<str>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            folder: folder_prefix(folder.as_ref()),
        }
    }

    fn folder_path(&self) -> PathBuf {
        match self.folder.trim_end_matches('/') {
            "" => self.root.clone(),
            folder => self.root.join(folder),
        }
    }

    /// Key a file the way the blob store names it: folder prefix + file name.
    fn key_for(&self, file_name: &str) -> String {
        format!("{}{}", self.folder, file_name)
    }
}

#[async_trait]
impl DatasetStore for FsDatasetStore {
    /// Only a folder that cannot be listed fails the load. A single file that
    /// cannot be read is reported in `failures` and the scan goes on.
    async fn load_all_datasets(&self) -> Result<DatasetLoad> {
        let dir = self.folder_path();
        let mut entries = fs::read_dir(&dir)
            .await
            .map_err(|e| StoreError::io(&dir, e))?;

        let mut load = DatasetLoad::default();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::io(&dir, e))?
        {
            let path = entry.path();
            let raw_name = entry.file_name();
            let key = self.key_for(&raw_name.to_string_lossy());

            let metadata = match fs::metadata(&path).await {
                Ok(metadata) => metadata,
                Err(e) => {
                    load.add_failure(DatasetParseError::new(key, 0, format!("cannot stat: {e}")));
                    continue;
                }
            };
            if !metadata.is_file() {
                debug!(path = %path.display(), "Skipping non-file entry");
                continue;
            }

            if raw_name.to_str().is_none() {
                load.add_failure(DatasetParseError::new(key, 0, "file name is not UTF-8"));
                continue;
            }

            let body = match fs::read(&path).await {
                Ok(body) => body,
                Err(e) => {
                    load.add_failure(DatasetParseError::new(key, 0, format!("cannot read: {e}")));
                    continue;
                }
            };
            let last_modified = metadata.modified().ok().map(DateTime::<Utc>::from);
            load.add_file(&key, &body, last_modified);
        }

        info!(
            folder = %dir.display(),
            datasets = load.datasets.len(),
            failures = load.failures.len(),
            "Loaded signal datasets"
        );
        Ok(load)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_carry_folder_prefix() {
        let store = FsDatasetStore::new("/data", "threat_exchange_data/");
        assert_eq!(store.key_for("a.pdq"), "threat_exchange_data/a.pdq");
        assert_eq!(store.folder_path(), PathBuf::from("/data/threat_exchange_data"));
    }

    #[test]
    fn folder_without_trailing_slash_gets_separator() {
        let store = FsDatasetStore::new("/data", "threat_exchange_data");
        assert_eq!(store.key_for("a.pdq"), "threat_exchange_data/a.pdq");
        assert_eq!(store.folder_path(), PathBuf::from("/data/threat_exchange_data"));
    }

    #[test]
    fn empty_folder_reads_root() {
        let store = FsDatasetStore::new("/data", "");
        assert_eq!(store.folder_path(), PathBuf::from("/data"));
        assert_eq!(store.key_for("a.pdq"), "a.pdq");
    }
}
