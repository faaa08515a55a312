//! Read access to the two stores behind the query layer.
//!
//! `RecordStore` covers hash, match and signal metadata records (Postgres).
//! `DatasetStore` covers bulk signal datasets exported as files (blob store).
//! Enable `test-support` for in-memory backends.

pub mod datasets;
pub mod error;
pub mod fs;
pub mod postgres;
pub mod records;
#[cfg(feature = "test-support")]
pub mod testing;

pub use datasets::{parse_dataset, DatasetLoad, DatasetStore, SignalDataset, SignalRow};
pub use error::{Result, StoreError};
pub use fs::FsDatasetStore;
pub use postgres::PgRecordStore;
pub use records::RecordStore;
