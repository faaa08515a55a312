pub mod types;
pub mod namespace;
pub mod config;
pub mod error;
pub mod schema;

pub use types::*;
pub use namespace::ContentNamespace;
pub use config::{folder_prefix, Config, DatasetExtension, QuerySettings};
pub use error::{DatasetParseError, HmaError};
pub use schema::output_schemas;
