//! Query layer over content matches and signal datasets.
//!
//! `QueryFacade` is the public surface. It answers "has this content matched
//! a known signal, and what do we know about that signal", plus dashboard
//! counts, by joining the record store against the dataset store.

pub mod cache;
pub mod counts;
pub mod facade;
pub mod matches;
pub mod opinion;

pub use counts::{CountAggregator, DatasetCount, DatasetCounts};
pub use facade::QueryFacade;
pub use matches::MatchAggregator;
pub use opinion::{classify, display_tags};
