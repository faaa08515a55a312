//! JSON Schemas for every query result, keyed by the CLI command that emits it.

use std::collections::BTreeMap;

use schemars::schema::RootSchema;
use schemars::schema_for;

use crate::types::{
    DashboardCount, HashSummary, MatchDetail, MatchSummary, SignalSourceSummary, SignalTotals,
};

pub fn output_schemas() -> BTreeMap<&'static str, RootSchema> {
    BTreeMap::from([
        ("matches", schema_for!(Vec<MatchSummary>)),
        ("match", schema_for!(Vec<MatchDetail>)),
        ("hash", schema_for!(Option<HashSummary>)),
        ("signals", schema_for!(Vec<SignalSourceSummary>)),
        ("counts", schema_for!(DashboardCount)),
        ("hash-counts", schema_for!(BTreeMap<String, usize>)),
        ("signal-totals", schema_for!(SignalTotals)),
    ])
}
