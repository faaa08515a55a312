use std::collections::BTreeSet;

use hma_common::Opinion;

pub const TRUE_POSITIVE: &str = "true_positive";
pub const FALSE_POSITIVE: &str = "false_positive";
pub const DISPUTED: &str = "disputed";

/// Tags that carry a classification rather than a description.
pub const RESERVED_TAGS: [&str; 3] = [TRUE_POSITIVE, FALSE_POSITIVE, DISPUTED];

/// Derive an opinion from a signal's tags. The first reserved tag present,
/// in precedence order, decides.
pub fn classify(tags: &BTreeSet<String>) -> Opinion {
    if tags.contains(TRUE_POSITIVE) {
        Opinion::TruePositive
    } else if tags.contains(FALSE_POSITIVE) {
        Opinion::FalsePositive
    } else if tags.contains(DISPUTED) {
        Opinion::Disputed
    } else {
        Opinion::Unknown
    }
}

pub fn is_reserved(tag: &str) -> bool {
    RESERVED_TAGS.contains(&tag)
}

/// Tags safe to show as metadata, in sorted order.
pub fn display_tags(tags: &BTreeSet<String>) -> Vec<String> {
    tags.iter().filter(|t| !is_reserved(t)).cloned().collect()
}
