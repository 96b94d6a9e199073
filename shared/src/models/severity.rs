//! Severity levels

use serde::{Deserialize, Serialize};

/// Ordered severity rank, shared by issues and entries.
///
/// `Unspecified` marks entries whose source has no data yet; issues never
/// carry it (rejected on write). The derived `Ord` drives every rollup and
/// sort in the aggregators.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    #[default]
    Unspecified,
    Ok,
    Recommendation,
    CriticalWarning,
}

impl Severity {
    /// Whether this level is valid for an issue.
    pub fn is_issue_level(self) -> bool {
        self > Severity::Unspecified
    }
}
