//! Persisted dismissal records
//!
//! The shape the issue ledger round-trips through the storage
//! collaborator. The core defines only this record, not the file format.

use serde::{Deserialize, Serialize};

/// One ledger row: issue identity in encoded form plus its timestamps.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DismissalRecord {
    /// `IssueKey::encode()` form.
    pub issue_key: String,
    /// When the issue key was first observed (millis). Set once, never
    /// updated while the record lives.
    pub first_seen_at: i64,
    /// When the issue was dismissed (millis), if it was.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dismissed_at: Option<i64>,
}
