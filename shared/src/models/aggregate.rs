//! Aggregate output shapes
//!
//! What the service computes for UI clients: an overall status, the
//! visible issues, the entry tree and the static entries. Compared by
//! value per listener registration to suppress no-op pushes, so every
//! type here derives `PartialEq`.

use serde::{Deserialize, Serialize};

use super::severity::Severity;
use super::source::{Issue, NavigationTarget};
use crate::ids::{IssueKey, UserId};

/// Top-level summary line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AggregateStatus {
    pub title: String,
    pub summary: String,
    pub severity: Severity,
    /// Set when entries signal worse than any actionable issue does.
    pub settings_to_review: bool,
}

/// A visible issue with its aggregation context.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AggregateIssue {
    pub key: IssueKey,
    /// Group the reporting source is declared under.
    pub group_id: String,
    /// Other group ids this issue would have appeared under before
    /// deduplication collapsed it.
    #[serde(default)]
    pub also_affects: Vec<String>,
    /// Source action ids currently executing for this issue.
    #[serde(default)]
    pub actions_in_flight: Vec<String>,
    pub issue: Issue,
}

/// One dynamic entry, from a source's status or its configured defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AggregateEntry {
    pub source_id: String,
    pub user_id: UserId,
    pub title: String,
    pub summary: String,
    pub severity: Severity,
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<NavigationTarget>,
}

/// A collapsible group rolled up into one entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntryGroup {
    pub group_id: String,
    pub title: String,
    pub summary: String,
    pub severity: Severity,
    pub entries: Vec<AggregateEntry>,
}

/// A node in the rendered entry list: a promoted single entry or a group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryNode {
    Entry(AggregateEntry),
    Group(EntryGroup),
}

impl EntryNode {
    pub fn severity(&self) -> Severity {
        match self {
            EntryNode::Entry(e) => e.severity,
            EntryNode::Group(g) => g.severity,
        }
    }
}

/// A severity-less entry from a rigid group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StaticEntry {
    pub source_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<NavigationTarget>,
}

/// A rigid group and its static entries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StaticGroup {
    pub group_id: String,
    pub title: String,
    pub entries: Vec<StaticEntry>,
}

/// The full aggregate view for one profile group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SafetyAggregate {
    pub status: AggregateStatus,
    pub issues: Vec<AggregateIssue>,
    pub entries: Vec<EntryNode>,
    pub static_entries: Vec<StaticGroup>,
}

/// Error details forwarded to listeners, never deduplicated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorDetails {
    pub message: String,
}

impl ErrorDetails {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
