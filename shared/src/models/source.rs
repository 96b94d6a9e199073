//! Source report payloads
//!
//! The shapes a safety source pushes: an optional status plus an ordered
//! list of issues. Which fields may be present is constrained by the
//! source's declared kind (see `models::config`) and validated on write.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::severity::Severity;

/// Where the UI navigates when an entry, issue or action is activated.
///
/// Stands in for the platform's pending-intent machinery; the core only
/// carries it as data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NavigationTarget {
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
}

impl NavigationTarget {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            package: None,
        }
    }
}

/// Secondary icon tap target on a status entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IconAction {
    pub icon_type: IconType,
    pub target: NavigationTarget,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IconType {
    Gear,
    Info,
}

/// The status half of a source report, rendered as an entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceStatus {
    pub title: String,
    /// Empty string means "no summary"; group rollup then falls back to
    /// joined child titles.
    #[serde(default)]
    pub summary: String,
    pub severity: Severity,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<NavigationTarget>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_action: Option<IconAction>,
}

fn default_true() -> bool {
    true
}

/// One action a user can take on an issue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Action {
    pub source_action_id: String,
    pub label: String,
    pub target: NavigationTarget,
    /// Whether a successful resolution removes the issue.
    #[serde(default)]
    pub will_resolve: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_message: Option<String>,
}

/// One issue reported by a source.
///
/// Identity is `(source_id, source_issue_id, user_id)`; `issue_type_id`
/// only feeds cross-source deduplication grouping.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Issue {
    pub source_issue_id: String,
    pub issue_type_id: String,
    pub title: String,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    pub severity: Severity,
    #[serde(default)]
    pub actions: Vec<Action>,
    /// Issues sharing `(dedup_group, issue_type_id)` across sources may be
    /// collapsed into one representative.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dedup_group: Option<String>,
}

/// The full payload one source pushes for one user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SourceReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<SourceStatus>,
    #[serde(default)]
    pub issues: Vec<Issue>,
}

impl SourceReport {
    /// Highest severity carried anywhere in the report.
    pub fn max_severity(&self) -> Severity {
        let status = self.status.as_ref().map(|s| s.severity);
        let issues = self.issues.iter().map(|i| i.severity).max();
        status.into_iter().chain(issues).max().unwrap_or_default()
    }

    /// The set of issue ids present in this report.
    pub fn issue_ids(&self) -> HashSet<String> {
        self.issues
            .iter()
            .map(|i| i.source_issue_id.clone())
            .collect()
    }
}
