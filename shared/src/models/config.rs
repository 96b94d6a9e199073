//! Safety Center configuration model
//!
//! The declared universe of sources and their grouping. Parsed from
//! platform resources by an external collaborator; the core receives the
//! already-built value and treats it as immutable.

use serde::{Deserialize, Serialize};

use super::severity::Severity;
use super::source::NavigationTarget;

/// Declared kind of a source, constraining what it may report.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceKind {
    /// Pushes a status entry and optionally issues.
    Dynamic,
    /// Never pushes data; rendered from configuration only.
    Static,
    /// Pushes issues but no status entry.
    IssueOnly,
}

/// Rendering mode of a source group.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GroupKind {
    /// Rolls up into one dynamic entry with a severity.
    Collapsible,
    /// Renders as severity-less static entries.
    Rigid,
}

/// One declared safety source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceDecl {
    pub id: String,
    /// Package allowed to push data for this source.
    pub package_name: String,
    pub kind: SourceKind,
    /// Highest severity this source may report.
    pub max_severity: Severity,
    #[serde(default)]
    pub supports_managed_profiles: bool,
    /// Whether a PAGE_OPEN refresh addresses this source.
    #[serde(default)]
    pub refresh_on_page_open: bool,
    /// Untracked sources are messaged on refresh but never block or
    /// complete a cycle (known-flaky or rolling-out sources).
    #[serde(default)]
    pub untracked: bool,
    /// Whether the source's data appears in aggregates at all.
    #[serde(default = "default_true")]
    pub visible_externally: bool,
    /// Entry title/summary used before the source has pushed data, and for
    /// static sources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_target: Option<NavigationTarget>,
}

fn default_true() -> bool {
    true
}

impl SourceDecl {
    /// Whether refresh requests address this source at all.
    pub fn refreshable(&self) -> bool {
        matches!(self.kind, SourceKind::Dynamic | SourceKind::IssueOnly)
    }
}

/// A declared group of sources.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceGroup {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub kind: GroupKind,
    pub sources: Vec<SourceDecl>,
}

/// The full configuration the service is constructed with.
///
/// Group and source order is declaration order and is significant: it is
/// the tie-break order for equal-severity issues and the render order of
/// entries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SafetyCenterConfig {
    pub groups: Vec<SourceGroup>,
    /// Gates the cross-source issue deduplication pass.
    #[serde(default)]
    pub dedup_enabled: bool,
}

impl SafetyCenterConfig {
    /// Look up a source declaration by id.
    pub fn source(&self, source_id: &str) -> Option<&SourceDecl> {
        self.sources().find(|s| s.id == source_id)
    }

    /// The group a source belongs to.
    pub fn group_of(&self, source_id: &str) -> Option<&SourceGroup> {
        self.groups
            .iter()
            .find(|g| g.sources.iter().any(|s| s.id == source_id))
    }

    /// All sources in declaration order.
    pub fn sources(&self) -> impl Iterator<Item = &SourceDecl> {
        self.groups.iter().flat_map(|g| g.sources.iter())
    }
}
