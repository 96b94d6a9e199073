//! Top-level aggregate computation
//!
//! Builds the entry tree from configuration plus stored reports, rolls
//! severities up, and selects the overall title/summary from a fixed
//! table keyed by (severity, review flag, issue count).

use shared::ids::{SourceKey, UserId};
use shared::models::{
    AggregateEntry, AggregateStatus, EntryGroup, EntryNode, SafetyAggregate, SafetyCenterConfig,
    Severity, SourceDecl, SourceKind, StaticEntry, StaticGroup, UserContext, UserProfileGroup,
};

use super::actions::InFlightActionTracker;
use super::data_store::SourceDataStore;
use super::issues;
use super::ledger::IssueDismissalLedger;

const FALLBACK_ENTRY_SUMMARY: &str = "No information yet";

/// Compute the full aggregate for a profile group.
pub(crate) fn compute_aggregate(
    config: &SafetyCenterConfig,
    ctx: &dyn UserContext,
    store: &SourceDataStore,
    ledger: &IssueDismissalLedger,
    actions: &InFlightActionTracker,
    group: &UserProfileGroup,
) -> SafetyAggregate {
    let issues = issues::compute_visible(config, ctx, store, ledger, actions, group);

    let mut entries: Vec<EntryNode> = Vec::new();
    let mut static_entries: Vec<StaticGroup> = Vec::new();

    for source_group in &config.groups {
        match source_group.kind {
            shared::models::GroupKind::Rigid => {
                let rows: Vec<StaticEntry> = source_group
                    .sources
                    .iter()
                    .filter(|d| d.visible_externally && d.kind != SourceKind::IssueOnly)
                    .map(|d| StaticEntry {
                        source_id: d.id.clone(),
                        title: d.default_title.clone().unwrap_or_else(|| d.id.clone()),
                        summary: d.default_summary.clone(),
                        target: d.default_target.clone(),
                    })
                    .collect();
                if !rows.is_empty() {
                    static_entries.push(StaticGroup {
                        group_id: source_group.id.clone(),
                        title: source_group.title.clone(),
                        entries: rows,
                    });
                }
            }
            shared::models::GroupKind::Collapsible => {
                let mut children: Vec<AggregateEntry> = Vec::new();
                for decl in &source_group.sources {
                    if !decl.visible_externally || decl.kind != SourceKind::Dynamic {
                        continue;
                    }
                    for user_id in group.users_for_source(ctx, decl) {
                        children.push(entry_for(store, decl, user_id));
                    }
                }
                match children.len() {
                    0 => {}
                    // A lone entry is promoted out of its group.
                    1 => {
                        if let Some(entry) = children.pop() {
                            entries.push(EntryNode::Entry(entry));
                        }
                    }
                    _ => {
                        entries.push(merge_group(source_group.id.clone(), source_group, children));
                    }
                }
            }
        }
    }

    let issue_severity = issues
        .iter()
        .map(|i| i.issue.severity)
        .max()
        .unwrap_or_default();
    let entry_severity = entries
        .iter()
        .map(|e| e.severity())
        .max()
        .unwrap_or_default();

    let severity = issue_severity.max(entry_severity);
    // Entries signal worse than any actionable issue: there is nothing to
    // fix from the issue list, but a setting still wants attention.
    let settings_to_review = entry_severity > issue_severity && entry_severity > Severity::Ok;
    let (title, summary) = status_strings(severity, settings_to_review, issues.len());

    SafetyAggregate {
        status: AggregateStatus {
            title: title.to_string(),
            summary,
            severity,
            settings_to_review,
        },
        issues,
        entries,
        static_entries,
    }
}

/// Entry for one dynamic source/user: its pushed status, or the
/// configured defaults while no data is stored.
fn entry_for(store: &SourceDataStore, decl: &SourceDecl, user_id: UserId) -> AggregateEntry {
    let key = SourceKey::new(&decl.id, user_id);
    match store.get(&key).and_then(|r| r.status.as_ref()) {
        Some(status) => AggregateEntry {
            source_id: decl.id.clone(),
            user_id,
            title: status.title.clone(),
            summary: status.summary.clone(),
            severity: status.severity,
            enabled: status.enabled,
            target: status.target.clone(),
        },
        None => AggregateEntry {
            source_id: decl.id.clone(),
            user_id,
            title: decl.default_title.clone().unwrap_or_else(|| decl.id.clone()),
            summary: decl
                .default_summary
                .clone()
                .unwrap_or_else(|| FALLBACK_ENTRY_SUMMARY.to_string()),
            severity: Severity::Unspecified,
            enabled: true,
            target: decl.default_target.clone(),
        },
    }
}

/// Roll several entries up into one group node.
///
/// Group severity is the worst child severity. The group summary is the
/// worst child's own summary; when that child has none, the group's
/// configured summary, and failing that a joined list of all child
/// titles.
fn merge_group(
    group_id: String,
    source_group: &shared::models::SourceGroup,
    children: Vec<AggregateEntry>,
) -> EntryNode {
    let severity = children
        .iter()
        .map(|c| c.severity)
        .max()
        .unwrap_or_default();
    let worst = children.iter().find(|c| c.severity == severity);
    let summary = match worst {
        Some(child) if !child.summary.is_empty() => child.summary.clone(),
        _ => source_group
            .summary
            .clone()
            .unwrap_or_else(|| join_titles(&children)),
    };

    EntryNode::Group(EntryGroup {
        group_id,
        title: source_group.title.clone(),
        summary,
        severity,
        entries: children,
    })
}

fn join_titles(children: &[AggregateEntry]) -> String {
    children
        .iter()
        .map(|c| c.title.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Overall title/summary table.
///
/// Keyed by (overall severity, review flag, issue count) and exhaustive
/// over all combinations, including ones the rollup cannot currently
/// produce.
pub(crate) fn status_strings(
    severity: Severity,
    settings_to_review: bool,
    issue_count: usize,
) -> (&'static str, String) {
    let title = match severity {
        Severity::Unspecified => "Security and privacy status unknown",
        Severity::Ok => "Looks good",
        Severity::Recommendation => "You may be at risk",
        Severity::CriticalWarning => "You're at risk",
    };

    let summary = match (settings_to_review, issue_count) {
        (true, 0) => "Review your settings".to_string(),
        (_, 0) => match severity {
            Severity::Unspecified => "Couldn't check all settings".to_string(),
            Severity::Ok => "No issues found".to_string(),
            Severity::Recommendation | Severity::CriticalWarning => {
                "Review your settings".to_string()
            }
        },
        (_, 1) => "1 alert needs your attention".to_string(),
        (_, n) => format!("{n} alerts need your attention"),
    };

    (title, summary)
}
