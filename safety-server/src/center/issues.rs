//! Visible-issue aggregation
//!
//! Collects issues across the profile group's users and the externally
//! visible sources, drops dismissed ones, sorts by severity and
//! optionally collapses cross-source duplicates.

use std::collections::HashMap;

use shared::ids::{IssueKey, SourceKey};
use shared::models::{
    AggregateIssue, SafetyCenterConfig, SourceKind, UserContext, UserProfileGroup,
};

use super::actions::InFlightActionTracker;
use super::data_store::SourceDataStore;
use super::ledger::IssueDismissalLedger;

/// Compute the ordered visible-issue list for a profile group.
///
/// Iteration order is deliberate: groups and sources in declaration
/// order, users parent-first, issues in report order. The final sort by
/// severity is stable, so equal-severity issues keep that order - the
/// determinism the UI and the tests rely on.
pub(crate) fn compute_visible(
    config: &SafetyCenterConfig,
    ctx: &dyn UserContext,
    store: &SourceDataStore,
    ledger: &IssueDismissalLedger,
    actions: &InFlightActionTracker,
    group: &UserProfileGroup,
) -> Vec<AggregateIssue> {
    let mut out = Vec::new();

    for source_group in &config.groups {
        for decl in &source_group.sources {
            if !decl.visible_externally || decl.kind == SourceKind::Static {
                continue;
            }
            for user_id in group.users_for_source(ctx, decl) {
                let Some(report) = store.get(&SourceKey::new(&decl.id, user_id)) else {
                    continue;
                };
                for issue in &report.issues {
                    let key = IssueKey::new(&decl.id, &issue.source_issue_id, user_id);
                    if ledger.is_dismissed(&key) {
                        continue;
                    }
                    out.push(AggregateIssue {
                        actions_in_flight: actions.in_flight_for(&key),
                        key,
                        group_id: source_group.id.clone(),
                        also_affects: Vec::new(),
                        issue: issue.clone(),
                    });
                }
            }
        }
    }

    // Stable: ties keep declaration/report order.
    out.sort_by(|a, b| b.issue.severity.cmp(&a.issue.severity));

    if config.dedup_enabled {
        deduplicate(&mut out);
    }

    out
}

/// Collapse issues judged equivalent across sources into the
/// highest-ranked representative.
///
/// Equivalence is `(dedup_group, issue_type_id)`; issues without a dedup
/// group never collapse. The representative keeps a mapping to every
/// other group it would have appeared under, so the UI can indicate
/// "this also affects group X".
fn deduplicate(issues: &mut Vec<AggregateIssue>) {
    let mut representatives: HashMap<(String, String), usize> = HashMap::new();
    let mut merged: Vec<AggregateIssue> = Vec::with_capacity(issues.len());

    for issue in issues.drain(..) {
        let Some(dedup_group) = issue.issue.dedup_group.clone() else {
            merged.push(issue);
            continue;
        };
        let bucket = (dedup_group, issue.issue.issue_type_id.clone());
        match representatives.get(&bucket) {
            Some(&index) => {
                let representative = &mut merged[index];
                if representative.group_id != issue.group_id
                    && !representative.also_affects.contains(&issue.group_id)
                {
                    representative.also_affects.push(issue.group_id);
                }
            }
            None => {
                representatives.insert(bucket, merged.len());
                merged.push(issue);
            }
        }
    }

    *issues = merged;
}
