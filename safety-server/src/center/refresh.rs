//! RefreshCoordinator - refresh cycle state machine
//!
//! Tracks at most one refresh cycle at a time: Idle until a cycle starts,
//! InProgress while tracked sources are in flight, Idle again when the
//! in-flight set empties or the cycle is cleared/superseded. Starting a
//! new cycle discards tracking of the old one; broadcasts already sent
//! are not recalled, their late replies are logged and ignored.
//!
//! There is no built-in timer: a cycle whose sources never all reply
//! stays InProgress until a caller cancels or supersedes it. Timeout
//! policy belongs to the caller.

use std::collections::HashSet;

use enum_dispatch::enum_dispatch;

use shared::ids::{SourceKey, UserId};
use shared::models::{
    RefreshReason, RefreshRequest, RefreshTarget, SafetyCenterConfig, SourceDecl, UserContext,
    UserProfileGroup,
};

/// Which sources a refresh reason addresses.
///
/// Closed registry: every reason maps to a statically-known policy,
/// resolved here rather than by runtime lookup.
#[enum_dispatch]
pub trait ReasonPolicy {
    fn includes(&self, decl: &SourceDecl) -> bool;
}

/// Page-open refreshes only address sources that opted in; the page is
/// opened often and most sources' data does not go stale that fast.
pub struct PageOpenPolicy;

impl ReasonPolicy for PageOpenPolicy {
    fn includes(&self, decl: &SourceDecl) -> bool {
        decl.refreshable() && decl.refresh_on_page_open
    }
}

/// Every other reason addresses all refreshable sources.
pub struct FullRescanPolicy;

impl ReasonPolicy for FullRescanPolicy {
    fn includes(&self, decl: &SourceDecl) -> bool {
        decl.refreshable()
    }
}

#[enum_dispatch(ReasonPolicy)]
pub enum ReasonFilter {
    PageOpen(PageOpenPolicy),
    FullRescan(FullRescanPolicy),
}

impl From<RefreshReason> for ReasonFilter {
    fn from(reason: RefreshReason) -> Self {
        match reason {
            RefreshReason::PageOpen => ReasonFilter::PageOpen(PageOpenPolicy),
            _ => ReasonFilter::FullRescan(FullRescanPolicy),
        }
    }
}

/// Outcome of a source completion signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleProgress {
    /// The in-flight set emptied; the cycle is done and no longer tracked.
    Completed { cycle_id: String },
    /// Tracked sources are still in flight.
    InProgress,
    /// The signal referenced an unknown or superseded cycle and was
    /// ignored.
    Stale,
}

#[derive(Debug)]
struct RefreshCycle {
    id: String,
    in_flight: HashSet<SourceKey>,
    /// Source ids messaged but excluded from in-flight accounting.
    untracked: HashSet<String>,
}

#[derive(Debug, Default)]
pub struct RefreshCoordinator {
    current: Option<RefreshCycle>,
    counter: u64,
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new cycle, superseding any tracked one.
    ///
    /// The in-flight set is the reason-filtered sources crossed with the
    /// profile group's active users, minus untracked sources. A cycle with
    /// nothing to track completes immediately and is never tracked.
    pub fn start_cycle(
        &mut self,
        config: &SafetyCenterConfig,
        ctx: &dyn UserContext,
        reason: RefreshReason,
        group: &UserProfileGroup,
    ) -> RefreshRequest {
        if let Some(old) = self.current.take() {
            tracing::info!(
                superseded_cycle = %old.id,
                pending_sources = old.in_flight.len(),
                "Superseding tracked refresh cycle"
            );
        }

        self.counter += 1;
        let cycle_id = format!("{:x}-{}", reason.code(), self.counter);

        let filter = ReasonFilter::from(reason);
        let mut in_flight = HashSet::new();
        let mut untracked = HashSet::new();
        let mut targets = Vec::new();

        for decl in config.sources() {
            if !filter.includes(decl) {
                continue;
            }
            for user_id in group.users_for_source(ctx, decl) {
                let key = SourceKey::new(&decl.id, user_id);
                targets.push(RefreshTarget {
                    key: key.clone(),
                    package_name: decl.package_name.clone(),
                });
                if decl.untracked {
                    untracked.insert(decl.id.clone());
                } else {
                    in_flight.insert(key);
                }
            }
        }

        if in_flight.is_empty() {
            tracing::info!(cycle_id = %cycle_id, "Refresh cycle tracks no sources, completing immediately");
        } else {
            tracing::debug!(
                cycle_id = %cycle_id,
                reason = ?reason,
                tracked = in_flight.len(),
                targets = targets.len(),
                "Refresh cycle started"
            );
            self.current = Some(RefreshCycle {
                id: cycle_id.clone(),
                in_flight,
                untracked,
            });
        }

        RefreshRequest { cycle_id, targets }
    }

    /// A source finished (successfully or with an error) for a cycle.
    ///
    /// Replies carrying an unknown or superseded cycle id never touch the
    /// tracked cycle's in-flight set.
    pub fn mark_source_done(
        &mut self,
        source_id: &str,
        user_id: UserId,
        cycle_id: &str,
    ) -> CycleProgress {
        let Some(cycle) = self.current.as_mut() else {
            tracing::warn!(source_id, cycle_id, "Refresh reply with no cycle tracked, ignoring");
            return CycleProgress::Stale;
        };
        if cycle.id != cycle_id {
            tracing::warn!(
                source_id,
                stale_cycle = cycle_id,
                current_cycle = %cycle.id,
                "Refresh reply for superseded cycle, ignoring"
            );
            return CycleProgress::Stale;
        }
        if cycle.untracked.contains(source_id) {
            tracing::debug!(source_id, cycle_id, "Untracked source replied");
            return CycleProgress::InProgress;
        }
        if !cycle.in_flight.remove(&SourceKey::new(source_id, user_id)) {
            tracing::debug!(source_id, user_id, cycle_id, "Source already completed for cycle");
        }

        self.complete_if_drained()
    }

    /// Drop all in-flight entries for a user (user removed or profile
    /// stopped). May complete the cycle.
    pub fn cancel_for_user(&mut self, user_id: UserId) -> CycleProgress {
        let Some(cycle) = self.current.as_mut() else {
            return CycleProgress::Stale;
        };
        let before = cycle.in_flight.len();
        cycle.in_flight.retain(|key| key.user_id != user_id);
        if cycle.in_flight.len() != before {
            tracing::debug!(
                user_id,
                cancelled = before - cycle.in_flight.len(),
                cycle_id = %cycle.id,
                "Cancelled in-flight refreshes for user"
            );
        }

        self.complete_if_drained()
    }

    /// Stop tracking any cycle. Requests already sent are not recalled.
    pub fn clear(&mut self) {
        self.current = None;
    }

    pub fn in_progress(&self) -> bool {
        self.current.is_some()
    }

    pub fn current_cycle_id(&self) -> Option<&str> {
        self.current.as_ref().map(|c| c.id.as_str())
    }

    fn complete_if_drained(&mut self) -> CycleProgress {
        let drained = self
            .current
            .as_ref()
            .is_some_and(|c| c.in_flight.is_empty());
        if drained && let Some(done) = self.current.take() {
            tracing::info!(cycle_id = %done.id, "Refresh cycle complete");
            return CycleProgress::Completed { cycle_id: done.id };
        }
        CycleProgress::InProgress
    }
}
