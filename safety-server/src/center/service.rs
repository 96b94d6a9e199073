//! SafetyCenterService - the facade owning all mutable state
//!
//! Every component lives behind a single `parking_lot::Mutex`; each
//! operation is one synchronous map-update-and-recompute under that lock.
//! Concurrency comes from the external callers (sources, refresh
//! requesters, listener front-ends) invoking the facade concurrently; the
//! lock serializes them. The lock is never held while refresh requests
//! are physically sent: `start_refresh` returns the outbound target list
//! for a messaging collaborator to deliver.
//!
//! # Data flow
//!
//! ```text
//! set_source_data(report)
//!     ├─ 1. Resolve and validate (source, package, profile)
//!     ├─ 2. SourceDataStore.set (no-op when equal by value)
//!     ├─ 3. Ledger: record new issues, purge vanished ones
//!     ├─ 4. RefreshCoordinator: free the in-flight slot if the report
//!     │     answers the tracked cycle
//!     ├─ 5. Recompute aggregate, deliver on change per listener
//!     └─ 6. Broadcast CenterEvent(s)
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use uuid::Uuid;

use shared::ids::{ActionKey, IssueKey, SourceKey, UserId};
use shared::models::{
    DismissalRecord, ErrorDetails, RefreshReason, RefreshRequest, SafetyAggregate,
    SafetyCenterConfig, SourceDecl, SourceEvent, SourceReport, UserContext, UserProfileGroup,
};

use super::actions::InFlightActionTracker;
use super::data_store::SourceDataStore;
use super::error::{ServiceError, ServiceResult, ValidationError};
use super::ledger::IssueDismissalLedger;
use super::listeners::{AggregateObserver, ListenerDispatcher};
use super::refresh::{CycleProgress, RefreshCoordinator};
use super::status;

/// Event broadcast channel capacity.
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Coarse notifications for ancillary consumers (persistence scheduling,
/// metrics). UI observers use listener registrations instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CenterEvent {
    DataChanged { user_id: UserId },
    RefreshStarted { cycle_id: String },
    RefreshCompleted { cycle_id: String },
}

#[derive(Debug, Default)]
struct CenterState {
    store: SourceDataStore,
    ledger: IssueDismissalLedger,
    refresh: RefreshCoordinator,
    listeners: ListenerDispatcher,
    actions: InFlightActionTracker,
}

pub struct SafetyCenterService {
    config: SafetyCenterConfig,
    users: Arc<dyn UserContext>,
    state: Mutex<CenterState>,
    event_tx: broadcast::Sender<CenterEvent>,
}

impl std::fmt::Debug for SafetyCenterService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SafetyCenterService")
            .field("config", &self.config)
            .finish()
    }
}

impl SafetyCenterService {
    pub fn new(config: SafetyCenterConfig, users: Arc<dyn UserContext>) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            config,
            users,
            state: Mutex::new(CenterState::default()),
            event_tx,
        }
    }

    pub fn config(&self) -> &SafetyCenterConfig {
        &self.config
    }

    /// Subscribe to coarse state-change events.
    pub fn subscribe(&self) -> broadcast::Receiver<CenterEvent> {
        self.event_tx.subscribe()
    }

    // ========== Source report ingestion ==========

    /// Ingest a source's report, or clear its data with `report = None`.
    ///
    /// Rejected pushes mutate nothing. An equal-by-value report still
    /// settles refresh accounting but triggers no recomputation or
    /// delivery.
    pub fn set_source_data(
        &self,
        source_id: &str,
        user_id: UserId,
        package_name: &str,
        report: Option<SourceReport>,
        event: SourceEvent,
    ) -> ServiceResult<()> {
        let decl = self.validate_caller(source_id, user_id, package_name)?;
        let key = SourceKey::new(source_id, user_id);

        let mut events = Vec::new();
        let mut state = self.state.lock();

        let live_ids: HashSet<String> = report
            .as_ref()
            .map(|r| r.issue_ids())
            .unwrap_or_default();
        let changed = state.store.set(&decl, key.clone(), report)?;

        if changed {
            for id in &live_ids {
                state
                    .ledger
                    .record_observed(&IssueKey::new(source_id, id, user_id));
            }
            state.ledger.purge_stale(&key, &live_ids);
            state.actions.purge_stale(&key, &live_ids);
        }

        self.settle_event(&mut state, source_id, user_id, &event, &mut events);

        if changed {
            tracing::debug!(source_id, user_id, "Source data updated");
            self.deliver_update(&mut state, user_id);
            events.push(CenterEvent::DataChanged { user_id });
        }
        drop(state);

        self.broadcast(events);
        Ok(())
    }

    /// A source explicitly failed to produce data.
    ///
    /// A valid outcome, not an error: the refresh in-flight slot is freed
    /// exactly as on success and previously cached data stays. Listeners
    /// in the user's profile group are told, without deduplication.
    pub fn report_source_error(
        &self,
        source_id: &str,
        user_id: UserId,
        package_name: &str,
        event: SourceEvent,
    ) -> ServiceResult<()> {
        self.validate_caller(source_id, user_id, package_name)?;
        tracing::warn!(source_id, user_id, "Source reported an error");

        let mut events = Vec::new();
        let mut state = self.state.lock();
        self.settle_event(&mut state, source_id, user_id, &event, &mut events);

        let group = self.users.profile_group_of(user_id);
        let error = ErrorDetails::new(format!("Source {source_id} failed to provide data"));
        state.listeners.deliver(&group, None, Some(&error));
        drop(state);

        self.broadcast(events);
        Ok(())
    }

    // ========== Refresh ==========

    /// Start a refresh cycle for a profile group, superseding any tracked
    /// one.
    ///
    /// The returned request carries the generated cycle id and the
    /// per-source targets a messaging collaborator must deliver, cycle id
    /// embedded. Sending happens outside the service lock.
    pub fn start_refresh(
        &self,
        reason: RefreshReason,
        group: &UserProfileGroup,
    ) -> RefreshRequest {
        let mut state = self.state.lock();
        let request = state
            .refresh
            .start_cycle(&self.config, self.users.as_ref(), reason, group);
        let completed = !state.refresh.in_progress();
        drop(state);

        let mut events = vec![CenterEvent::RefreshStarted {
            cycle_id: request.cycle_id.clone(),
        }];
        if completed {
            events.push(CenterEvent::RefreshCompleted {
                cycle_id: request.cycle_id.clone(),
            });
        }
        self.broadcast(events);
        request
    }

    pub fn refresh_in_progress(&self) -> bool {
        self.state.lock().refresh.in_progress()
    }

    pub fn current_cycle_id(&self) -> Option<String> {
        self.state
            .lock()
            .refresh
            .current_cycle_id()
            .map(str::to_string)
    }

    // ========== Issue interaction ==========

    /// Dismiss a currently reported issue.
    ///
    /// The dismissal sticks until the owning source stops reporting the
    /// issue id; a later re-report of the same id stays hidden.
    pub fn dismiss_issue(&self, key: &IssueKey) -> ServiceResult<()> {
        let mut state = self.state.lock();
        self.require_issue(&state, key)?;

        if state.ledger.dismiss(key) {
            tracing::info!(issue = %key.encode(), "Issue dismissed");
            self.deliver_update(&mut state, key.user_id);
            drop(state);
            self.broadcast(vec![CenterEvent::DataChanged {
                user_id: key.user_id,
            }]);
        }
        Ok(())
    }

    /// Mark an issue action as executing, so aggregates render it as in
    /// flight until the source reports the action's outcome.
    pub fn mark_action_in_flight(&self, key: &ActionKey) -> ServiceResult<()> {
        let mut state = self.state.lock();
        let report = self.require_issue(&state, &key.issue_key)?;
        let known = report
            .issues
            .iter()
            .find(|i| i.source_issue_id == key.issue_key.source_issue_id)
            .is_some_and(|i| {
                i.actions
                    .iter()
                    .any(|a| a.source_action_id == key.source_action_id)
            });
        if !known {
            return Err(ServiceError::UnknownAction {
                issue_key: key.issue_key.encode(),
                source_action_id: key.source_action_id.clone(),
            });
        }

        state.actions.mark(key);
        self.deliver_update(&mut state, key.issue_key.user_id);
        drop(state);
        self.broadcast(vec![CenterEvent::DataChanged {
            user_id: key.issue_key.user_id,
        }]);
        Ok(())
    }

    /// Explicitly clear an in-flight marker (e.g. the resolution timed out
    /// on the caller's side).
    pub fn clear_action_in_flight(&self, key: &ActionKey) {
        let mut state = self.state.lock();
        if state.actions.clear(key) {
            self.deliver_update(&mut state, key.issue_key.user_id);
            drop(state);
            self.broadcast(vec![CenterEvent::DataChanged {
                user_id: key.issue_key.user_id,
            }]);
        }
    }

    // ========== Reads ==========

    /// Compute the aggregate view for a profile group on demand.
    ///
    /// `package_name` identifies the requesting client; the computed view
    /// is the same for every caller.
    pub fn aggregate(&self, package_name: &str, group: &UserProfileGroup) -> SafetyAggregate {
        tracing::debug!(package = package_name, "Aggregate requested");
        let state = self.state.lock();
        status::compute_aggregate(
            &self.config,
            self.users.as_ref(),
            &state.store,
            &state.ledger,
            &state.actions,
            group,
        )
    }

    // ========== Listeners ==========

    /// Register an observer; it immediately receives the current
    /// aggregate for its user's profile group.
    pub fn add_listener(
        &self,
        observer: Arc<dyn AggregateObserver>,
        package_name: &str,
        user_id: UserId,
    ) -> Uuid {
        let group = self.users.profile_group_of(user_id);
        let mut state = self.state.lock();
        let id = state.listeners.add(observer, package_name, user_id);
        let aggregate = status::compute_aggregate(
            &self.config,
            self.users.as_ref(),
            &state.store,
            &state.ledger,
            &state.actions,
            &group,
        );
        state.listeners.deliver_initial(id, &aggregate);
        id
    }

    pub fn remove_listener(&self, id: Uuid) -> bool {
        self.state.lock().listeners.remove(id)
    }

    // ========== Persistence round-trip ==========

    pub fn snapshot_ledger(&self) -> Vec<DismissalRecord> {
        self.state.lock().ledger.snapshot()
    }

    /// Restore ledger records on boot. Returns the number restored.
    pub fn restore_ledger(&self, records: &[DismissalRecord]) -> usize {
        self.state.lock().ledger.restore(records)
    }

    // ========== Per-user lifecycle ==========

    /// Purge all state for a removed user or stopped profile.
    pub fn clear_for_user(&self, user_id: UserId) {
        let mut events = Vec::new();
        let mut state = self.state.lock();

        state.store.clear_for_user(user_id);
        state.ledger.clear_for_user(user_id);
        state.actions.clear_for_user(user_id);
        state.listeners.clear_for_user(user_id);
        if let CycleProgress::Completed { cycle_id } = state.refresh.cancel_for_user(user_id) {
            events.push(CenterEvent::RefreshCompleted { cycle_id });
        }

        self.deliver_update(&mut state, user_id);
        events.push(CenterEvent::DataChanged { user_id });
        drop(state);

        tracing::info!(user_id, "Cleared state for user");
        self.broadcast(events);
    }

    /// Drop everything (service disabled).
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.store.clear();
        state.ledger.clear();
        state.actions.clear_all();
        state.listeners.clear();
        state.refresh.clear();
        tracing::info!("Cleared all Safety Center state");
    }

    // ========== Internals ==========

    /// Caller validation shared by ingestion paths. No state is touched.
    fn validate_caller(
        &self,
        source_id: &str,
        user_id: UserId,
        package_name: &str,
    ) -> ServiceResult<SourceDecl> {
        let decl = self
            .config
            .source(source_id)
            .ok_or_else(|| ValidationError::UnknownSource(source_id.to_string()))?;
        if decl.package_name != package_name {
            return Err(ValidationError::PackageMismatch {
                source_id: source_id.to_string(),
                package: package_name.to_string(),
            }
            .into());
        }
        if self.users.profile_kind(user_id).is_some() && !decl.supports_managed_profiles {
            return Err(ValidationError::UnsupportedProfile {
                source_id: source_id.to_string(),
                user_id,
            }
            .into());
        }
        Ok(decl.clone())
    }

    /// Apply the event half of an ingestion call: refresh accounting and
    /// action in-flight clearing. Stale cycle ids are ignored here, the
    /// coordinator logs them.
    fn settle_event(
        &self,
        state: &mut CenterState,
        source_id: &str,
        user_id: UserId,
        event: &SourceEvent,
        events: &mut Vec<CenterEvent>,
    ) {
        match event {
            SourceEvent::SourceStateChanged => {}
            SourceEvent::RefreshResponse { cycle_id } => {
                if let CycleProgress::Completed { cycle_id } =
                    state.refresh.mark_source_done(source_id, user_id, cycle_id)
                {
                    events.push(CenterEvent::RefreshCompleted { cycle_id });
                }
            }
            SourceEvent::ActionSucceeded {
                source_issue_id,
                source_action_id,
            }
            | SourceEvent::ActionFailed {
                source_issue_id,
                source_action_id,
            } => {
                let key = ActionKey::new(
                    IssueKey::new(source_id, source_issue_id, user_id),
                    source_action_id,
                );
                state.actions.clear(&key);
            }
        }
    }

    /// Recompute the aggregate for the user's profile group and deliver
    /// it, suppressed per listener when unchanged.
    fn deliver_update(&self, state: &mut CenterState, user_id: UserId) {
        let group = self.users.profile_group_of(user_id);
        if !state.listeners.has_listeners_for(&group) {
            return;
        }
        let aggregate = status::compute_aggregate(
            &self.config,
            self.users.as_ref(),
            &state.store,
            &state.ledger,
            &state.actions,
            &group,
        );
        state.listeners.deliver(&group, Some(&aggregate), None);
    }

    /// The stored report carrying an issue, or `UnknownIssue`.
    fn require_issue<'a>(
        &self,
        state: &'a CenterState,
        key: &IssueKey,
    ) -> ServiceResult<&'a SourceReport> {
        state
            .store
            .get(&key.source_key())
            .filter(|report| {
                report
                    .issues
                    .iter()
                    .any(|i| i.source_issue_id == key.source_issue_id)
            })
            .ok_or_else(|| ServiceError::UnknownIssue(key.encode()))
    }

    fn broadcast(&self, events: Vec<CenterEvent>) {
        for event in events {
            // No receivers is fine; the channel is auxiliary.
            let _ = self.event_tx.send(event);
        }
    }
}
