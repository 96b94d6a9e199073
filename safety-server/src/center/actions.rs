//! In-flight markers for resolving actions
//!
//! While a source executes an issue action, the action is marked in
//! flight so the UI can render it as running. The marker is transient
//! state, tracked apart from the persisted issue metadata: it is cleared
//! when the action completes either way, when the source's report no
//! longer carries the issue, and on per-user clear.

use std::collections::{HashMap, HashSet};

use shared::ids::{ActionKey, IssueKey, SourceKey, UserId};

#[derive(Debug, Default)]
pub struct InFlightActionTracker {
    in_flight: HashMap<IssueKey, HashSet<String>>,
}

impl InFlightActionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark(&mut self, key: &ActionKey) {
        self.in_flight
            .entry(key.issue_key.clone())
            .or_default()
            .insert(key.source_action_id.clone());
    }

    /// Returns whether the action was in flight.
    pub fn clear(&mut self, key: &ActionKey) -> bool {
        let Some(actions) = self.in_flight.get_mut(&key.issue_key) else {
            return false;
        };
        let removed = actions.remove(&key.source_action_id);
        if actions.is_empty() {
            self.in_flight.remove(&key.issue_key);
        }
        removed
    }

    /// Source action ids in flight for an issue, sorted for deterministic
    /// aggregate output.
    pub fn in_flight_for(&self, key: &IssueKey) -> Vec<String> {
        let mut ids: Vec<String> = self
            .in_flight
            .get(key)
            .map(|a| a.iter().cloned().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }

    /// Drop markers for a source's issues that are no longer reported.
    pub fn purge_stale(&mut self, source_key: &SourceKey, live_ids: &HashSet<String>) {
        self.in_flight.retain(|key, _| {
            key.source_id != source_key.source_id
                || key.user_id != source_key.user_id
                || live_ids.contains(&key.source_issue_id)
        });
    }

    pub fn clear_for_user(&mut self, user_id: UserId) {
        self.in_flight.retain(|key, _| key.user_id != user_id);
    }

    pub fn clear_all(&mut self) {
        self.in_flight.clear();
    }
}
