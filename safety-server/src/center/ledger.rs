//! IssueDismissalLedger - cross-restart issue metadata
//!
//! Tracks, per issue key, when the issue was first observed and whether it
//! was dismissed. This record is what persists across restarts; issue
//! payloads are always re-supplied by sources after boot. `first_seen_at`
//! is set exactly once per key and only reset by a full purge followed by
//! re-observation, which is what distinguishes "newly appeared" from
//! "returned after being briefly absent".

use std::collections::{HashMap, HashSet};

use shared::ids::{IssueKey, SourceKey, UserId};
use shared::models::DismissalRecord;
use shared::util::now_millis;

#[derive(Debug, Clone, PartialEq, Eq)]
struct LedgerEntry {
    first_seen_at: i64,
    dismissed_at: Option<i64>,
}

#[derive(Debug, Default)]
pub struct IssueDismissalLedger {
    entries: HashMap<IssueKey, LedgerEntry>,
}

impl IssueDismissalLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fresh record iff the key is unknown. Idempotent:
    /// re-observing never touches `first_seen_at`.
    pub fn record_observed(&mut self, key: &IssueKey) {
        self.entries.entry(key.clone()).or_insert_with(|| LedgerEntry {
            first_seen_at: now_millis(),
            dismissed_at: None,
        });
    }

    /// Mark an issue dismissed. No-op if the key is unknown or already
    /// dismissed; returns whether anything changed.
    pub fn dismiss(&mut self, key: &IssueKey) -> bool {
        match self.entries.get_mut(key) {
            Some(entry) if entry.dismissed_at.is_none() => {
                entry.dismissed_at = Some(now_millis());
                true
            }
            _ => false,
        }
    }

    pub fn is_dismissed(&self, key: &IssueKey) -> bool {
        self.entries
            .get(key)
            .is_some_and(|e| e.dismissed_at.is_some())
    }

    pub fn first_seen_at(&self, key: &IssueKey) -> Option<i64> {
        self.entries.get(key).map(|e| e.first_seen_at)
    }

    /// Drop records of a source's issues that the source no longer
    /// reports. Records for ids in `live_ids` survive, dismissal history
    /// included.
    pub fn purge_stale(&mut self, source_key: &SourceKey, live_ids: &HashSet<String>) {
        self.entries.retain(|key, _| {
            key.source_id != source_key.source_id
                || key.user_id != source_key.user_id
                || live_ids.contains(&key.source_issue_id)
        });
    }

    pub fn clear_for_user(&mut self, user_id: UserId) {
        self.entries.retain(|key, _| key.user_id != user_id);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Records for the persistence round-trip, sorted by encoded key for a
    /// deterministic snapshot.
    pub fn snapshot(&self) -> Vec<DismissalRecord> {
        let mut records: Vec<DismissalRecord> = self
            .entries
            .iter()
            .map(|(key, entry)| DismissalRecord {
                issue_key: key.encode(),
                first_seen_at: entry.first_seen_at,
                dismissed_at: entry.dismissed_at,
            })
            .collect();
        records.sort_by(|a, b| a.issue_key.cmp(&b.issue_key));
        records
    }

    /// Restore records produced by [`snapshot`](Self::snapshot). Malformed
    /// keys are logged and skipped. Returns the number restored.
    pub fn restore(&mut self, records: &[DismissalRecord]) -> usize {
        let mut restored = 0;
        for record in records {
            let key = match IssueKey::parse(&record.issue_key) {
                Ok(key) => key,
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping malformed ledger record");
                    continue;
                }
            };
            self.entries.insert(
                key,
                LedgerEntry {
                    first_seen_at: record.first_seen_at,
                    dismissed_at: record.dismissed_at,
                },
            );
            restored += 1;
        }
        restored
    }
}
