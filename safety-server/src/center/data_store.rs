//! SourceDataStore - latest report per (source, user)
//!
//! Pure key-value store with validation on write. Equal reports are a
//! no-op (`changed = false`); that early exit is what lets the listener
//! layer skip needless recomputation.

use std::collections::HashMap;

use shared::ids::{SourceKey, UserId};
use shared::models::{SourceDecl, SourceKind, SourceReport};

use super::error::ValidationError;

#[derive(Debug, Default)]
pub struct SourceDataStore {
    reports: HashMap<SourceKey, SourceReport>,
}

impl SourceDataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the latest report for a key, or evict it with `None`.
    ///
    /// Returns whether the stored value changed. Reports equal by value to
    /// the current one leave the store untouched. Shape validation happens
    /// before any mutation: a rejected write has no side effects.
    pub fn set(
        &mut self,
        decl: &SourceDecl,
        key: SourceKey,
        report: Option<SourceReport>,
    ) -> Result<bool, ValidationError> {
        if let Some(report) = &report {
            validate_report(decl, report)?;
        }

        if self.reports.get(&key) == report.as_ref() {
            return Ok(false);
        }

        match report {
            Some(report) => {
                self.reports.insert(key, report);
            }
            None => {
                self.reports.remove(&key);
            }
        }
        Ok(true)
    }

    pub fn get(&self, key: &SourceKey) -> Option<&SourceReport> {
        self.reports.get(key)
    }

    pub fn clear_for_user(&mut self, user_id: UserId) {
        self.reports.retain(|k, _| k.user_id != user_id);
    }

    pub fn clear(&mut self) {
        self.reports.clear();
    }
}

/// Shape validation for a pushed report against the source's declaration.
fn validate_report(decl: &SourceDecl, report: &SourceReport) -> Result<(), ValidationError> {
    match decl.kind {
        SourceKind::Static => {
            return Err(ValidationError::StaticSourcePush(decl.id.clone()));
        }
        SourceKind::IssueOnly => {
            if report.status.is_some() {
                return Err(ValidationError::UnexpectedStatus(decl.id.clone()));
            }
        }
        SourceKind::Dynamic => {
            if report.status.is_none() {
                return Err(ValidationError::MissingStatus(decl.id.clone()));
            }
        }
    }

    if let Some(status) = &report.status
        && status.severity > decl.max_severity
    {
        return Err(ValidationError::SeverityAboveMax {
            source_id: decl.id.clone(),
            severity: status.severity,
        });
    }

    for issue in &report.issues {
        if !issue.severity.is_issue_level() {
            return Err(ValidationError::UnspecifiedIssueSeverity {
                source_id: decl.id.clone(),
                source_issue_id: issue.source_issue_id.clone(),
            });
        }
        if issue.severity > decl.max_severity {
            return Err(ValidationError::SeverityAboveMax {
                source_id: decl.id.clone(),
                severity: issue.severity,
            });
        }
    }

    Ok(())
}
