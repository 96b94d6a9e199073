use shared::ids::{IdParseError, UserId};
use shared::models::Severity;
use thiserror::Error;

/// Caller/config errors: the push is rejected synchronously and no state
/// is mutated. These are programming errors on the source's side, not
/// transient conditions.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("unknown safety source: {0}")]
    UnknownSource(String),

    #[error("source {source_id} is not owned by package {package}")]
    PackageMismatch { source_id: String, package: String },

    #[error("source {source_id} does not support profile user {user_id}")]
    UnsupportedProfile { source_id: String, user_id: UserId },

    #[error("static source {0} cannot push data")]
    StaticSourcePush(String),

    #[error("issue-only source {0} cannot report a status")]
    UnexpectedStatus(String),

    #[error("dynamic source {0} must report a status")]
    MissingStatus(String),

    #[error("severity {severity:?} exceeds the maximum declared by source {source_id}")]
    SeverityAboveMax {
        source_id: String,
        severity: Severity,
    },

    #[error("issue {source_issue_id} of source {source_id} carries unspecified severity")]
    UnspecifiedIssueSeverity {
        source_id: String,
        source_issue_id: String,
    },
}

/// Service errors
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("unknown issue: {0}")]
    UnknownIssue(String),

    #[error("unknown action {source_action_id} on issue {issue_key}")]
    UnknownAction {
        issue_key: String,
        source_action_id: String,
    },

    #[error(transparent)]
    Id(#[from] IdParseError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;
