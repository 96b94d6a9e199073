//! Identity types
//!
//! Composite keys addressing per-source data, individual issues and issue
//! actions. All keys are value types usable as map keys; `IssueKey` also has
//! a stable string encoding used by the persisted dismissal records.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Platform user handle (a full user or one of its profiles).
pub type UserId = i32;

/// Separator for the encoded `IssueKey` form. Source and issue ids are
/// declared identifiers and never contain it.
const KEY_SEPARATOR: char = '|';

/// Key parsing errors
#[derive(Debug, Error)]
pub enum IdParseError {
    #[error("malformed issue key: {0}")]
    Malformed(String),
}

/// Addresses the data of one source for one user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceKey {
    pub source_id: String,
    pub user_id: UserId,
}

impl SourceKey {
    pub fn new(source_id: impl Into<String>, user_id: UserId) -> Self {
        Self {
            source_id: source_id.into(),
            user_id,
        }
    }
}

/// Addresses one issue: the reporting source, the source-scoped issue id
/// and the user it was reported for.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IssueKey {
    pub source_id: String,
    pub source_issue_id: String,
    pub user_id: UserId,
}

impl IssueKey {
    pub fn new(
        source_id: impl Into<String>,
        source_issue_id: impl Into<String>,
        user_id: UserId,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            source_issue_id: source_issue_id.into(),
            user_id,
        }
    }

    pub fn source_key(&self) -> SourceKey {
        SourceKey::new(self.source_id.clone(), self.user_id)
    }

    /// Stable string form, used by `DismissalRecord` for persistence.
    pub fn encode(&self) -> String {
        format!(
            "{}{sep}{}{sep}{}",
            self.source_id,
            self.source_issue_id,
            self.user_id,
            sep = KEY_SEPARATOR
        )
    }

    /// Parse the encoded form produced by [`IssueKey::encode`].
    pub fn parse(encoded: &str) -> Result<Self, IdParseError> {
        let mut parts = encoded.split(KEY_SEPARATOR);
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(source_id), Some(source_issue_id), Some(user), None) => {
                let user_id = user
                    .parse::<UserId>()
                    .map_err(|_| IdParseError::Malformed(encoded.to_string()))?;
                Ok(Self::new(source_id, source_issue_id, user_id))
            }
            _ => Err(IdParseError::Malformed(encoded.to_string())),
        }
    }
}

/// Addresses one action of one issue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ActionKey {
    pub issue_key: IssueKey,
    pub source_action_id: String,
}

impl ActionKey {
    pub fn new(issue_key: IssueKey, source_action_id: impl Into<String>) -> Self {
        Self {
            issue_key,
            source_action_id: source_action_id.into(),
        }
    }
}
