//! Refresh protocol types

use serde::{Deserialize, Serialize};

use crate::ids::SourceKey;

/// Why a refresh cycle was requested. Different reasons address different
/// subsets of the configured sources.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefreshReason {
    PageOpen,
    RescanButtonClick,
    DeviceReboot,
    DeviceLocaleChange,
    SafetyCenterEnabled,
    Periodic,
    Other,
}

impl RefreshReason {
    /// Stable numeric tag, embedded in generated cycle ids.
    pub fn code(self) -> u32 {
        match self {
            RefreshReason::PageOpen => 100,
            RefreshReason::RescanButtonClick => 200,
            RefreshReason::DeviceReboot => 300,
            RefreshReason::DeviceLocaleChange => 400,
            RefreshReason::SafetyCenterEnabled => 500,
            RefreshReason::Periodic => 600,
            RefreshReason::Other => 700,
        }
    }
}

/// What a source report is responding to, carried alongside the payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceEvent {
    /// Spontaneous push; no refresh cycle involved.
    SourceStateChanged,
    /// Reply to a refresh request carrying the cycle id it answers.
    RefreshResponse { cycle_id: String },
    /// A resolving action finished; the in-flight marker is cleared.
    ActionSucceeded {
        source_issue_id: String,
        source_action_id: String,
    },
    ActionFailed {
        source_issue_id: String,
        source_action_id: String,
    },
}

/// One outbound refresh request the messaging collaborator must send.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RefreshTarget {
    pub key: SourceKey,
    pub package_name: String,
}

/// A started refresh cycle: the generated id plus the requests to send.
///
/// The id must be embedded in every outbound request so sources can echo
/// it back in their `RefreshResponse`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RefreshRequest {
    pub cycle_id: String,
    pub targets: Vec<RefreshTarget>,
}
