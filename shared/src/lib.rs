//! Shared types for the Safety Center framework
//!
//! Data models, identity/key types and configuration shapes used by the
//! service core and by the IPC/storage collaborators around it.

pub mod ids;
pub mod models;
pub mod util;

// Re-exports
pub use ids::{ActionKey, IssueKey, SourceKey, UserId};
pub use serde::{Deserialize, Serialize};
