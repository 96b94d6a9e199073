//! Data models
//!
//! Shared between the service core and its IPC/storage collaborators.
//! Everything here is plain serde-serializable data; behavior lives in
//! `safety-server`.

pub mod aggregate;
pub mod config;
pub mod dismissal;
pub mod refresh;
pub mod severity;
pub mod source;
pub mod user;

// Re-exports
pub use aggregate::*;
pub use config::*;
pub use dismissal::*;
pub use refresh::*;
pub use severity::*;
pub use source::*;
pub use user::*;
