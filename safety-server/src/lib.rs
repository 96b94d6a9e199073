//! Safety Center service core
//!
//! Aggregates status and issue reports from independent safety sources
//! into one consistent per-profile-group view, coordinates the pull-based
//! refresh protocol across them and keeps a cross-restart dismissal
//! ledger. Transport, persistence I/O and UI are external collaborators;
//! this crate owns what gets cached, merged and tracked.

pub mod center;

pub use center::service::{CenterEvent, SafetyCenterService};
