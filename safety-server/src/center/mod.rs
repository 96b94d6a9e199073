//! Safety Center components
//!
//! # Module structure
//!
//! - [`data_store`] - per-(source, user) report store with write validation
//! - [`ledger`] - cross-restart issue dismissal ledger
//! - [`issues`] - visible-issue aggregation (sorting, dedup, dismissal)
//! - [`status`] - top-level aggregate (entries, groups, overall status)
//! - [`refresh`] - refresh cycle state machine
//! - [`listeners`] - change-suppressed delivery to registered observers
//! - [`actions`] - transient in-flight markers for resolving actions
//! - [`service`] - the facade owning all of the above under one lock

pub mod actions;
pub mod data_store;
pub mod error;
pub mod issues;
pub mod ledger;
pub mod listeners;
pub mod refresh;
pub mod service;
pub mod status;

pub use error::{ServiceError, ServiceResult, ValidationError};
pub use listeners::{AggregateObserver, DeliveryError};
pub use service::{CenterEvent, SafetyCenterService};

#[cfg(test)]
mod tests;
