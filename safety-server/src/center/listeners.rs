//! ListenerDispatcher - change-suppressed delivery to observers
//!
//! Each registration remembers the last aggregate it was delivered;
//! pushes happen only when the freshly computed aggregate differs by
//! value, while errors are always forwarded. One registration failing
//! never stops delivery to the others.

use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use shared::ids::UserId;
use shared::models::{ErrorDetails, SafetyAggregate, UserProfileGroup};

/// Observer-side delivery failures.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The observer is permanently unreachable; its registration is
    /// removed.
    #[error("observer is gone")]
    Gone,
    #[error("delivery failed: {0}")]
    Failed(String),
}

/// Receives recomputed aggregates and forwarded errors.
///
/// Callbacks run under the service lock and must not block or call back
/// into the service.
pub trait AggregateObserver: Send + Sync {
    fn on_aggregate_changed(&self, aggregate: &SafetyAggregate) -> Result<(), DeliveryError>;

    fn on_error(&self, error: &ErrorDetails) -> Result<(), DeliveryError> {
        let _ = error;
        Ok(())
    }
}

struct ListenerRegistration {
    id: Uuid,
    package_name: String,
    user_id: UserId,
    observer: Arc<dyn AggregateObserver>,
    last_delivered: Option<SafetyAggregate>,
}

#[derive(Default)]
pub struct ListenerDispatcher {
    registrations: Vec<ListenerRegistration>,
}

impl std::fmt::Debug for ListenerDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerDispatcher")
            .field("registrations", &self.registrations.len())
            .finish()
    }
}

impl ListenerDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(
        &mut self,
        observer: Arc<dyn AggregateObserver>,
        package_name: impl Into<String>,
        user_id: UserId,
    ) -> Uuid {
        let id = Uuid::new_v4();
        self.registrations.push(ListenerRegistration {
            id,
            package_name: package_name.into(),
            user_id,
            observer,
            last_delivered: None,
        });
        id
    }

    pub fn remove(&mut self, id: Uuid) -> bool {
        let before = self.registrations.len();
        self.registrations.retain(|r| r.id != id);
        self.registrations.len() != before
    }

    pub fn clear_for_user(&mut self, user_id: UserId) {
        self.registrations.retain(|r| r.user_id != user_id);
    }

    pub fn clear(&mut self) {
        self.registrations.clear();
    }

    /// Whether any registration is bound to a user in the group.
    pub fn has_listeners_for(&self, group: &UserProfileGroup) -> bool {
        self.registrations.iter().any(|r| group.contains(r.user_id))
    }

    /// Deliver to every registration bound to an active user in the group.
    ///
    /// `aggregate` is pushed only to registrations whose last-delivered
    /// value differs; `error` is forwarded unconditionally. Failures are
    /// isolated per registration: a failed push is logged, leaves that
    /// registration's bookkeeping alone, and delivery continues. Observers
    /// reporting themselves gone are pruned afterwards.
    pub fn deliver(
        &mut self,
        group: &UserProfileGroup,
        aggregate: Option<&SafetyAggregate>,
        error: Option<&ErrorDetails>,
    ) {
        let mut dead: Vec<Uuid> = Vec::new();

        for registration in self
            .registrations
            .iter_mut()
            .filter(|r| group.contains(r.user_id))
        {
            if let Some(aggregate) = aggregate
                && registration.last_delivered.as_ref() != Some(aggregate)
            {
                match registration.observer.on_aggregate_changed(aggregate) {
                    Ok(()) => registration.last_delivered = Some(aggregate.clone()),
                    Err(DeliveryError::Gone) => {
                        dead.push(registration.id);
                        continue;
                    }
                    Err(e) => {
                        tracing::warn!(
                            listener = %registration.id,
                            package = %registration.package_name,
                            error = %e,
                            "Aggregate delivery failed"
                        );
                    }
                }
            }

            if let Some(error) = error {
                match registration.observer.on_error(error) {
                    Ok(()) => {}
                    Err(DeliveryError::Gone) => dead.push(registration.id),
                    Err(e) => {
                        tracing::warn!(
                            listener = %registration.id,
                            package = %registration.package_name,
                            error = %e,
                            "Error delivery failed"
                        );
                    }
                }
            }
        }

        if !dead.is_empty() {
            tracing::info!(count = dead.len(), "Pruning gone listeners");
            self.registrations.retain(|r| !dead.contains(&r.id));
        }
    }

    /// Push the current aggregate to one freshly added registration.
    pub fn deliver_initial(&mut self, id: Uuid, aggregate: &SafetyAggregate) {
        let Some(registration) = self.registrations.iter_mut().find(|r| r.id == id) else {
            return;
        };
        match registration.observer.on_aggregate_changed(aggregate) {
            Ok(()) => registration.last_delivered = Some(aggregate.clone()),
            Err(DeliveryError::Gone) => {
                let id = registration.id;
                self.registrations.retain(|r| r.id != id);
            }
            Err(e) => {
                tracing::warn!(listener = %id, error = %e, "Initial delivery failed");
            }
        }
    }
}
