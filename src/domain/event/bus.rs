//! Event publishing port

use async_trait::async_trait;

use super::EventEnvelope;
use crate::domain::DomainError;

#[cfg(test)]
use mockall::automock;

/// Fan-out of domain events to downstream consumers.
///
/// Delivery is at-least-once and best-effort: handlers log a failed publish and
/// carry on, the state change it describes is already persisted.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Publish events in the order given
    async fn publish(&self, events: &[EventEnvelope]) -> Result<(), DomainError>;
}
