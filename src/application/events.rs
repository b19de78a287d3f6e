//! Post-commit event publication

use std::sync::Arc;

use tracing::warn;

use crate::domain::event::{EventBus, EventEnvelope};

/// Optional event bus shared by command handlers.
///
/// Publication happens after the aggregate is persisted. A failing bus is
/// logged and otherwise ignored; the command has already succeeded.
#[derive(Clone, Default)]
pub struct EventPublisher {
    bus: Option<Arc<dyn EventBus>>,
}

impl EventPublisher {
    pub fn new(bus: Arc<dyn EventBus>) -> Self {
        Self { bus: Some(bus) }
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.bus.is_some()
    }

    pub async fn publish(&self, events: Vec<EventEnvelope>) {
        let Some(bus) = &self.bus else {
            return;
        };
        if events.is_empty() {
            return;
        }

        if let Err(e) = bus.publish(&events).await {
            warn!(
                error = %e,
                count = events.len(),
                first_event = events[0].event_type(),
                "Failed to publish domain events"
            );
        }
    }
}

impl std::fmt::Debug for EventPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventPublisher")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::event::{DomainEvent, MockEventBus};
    use crate::domain::{DomainError, UserId};

    fn event() -> EventEnvelope {
        EventEnvelope::new(DomainEvent::UserDeleted {
            user_id: UserId::new(),
        })
    }

    #[tokio::test]
    async fn test_publish_without_bus_is_noop() {
        EventPublisher::none().publish(vec![event()]).await;
    }

    #[tokio::test]
    async fn test_publish_forwards_events() {
        let mut bus = MockEventBus::new();
        bus.expect_publish()
            .withf(|events| events.len() == 2)
            .times(1)
            .returning(|_| Ok(()));

        EventPublisher::new(Arc::new(bus))
            .publish(vec![event(), event()])
            .await;
    }

    #[tokio::test]
    async fn test_publish_skips_empty_batches() {
        let mut bus = MockEventBus::new();
        bus.expect_publish().never();

        EventPublisher::new(Arc::new(bus)).publish(Vec::new()).await;
    }

    #[tokio::test]
    async fn test_publish_failure_is_swallowed() {
        let mut bus = MockEventBus::new();
        bus.expect_publish()
            .times(1)
            .returning(|_| Err(DomainError::infrastructure("broker down")));

        EventPublisher::new(Arc::new(bus)).publish(vec![event()]).await;
    }
}
