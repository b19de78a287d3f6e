//! Event bus that writes every event to the log

use async_trait::async_trait;
use tracing::info;

use crate::domain::event::{EventBus, EventEnvelope};
use crate::domain::DomainError;

#[derive(Debug, Clone, Default)]
pub struct TracingEventBus;

impl TracingEventBus {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EventBus for TracingEventBus {
    async fn publish(&self, events: &[EventEnvelope]) -> Result<(), DomainError> {
        for envelope in events {
            let payload = serde_json::to_string(&envelope.event)
                .map_err(|e| DomainError::infrastructure(format!("Failed to encode event: {}", e)))?;

            info!(
                event_id = %envelope.id,
                event_type = envelope.event_type(),
                aggregate_id = %envelope.event.aggregate_id(),
                occurred_at = %envelope.occurred_at,
                payload = %payload,
                "Domain event"
            );
        }
        Ok(())
    }
}
