//! In-memory event bus for tests and single-process deployments

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

use crate::domain::event::{EventBus, EventEnvelope};
use crate::domain::DomainError;

const DEFAULT_CAPACITY: usize = 1024;

/// Records every published event and fans it out to subscribers.
///
/// Delivery to subscribers is best effort: a lagging receiver loses the
/// oldest events, and publishing with no subscribers is not an error.
#[derive(Debug, Clone)]
pub struct InMemoryEventBus {
    published: Arc<RwLock<Vec<EventEnvelope>>>,
    sender: broadcast::Sender<EventEnvelope>,
    should_fail: Arc<RwLock<bool>>,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            published: Arc::new(RwLock::new(Vec::new())),
            sender,
            should_fail: Arc::new(RwLock::new(false)),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.sender.subscribe()
    }

    /// Set whether publishing should fail
    pub async fn set_should_fail(&self, fail: bool) {
        *self.should_fail.write().await = fail;
    }

    pub async fn published(&self) -> Vec<EventEnvelope> {
        self.published.read().await.clone()
    }

    /// Event type names in publication order
    pub async fn published_types(&self) -> Vec<&'static str> {
        self.published
            .read()
            .await
            .iter()
            .map(|e| e.event_type())
            .collect()
    }

    /// How many published events have the given type
    pub async fn count_of(&self, event_type: &str) -> usize {
        self.published
            .read()
            .await
            .iter()
            .filter(|e| e.event_type() == event_type)
            .count()
    }

    pub async fn clear(&self) {
        self.published.write().await.clear();
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventBus for InMemoryEventBus {
    async fn publish(&self, events: &[EventEnvelope]) -> Result<(), DomainError> {
        if *self.should_fail.read().await {
            return Err(DomainError::infrastructure(
                "In-memory event bus configured to fail",
            ));
        }

        self.published.write().await.extend_from_slice(events);
        for event in events {
            // No receivers is fine
            let _ = self.sender.send(event.clone());
        }

        Ok(())
    }
}
