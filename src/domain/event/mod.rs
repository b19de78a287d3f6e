//! Domain events
//!
//! Aggregates record facts about their own state changes into an
//! [`EventBuffer`]; command handlers drain the buffer after persistence and hand
//! the events to an [`EventBus`].

mod bus;
mod envelope;

pub use bus::EventBus;
pub use envelope::{DomainEvent, EventBuffer, EventEnvelope};

#[cfg(test)]
pub use bus::MockEventBus;
