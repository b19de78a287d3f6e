//! Event bus adapters

mod in_memory;
mod tracing_bus;

pub use in_memory::InMemoryEventBus;
pub use tracing_bus::TracingEventBus;
