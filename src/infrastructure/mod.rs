//! Infrastructure layer - Adapters for the domain ports

pub mod auth;
pub mod event_bus;
pub mod logging;
pub mod observability;
pub mod permission;
pub mod role;
pub mod session;
pub mod user;
