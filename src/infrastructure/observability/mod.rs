//! Observability infrastructure - Metrics

mod metrics;

pub use metrics::{record_auth_attempt, record_auth_result, AuthFlow};
