//! Internal telemetry for the analytics engine: tracing setup, in-process
//! counters, and the component health registry.

pub mod health;
pub mod metrics;
pub mod tracing_setup;

pub use health::*;
pub use metrics::*;
pub use tracing_setup::*;
