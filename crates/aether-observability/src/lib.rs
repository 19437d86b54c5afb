//! Logging and render metrics for the Aether framework.
//!
//! This crate provides:
//! - `init_logging` - Installs a `tracing` subscriber (JSON or human format)
//! - `MetricsCollector` - Per-module timings for one render
//! - `RenderMetrics` - Finalized timings, with JSON and summary output

mod logging;
mod metrics;

pub use logging::*;
pub use metrics::*;

// Re-export RequestId from aether-core for convenience
pub use aether_core::RequestId;
