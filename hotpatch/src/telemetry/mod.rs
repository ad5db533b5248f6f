//! Orchestrator telemetry for observability and user feedback.
//!
//! Lock-free atomic counters record check and download events as they
//! happen; [`MetricsSnapshot`] is a point-in-time copy for display.
//!
//! ```text
//! UpdateOrchestrator ─────► OrchestratorMetrics ─────► MetricsSnapshot ─────► CLI
//!                           (atomic counters)          (plain copy)
//! ```

mod metrics;
mod snapshot;

pub use metrics::OrchestratorMetrics;
pub use snapshot::MetricsSnapshot;
