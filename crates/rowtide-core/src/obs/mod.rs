//! Observability: runtime telemetry (metrics) and sink abstractions.
//!
//! Pipeline logic does not access `obs::metrics` directly. All
//! instrumentation flows through `MetricsEvent` and `MetricsSink`; this
//! module is the only bridge to the process-local metric state.

pub(crate) mod metrics;
pub(crate) mod sink;

pub use metrics::EventReport;
pub use sink::{MetricsEvent, MetricsSink, metrics_report, metrics_reset_all, with_sink_override};
