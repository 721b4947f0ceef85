//! Observability: runtime telemetry (metrics) and sink abstractions.
//!
//! Sorter and accumulator logic only emit [`MetricsEvent`]s; counters and
//! any host-side logging live behind [`MetricsSink`].

pub(crate) mod metrics;
pub(crate) mod sink;

// re-exports
pub use metrics::{EventOps, EventPerf, EventReport};
pub use sink::{
    GlobalMetricsSink, MetricsEvent, MetricsSink, metrics_report, metrics_reset_all,
    with_metrics_sink,
};
