use spillmedian_core::obs::{GlobalMetricsSink, MetricsEvent, MetricsSink};

///
/// TracingSink
///
/// Logs every core event at debug level, then counts it as usual.
///

#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl MetricsSink for TracingSink {
    fn record(&self, event: MetricsEvent) {
        match event {
            MetricsEvent::RunSpilled { values, bytes } => {
                tracing::debug!(values, bytes, "spilled sorted run");
            }
            MetricsEvent::MergePass {
                runs,
                values,
                bytes,
            } => {
                tracing::debug!(runs, values, bytes, "merged runs into one");
            }
            MetricsEvent::SortFinished {
                values,
                runs,
                merged,
            } => {
                tracing::debug!(values, runs, merged, "sort finished");
            }
            MetricsEvent::MedianSelected { count, position } => {
                tracing::debug!(count, position, "median selected");
            }
            MetricsEvent::FinalizeFinish {
                count,
                elapsed_micros,
            } => {
                tracing::debug!(count, elapsed_micros, "finalize finished");
            }
            MetricsEvent::ValueInserted | MetricsEvent::NullSkipped => {
                tracing::trace!(?event, "input");
            }
            MetricsEvent::FinalizeStart => {}
        }

        GlobalMetricsSink.record(event);
    }
}
