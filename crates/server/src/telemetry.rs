//! Prometheus wiring for the pipeline metrics observer.
//!
//! The recorder is process-global, so it is installed at most once no matter
//! how many routers get built.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use ingest::IngestError;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use publish::{PublishError, PublisherStats};
use tally::PipelineMetrics;

static PROMETHEUS: OnceLock<Option<PrometheusHandle>> = OnceLock::new();

/// Install the Prometheus recorder and hook it into the pipeline.
///
/// Returns `None` when another recorder already owns the process.
pub fn install_prometheus() -> Option<PrometheusHandle> {
    PROMETHEUS
        .get_or_init(|| match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => {
                tally::set_pipeline_metrics(Some(Arc::new(PrometheusPipelineMetrics)));
                Some(handle)
            }
            Err(err) => {
                tracing::warn!(error = %err, "prometheus_recorder_unavailable");
                None
            }
        })
        .clone()
}

/// Feeds pipeline outcomes into the `metrics` facade.
pub struct PrometheusPipelineMetrics;

impl PipelineMetrics for PrometheusPipelineMetrics {
    fn record_ingest(&self, latency: Duration, result: Result<(), IngestError>) {
        let outcome = match &result {
            Ok(()) => "accepted",
            Err(err) => err.kind(),
        };
        metrics::counter!("tally_ingest_total", "outcome" => outcome).increment(1);
        metrics::histogram!("tally_ingest_duration_seconds").record(latency.as_secs_f64());
    }

    fn record_publish(&self, latency: Duration, result: Result<(), PublishError>) {
        let outcome = match &result {
            Ok(()) => "ok",
            Err(err) => err.kind(),
        };
        metrics::counter!("tally_publish_total", "outcome" => outcome).increment(1);
        metrics::histogram!("tally_publish_duration_seconds").record(latency.as_secs_f64());
    }
}

/// Mirror the publisher's delivery counters as gauges before a scrape.
pub fn record_publisher_stats(stats: PublisherStats) {
    metrics::gauge!("tally_publisher_enqueued").set(stats.enqueued as f64);
    metrics::gauge!("tally_publisher_acknowledged").set(stats.acknowledged as f64);
    metrics::gauge!("tally_publisher_failed").set(stats.failed as f64);
    metrics::gauge!("tally_publisher_late_failures").set(stats.late_failures as f64);
}
