//! Observability infrastructure for the monitor
//!
//! Provides:
//! - Prometheus metrics (backend latency and errors, degraded values, view sizes)
//! - Structured JSON logging of composed views with tracing

use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec,
    register_int_gauge_vec, HistogramVec, IntCounter, IntCounterVec, IntGaugeVec,
};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{info, warn};

/// Histogram buckets for backend round trips (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
];

/// Registered once per process; `None` if registration failed
static GLOBAL_METRICS: OnceLock<Option<MonitorMetricsInner>> = OnceLock::new();

struct MonitorMetricsInner {
    query_latency_seconds: HistogramVec,
    queries_total: IntCounterVec,
    query_errors_total: IntCounterVec,
    degraded_values_total: IntCounter,
    entities_returned: IntGaugeVec,
}

impl MonitorMetricsInner {
    fn register() -> prometheus::Result<Self> {
        Ok(Self {
            query_latency_seconds: register_histogram_vec!(
                "caas_monitor_query_latency_seconds",
                "Round-trip time of backend calls",
                &["backend"],
                LATENCY_BUCKETS.to_vec()
            )?,
            queries_total: register_int_counter_vec!(
                "caas_monitor_queries_total",
                "Total number of backend calls",
                &["backend"]
            )?,
            query_errors_total: register_int_counter_vec!(
                "caas_monitor_query_errors_total",
                "Total number of failed backend calls",
                &["backend", "code"]
            )?,
            degraded_values_total: register_int_counter!(
                "caas_monitor_degraded_values_total",
                "Values replaced by zero or empty because they could not be read"
            )?,
            entities_returned: register_int_gauge_vec!(
                "caas_monitor_entities_returned",
                "Number of records in the last composed view",
                &["view"]
            )?,
        })
    }
}

/// Handle to the process-wide monitor metrics
///
/// Clones share the same underlying collectors. When registration failed
/// (a conflicting collector already exists) every call is a no-op.
#[derive(Clone)]
pub struct MonitorMetrics {
    _private: (),
}

impl Default for MonitorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl MonitorMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(|| match MonitorMetricsInner::register() {
            Ok(inner) => Some(inner),
            Err(e) => {
                warn!(error = %e, "Failed to register monitor metrics");
                None
            }
        });
        Self { _private: () }
    }

    fn inner(&self) -> Option<&MonitorMetricsInner> {
        GLOBAL_METRICS.get().and_then(Option::as_ref)
    }

    /// Count one backend call and its latency
    pub fn observe_query(&self, backend: &str, elapsed: Duration) {
        if let Some(m) = self.inner() {
            m.queries_total.with_label_values(&[backend]).inc();
            m.query_latency_seconds
                .with_label_values(&[backend])
                .observe(elapsed.as_secs_f64());
        }
    }

    pub fn inc_query_errors(&self, backend: &str, code: &str) {
        if let Some(m) = self.inner() {
            m.query_errors_total.with_label_values(&[backend, code]).inc();
        }
    }

    pub fn inc_degraded_values(&self) {
        if let Some(m) = self.inner() {
            m.degraded_values_total.inc();
        }
    }

    pub fn set_entities_returned(&self, view: &str, count: usize) {
        if let Some(m) = self.inner() {
            m.entities_returned
                .with_label_values(&[view])
                .set(i64::try_from(count).unwrap_or(i64::MAX));
        }
    }
}

/// Structured logger for monitor lifecycle and view events
#[derive(Clone)]
pub struct StructuredLogger {
    service: String,
}

impl StructuredLogger {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    pub fn log_startup(&self, version: &str, prometheus_url: &str, port: u16) {
        info!(
            event = "monitor_started",
            service = %self.service,
            version = %version,
            prometheus_url = %prometheus_url,
            port = port,
            "CaaS monitor started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "monitor_shutdown",
            service = %self.service,
            reason = %reason,
            "CaaS monitor shutting down"
        );
    }

    /// Log a composed view and publish its size
    pub fn log_view(&self, view: &str, entities: usize, elapsed: Duration) {
        MonitorMetrics::new().set_entities_returned(view, entities);
        info!(
            event = "view_composed",
            service = %self.service,
            view = %view,
            entities = entities,
            elapsed_ms = elapsed.as_millis() as u64,
            "Composed view"
        );
    }

    /// Log a dependent query whose failure left values absent
    pub fn log_degraded(&self, view: &str, role: &str, error: &dyn std::fmt::Display) {
        MonitorMetrics::new().inc_degraded_values();
        warn!(
            event = "dependent_degraded",
            service = %self.service,
            view = %view,
            role = %role,
            error = %error,
            "Dependent query failed, values left absent"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monitor_metrics_observations() {
        let metrics = MonitorMetrics::new();
        let again = MonitorMetrics::new();

        metrics.observe_query("prometheus", Duration::from_millis(12));
        metrics.inc_query_errors("prometheus", "query_failed");
        again.inc_degraded_values();
        again.set_entities_returned("node_list", 3);

        let families = prometheus::gather();
        let names: Vec<&str> = families.iter().map(|f| f.get_name()).collect();
        assert!(names.contains(&"caas_monitor_queries_total"));
        assert!(names.contains(&"caas_monitor_entities_returned"));
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("caas-monitor");
        assert_eq!(logger.service, "caas-monitor");
        logger.log_view("cluster_average", 1, Duration::from_millis(3));
    }
}
