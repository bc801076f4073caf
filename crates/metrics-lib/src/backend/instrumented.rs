//! Metrics and health decorator for any [`QueryBackend`]

use super::{QueryBackend, SharedBackend};
use crate::error::Result;
use crate::health::{components, HealthRegistry};
use crate::observability::MonitorMetrics;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Instant;
use tracing::debug;

/// Records latency, call counts and failures, and feeds backend health
pub struct InstrumentedBackend {
    inner: SharedBackend,
    metrics: MonitorMetrics,
    health: HealthRegistry,
}

impl InstrumentedBackend {
    pub fn new(inner: SharedBackend, health: HealthRegistry) -> Self {
        Self {
            inner,
            metrics: MonitorMetrics::new(),
            health,
        }
    }

    async fn record<T>(&self, component: &str, started: Instant, outcome: &Result<T>) {
        self.metrics.observe_query(component, started.elapsed());
        if let Err(e) = outcome {
            self.metrics.inc_query_errors(component, e.code());
        }
        self.health.observe(component, outcome).await;
    }
}

#[async_trait]
impl QueryBackend for InstrumentedBackend {
    async fn query(&self, expr: &str) -> Result<Value> {
        let started = Instant::now();
        let outcome = self.inner.query(expr).await;
        debug!(query = %expr, ok = outcome.is_ok(), "Backend query finished");
        self.record(components::PROMETHEUS, started, &outcome).await;
        outcome
    }

    async fn pod_log(&self, namespace: &str, pod: &str) -> Result<String> {
        let started = Instant::now();
        let outcome = self.inner.pod_log(namespace, pod).await;
        self.record(components::KUBERNETES_API, started, &outcome).await;
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::fixture::{scalar_doc, FixtureBackend};
    use crate::health::ComponentStatus;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_failures_degrade_the_matching_component() {
        let health = HealthRegistry::for_backends().await;
        let fixture = FixtureBackend::new()
            .on_contains("up", scalar_doc("1"))
            .fail_on("broken");
        let backend = InstrumentedBackend::new(Arc::new(fixture), health.clone());

        assert!(backend.query("broken_metric").await.is_err());
        let status = health.health().await;
        assert_eq!(
            status.components[components::PROMETHEUS].status,
            ComponentStatus::Degraded
        );
        assert_eq!(
            status.components[components::KUBERNETES_API].status,
            ComponentStatus::Healthy
        );

        assert!(backend.query("up").await.is_ok());
        assert_eq!(health.health().await.status, ComponentStatus::Healthy);
    }

    #[tokio::test]
    async fn test_log_failures_tracked_separately() {
        let health = HealthRegistry::for_backends().await;
        let backend = InstrumentedBackend::new(Arc::new(FixtureBackend::new()), health.clone());

        assert!(backend.pod_log("default", "missing").await.is_err());
        let status = health.health().await;
        assert_eq!(
            status.components[components::KUBERNETES_API].status,
            ComponentStatus::Degraded
        );
        assert_eq!(
            status.components[components::PROMETHEUS].status,
            ComponentStatus::Healthy
        );
    }
}
