//! Backend health tracking for liveness and readiness probes
//!
//! Each outbound backend is a component. A failed call marks it degraded
//! (the API keeps serving partial views), a successful call restores it.
//! Only an explicit `set_unhealthy` takes the service out of rotation.

use crate::error::MetricsError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Health status of a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    /// Recent calls failed; views may be incomplete
    Degraded,
    Unhealthy,
}

impl ComponentStatus {
    pub fn is_operational(&self) -> bool {
        matches!(self, ComponentStatus::Healthy | ComponentStatus::Degraded)
    }
}

/// Last observed state of one backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Failures since the last successful call
    pub consecutive_failures: u32,
    pub last_check_timestamp: i64,
}

impl ComponentHealth {
    pub fn healthy() -> Self {
        Self {
            status: ComponentStatus::Healthy,
            message: None,
            consecutive_failures: 0,
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }

    fn failing(status: ComponentStatus, message: String, consecutive_failures: u32) -> Self {
        Self {
            status,
            message: Some(message),
            consecutive_failures,
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// Aggregated `/healthz` body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: HashMap<String, ComponentHealth>,
}

impl HealthResponse {
    /// Worst status across all components
    pub fn compute_status(components: &HashMap<String, ComponentHealth>) -> ComponentStatus {
        components
            .values()
            .map(|c| c.status)
            .fold(ComponentStatus::Healthy, |worst, s| match (worst, s) {
                (ComponentStatus::Unhealthy, _) | (_, ComponentStatus::Unhealthy) => {
                    ComponentStatus::Unhealthy
                }
                (ComponentStatus::Degraded, _) | (_, ComponentStatus::Degraded) => {
                    ComponentStatus::Degraded
                }
                _ => ComponentStatus::Healthy,
            })
    }
}

/// `/readyz` body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Component names
pub mod components {
    pub const PROMETHEUS: &str = "prometheus";
    pub const KUBERNETES_API: &str = "kubernetes_api";
}

/// Shared registry of backend health
#[derive(Debug, Clone)]
pub struct HealthRegistry {
    components: Arc<RwLock<HashMap<String, ComponentHealth>>>,
    ready: Arc<RwLock<bool>>,
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self {
            components: Arc::new(RwLock::new(HashMap::new())),
            ready: Arc::new(RwLock::new(false)),
        }
    }

    /// Registry with both backends registered as healthy
    pub async fn for_backends() -> Self {
        let registry = Self::new();
        registry.register(components::PROMETHEUS).await;
        registry.register(components::KUBERNETES_API).await;
        registry
    }

    pub async fn register(&self, name: &str) {
        self.components
            .write()
            .await
            .insert(name.to_string(), ComponentHealth::healthy());
    }

    pub async fn set_healthy(&self, name: &str) {
        self.components
            .write()
            .await
            .insert(name.to_string(), ComponentHealth::healthy());
    }

    /// Record a failed call; the failure streak is kept for diagnostics
    pub async fn record_failure(&self, name: &str, error: &MetricsError) {
        let mut components = self.components.write().await;
        let streak = components
            .get(name)
            .map(|c| c.consecutive_failures)
            .unwrap_or(0)
            + 1;
        let status = match components.get(name).map(|c| c.status) {
            Some(ComponentStatus::Unhealthy) => ComponentStatus::Unhealthy,
            _ => ComponentStatus::Degraded,
        };
        components.insert(
            name.to_string(),
            ComponentHealth::failing(status, error.to_string(), streak),
        );
    }

    /// Record the outcome of one backend call
    pub async fn observe<T>(&self, name: &str, outcome: &Result<T, MetricsError>) {
        match outcome {
            Ok(_) => self.set_healthy(name).await,
            Err(e) => self.record_failure(name, e).await,
        }
    }

    pub async fn set_unhealthy(&self, name: &str, message: impl Into<String>) {
        let streak = self
            .components
            .read()
            .await
            .get(name)
            .map(|c| c.consecutive_failures)
            .unwrap_or(0);
        self.components.write().await.insert(
            name.to_string(),
            ComponentHealth::failing(ComponentStatus::Unhealthy, message.into(), streak),
        );
    }

    pub async fn set_ready(&self, ready: bool) {
        *self.ready.write().await = ready;
    }

    pub async fn health(&self) -> HealthResponse {
        let components = self.components.read().await.clone();
        let status = HealthResponse::compute_status(&components);
        HealthResponse { status, components }
    }

    /// Ready once started, unless a backend was marked unhealthy
    pub async fn readiness(&self) -> ReadinessResponse {
        let ready = *self.ready.read().await;
        let health = self.health().await;

        if !ready {
            ReadinessResponse {
                ready: false,
                reason: Some("Monitor not yet initialized".to_string()),
            }
        } else if !health.status.is_operational() {
            ReadinessResponse {
                ready: false,
                reason: Some("Backend unhealthy".to_string()),
            }
        } else {
            ReadinessResponse {
                ready: true,
                reason: None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refused() -> MetricsError {
        MetricsError::query_failed("http://prometheus:9090", "connection refused")
    }

    #[tokio::test]
    async fn test_registry_starts_healthy() {
        let registry = HealthRegistry::for_backends().await;
        let health = registry.health().await;

        assert_eq!(health.status, ComponentStatus::Healthy);
        assert_eq!(health.components.len(), 2);
        assert!(health.components.contains_key(components::PROMETHEUS));
    }

    #[tokio::test]
    async fn test_failure_degrades_and_success_restores() {
        let registry = HealthRegistry::for_backends().await;

        registry.record_failure(components::PROMETHEUS, &refused()).await;
        registry.record_failure(components::PROMETHEUS, &refused()).await;
        let health = registry.health().await;
        assert_eq!(health.status, ComponentStatus::Degraded);
        let prom = &health.components[components::PROMETHEUS];
        assert_eq!(prom.consecutive_failures, 2);
        assert!(prom.message.as_deref().unwrap().contains("connection refused"));

        registry
            .observe::<()>(components::PROMETHEUS, &Ok(()))
            .await;
        let health = registry.health().await;
        assert_eq!(health.status, ComponentStatus::Healthy);
        assert_eq!(health.components[components::PROMETHEUS].consecutive_failures, 0);
    }

    #[tokio::test]
    async fn test_degraded_backend_stays_ready() {
        let registry = HealthRegistry::for_backends().await;
        registry.set_ready(true).await;
        registry
            .observe::<()>(components::KUBERNETES_API, &Err(refused()))
            .await;

        assert!(registry.readiness().await.ready);
    }

    #[tokio::test]
    async fn test_not_ready_initially_or_when_unhealthy() {
        let registry = HealthRegistry::for_backends().await;
        let readiness = registry.readiness().await;
        assert!(!readiness.ready);
        assert!(readiness.reason.is_some());

        registry.set_ready(true).await;
        registry.set_unhealthy(components::PROMETHEUS, "bad URL").await;
        assert!(!registry.readiness().await.ready);
        assert_eq!(registry.health().await.status, ComponentStatus::Unhealthy);
    }
}
