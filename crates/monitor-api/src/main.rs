//! CaaS monitor - metrics aggregation service
//!
//! Serves hierarchical cluster, node, workload, pod and container views
//! composed from Prometheus queries.

use anyhow::Result;
use metrics_lib::{
    backend::{HttpBackend, InstrumentedBackend},
    health::HealthRegistry,
    observability::StructuredLogger,
    MetricsService, MonitorConfig,
};
use monitor_api::api;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const MONITOR_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting caas-monitor");

    let config = MonitorConfig::load()?;
    info!(
        prometheus_url = %config.prometheus_url,
        kubernetes_api_url = %config.kubernetes_api_url,
        "Monitor configured"
    );

    let health_registry = HealthRegistry::for_backends().await;

    let backend = InstrumentedBackend::new(
        Arc::new(HttpBackend::from_config(&config)?),
        health_registry.clone(),
    );
    let service = MetricsService::new(Arc::new(backend));

    let logger = StructuredLogger::new("caas-monitor");
    logger.log_startup(MONITOR_VERSION, &config.prometheus_url, config.api_port);

    let app_state = Arc::new(api::AppState::new(service, health_registry.clone()));

    health_registry.set_ready(true).await;

    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    tokio::select! {
        result = api_handle => {
            match result {
                Ok(Ok(())) => info!("API server stopped"),
                Ok(Err(e)) => error!(error = %e, "API server failed"),
                Err(e) => error!(error = %e, "API server task aborted"),
            }
            logger.log_shutdown("API server exited");
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            logger.log_shutdown("SIGINT received");
        }
    }

    health_registry.set_ready(false).await;
    info!("Shutting down");

    Ok(())
}
