//! HTTP API: entity views, health checks and Prometheus metrics

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use metrics_lib::{
    health::{ComponentStatus, HealthRegistry},
    query::WorkloadKind,
    MetricsError, MetricsRequest, MetricsService,
};
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: MetricsService,
    pub health_registry: HealthRegistry,
}

impl AppState {
    pub fn new(service: MetricsService, health_registry: HealthRegistry) -> Self {
        Self {
            service,
            health_registry,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
}

/// `MetricsError` rendered as a JSON error response
pub struct ApiError(MetricsError);

impl From<MetricsError> for ApiError {
    fn from(e: MetricsError) -> Self {
        ApiError(e)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            MetricsError::InvalidDimension(_) => StatusCode::BAD_REQUEST,
            MetricsError::QueryFailed { .. } | MetricsError::DecodeFailed(_) => {
                StatusCode::BAD_GATEWAY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self.0, code = self.0.code(), "Request failed");
        } else {
            warn!(error = %self.0, "Rejected request");
        }

        let body = ErrorBody {
            error: self.0.to_string(),
            code: self.0.code(),
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Health check response - returns 200 if healthy or degraded, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // Still serving, values may be absent
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

async fn cluster_average(
    State(state): State<Arc<AppState>>,
) -> ApiResult<metrics_lib::ClusterAverage> {
    Ok(Json(state.service.cluster_average().await?))
}

async fn cluster_overview(
    State(state): State<Arc<AppState>>,
) -> ApiResult<metrics_lib::ClusterOverview> {
    Ok(Json(state.service.cluster_overview().await?))
}

async fn cluster_snapshot(
    State(state): State<Arc<AppState>>,
) -> ApiResult<metrics_lib::ClusterSnapshot> {
    Ok(Json(state.service.cluster_snapshot().await?))
}

async fn workloads_status(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Vec<metrics_lib::WorkloadStatus>> {
    Ok(Json(state.service.workloads_status().await?))
}

async fn workloads_summary(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Vec<metrics_lib::WorkloadSummary>> {
    Ok(Json(state.service.workloads_summary().await?))
}

async fn workload_summary(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
) -> ApiResult<metrics_lib::WorkloadSummary> {
    let kind: WorkloadKind = kind.parse()?;
    Ok(Json(state.service.workload_summary(kind).await?))
}

async fn workload_usage(
    State(state): State<Arc<AppState>>,
    Query(request): Query<MetricsRequest>,
) -> ApiResult<metrics_lib::ContainerInfo> {
    Ok(Json(state.service.workload_usage(&request).await?))
}

async fn nodes(State(state): State<Arc<AppState>>) -> ApiResult<Vec<metrics_lib::NodeRecord>> {
    Ok(Json(state.service.work_node_list().await?))
}

async fn node_info(
    State(state): State<Arc<AppState>>,
    Query(request): Query<MetricsRequest>,
) -> ApiResult<metrics_lib::WorkNodeInfo> {
    Ok(Json(state.service.work_node_info(&request).await?))
}

async fn pods(State(state): State<Arc<AppState>>) -> ApiResult<Vec<metrics_lib::PodRecord>> {
    Ok(Json(state.service.pod_metric_list().await?))
}

async fn pod_phase(State(state): State<Arc<AppState>>) -> ApiResult<metrics_lib::PodPhase> {
    Ok(Json(state.service.pod_phase().await?))
}

async fn containers(
    State(state): State<Arc<AppState>>,
    Query(request): Query<MetricsRequest>,
) -> ApiResult<Vec<metrics_lib::ContainerRecord>> {
    Ok(Json(state.service.container_list(&request).await?))
}

async fn container_info(
    State(state): State<Arc<AppState>>,
    Query(request): Query<MetricsRequest>,
) -> ApiResult<metrics_lib::ContainerInfo> {
    Ok(Json(state.service.container_info(&request).await?))
}

async fn container_log(
    State(state): State<Arc<AppState>>,
    Query(request): Query<MetricsRequest>,
) -> ApiResult<metrics_lib::ContainerLog> {
    Ok(Json(state.service.container_log(&request).await?))
}

/// Entity view routes, mounted under `/v1`
fn view_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/cluster/average", get(cluster_average))
        .route("/cluster/overview", get(cluster_overview))
        .route("/cluster/snapshot", get(cluster_snapshot))
        .route("/workloads/status", get(workloads_status))
        .route("/workloads/summary", get(workloads_summary))
        .route("/workloads/summary/:kind", get(workload_summary))
        .route("/workloads/usage", get(workload_usage))
        .route("/nodes", get(nodes))
        .route("/nodes/info", get(node_info))
        .route("/pods", get(pods))
        .route("/pods/phase", get(pod_phase))
        .route("/containers", get(containers))
        .route("/containers/info", get(container_info))
        .route("/containers/log", get(container_log))
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .nest("/v1", view_routes())
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
