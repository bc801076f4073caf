//! Metrics aggregation and correlation engine for CaaS monitoring
//!
//! This crate provides the core functionality for:
//! - Dimensioned PromQL construction
//! - Query execution against Prometheus and the Kubernetes log API
//! - Path-based extraction of scalars and tagged rows
//! - Concurrent fan-out with a completion barrier
//! - Merge-join of dependent lists onto an authoritative list
//! - Unit conversion and presentation formatting
//! - Health checks and observability

pub mod backend;
pub mod composer;
pub mod config;
pub mod correlate;
pub mod error;
pub mod extract;
pub mod fanout;
pub mod health;
pub mod models;
pub mod observability;
pub mod query;
pub mod units;

pub use backend::{HttpBackend, InstrumentedBackend, QueryBackend, SharedBackend};
pub use composer::MetricsService;
pub use config::MonitorConfig;
pub use error::{MetricsError, Result};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{MonitorMetrics, StructuredLogger};
