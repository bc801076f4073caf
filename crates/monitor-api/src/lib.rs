//! Controller layer of the CaaS monitor: routes entity requests to the
//! metrics engine and serves health, readiness and Prometheus metrics.

pub mod api;

pub use api::{create_router, serve, AppState};
