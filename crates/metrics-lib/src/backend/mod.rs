//! Query execution against the metrics and log backends
//!
//! The composer only sees the [`QueryBackend`] trait, so the HTTP client can
//! be swapped for [`fixture::FixtureBackend`] in tests.

pub mod fixture;
mod http;
mod instrumented;

pub use http::HttpBackend;
pub use instrumented::InstrumentedBackend;

use crate::error::Result;
use crate::extract::{self, KeyField, ScalarResult, TaggedRow};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Outbound capabilities consumed by the aggregation engine
#[async_trait]
pub trait QueryBackend: Send + Sync {
    /// Run an instant query and return the decoded response document
    async fn query(&self, expr: &str) -> Result<Value>;

    /// Fetch the raw log text of a pod
    async fn pod_log(&self, namespace: &str, pod: &str) -> Result<String>;
}

/// Shared handle passed into fan-out workers
pub type SharedBackend = Arc<dyn QueryBackend>;

/// Query and read the first result's value
pub async fn fetch_scalar(backend: &dyn QueryBackend, expr: &str) -> Result<ScalarResult> {
    let doc = backend.query(expr).await?;
    Ok(extract::scalar(&doc, extract::VALUE_DATA))
}

/// Query and read the first result's value exactly as the backend sent it
pub async fn fetch_raw(backend: &dyn QueryBackend, expr: &str) -> Result<Option<String>> {
    let doc = backend.query(expr).await?;
    Ok(extract::raw_string(&doc, extract::VALUE_DATA))
}

/// Query and enumerate every result element into a row
pub async fn fetch_rows(
    backend: &dyn QueryBackend,
    expr: &str,
    labels: &[(KeyField, &str)],
) -> Result<Vec<TaggedRow>> {
    let doc = backend.query(expr).await?;
    Ok(extract::rows(&doc, labels))
}
