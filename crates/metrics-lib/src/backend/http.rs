//! HTTP implementation of the query backend
//!
//! One GET per call, no retries. The response body is decoded once into a
//! generic JSON document and handed to the extractor.

use super::QueryBackend;
use crate::config::MonitorConfig;
use crate::error::{MetricsError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

const QUERY_PATH: &str = "api/v1/query";

/// Prometheus query API plus the Kubernetes pod log endpoint
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    prometheus_url: Url,
    kubernetes_api_url: Url,
    kubernetes_token: Option<String>,
}

impl HttpBackend {
    /// Create a backend. A `None` timeout leaves calls unbounded.
    pub fn new(
        prometheus_url: &str,
        kubernetes_api_url: &str,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| MetricsError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            prometheus_url: parse_base(prometheus_url)?,
            kubernetes_api_url: parse_base(kubernetes_api_url)?,
            kubernetes_token: None,
        })
    }

    /// Create a backend from loaded configuration
    pub fn from_config(config: &MonitorConfig) -> Result<Self> {
        let mut backend = Self::new(
            &config.prometheus_url,
            &config.kubernetes_api_url,
            config.query_timeout(),
        )?;
        backend.kubernetes_token = config.kubernetes_token.clone();
        Ok(backend)
    }

    /// Full query URL for a PromQL expression
    pub fn query_url(&self, expr: &str) -> Result<Url> {
        let mut url = self
            .prometheus_url
            .join(QUERY_PATH)
            .map_err(|e| MetricsError::Config(e.to_string()))?;
        url.query_pairs_mut().append_pair("query", expr);
        Ok(url)
    }

    /// Pod log URL on the Kubernetes API
    pub fn log_url(&self, namespace: &str, pod: &str) -> Result<Url> {
        let mut url = self
            .kubernetes_api_url
            .join("api/v1/")
            .map_err(|e| MetricsError::Config(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| MetricsError::Config("kubernetes API URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(["namespaces", namespace, "pods", pod, "log"]);
        Ok(url)
    }

    /// Perform the GET and decode the body as JSON
    pub async fn execute(&self, url: Url) -> Result<Value> {
        let target = url.to_string();
        debug!(url = %target, "Executing backend query");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| MetricsError::query_failed(&target, e))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| MetricsError::query_failed(&target, e))?;

        if !status.is_success() {
            return Err(MetricsError::query_failed(
                &target,
                format!("HTTP {}: {}", status, String::from_utf8_lossy(&body)),
            ));
        }

        serde_json::from_slice(&body).map_err(|e| MetricsError::DecodeFailed(e.to_string()))
    }
}

#[async_trait]
impl QueryBackend for HttpBackend {
    async fn query(&self, expr: &str) -> Result<Value> {
        let url = self.query_url(expr)?;
        self.execute(url).await
    }

    async fn pod_log(&self, namespace: &str, pod: &str) -> Result<String> {
        let url = self.log_url(namespace, pod)?;
        let target = url.to_string();

        let mut request = self.client.get(url);
        if let Some(token) = &self.kubernetes_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| MetricsError::query_failed(&target, e))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| MetricsError::query_failed(&target, e))?;

        if !status.is_success() {
            return Err(MetricsError::query_failed(
                &target,
                format!("HTTP {}: {}", status, text),
            ));
        }

        Ok(text)
    }
}

/// Parse a base URL, making sure it ends with a slash so `join` appends
fn parse_base(raw: &str) -> Result<Url> {
    let normalized = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{}/", raw)
    };
    Url::parse(&normalized).map_err(|e| MetricsError::Config(format!("invalid URL '{}': {}", raw, e)))
}
