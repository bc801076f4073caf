//! API client for communicating with the monitor API

use anyhow::{Context, Result};
use metrics_lib::MetricsRequest;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize};
use url::Url;

/// API client for the monitor API
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

/// Error body returned by the monitor API
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default)]
    pub code: Option<String>,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;
        self.fetch(url).await
    }

    /// Make a GET request carrying the non-empty fields of `request` as
    /// query parameters
    pub async fn get_with<T: DeserializeOwned>(
        &self,
        path: &str,
        request: &MetricsRequest,
    ) -> Result<T> {
        let mut url = self.base_url.join(path).context("Invalid path")?;
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query_pairs(request) {
                pairs.append_pair(key, value);
            }
        }
        // An empty serializer still leaves a trailing '?'
        if url.query() == Some("") {
            url.set_query(None);
        }
        self.fetch(url).await
    }

    async fn fetch<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            match serde_json::from_str::<ErrorResponse>(&body) {
                Ok(err) => anyhow::bail!(
                    "API error ({}): {} [{}]",
                    status,
                    err.error,
                    err.code.unwrap_or_default()
                ),
                Err(_) => anyhow::bail!("API error ({}): {}", status, body),
            }
        }

        response.json().await.context("Failed to parse response")
    }
}

/// Request fields as the camelCase query parameters the API expects
fn query_pairs(request: &MetricsRequest) -> Vec<(&'static str, &str)> {
    [
        ("namespace", &request.namespace),
        ("podName", &request.pod_name),
        ("containerName", &request.container_name),
        ("instance", &request.instance),
        ("nodename", &request.nodename),
        ("workloadsName", &request.workloads_name),
    ]
    .into_iter()
    .filter_map(|(key, value)| {
        value
            .as_deref()
            .filter(|v| !v.is_empty())
            .map(|v| (key, v))
    })
    .collect()
}
