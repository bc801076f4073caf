//! Monitor configuration

use crate::error::{MetricsError, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Environment variable naming an optional config file
pub const CONFIG_FILE_ENV: &str = "CAAS_MONITOR_CONFIG";

/// Monitor configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    /// Prometheus base URL (the query path is appended)
    #[serde(default = "default_prometheus_url")]
    pub prometheus_url: String,

    /// Kubernetes API base URL used for pod logs
    #[serde(default = "default_kubernetes_api_url")]
    pub kubernetes_api_url: String,

    /// Bearer token for the Kubernetes API
    #[serde(default)]
    pub kubernetes_token: Option<String>,

    /// API server port
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Per-call backend timeout in seconds, 0 disables it
    #[serde(default)]
    pub query_timeout_secs: u64,
}

fn default_prometheus_url() -> String {
    "http://prometheus:9090".to_string()
}

fn default_kubernetes_api_url() -> String {
    "https://kubernetes.default".to_string()
}

fn default_api_port() -> u16 {
    8080
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            prometheus_url: default_prometheus_url(),
            kubernetes_api_url: default_kubernetes_api_url(),
            kubernetes_token: None,
            api_port: default_api_port(),
            query_timeout_secs: 0,
        }
    }
}

impl MonitorConfig {
    /// Load configuration from the optional config file and `CAAS_MONITOR_*`
    /// environment variables. Environment wins over the file.
    pub fn load() -> Result<Self> {
        let file = std::env::var(CONFIG_FILE_ENV).unwrap_or_else(|_| "config.toml".to_string());
        Self::load_from(Path::new(&file))
    }

    /// Load with an explicit config file path; a missing file is not an error
    pub fn load_from(file: &Path) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::from(file).required(false))
            .add_source(config::Environment::with_prefix("CAAS_MONITOR").separator("__"))
            .build()
            .map_err(|e| MetricsError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| MetricsError::Config(e.to_string()))
    }

    /// Per-call timeout, `None` when disabled
    pub fn query_timeout(&self) -> Option<Duration> {
        (self.query_timeout_secs > 0).then(|| Duration::from_secs(self.query_timeout_secs))
    }
}
