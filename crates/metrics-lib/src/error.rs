//! Error taxonomy for the metrics aggregation engine

use thiserror::Error;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, MetricsError>;

/// Errors produced while building, executing and interpreting backend queries
#[derive(Debug, Error)]
pub enum MetricsError {
    /// Network or transport failure talking to a backend
    #[error("query failed for {target}: {reason}")]
    QueryFailed { target: String, reason: String },

    /// Backend answered but the payload could not be decoded
    #[error("failed to decode backend response: {0}")]
    DecodeFailed(String),

    /// The requested path is absent from the response document
    #[error("path '{0}' missing from response")]
    ExtractionMissing(String),

    /// A query template was invoked with an unsupported or empty dimension
    #[error("invalid dimension: {0}")]
    InvalidDimension(String),

    /// A fan-out worker panicked or was cancelled before reporting
    #[error("fan-out task '{role}' aborted: {reason}")]
    TaskAborted { role: String, reason: String },

    /// Invalid configuration value, e.g. an unparsable backend URL
    #[error("configuration error: {0}")]
    Config(String),
}

impl MetricsError {
    pub fn query_failed(target: impl Into<String>, reason: impl ToString) -> Self {
        MetricsError::QueryFailed {
            target: target.into(),
            reason: reason.to_string(),
        }
    }

    /// Short machine-readable code used by API error bodies
    pub fn code(&self) -> &'static str {
        match self {
            MetricsError::QueryFailed { .. } => "query_failed",
            MetricsError::DecodeFailed(_) => "decode_failed",
            MetricsError::ExtractionMissing(_) => "extraction_missing",
            MetricsError::InvalidDimension(_) => "invalid_dimension",
            MetricsError::TaskAborted { .. } => "task_aborted",
            MetricsError::Config(_) => "config",
        }
    }

    /// True for failures caused by the backend rather than by the caller
    pub fn is_backend_failure(&self) -> bool {
        matches!(
            self,
            MetricsError::QueryFailed { .. } | MetricsError::DecodeFailed(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            MetricsError::query_failed("http://x", "refused").code(),
            "query_failed"
        );
        assert_eq!(
            MetricsError::InvalidDimension("division".into()).code(),
            "invalid_dimension"
        );
    }

    #[test]
    fn test_backend_failure_classification() {
        assert!(MetricsError::DecodeFailed("eof".into()).is_backend_failure());
        assert!(!MetricsError::ExtractionMissing("data.result.0".into()).is_backend_failure());
    }

    #[test]
    fn test_display_includes_target() {
        let err = MetricsError::query_failed("http://prom/api/v1/query", "connection refused");
        let msg = err.to_string();
        assert!(msg.contains("http://prom/api/v1/query"));
        assert!(msg.contains("connection refused"));
    }
}
