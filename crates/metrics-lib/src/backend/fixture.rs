//! Canned-response backend for tests and local demos

use super::QueryBackend;
use crate::error::{MetricsError, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Backend answering from registered documents
///
/// Lookup order: exact expression, failure patterns, then substring rules in
/// registration order. Unmatched queries get an empty result vector.
/// Delays apply before the lookup.
#[derive(Default)]
pub struct FixtureBackend {
    exact: HashMap<String, Value>,
    contains: Vec<(String, Value)>,
    failures: Vec<String>,
    delays: Vec<(String, Duration)>,
    logs: HashMap<(String, String), String>,
    calls: Mutex<Vec<String>>,
    answered: AtomicUsize,
}

impl FixtureBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `expr` exactly with `doc`
    pub fn on_exact(mut self, expr: impl Into<String>, doc: Value) -> Self {
        self.exact.insert(expr.into(), doc);
        self
    }

    /// Answer any query containing `pattern` with `doc`
    pub fn on_contains(mut self, pattern: impl Into<String>, doc: Value) -> Self {
        self.contains.push((pattern.into(), doc));
        self
    }

    /// Fail any query containing `pattern` with a transport error
    pub fn fail_on(mut self, pattern: impl Into<String>) -> Self {
        self.failures.push(pattern.into());
        self
    }

    /// Hold back the answer to any query containing `pattern`
    pub fn delay_on(mut self, pattern: impl Into<String>, delay: Duration) -> Self {
        self.delays.push((pattern.into(), delay));
        self
    }

    /// Serve `text` as the log of `namespace/pod`
    pub fn with_log(
        mut self,
        namespace: impl Into<String>,
        pod: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        self.logs.insert((namespace.into(), pod.into()), text.into());
        self
    }

    /// Every expression queried so far, in call order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Number of queries that ran to completion, failed ones included
    pub fn answered(&self) -> usize {
        self.answered.load(Ordering::SeqCst)
    }

    fn answer(&self, expr: &str) -> Result<Value> {
        if let Some(doc) = self.exact.get(expr) {
            return Ok(doc.clone());
        }
        if self.failures.iter().any(|p| expr.contains(p.as_str())) {
            return Err(MetricsError::query_failed(expr, "connection refused"));
        }
        if let Some((_, doc)) = self.contains.iter().find(|(p, _)| expr.contains(p.as_str())) {
            return Ok(doc.clone());
        }

        Ok(empty_doc())
    }

    fn record(&self, expr: &str) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(expr.to_string());
        }
    }
}

#[async_trait]
impl QueryBackend for FixtureBackend {
    async fn query(&self, expr: &str) -> Result<Value> {
        self.record(expr);

        if let Some((_, delay)) = self.delays.iter().find(|(p, _)| expr.contains(p.as_str())) {
            tokio::time::sleep(*delay).await;
        }
        let outcome = self.answer(expr);
        self.answered.fetch_add(1, Ordering::SeqCst);
        outcome
    }

    async fn pod_log(&self, namespace: &str, pod: &str) -> Result<String> {
        self.logs
            .get(&(namespace.to_string(), pod.to_string()))
            .cloned()
            .ok_or_else(|| {
                MetricsError::query_failed(format!("{}/{}", namespace, pod), "HTTP 404 Not Found")
            })
    }
}

/// Instant-vector document with one element per `(labels, value)` pair
pub fn vector_doc(elements: &[(&[(&str, &str)], &str)]) -> Value {
    let result: Vec<Value> = elements
        .iter()
        .map(|(labels, value)| {
            let metric: serde_json::Map<String, Value> = labels
                .iter()
                .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
                .collect();
            json!({"metric": metric, "value": [1_700_000_000.0, value]})
        })
        .collect();

    json!({
        "status": "success",
        "data": {"resultType": "vector", "result": result}
    })
}

/// Instant-vector document holding a single unlabeled value
pub fn scalar_doc(value: &str) -> Value {
    let no_labels: &[(&str, &str)] = &[];
    vector_doc(&[(no_labels, value)])
}

/// Successful response with an empty result vector
pub fn empty_doc() -> Value {
    vector_doc(&[])
}
