//! Path-based field selection over decoded backend documents
//!
//! Query responses are decoded once into a generic [`serde_json::Value`] and
//! values are pulled out with dotted paths such as `data.result.0.value.1`.
//! Two shapes are supported:
//! - scalars taken from the first result's `[timestamp, value]` pair
//! - enumeration of every result element into a [`TaggedRow`]

use crate::error::{MetricsError, Result};
use crate::observability::MonitorMetrics;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

/// Timestamp of the first result element
pub const VALUE_TIMESTAMP: &str = "data.result.0.value.0";
/// Value of the first result element
pub const VALUE_DATA: &str = "data.result.0.value.1";
/// Reserved third slot of the first result element
pub const VALUE_RESERVED: &str = "data.result.0.value.2";
/// Number of elements in the result vector
pub const RESULT_COUNT: &str = "data.result.#";

/// Outcome of a scalar extraction; `value` is `None` when the path is absent
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarResult {
    pub path: String,
    pub value: Option<f64>,
}

impl ScalarResult {
    /// Value with absence collapsed to zero
    pub fn or_zero(&self) -> f64 {
        self.value.unwrap_or(0.0)
    }
}

/// Anything `extract` can hand back
#[derive(Debug, Clone, PartialEq)]
pub enum Extracted {
    Scalar(ScalarResult),
    Count(usize),
    Row(TaggedRow),
}

/// Identity fields a row key may carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyField {
    Instance,
    Namespace,
    Pod,
    Container,
    Node,
    NodeName,
    Workload,
    Phase,
}

/// One element of a vector response: identity fields plus its value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaggedRow {
    pub key: Vec<(KeyField, String)>,
    pub value: Option<String>,
}

impl TaggedRow {
    pub fn new(key: Vec<(KeyField, String)>, value: Option<String>) -> Self {
        Self { key, value }
    }

    /// Look up one identity field
    pub fn get(&self, field: KeyField) -> Option<&str> {
        self.key
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, v)| v.as_str())
    }

    /// Numeric value. Unparsable values degrade to zero with a warning.
    pub fn number(&self) -> Option<f64> {
        self.value.as_deref().map(|raw| parse_number(raw, "row"))
    }
}

/// Walk a dotted path. Numeric segments index arrays, others index objects.
pub fn select<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .filter(|segment| !segment.is_empty())
        .try_fold(doc, |node, segment| match node {
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            Value::Object(map) => map.get(segment),
            _ => None,
        })
}

/// Generic extraction: a trailing `#` counts array elements, anything else
/// is read as a scalar.
pub fn extract(doc: &Value, path: &str) -> Result<Extracted> {
    if let Some(array_path) = path.strip_suffix('#') {
        let array_path = array_path.trim_end_matches('.');
        return match select(doc, array_path) {
            Some(Value::Array(items)) => Ok(Extracted::Count(items.len())),
            _ => Err(MetricsError::ExtractionMissing(path.to_string())),
        };
    }

    let value = try_scalar(doc, path)?;
    Ok(Extracted::Scalar(ScalarResult {
        path: path.to_string(),
        value: Some(value),
    }))
}

/// Read a scalar, failing with `ExtractionMissing` when the path is absent
pub fn try_scalar(doc: &Value, path: &str) -> Result<f64> {
    let node = select(doc, path).ok_or_else(|| MetricsError::ExtractionMissing(path.to_string()))?;
    Ok(value_to_number(node, path))
}

/// Read a scalar, recording absence as `None` rather than zero
pub fn scalar(doc: &Value, path: &str) -> ScalarResult {
    let value = match try_scalar(doc, path) {
        Ok(v) => Some(v),
        Err(e) => {
            debug!(path, error = %e, "Scalar absent from response");
            None
        }
    };

    ScalarResult {
        path: path.to_string(),
        value,
    }
}

/// Read the value at `path` as the backend sent it, without numeric parsing
pub fn raw_string(doc: &Value, path: &str) -> Option<String> {
    select(doc, path).map(value_to_string)
}

/// Number of elements in `data.result`; zero when absent
pub fn result_count(doc: &Value) -> usize {
    match extract(doc, RESULT_COUNT) {
        Ok(Extracted::Count(n)) => n,
        _ => 0,
    }
}

/// Enumerate `data.result` into rows, reading the given metric labels as the
/// row key. Missing labels become empty strings.
pub fn rows(doc: &Value, labels: &[(KeyField, &str)]) -> Vec<TaggedRow> {
    let count = result_count(doc);
    let mut out = Vec::new();

    for i in 0..count {
        let metric = select(doc, &format!("data.result.{}.metric", i));
        let key = labels
            .iter()
            .map(|(field, label)| {
                let value = metric
                    .and_then(|m| m.get(*label))
                    .map(value_to_string)
                    .unwrap_or_default();
                (*field, value)
            })
            .collect();
        let value = raw_string(doc, &format!("data.result.{}.value.1", i));

        out.push(TaggedRow::new(key, value));
    }

    out
}

/// Parse a backend number, degrading to zero on failure. `NaN` and
/// infinities (e.g. a 0/0 ratio) count as failures.
pub fn parse_number(raw: &str, context: &str) -> f64 {
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        Ok(_) => {
            warn!(context, raw, "Non-finite metric value, using 0");
            MonitorMetrics::new().inc_degraded_values();
            0.0
        }
        Err(e) => {
            warn!(context, raw, error = %e, "Unparsable metric value, using 0");
            MonitorMetrics::new().inc_degraded_values();
            0.0
        }
    }
}

fn value_to_number(node: &Value, path: &str) -> f64 {
    match node {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => parse_number(s, path),
        other => {
            warn!(path, value = %other, "Non-numeric metric value, using 0");
            MonitorMetrics::new().inc_degraded_values();
            0.0
        }
    }
}

fn value_to_string(node: &Value) -> String {
    match node {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vector_doc() -> Value {
        json!({
            "status": "success",
            "data": {
                "resultType": "vector",
                "result": [
                    {"metric": {"instance": "10.0.0.1:9100", "nodename": "node-a"}, "value": [1700000000.1, "42.5"]},
                    {"metric": {"instance": "10.0.0.2:9100"}, "value": [1700000000.1, "7"]}
                ]
            }
        })
    }

    #[test]
    fn test_select_nested_paths() {
        let doc = vector_doc();
        assert_eq!(select(&doc, "status"), Some(&json!("success")));
        assert_eq!(select(&doc, VALUE_DATA), Some(&json!("42.5")));
        assert!(select(&doc, "data.result.5.value.1").is_none());
        assert!(select(&doc, "data.result.x").is_none());
    }

    #[test]
    fn test_scalar_distinguishes_absent_from_zero() {
        let empty = json!({"data": {"result": []}});
        assert_eq!(scalar(&empty, VALUE_DATA).value, None);

        let zero = json!({"data": {"result": [{"metric": {}, "value": [1, "0"]}]}});
        assert_eq!(scalar(&zero, VALUE_DATA).value, Some(0.0));
    }

    #[test]
    fn test_scalar_parse_failure_degrades_to_zero() {
        let doc = json!({"data": {"result": [{"metric": {}, "value": [1, "not-a-number"]}]}});
        assert_eq!(scalar(&doc, VALUE_DATA).value, Some(0.0));
    }

    #[test]
    fn test_non_finite_values_degrade_to_zero() {
        for raw in ["NaN", "+Inf", "-Inf"] {
            assert_eq!(parse_number(raw, "test"), 0.0, "raw={}", raw);

            let doc = json!({"data": {"result": [{"metric": {}, "value": [1, raw]}]}});
            assert_eq!(scalar(&doc, VALUE_DATA).value, Some(0.0), "raw={}", raw);
        }
    }

    #[test]
    fn test_reserved_slot_is_missing() {
        let doc = vector_doc();
        let err = try_scalar(&doc, VALUE_RESERVED).unwrap_err();
        assert!(matches!(err, MetricsError::ExtractionMissing(_)));
        assert!(try_scalar(&doc, VALUE_TIMESTAMP).unwrap() > 1.0e9);
    }

    #[test]
    fn test_extract_count_and_scalar() {
        let doc = vector_doc();
        assert_eq!(extract(&doc, RESULT_COUNT).unwrap(), Extracted::Count(2));
        match extract(&doc, VALUE_DATA).unwrap() {
            Extracted::Scalar(s) => assert_eq!(s.value, Some(42.5)),
            other => panic!("unexpected {:?}", other),
        }
        assert!(extract(&json!({}), RESULT_COUNT).is_err());
    }

    #[test]
    fn test_rows_reads_labels_and_values() {
        let doc = vector_doc();
        let rows = rows(
            &doc,
            &[(KeyField::Instance, "instance"), (KeyField::NodeName, "nodename")],
        );

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get(KeyField::Instance), Some("10.0.0.1:9100"));
        assert_eq!(rows[0].get(KeyField::NodeName), Some("node-a"));
        assert_eq!(rows[0].number(), Some(42.5));
        // Missing label is an empty string, not a dropped row
        assert_eq!(rows[1].get(KeyField::NodeName), Some(""));
    }

    #[test]
    fn test_rows_on_malformed_document() {
        assert!(rows(&json!({"data": "oops"}), &[(KeyField::Pod, "pod")]).is_empty());
        assert_eq!(result_count(&json!(null)), 0);
    }

    #[test]
    fn test_raw_string_keeps_backend_text() {
        let doc = vector_doc();
        assert_eq!(raw_string(&doc, VALUE_DATA).as_deref(), Some("42.5"));
        assert_eq!(raw_string(&doc, "data.result.1.metric.nodename"), None);
    }
}
