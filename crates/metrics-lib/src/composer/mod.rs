//! Hierarchy composer: the per-level views served to the controller layer
//!
//! Every operation is a fixed recipe: launch the independent queries through
//! a [`FanOut`], wait for the barrier, join dependent lists onto the
//! authoritative one and format the result.
//!
//! Failure policy: a transport failure of an operation's top-level or
//! authoritative query is returned to the caller. Dependent lists, per-child
//! sums and denominators degrade to absent or zero values, with a warning.

mod cluster;
mod container;
mod node;
mod pod;
mod usage;
mod workload;

use crate::backend::{self, SharedBackend};
use crate::error::{MetricsError, Result};
use crate::extract::{KeyField, ScalarResult, TaggedRow};
use crate::fanout::{run_all, Joined, Role};
use crate::observability::StructuredLogger;
use std::time::Instant;

/// Entry point of the aggregation engine
#[derive(Clone)]
pub struct MetricsService {
    backend: SharedBackend,
    logger: StructuredLogger,
}

impl MetricsService {
    pub fn new(backend: SharedBackend) -> Self {
        Self {
            backend,
            logger: StructuredLogger::new("caas-monitor"),
        }
    }

    pub fn backend(&self) -> &SharedBackend {
        &self.backend
    }

    /// Run every `(role, expr)` scalar query concurrently
    async fn scalars(&self, queries: Vec<(Role, String)>) -> Result<Joined<Result<ScalarResult>>> {
        run_all(queries.into_iter().map(|(role, expr)| {
            let backend = self.backend.clone();
            (role, async move {
                backend::fetch_scalar(backend.as_ref(), &expr).await
            })
        }))
        .await
    }

    /// Run every `(role, expr)` query concurrently, keeping raw values
    async fn raw_values(
        &self,
        queries: Vec<(Role, String)>,
    ) -> Result<Joined<Result<Option<String>>>> {
        run_all(queries.into_iter().map(|(role, expr)| {
            let backend = self.backend.clone();
            (role, async move {
                backend::fetch_raw(backend.as_ref(), &expr).await
            })
        }))
        .await
    }

    /// Dependent row list; a failed query yields an empty list
    fn degrade_rows(&self, view: &str, role: Role, rows: Result<Vec<TaggedRow>>) -> Vec<TaggedRow> {
        rows.unwrap_or_else(|e| {
            self.logger.log_degraded(view, role, &e);
            Vec::new()
        })
    }

    /// Denominator scalar; a failed query yields absence
    fn degrade_scalar(&self, view: &str, role: Role, scalar: Result<ScalarResult>) -> Option<f64> {
        match scalar {
            Ok(s) => s.value,
            Err(e) => {
                self.logger.log_degraded(view, role, &e);
                None
            }
        }
    }

    fn finish(&self, view: &str, entities: usize, started: Instant) {
        self.logger.log_view(view, entities, started.elapsed());
    }
}

/// Result of `role`, or `TaskAborted` if the fan-out never produced it
fn take_role<T>(joined: &mut Joined<Result<T>>, role: Role) -> Result<T> {
    joined.take(role).unwrap_or_else(|| {
        Err(MetricsError::TaskAborted {
            role: role.to_string(),
            reason: "no result recorded".to_string(),
        })
    })
}

/// Percent rendering with absence kept as an empty string
fn percent_or_absent(value: Option<f64>) -> String {
    value.map(crate::units::percent).unwrap_or_default()
}

/// Reject an empty or whitespace request field
fn require<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(MetricsError::InvalidDimension(format!("{} is required", name))),
    }
}

/// `(namespace, pod_name, container_name)` row key
const CONTAINER_LABELS: [(KeyField, &str); 3] = [
    (KeyField::Namespace, "namespace"),
    (KeyField::Pod, "pod_name"),
    (KeyField::Container, "container_name"),
];
