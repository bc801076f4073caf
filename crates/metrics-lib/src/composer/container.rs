//! Container views and log pass-through

use super::{percent_or_absent, require, take_role, MetricsService, CONTAINER_LABELS};
use crate::backend::{self, SharedBackend};
use crate::correlate::{merge, Dependent, MergedRecord};
use crate::error::Result;
use crate::extract::{KeyField, TaggedRow};
use crate::fanout::{FanOut, Role};
use crate::models::{ContainerInfo, ContainerLog, ContainerRecord, MetricsRequest};
use crate::query::{build, build_child, templates as pq, Dimensions, Division, Template, WorkloadKind};
use crate::units;
use std::collections::HashSet;
use std::time::Instant;

/// Dependent lists of the container view, keyed by
/// `(namespace, pod_name, container_name)`
const CONTAINER_DEPENDENTS: [(Role, &str); 4] = [
    ("cpu", pq::CONTAINER_CPU_USE),
    ("cpu_usage", pq::CONTAINER_CPU_USAGE),
    ("memory", pq::CONTAINER_MEMORY_USE),
    ("disk", pq::CONTAINER_DISK_USE),
];

impl MetricsService {
    /// Containers selected by the request: every container of a workload
    /// kind (`workloads_name`), of one pod (`pod_name`), or of the cluster.
    pub async fn container_list(&self, request: &MetricsRequest) -> Result<Vec<ContainerRecord>> {
        let started = Instant::now();

        // Dependents run while the authoritative list is resolved
        let mut fan_out: FanOut<Result<Vec<TaggedRow>>> = FanOut::new();
        for (role, expr) in CONTAINER_DEPENDENTS {
            let b = self.backend.clone();
            fan_out.spawn(role, async move {
                backend::fetch_rows(b.as_ref(), expr, &CONTAINER_LABELS).await
            });
        }
        let b = self.backend.clone();
        fan_out.spawn("memory_usage", async move { memory_usage_rows(b).await });

        let names = self.container_names(request).await;
        let mut joined = fan_out.join().await?;
        let names = names?;

        let mut dependents: Vec<Dependent> = CONTAINER_DEPENDENTS
            .iter()
            .map(|&(role, _)| {
                Dependent::exact(
                    role,
                    self.degrade_rows("container_list", role, take_role(&mut joined, role)),
                )
            })
            .collect();
        dependents.push(Dependent::exact(
            "memory_usage",
            self.degrade_rows(
                "container_list",
                "memory_usage",
                take_role(&mut joined, "memory_usage"),
            ),
        ));

        let containers: Vec<ContainerRecord> =
            merge(&names, &dependents).iter().map(container_record).collect();

        self.finish("container_list", containers.len(), started);
        Ok(containers)
    }

    /// Authoritative container list for `container_list`
    async fn container_names(&self, request: &MetricsRequest) -> Result<Vec<TaggedRow>> {
        if let Ok(kind) = require(&request.workloads_name, "workloads name") {
            let kind: WorkloadKind = kind.parse()?;
            return self.workload_container_names(kind).await;
        }

        if let Ok(pod) = require(&request.pod_name, "pod name") {
            let expr = build_child(Template::ChildNames, Division::Pod, &Dimensions::new().pod(pod))?;
            return backend::fetch_rows(self.backend.as_ref(), &expr, &CONTAINER_LABELS).await;
        }

        backend::fetch_rows(self.backend.as_ref(), pq::CONTAINER_NAME_LIST, &CONTAINER_LABELS).await
    }

    /// Container names of every workload of `kind`, concatenated in
    /// workload order with duplicates removed
    async fn workload_container_names(&self, kind: WorkloadKind) -> Result<Vec<TaggedRow>> {
        let workloads = self.workloads_of(kind).await?;

        let mut fan_out = FanOut::new();
        for row in &workloads {
            let dims = Dimensions::new()
                .namespace(row.get(KeyField::Namespace).unwrap_or_default())
                .workload_name(row.get(KeyField::Workload).unwrap_or_default());
            let b = self.backend.clone();

            fan_out.spawn("workload", async move {
                let expr = build_child(Template::ChildNames, Division::Workloads, &dims)?;
                backend::fetch_rows(b.as_ref(), &expr, &CONTAINER_LABELS).await
            });
        }

        let mut seen = HashSet::new();
        let mut names = Vec::new();
        for rows in fan_out.join().await?.into_ordered() {
            for row in self.degrade_rows("container_list", "workload_names", rows) {
                if seen.insert(row.key.clone()) {
                    names.push(row);
                }
            }
        }
        Ok(names)
    }

    /// Usage percentages of one container; namespace, pod and container
    /// are required
    pub async fn container_info(&self, request: &MetricsRequest) -> Result<ContainerInfo> {
        let started = Instant::now();
        let dims = request.dimensions();

        let mut joined = self
            .scalars(vec![
                ("cpu_usage", build(Template::ContainerCpuUsage, &dims)?),
                ("memory_usage", build(Template::ContainerMemoryUsage, &dims)?),
                ("disk_usage", build(Template::ContainerDiskUsage, &dims)?),
            ])
            .await?;

        let info = ContainerInfo {
            cpu_usage: percent_or_absent(take_role(&mut joined, "cpu_usage")?.value),
            memory_usage: percent_or_absent(take_role(&mut joined, "memory_usage")?.value),
            disk_usage: percent_or_absent(take_role(&mut joined, "disk_usage")?.value),
        };

        self.finish("container_info", 1, started);
        Ok(info)
    }

    /// Raw log text of a pod
    pub async fn container_log(&self, request: &MetricsRequest) -> Result<ContainerLog> {
        let namespace = require(&request.namespace, "namespace")?;
        let pod = require(&request.pod_name, "pod name")?;

        let log = self.backend.pod_log(namespace, pod).await?;
        Ok(ContainerLog {
            namespace: namespace.to_string(),
            pod: pod.to_string(),
            log,
        })
    }
}

/// Container working set as a percentage of average machine memory
async fn memory_usage_rows(shared: SharedBackend) -> Result<Vec<TaggedRow>> {
    let b = shared.as_ref();
    let (machine_memory, memory) = tokio::join!(
        backend::fetch_scalar(b, pq::MACHINE_MEMORY),
        backend::fetch_rows(b, pq::CONTAINER_MEMORY_USE, &CONTAINER_LABELS),
    );
    let (machine_memory, memory) = (machine_memory?, memory?);

    Ok(memory
        .into_iter()
        .map(|row| {
            let value = row
                .number()
                .and_then(|used| units::ratio_percent(used, machine_memory.value))
                .map(units::percent);
            TaggedRow::new(row.key, value)
        })
        .collect())
}

fn container_record(rec: &MergedRecord) -> ContainerRecord {
    let formatted = |role, f: fn(&str) -> String| rec.value(role).map(f).unwrap_or_default();

    ContainerRecord {
        namespace: rec.field(KeyField::Namespace).to_string(),
        pod_name: rec.field(KeyField::Pod).to_string(),
        container_name: rec.field(KeyField::Container).to_string(),
        cpu: formatted("cpu", |v| units::fixed2(v)),
        cpu_usage: formatted("cpu_usage", |v| units::percent(v)),
        memory: formatted("memory", |v| units::bytes_to_mb(v)),
        // Already rendered by `memory_usage_rows`
        memory_usage: rec.value_or_empty("memory_usage"),
        disk: formatted("disk", |v| units::bytes_to_mb(v)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::fixture::{scalar_doc, vector_doc, FixtureBackend};
    use crate::error::MetricsError;
    use std::sync::Arc;
    use std::time::Duration;

    fn labels<'a>(ns: &'a str, pod: &'a str, container: &'a str) -> [(&'a str, &'a str); 3] {
        [("namespace", ns), ("pod_name", pod), ("container_name", container)]
    }

    fn dependents() -> FixtureBackend {
        FixtureBackend::new()
            .on_exact(pq::MACHINE_MEMORY, scalar_doc("1048576000"))
            .on_exact(
                pq::CONTAINER_MEMORY_USE,
                vector_doc(&[
                    (&labels("default", "web-1", "nginx"), "104857600"),
                    (&labels("staging", "web-1", "nginx"), "52428800"),
                ]),
            )
            .on_exact(
                pq::CONTAINER_CPU_USAGE,
                vector_doc(&[(&labels("default", "web-1", "nginx"), "0.5")]),
            )
    }

    #[tokio::test]
    async fn test_cluster_wide_list_joins_on_full_identity() {
        let svc = MetricsService::new(Arc::new(dependents().on_exact(
            pq::CONTAINER_NAME_LIST,
            vector_doc(&[
                (&labels("default", "web-1", "nginx"), "1"),
                (&labels("default", "web-1", "sidecar"), "1"),
            ]),
        )));

        let containers = svc.container_list(&MetricsRequest::default()).await.unwrap();
        assert_eq!(containers.len(), 2);

        let nginx = &containers[0];
        assert_eq!(nginx.container_name, "nginx");
        assert_eq!(nginx.memory, "100.00");
        assert_eq!(nginx.memory_usage, "10.00");
        assert_eq!(nginx.cpu_usage, "0.50");
        assert_eq!(nginx.disk, "");

        let sidecar = &containers[1];
        assert_eq!(sidecar.memory, "");
        assert_eq!(sidecar.memory_usage, "");
    }

    #[tokio::test]
    async fn test_pod_list_selects_by_pod_name() {
        let fixture = Arc::new(dependents().on_contains(
            "pod_name='web-1'",
            vector_doc(&[(&labels("staging", "web-1", "nginx"), "1")]),
        ));
        let svc = MetricsService::new(fixture.clone());
        let request = MetricsRequest {
            pod_name: Some("web-1".into()),
            ..Default::default()
        };

        let containers = svc.container_list(&request).await.unwrap();
        assert_eq!(containers.len(), 1);
        assert_eq!(containers[0].namespace, "staging");
        assert_eq!(containers[0].memory, "50.00");
        assert!(!fixture.calls().iter().any(|c| c == pq::CONTAINER_NAME_LIST));
    }

    #[tokio::test]
    async fn test_workload_list_concatenates_in_workload_order() {
        let svc = MetricsService::new(Arc::new(
            dependents()
                .on_exact(
                    "count(kube_statefulset_metadata_generation)by(namespace,statefulset)",
                    vector_doc(&[
                        (&[("namespace", "db"), ("statefulset", "pg")], "1"),
                        (&[("namespace", "db"), ("statefulset", "redis")], "1"),
                    ]),
                )
                .on_contains(
                    "pod_name=~'pg-.*'",
                    vector_doc(&[
                        (&labels("db", "pg-0", "postgres"), "1"),
                        (&labels("db", "pg-1", "postgres"), "1"),
                    ]),
                )
                .on_contains(
                    "pod_name=~'redis-.*'",
                    vector_doc(&[
                        (&labels("db", "redis-0", "redis"), "1"),
                        (&labels("db", "pg-0", "postgres"), "1"),
                    ]),
                ),
        ));
        let request = MetricsRequest {
            workloads_name: Some("statefulset".into()),
            ..Default::default()
        };

        let containers = svc.container_list(&request).await.unwrap();
        let pods: Vec<&str> = containers.iter().map(|c| c.pod_name.as_str()).collect();
        assert_eq!(pods, ["pg-0", "pg-1", "redis-0"]);
    }

    #[tokio::test]
    async fn test_dependent_failure_leaves_fields_absent() {
        let svc = MetricsService::new(Arc::new(
            FixtureBackend::new()
                .on_exact(
                    pq::CONTAINER_NAME_LIST,
                    vector_doc(&[(&labels("default", "web-1", "nginx"), "1")]),
                )
                .fail_on("container_memory_working_set_bytes"),
        ));

        let containers = svc.container_list(&MetricsRequest::default()).await.unwrap();
        assert_eq!(containers.len(), 1);
        assert_eq!(containers[0].memory, "");
        assert_eq!(containers[0].memory_usage, "");
    }

    #[tokio::test]
    async fn test_memory_usage_waits_for_slow_sibling_query() {
        let fixture = Arc::new(
            FixtureBackend::new()
                .on_exact(
                    pq::CONTAINER_NAME_LIST,
                    vector_doc(&[(&labels("default", "web-1", "nginx"), "1")]),
                )
                .fail_on("machine_memory_bytes")
                .delay_on(pq::CONTAINER_MEMORY_USE, Duration::from_millis(50)),
        );
        let svc = MetricsService::new(fixture.clone());

        let containers = svc.container_list(&MetricsRequest::default()).await.unwrap();
        assert_eq!(containers[0].memory_usage, "");

        let calls = fixture.calls();
        let memory_calls = calls.iter().filter(|c| *c == pq::CONTAINER_MEMORY_USE).count();
        assert_eq!(memory_calls, 2);
        // Every launched query finished before the view returned
        assert_eq!(fixture.answered(), calls.len());
    }

    #[tokio::test]
    async fn test_container_info() {
        let fixture = Arc::new(
            FixtureBackend::new()
                .on_contains("rate(container_cpu_usage_seconds_total", scalar_doc("3.14159"))
                .on_contains("container_memory_working_set_bytes", scalar_doc("12.5")),
        );
        let svc = MetricsService::new(fixture.clone());
        let request = MetricsRequest {
            namespace: Some("default".into()),
            pod_name: Some("web-1".into()),
            container_name: Some("nginx".into()),
            ..Default::default()
        };

        let info = svc.container_info(&request).await.unwrap();
        assert_eq!(info.cpu_usage, "3.14");
        assert_eq!(info.memory_usage, "12.50");
        assert_eq!(info.disk_usage, "");
        assert!(fixture
            .calls()
            .iter()
            .all(|c| c.contains("container_name='nginx'")));
    }

    #[tokio::test]
    async fn test_container_info_requires_identity() {
        let svc = MetricsService::new(Arc::new(FixtureBackend::new()));
        let request = MetricsRequest {
            namespace: Some("default".into()),
            ..Default::default()
        };

        let err = svc.container_info(&request).await.unwrap_err();
        assert!(matches!(err, MetricsError::InvalidDimension(_)));
    }

    #[tokio::test]
    async fn test_container_log_pass_through() {
        let svc = MetricsService::new(Arc::new(
            FixtureBackend::new().with_log("default", "web-1", "line one\nline two\n"),
        ));
        let request = MetricsRequest {
            namespace: Some("default".into()),
            pod_name: Some("web-1".into()),
            ..Default::default()
        };

        let log = svc.container_log(&request).await.unwrap();
        assert_eq!(log.pod, "web-1");
        assert_eq!(log.log, "line one\nline two\n");

        let missing = MetricsRequest {
            namespace: Some("default".into()),
            pod_name: Some("gone".into()),
            ..Default::default()
        };
        assert!(matches!(
            svc.container_log(&missing).await.unwrap_err(),
            MetricsError::QueryFailed { .. }
        ));
    }
}
