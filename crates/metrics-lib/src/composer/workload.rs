//! Workload summaries
//!
//! Each workload of a kind gets its own task that sums the usage of every
//! container matching `<workload>-.*` in its namespace. Tasks fold their
//! partial sums into one shared [`Accumulator`] after their own queries
//! finished.

use super::usage::{child_usage, Denominators, UsageFields};
use super::{require, MetricsService};
use crate::backend;
use crate::error::Result;
use crate::extract::{KeyField, TaggedRow};
use crate::fanout::{Accumulator, FanOut, UsageTotals};
use crate::models::{ContainerInfo, MetricsRequest, WorkloadSummary};
use crate::query::{build, Dimensions, Division, Template, WorkloadKind};
use std::time::Instant;
use tracing::warn;

impl MetricsService {
    /// Summaries of deployments, statefulsets and daemonsets, computed
    /// concurrently
    pub async fn workloads_summary(&self) -> Result<Vec<WorkloadSummary>> {
        let started = Instant::now();
        let denominators = self.denominators("workloads_summary").await?;

        let mut fan_out = FanOut::new();
        for kind in WorkloadKind::ALL {
            let svc = self.clone();
            fan_out.spawn(kind.label(), async move {
                svc.summarize_kind(kind, denominators).await
            });
        }

        let summaries = fan_out
            .join()
            .await?
            .into_ordered()
            .into_iter()
            .collect::<Result<Vec<_>>>()?;

        self.finish("workloads_summary", summaries.len(), started);
        Ok(summaries)
    }

    /// Summary of a single workload kind
    pub async fn workload_summary(&self, kind: WorkloadKind) -> Result<WorkloadSummary> {
        let denominators = self.denominators("workload_summary").await?;
        self.summarize_kind(kind, denominators).await
    }

    /// Usage percentages of the kind named by `workloads_name`
    pub async fn workload_usage(&self, request: &MetricsRequest) -> Result<ContainerInfo> {
        let kind: WorkloadKind = require(&request.workloads_name, "workloads name")?.parse()?;
        let summary = self.workload_summary(kind).await?;

        Ok(ContainerInfo {
            cpu_usage: summary.cpu_usage,
            memory_usage: summary.memory_usage,
            disk_usage: summary.disk_usage,
        })
    }

    /// Workloads of `kind` as `(namespace, workload)` rows
    pub(crate) async fn workloads_of(&self, kind: WorkloadKind) -> Result<Vec<TaggedRow>> {
        let expr = build(
            Template::WorkloadMetadata,
            &Dimensions::new().workload_kind(kind),
        )?;
        backend::fetch_rows(
            self.backend.as_ref(),
            &expr,
            &[
                (KeyField::Namespace, "namespace"),
                (KeyField::Workload, kind.label()),
            ],
        )
        .await
    }

    async fn summarize_kind(
        &self,
        kind: WorkloadKind,
        denominators: Denominators,
    ) -> Result<WorkloadSummary> {
        let workloads = self.workloads_of(kind).await?;
        let totals: Accumulator<UsageTotals> = Accumulator::new();

        let mut fan_out = FanOut::new();
        for row in &workloads {
            let dims = Dimensions::new()
                .namespace(row.get(KeyField::Namespace).unwrap_or_default())
                .workload_name(row.get(KeyField::Workload).unwrap_or_default());
            let backend = self.backend.clone();
            let totals = totals.clone();

            fan_out.spawn("workload", async move {
                match child_usage(backend, Division::Workloads, dims, denominators.machine_memory)
                    .await
                {
                    Ok(partial) => totals.add(partial).await,
                    Err(e) => warn!(error = %e, "Skipping workload without usable identity"),
                }
            });
        }
        fan_out.join().await?;

        let fields = UsageFields::render(&totals.total().await, &denominators);
        Ok(WorkloadSummary {
            kind,
            name: kind.label().to_string(),
            cpu: fields.cpu,
            cpu_usage: fields.cpu_usage,
            memory: fields.memory,
            memory_usage: fields.memory_usage,
            disk: fields.disk,
            disk_usage: fields.disk_usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::fixture::{scalar_doc, vector_doc, FixtureBackend};
    use crate::error::MetricsError;
    use crate::query::templates as pq;
    use std::sync::Arc;

    const GIB: &str = "1073741824";

    fn fixture() -> FixtureBackend {
        children()
            .on_exact(pq::MACHINE_MEMORY, scalar_doc("8589934592"))
            .on_exact(pq::CONTAINER_FS_LIMIT, scalar_doc("10737418240"))
    }

    /// Two deployments, each child query answering a fixed value
    fn children() -> FixtureBackend {
        FixtureBackend::new()
            .on_exact(
                "count(kube_deployment_metadata_generation)by(namespace,deployment)",
                vector_doc(&[
                    (&[("namespace", "default"), ("deployment", "web")], "1"),
                    (&[("namespace", "shop"), ("deployment", "cart")], "1"),
                ]),
            )
            .on_contains("sum(rate(container_cpu_usage_seconds_total", scalar_doc("1.5"))
            .on_contains("sum(container_cpu_usage_seconds_total", scalar_doc("100"))
            .on_contains("sum(container_memory_working_set_bytes", scalar_doc(GIB))
            .on_contains("sum(container_fs_usage_bytes", scalar_doc(GIB))
    }

    #[tokio::test]
    async fn test_workload_summary_sums_children() {
        let svc = MetricsService::new(Arc::new(fixture()));

        let summary = svc.workload_summary(WorkloadKind::Deployment).await.unwrap();
        assert_eq!(summary.name, "deployment");
        assert_eq!(summary.cpu, "200.00");
        assert_eq!(summary.cpu_usage, "3.00");
        assert_eq!(summary.memory, "2048.00");
        // 2 GiB of 8 GiB machine memory
        assert_eq!(summary.memory_usage, "25.00");
        assert_eq!(summary.disk, "2048.00");
        // 2 GiB of a 10 GiB filesystem limit
        assert_eq!(summary.disk_usage, "20.00");
    }

    #[tokio::test]
    async fn test_many_workloads_fold_into_one_total() {
        let names: Vec<String> = (0..50).map(|i| format!("app-{}", i)).collect();
        let labels: Vec<[(&str, &str); 2]> = names
            .iter()
            .map(|name| [("namespace", "default"), ("deployment", name.as_str())])
            .collect();
        let rows: Vec<(&[(&str, &str)], &str)> =
            labels.iter().map(|l| (&l[..], "1")).collect();

        let fixture = Arc::new(
            FixtureBackend::new()
                .on_exact(
                    "count(kube_deployment_metadata_generation)by(namespace,deployment)",
                    vector_doc(&rows),
                )
                .on_exact(pq::MACHINE_MEMORY, scalar_doc("8589934592"))
                .on_exact(pq::CONTAINER_FS_LIMIT, scalar_doc("10737418240"))
                .on_contains("sum(rate(container_cpu_usage_seconds_total", scalar_doc("1.5"))
                .on_contains("sum(container_cpu_usage_seconds_total", scalar_doc("100"))
                .on_contains("sum(container_memory_working_set_bytes", scalar_doc(GIB))
                .on_contains("sum(container_fs_usage_bytes", scalar_doc(GIB)),
        );
        let svc = MetricsService::new(fixture.clone());

        let summary = svc.workload_summary(WorkloadKind::Deployment).await.unwrap();
        assert_eq!(summary.cpu, "5000.00");
        assert_eq!(summary.cpu_usage, "75.00");
        assert_eq!(summary.memory, "51200.00");
        assert_eq!(summary.disk, "51200.00");

        let child_calls = fixture
            .calls()
            .iter()
            .filter(|c| c.contains("pod_name=~'app-"))
            .count();
        assert_eq!(child_calls, 200);
    }

    #[tokio::test]
    async fn test_children_use_workload_prefix_filter() {
        let fixture = Arc::new(fixture());
        let svc = MetricsService::new(fixture.clone());
        svc.workload_summary(WorkloadKind::Deployment).await.unwrap();

        let calls = fixture.calls();
        assert!(calls
            .iter()
            .any(|c| c.contains("namespace='shop',pod_name=~'cart-.*'")));
    }

    #[tokio::test]
    async fn test_workloads_summary_covers_every_kind_in_order() {
        let svc = MetricsService::new(Arc::new(fixture()));

        let summaries = svc.workloads_summary().await.unwrap();
        let kinds: Vec<WorkloadKind> = summaries.iter().map(|s| s.kind).collect();
        assert_eq!(kinds, WorkloadKind::ALL.to_vec());
        // No statefulsets or daemonsets registered
        assert_eq!(summaries[1].cpu, "0.00");
        assert_eq!(summaries[2].disk_usage, "0.00");
    }

    #[tokio::test]
    async fn test_missing_denominators_leave_percentages_absent() {
        let svc = MetricsService::new(Arc::new(
            children()
                .fail_on("machine_memory_bytes")
                .fail_on("container_fs_limit_bytes"),
        ));

        let summary = svc.workload_summary(WorkloadKind::Deployment).await.unwrap();
        assert_eq!(summary.memory, "2048.00");
        assert_eq!(summary.memory_usage, "");
        assert_eq!(summary.disk_usage, "");
    }

    #[tokio::test]
    async fn test_workload_usage_projection() {
        let svc = MetricsService::new(Arc::new(fixture()));
        let request = MetricsRequest {
            workloads_name: Some("deployment".into()),
            ..Default::default()
        };

        let usage = svc.workload_usage(&request).await.unwrap();
        assert_eq!(usage.cpu_usage, "3.00");
        assert_eq!(usage.disk_usage, "20.00");
    }

    #[tokio::test]
    async fn test_workload_usage_rejects_unknown_kind() {
        let svc = MetricsService::new(Arc::new(fixture()));
        let request = MetricsRequest {
            workloads_name: Some("cronjob".into()),
            ..Default::default()
        };

        let err = svc.workload_usage(&request).await.unwrap_err();
        assert!(matches!(err, MetricsError::InvalidDimension(_)));
    }
}
