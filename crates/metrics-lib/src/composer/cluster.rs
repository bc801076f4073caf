//! Cluster-wide scalar views

use super::{percent_or_absent, take_role, MetricsService};
use crate::error::Result;
use crate::fanout::Role;
use crate::models::{ClusterAverage, ClusterOverview, ClusterSnapshot, WorkloadStatus};
use crate::query::templates as pq;
use std::time::Instant;

const STATUS_QUERIES: [(Role, &str); 16] = [
    ("deployment.total", pq::DEPLOYMENT_TOTAL),
    ("deployment.available", pq::DEPLOYMENT_AVAILABLE),
    ("deployment.unavailable", pq::DEPLOYMENT_UNAVAILABLE),
    ("deployment.updated", pq::DEPLOYMENT_UPDATED),
    ("daemonset.ready", pq::DAEMONSET_READY),
    ("daemonset.available", pq::DAEMONSET_AVAILABLE),
    ("daemonset.unavailable", pq::DAEMONSET_UNAVAILABLE),
    ("daemonset.misscheduled", pq::DAEMONSET_MISSCHEDULED),
    ("statefulset.total", pq::STATEFULSET_TOTAL),
    ("statefulset.ready", pq::STATEFULSET_READY),
    ("statefulset.updated", pq::STATEFULSET_UPDATED),
    ("statefulset.revision", pq::STATEFULSET_REVISION),
    ("pod.ready", pq::PODCONTAINER_READY),
    ("pod.running", pq::PODCONTAINER_RUNNING),
    ("pod.restart", pq::PODCONTAINER_RESTARTS),
    ("pod.terminated", pq::PODCONTAINER_TERMINATED),
];

impl MetricsService {
    /// Pod, cpu, memory and disk usage of the whole cluster
    pub async fn cluster_average(&self) -> Result<ClusterAverage> {
        let started = Instant::now();
        let mut joined = self
            .scalars(vec![
                ("pod_usage", pq::POD_USAGE.to_string()),
                ("cpu_usage", pq::CPU_USAGE.to_string()),
                ("memory_usage", pq::MEMORY_USAGE.to_string()),
                ("disk_usage", pq::DISK_USAGE.to_string()),
            ])
            .await?;

        let average = ClusterAverage {
            pod_usage: percent_or_absent(take_role(&mut joined, "pod_usage")?.value),
            cpu_usage: percent_or_absent(take_role(&mut joined, "cpu_usage")?.value),
            memory_usage: percent_or_absent(take_role(&mut joined, "memory_usage")?.value),
            disk_usage: percent_or_absent(take_role(&mut joined, "disk_usage")?.value),
        };

        self.finish("cluster_average", 1, started);
        Ok(average)
    }

    /// Alert, running pod/container, restart and node counters
    pub async fn cluster_overview(&self) -> Result<ClusterOverview> {
        let started = Instant::now();
        let mut joined = self
            .raw_values(vec![
                ("alerts", pq::CLUSTER_ALERTS.to_string()),
                ("running_pod", pq::CLUSTER_RUNNING_POD.to_string()),
                ("running_container", pq::CLUSTER_RUNNING_CONTAINER.to_string()),
                ("pod_restart", pq::CLUSTER_POD_RESTART.to_string()),
                ("nodes", pq::CLUSTER_NODES.to_string()),
            ])
            .await?;

        let mut counter = |role| -> Result<String> {
            Ok(take_role(&mut joined, role)?.unwrap_or_default())
        };
        let overview = ClusterOverview {
            alerts: counter("alerts")?,
            running_pod: counter("running_pod")?,
            running_container: counter("running_container")?,
            pod_restart: counter("pod_restart")?,
            nodes: counter("nodes")?,
        };

        self.finish("cluster_overview", 1, started);
        Ok(overview)
    }

    /// Average and overview fetched concurrently
    pub async fn cluster_snapshot(&self) -> Result<ClusterSnapshot> {
        // Both views run to completion before either error is reported
        let (average, overview) = tokio::join!(self.cluster_average(), self.cluster_overview());
        Ok(ClusterSnapshot {
            average: average?,
            overview: overview?,
        })
    }

    /// Replica counters of deployments, daemonsets, statefulsets and pod
    /// containers. All sixteen counters are fetched in one fan-out.
    pub async fn workloads_status(&self) -> Result<Vec<WorkloadStatus>> {
        let started = Instant::now();
        let mut joined = self
            .raw_values(
                STATUS_QUERIES
                    .iter()
                    .map(|(role, expr)| (*role, expr.to_string()))
                    .collect(),
            )
            .await?;

        let mut counter = |role| -> Result<String> {
            Ok(take_role(&mut joined, role)?.unwrap_or_default())
        };

        let status = vec![
            WorkloadStatus {
                name: "Deployment".to_string(),
                total: counter("deployment.total")?,
                available: counter("deployment.available")?,
                unavailable: counter("deployment.unavailable")?,
                updated: counter("deployment.updated")?,
                ..Default::default()
            },
            WorkloadStatus {
                name: "DaemonSet".to_string(),
                ready: counter("daemonset.ready")?,
                available: counter("daemonset.available")?,
                unavailable: counter("daemonset.unavailable")?,
                misscheduled: counter("daemonset.misscheduled")?,
                ..Default::default()
            },
            WorkloadStatus {
                name: "StatefulSet".to_string(),
                total: counter("statefulset.total")?,
                ready: counter("statefulset.ready")?,
                updated: counter("statefulset.updated")?,
                revision: counter("statefulset.revision")?,
                ..Default::default()
            },
            WorkloadStatus {
                name: "Pod".to_string(),
                ready: counter("pod.ready")?,
                running: counter("pod.running")?,
                restart: counter("pod.restart")?,
                terminated: counter("pod.terminated")?,
                ..Default::default()
            },
        ];

        self.finish("workloads_status", status.len(), started);
        Ok(status)
    }
}
