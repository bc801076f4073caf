//! Work node views

use super::{percent_or_absent, require, take_role, MetricsService};
use crate::backend;
use crate::correlate::{merge, Dependent, MergedRecord};
use crate::error::Result;
use crate::extract::{KeyField, TaggedRow};
use crate::fanout::{FanOut, Role};
use crate::models::{MetricsRequest, NodeRecord, WorkNodeInfo};
use crate::query::{build, templates as pq, Dimensions, Template};
use crate::units;
use std::time::Instant;

const NODE_NAME_LABELS: [(KeyField, &str); 3] = [
    (KeyField::Instance, "instance"),
    (KeyField::NodeName, "nodename"),
    (KeyField::Namespace, "namespace"),
];

/// Per-instance dependent lists of the node view
const NODE_DEPENDENTS: [(Role, &str); 6] = [
    ("memory_usage", pq::NODE_MEMORY_USAGE),
    ("cpu_usage", pq::NODE_CPU_USAGE),
    ("disk", pq::NODE_DISK_USE),
    ("cpu", pq::NODE_CPU_USE),
    ("memory", pq::NODE_MEMORY_USE),
    ("disk_usage", pq::NODE_DISK_USAGE),
];

impl MetricsService {
    /// One record per exporter instance, in name-list order
    pub async fn work_node_list(&self) -> Result<Vec<NodeRecord>> {
        let started = Instant::now();
        let mut fan_out: FanOut<Result<Vec<TaggedRow>>> = FanOut::new();

        let b = self.backend.clone();
        fan_out.spawn("names", async move {
            backend::fetch_rows(b.as_ref(), pq::NODE_NAME_LIST, &NODE_NAME_LABELS).await
        });
        for (role, expr) in NODE_DEPENDENTS {
            let b = self.backend.clone();
            fan_out.spawn(role, async move {
                backend::fetch_rows(b.as_ref(), expr, &[(KeyField::Instance, "instance")]).await
            });
        }
        let b = self.backend.clone();
        fan_out.spawn("ready", async move {
            backend::fetch_rows(b.as_ref(), pq::NODE_CONDITION, &[(KeyField::Node, "node")]).await
        });

        let mut joined = fan_out.join().await?;
        let names = take_role(&mut joined, "names")?;

        let mut dependents: Vec<Dependent> = NODE_DEPENDENTS
            .iter()
            .map(|&(role, _)| {
                let rows = self.degrade_rows("work_node_list", role, take_role(&mut joined, role));
                Dependent::exact(role, rows)
            })
            .collect();
        let ready = self.degrade_rows("work_node_list", "ready", take_role(&mut joined, "ready"));
        dependents.push(Dependent::contains(
            "ready",
            ready,
            KeyField::NodeName,
            KeyField::Node,
        ));

        let nodes: Vec<NodeRecord> = merge(&names, &dependents).iter().map(node_record).collect();

        self.finish("work_node_list", nodes.len(), started);
        Ok(nodes)
    }

    /// Usage percentages of one node; `nodename` and `instance` are required
    pub async fn work_node_info(&self, request: &MetricsRequest) -> Result<WorkNodeInfo> {
        let started = Instant::now();
        let dims = Dimensions::new()
            .node(require(&request.nodename, "nodename")?)
            .instance(require(&request.instance, "instance")?);

        let mut joined = self
            .scalars(vec![
                ("pod_usage", build(Template::NodePodUsage, &dims)?),
                ("cpu_usage", build(Template::NodeCpuUsage, &dims)?),
                ("memory_usage", build(Template::NodeMemoryUsage, &dims)?),
                ("disk_usage", build(Template::NodeDiskUsage, &dims)?),
            ])
            .await?;

        let info = WorkNodeInfo {
            pod_usage: percent_or_absent(take_role(&mut joined, "pod_usage")?.value),
            cpu_usage: percent_or_absent(take_role(&mut joined, "cpu_usage")?.value),
            memory_usage: percent_or_absent(take_role(&mut joined, "memory_usage")?.value),
            disk_usage: percent_or_absent(take_role(&mut joined, "disk_usage")?.value),
        };

        self.finish("work_node_info", 1, started);
        Ok(info)
    }
}

fn node_record(rec: &MergedRecord) -> NodeRecord {
    let formatted = |role, f: fn(&str) -> String| rec.value(role).map(f).unwrap_or_default();

    NodeRecord {
        instance: rec.field(KeyField::Instance).to_string(),
        node_name: rec.field(KeyField::NodeName).to_string(),
        namespace: rec.field(KeyField::Namespace).to_string(),
        cpu: formatted("cpu", |v| units::fixed2(v)),
        cpu_usage: formatted("cpu_usage", |v| units::percent(v)),
        memory: formatted("memory", |v| units::bytes_to_gb(v)),
        memory_usage: formatted("memory_usage", |v| units::percent(v)),
        disk: formatted("disk", |v| units::bytes_to_gb(v)),
        disk_usage: formatted("disk_usage", |v| units::percent(v)),
        ready: rec.has("ready"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::fixture::{scalar_doc, vector_doc, FixtureBackend};
    use crate::error::MetricsError;
    use std::sync::Arc;

    fn node_names() -> serde_json::Value {
        vector_doc(&[
            (
                &[("instance", "i1"), ("nodename", "worker-1"), ("namespace", "monitoring")],
                "1",
            ),
            (
                &[("instance", "i2"), ("nodename", "worker-2"), ("namespace", "monitoring")],
                "1",
            ),
        ])
    }

    #[tokio::test]
    async fn test_node_list_joins_dependents_by_instance() {
        let svc = MetricsService::new(Arc::new(
            FixtureBackend::new()
                .on_exact(pq::NODE_NAME_LIST, node_names())
                .on_exact(
                    pq::NODE_MEMORY_USAGE,
                    vector_doc(&[(&[("instance", "i1")], "42.00")]),
                )
                .on_exact(
                    pq::NODE_MEMORY_USE,
                    vector_doc(&[
                        (&[("instance", "i2")], "2147483648"),
                        (&[("instance", "i1")], "1073741824"),
                    ]),
                )
                .on_exact(pq::NODE_CONDITION, vector_doc(&[(&[("node", "worker-2")], "1")])),
        ));

        let nodes = svc.work_node_list().await.unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].instance, "i1");
        assert_eq!(nodes[0].node_name, "worker-1");
        assert_eq!(nodes[0].memory_usage, "42.00");
        assert_eq!(nodes[1].memory_usage, "");
        assert_eq!(nodes[0].memory, "1.00");
        assert_eq!(nodes[1].memory, "2.00");
        assert!(!nodes[0].ready);
        assert!(nodes[1].ready);
    }

    #[tokio::test]
    async fn test_node_list_length_follows_name_list_when_dependents_fail() {
        let svc = MetricsService::new(Arc::new(
            FixtureBackend::new()
                .on_exact(pq::NODE_NAME_LIST, node_names())
                .fail_on("node_memory")
                .fail_on("node_cpu")
                .fail_on("kube_node_status_condition"),
        ));

        let nodes = svc.work_node_list().await.unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[1].cpu_usage, "");
        assert!(!nodes[1].ready);
    }

    #[tokio::test]
    async fn test_node_list_fails_when_name_list_fails() {
        let svc = MetricsService::new(Arc::new(FixtureBackend::new().fail_on("node_uname_info")));
        let err = svc.work_node_list().await.unwrap_err();
        assert!(matches!(err, MetricsError::QueryFailed { .. }));
    }

    #[tokio::test]
    async fn test_work_node_info() {
        let svc = MetricsService::new(Arc::new(
            FixtureBackend::new()
                .on_contains("kube_pod_info{node='worker-1'}", scalar_doc("25"))
                .on_contains("node_cpu_seconds_total", scalar_doc("12.346"))
                .on_contains("node_memory_MemTotal_bytes", scalar_doc("50")),
        ));
        let request = MetricsRequest {
            nodename: Some("worker-1".into()),
            instance: Some("10.0.0.1:9100".into()),
            ..Default::default()
        };

        let info = svc.work_node_info(&request).await.unwrap();
        assert_eq!(info.pod_usage, "25.00");
        assert_eq!(info.cpu_usage, "12.35");
        assert_eq!(info.memory_usage, "50.00");
        assert_eq!(info.disk_usage, "");
    }

    #[tokio::test]
    async fn test_work_node_info_requires_both_dimensions() {
        let svc = MetricsService::new(Arc::new(FixtureBackend::new()));
        let request = MetricsRequest {
            nodename: Some("worker-1".into()),
            instance: Some("  ".into()),
            ..Default::default()
        };

        let err = svc.work_node_info(&request).await.unwrap_err();
        assert!(matches!(err, MetricsError::InvalidDimension(_)));
    }
}
