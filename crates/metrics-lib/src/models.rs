//! Entity records returned by the composer
//!
//! Metric fields are presentation-ready strings. A value the backend did not
//! provide is rendered as an empty string ([`ABSENT`]), never as `"0"`.

use crate::query::{Dimensions, WorkloadKind};
use serde::{Deserialize, Serialize};

/// Rendering of a value no dependent list supplied
pub const ABSENT: &str = "";

/// Entity identity request, as received by the controller layer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsRequest {
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub pod_name: Option<String>,
    #[serde(default)]
    pub container_name: Option<String>,
    #[serde(default)]
    pub instance: Option<String>,
    #[serde(default)]
    pub nodename: Option<String>,
    #[serde(default)]
    pub workloads_name: Option<String>,
}

impl MetricsRequest {
    /// Query dimensions carried by this request
    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            namespace: self.namespace.clone(),
            pod: self.pod_name.clone(),
            container: self.container_name.clone(),
            instance: self.instance.clone(),
            node: self.nodename.clone(),
            workload_kind: None,
            workload_name: None,
        }
    }
}

/// Cluster-wide usage percentages
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterAverage {
    pub pod_usage: String,
    pub cpu_usage: String,
    pub memory_usage: String,
    pub disk_usage: String,
}

/// Cluster-wide counters, as reported by the backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterOverview {
    pub alerts: String,
    pub running_pod: String,
    pub running_container: String,
    pub pod_restart: String,
    pub nodes: String,
}

/// Both cluster views fetched in one call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterSnapshot {
    pub average: ClusterAverage,
    pub overview: ClusterOverview,
}

/// One work node, keyed by exporter instance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    pub instance: String,
    pub node_name: String,
    pub namespace: String,
    pub cpu: String,
    pub cpu_usage: String,
    pub memory: String,
    pub memory_usage: String,
    pub disk: String,
    pub disk_usage: String,
    pub ready: bool,
}

/// Usage percentages of a single node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkNodeInfo {
    pub pod_usage: String,
    pub cpu_usage: String,
    pub memory_usage: String,
    pub disk_usage: String,
}

/// Replica counters of one workload kind; counters a kind lacks stay empty
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadStatus {
    pub name: String,
    #[serde(default)]
    pub total: String,
    #[serde(default)]
    pub available: String,
    #[serde(default)]
    pub unavailable: String,
    #[serde(default)]
    pub updated: String,
    #[serde(default)]
    pub ready: String,
    #[serde(default)]
    pub misscheduled: String,
    #[serde(default)]
    pub revision: String,
    #[serde(default)]
    pub running: String,
    #[serde(default)]
    pub restart: String,
    #[serde(default)]
    pub terminated: String,
}

/// Usage summed over every container of a workload kind (or one workload)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadSummary {
    pub kind: WorkloadKind,
    pub name: String,
    pub cpu: String,
    pub cpu_usage: String,
    pub memory: String,
    pub memory_usage: String,
    pub disk: String,
    pub disk_usage: String,
}

/// Usage of one pod
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodRecord {
    pub pod_name: String,
    pub cpu: String,
    pub cpu_usage: String,
    pub memory: String,
    pub memory_usage: String,
    pub disk: String,
    pub disk_usage: String,
}

/// Usage of one container. No disk percentage: per-container limits are
/// not joined into the list view.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerRecord {
    pub namespace: String,
    pub pod_name: String,
    pub container_name: String,
    pub cpu: String,
    pub cpu_usage: String,
    pub memory: String,
    pub memory_usage: String,
    pub disk: String,
}

/// Usage percentages of a single container (or workload projection)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerInfo {
    pub cpu_usage: String,
    pub memory_usage: String,
    pub disk_usage: String,
}

/// Raw log text of a pod
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerLog {
    pub namespace: String,
    pub pod: String,
    pub log: String,
}

/// Pod counts by phase. `total` is the sum of the buckets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodPhase {
    pub total: u64,
    pub failed: u64,
    pub pending: u64,
    pub running: u64,
    pub succeeded: u64,
    pub unknown: u64,
}

impl PodPhase {
    /// Sum of the individual phase buckets
    pub fn bucket_sum(&self) -> u64 {
        self.failed + self.pending + self.running + self.succeeded + self.unknown
    }
}
