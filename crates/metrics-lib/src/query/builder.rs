//! Dimensioned query construction
//!
//! Queries are assembled from a [`Template`] and typed [`Dimensions`] instead
//! of string concatenation. Label values are escaped before they are placed
//! inside single quotes, and regex matchers escape regex metacharacters in
//! the bound value so a name like `web.v2` cannot widen the match.

use crate::error::{MetricsError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Filter shape for queries that select the children of an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Division {
    /// All containers of all pods owned by a workload (`pod_name=~'<name>-.*'`)
    Workloads,
    /// All containers of a single pod (`pod_name='<name>'`)
    Pod,
}

impl FromStr for Division {
    type Err = MetricsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "workloads" => Ok(Division::Workloads),
            "pod" => Ok(Division::Pod),
            other => Err(MetricsError::InvalidDimension(format!(
                "unsupported division '{}'",
                other
            ))),
        }
    }
}

/// Workload kinds that expose `kube_<kind>_metadata_generation`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkloadKind {
    Deployment,
    DaemonSet,
    StatefulSet,
}

impl WorkloadKind {
    pub const ALL: [WorkloadKind; 3] = [
        WorkloadKind::Deployment,
        WorkloadKind::StatefulSet,
        WorkloadKind::DaemonSet,
    ];

    /// Metric label and metric-name fragment for this kind
    pub fn label(&self) -> &'static str {
        match self {
            WorkloadKind::Deployment => "deployment",
            WorkloadKind::DaemonSet => "daemonset",
            WorkloadKind::StatefulSet => "statefulset",
        }
    }
}

impl fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for WorkloadKind {
    type Err = MetricsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "deployment" | "deployments" => Ok(WorkloadKind::Deployment),
            "daemonset" | "daemonsets" => Ok(WorkloadKind::DaemonSet),
            "statefulset" | "statefulsets" | "stateful" => Ok(WorkloadKind::StatefulSet),
            other => Err(MetricsError::InvalidDimension(format!(
                "unsupported workload kind '{}'",
                other
            ))),
        }
    }
}

/// Entity identity bindings for a query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dimensions {
    pub namespace: Option<String>,
    pub pod: Option<String>,
    pub container: Option<String>,
    pub instance: Option<String>,
    pub node: Option<String>,
    pub workload_kind: Option<WorkloadKind>,
    pub workload_name: Option<String>,
}

impl Dimensions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn namespace(mut self, v: impl Into<String>) -> Self {
        self.namespace = Some(v.into());
        self
    }

    pub fn pod(mut self, v: impl Into<String>) -> Self {
        self.pod = Some(v.into());
        self
    }

    pub fn container(mut self, v: impl Into<String>) -> Self {
        self.container = Some(v.into());
        self
    }

    pub fn instance(mut self, v: impl Into<String>) -> Self {
        self.instance = Some(v.into());
        self
    }

    pub fn node(mut self, v: impl Into<String>) -> Self {
        self.node = Some(v.into());
        self
    }

    pub fn workload_kind(mut self, kind: WorkloadKind) -> Self {
        self.workload_kind = Some(kind);
        self
    }

    pub fn workload_name(mut self, v: impl Into<String>) -> Self {
        self.workload_name = Some(v.into());
        self
    }
}

/// One label matcher inside a selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Matcher {
    Eq(&'static str, String),
    Ne(&'static str, String),
    /// `label=~'<escaped prefix>-.*'`
    ChildOf(&'static str, String),
}

impl Matcher {
    fn render(&self) -> String {
        match self {
            Matcher::Eq(label, value) => format!("{}='{}'", label, escape_value(value)),
            Matcher::Ne(label, value) => format!("{}!='{}'", label, escape_value(value)),
            Matcher::ChildOf(label, prefix) => {
                format!("{}=~'{}-.*'", label, escape_value(&escape_regex(prefix)))
            }
        }
    }
}

/// `metric{matcher,...}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    metric: &'static str,
    matchers: Vec<Matcher>,
}

impl Selector {
    pub fn new(metric: &'static str) -> Self {
        Self {
            metric,
            matchers: Vec::new(),
        }
    }

    pub fn eq(mut self, label: &'static str, value: impl Into<String>) -> Self {
        self.matchers.push(Matcher::Eq(label, value.into()));
        self
    }

    pub fn ne(mut self, label: &'static str, value: impl Into<String>) -> Self {
        self.matchers.push(Matcher::Ne(label, value.into()));
        self
    }

    pub fn child_of(mut self, label: &'static str, prefix: impl Into<String>) -> Self {
        self.matchers.push(Matcher::ChildOf(label, prefix.into()));
        self
    }

    pub fn render(&self) -> String {
        let body: Vec<String> = self.matchers.iter().map(Matcher::render).collect();
        format!("{}{{{}}}", self.metric, body.join(","))
    }
}

/// Dimensioned query shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Template {
    /// Pods scheduled on a node over its allocatable pods (node)
    NodePodUsage,
    /// Non-idle cpu of a node (instance)
    NodeCpuUsage,
    /// Used memory of a node (instance)
    NodeMemoryUsage,
    /// Root filesystem usage of a node (node)
    NodeDiskUsage,
    /// Cpu usage of one container (namespace, pod, container)
    ContainerCpuUsage,
    /// Working set of one container over machine memory
    ContainerMemoryUsage,
    /// Filesystem usage of one container over its limit
    ContainerDiskUsage,
    /// Workloads of a kind with their namespace (workload kind)
    WorkloadMetadata,
    /// Summed cpu seconds of the selected children (division)
    ChildCpuUse,
    /// Summed cpu rate of the selected children (division)
    ChildCpuUsage,
    /// Summed working set of the selected children (division)
    ChildMemoryUse,
    /// Summed filesystem usage of the selected children (division)
    ChildDiskUse,
    /// Container identities of the selected children (division)
    ChildNames,
}

/// An immutable, fully bound query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricQuery {
    template: Template,
    division: Option<Division>,
    dims: Dimensions,
}

impl MetricQuery {
    pub fn new(template: Template, dims: Dimensions) -> Self {
        Self {
            template,
            division: None,
            dims,
        }
    }

    pub fn with_division(mut self, division: Division) -> Self {
        self.division = Some(division);
        self
    }

    pub fn template(&self) -> Template {
        self.template
    }

    /// Render the PromQL expression
    pub fn build(&self) -> Result<String> {
        let d = &self.dims;

        let expr = match self.template {
            Template::NodePodUsage => {
                let node = required(&d.node, "node")?;
                format!(
                    "sum({})/sum({})*100",
                    Selector::new("kube_pod_info").eq("node", node).render(),
                    Selector::new("kube_node_status_allocatable_pods")
                        .eq("node", node)
                        .render()
                )
            }
            Template::NodeCpuUsage => {
                let instance = required(&d.instance, "instance")?;
                format!(
                    "(sum(irate({}[2m])))*100",
                    Selector::new("node_cpu_seconds_total")
                        .ne("mode", "idle")
                        .eq("job", "node-exporter")
                        .eq("instance", instance)
                        .render()
                )
            }
            Template::NodeMemoryUsage => {
                let instance = required(&d.instance, "instance")?;
                let sel = |metric| {
                    Selector::new(metric)
                        .eq("job", "node-exporter")
                        .eq("instance", instance)
                        .render()
                };
                format!(
                    "max((({}-{}-{}-{})/{})*100)",
                    sel("node_memory_MemTotal_bytes"),
                    sel("node_memory_MemFree_bytes"),
                    sel("node_memory_Buffers_bytes"),
                    sel("node_memory_Cached_bytes"),
                    sel("node_memory_MemTotal_bytes")
                )
            }
            Template::NodeDiskUsage => {
                let node = required(&d.node, "node")?;
                let sel = |metric| Selector::new(metric).eq("id", "/").eq("node", node).render();
                format!(
                    "sum({})/sum({})*100",
                    sel("container_fs_usage_bytes"),
                    sel("container_fs_limit_bytes")
                )
            }
            Template::ContainerCpuUsage => {
                let sel = container_selector("container_cpu_usage_seconds_total", d, true)?;
                format!(
                    "sum(rate({}[2m]))by(namespace,pod_name,container_name)*100",
                    sel.render()
                )
            }
            Template::ContainerMemoryUsage => {
                let sel = container_selector("container_memory_working_set_bytes", d, true)?;
                format!("sum({})/avg(machine_memory_bytes)*100", sel.render())
            }
            Template::ContainerDiskUsage => {
                let usage = container_selector("container_fs_usage_bytes", d, true)?;
                let limit = container_selector("container_fs_limit_bytes", d, false)?;
                format!("sum({})/max({})*100", usage.render(), limit.render())
            }
            Template::WorkloadMetadata => {
                let kind = d.workload_kind.ok_or_else(|| {
                    MetricsError::InvalidDimension("workload kind is required".to_string())
                })?;
                format!(
                    "count(kube_{}_metadata_generation)by(namespace,{})",
                    kind.label(),
                    kind.label()
                )
            }
            Template::ChildCpuUse
            | Template::ChildCpuUsage
            | Template::ChildMemoryUse
            | Template::ChildDiskUse
            | Template::ChildNames => {
                let division = self.division.ok_or_else(|| {
                    MetricsError::InvalidDimension(format!(
                        "{:?} requires a division",
                        self.template
                    ))
                })?;
                self.build_child(division)?
            }
        };

        Ok(expr)
    }

    fn build_child(&self, division: Division) -> Result<String> {
        let metric = match self.template {
            Template::ChildMemoryUse => "container_memory_working_set_bytes",
            Template::ChildDiskUse => "container_fs_usage_bytes",
            _ => "container_cpu_usage_seconds_total",
        };
        let sel = child_selector(metric, division, &self.dims)?.render();

        Ok(match self.template {
            Template::ChildCpuUsage => format!("sum(rate({}[2m]))*100", sel),
            Template::ChildNames => format!("count({})by(namespace,pod_name,container_name)", sel),
            _ => format!("sum({})", sel),
        })
    }
}

/// Render `template` bound to `dims`
pub fn build(template: Template, dims: &Dimensions) -> Result<String> {
    MetricQuery::new(template, dims.clone()).build()
}

/// Render a division template bound to `dims`
pub fn build_child(template: Template, division: Division, dims: &Dimensions) -> Result<String> {
    MetricQuery::new(template, dims.clone())
        .with_division(division)
        .build()
}

fn child_selector(metric: &'static str, division: Division, d: &Dimensions) -> Result<Selector> {
    let base = Selector::new(metric)
        .ne("container_name", "POD")
        .ne("image", "");

    match division {
        Division::Workloads => {
            let namespace = required(&d.namespace, "namespace")?;
            let name = required(&d.workload_name, "workload name")?;
            Ok(base.eq("namespace", namespace).child_of("pod_name", name))
        }
        Division::Pod => {
            let pod = required(&d.pod, "pod")?;
            Ok(base.eq("pod_name", pod))
        }
    }
}

fn container_selector(metric: &'static str, d: &Dimensions, running_only: bool) -> Result<Selector> {
    let container = required(&d.container, "container")?;
    let namespace = required(&d.namespace, "namespace")?;
    let pod = required(&d.pod, "pod")?;

    let mut sel = Selector::new(metric);
    if running_only {
        sel = sel.ne("container_name", "POD").ne("image", "");
    }
    Ok(sel
        .eq("container_name", container)
        .eq("namespace", namespace)
        .eq("pod_name", pod))
}

fn required<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(MetricsError::InvalidDimension(format!("{} is required", name))),
    }
}

/// Escape a value for a single-quoted PromQL string
pub fn escape_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape RE2 metacharacters so the value matches literally
pub fn escape_regex(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if "\\.+*?()|[]{}^$".contains(c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
