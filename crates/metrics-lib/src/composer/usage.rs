//! Per-child dimension sums shared by the workload and pod views

use super::MetricsService;
use crate::backend::{self, SharedBackend};
use crate::error::Result;
use crate::fanout::UsageTotals;
use crate::query::{build_child, templates, Dimensions, Division, Template};
use crate::units;
use tracing::warn;

/// Cluster-wide denominators for usage percentages
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Denominators {
    pub machine_memory: Option<f64>,
    pub fs_limit: Option<f64>,
}

impl MetricsService {
    /// Fetch machine memory and the root filesystem limit concurrently
    pub(crate) async fn denominators(&self, view: &str) -> Result<Denominators> {
        let mut joined = self
            .scalars(vec![
                ("machine_memory", templates::MACHINE_MEMORY.to_string()),
                ("fs_limit", templates::CONTAINER_FS_LIMIT.to_string()),
            ])
            .await?;

        Ok(Denominators {
            machine_memory: self.degrade_scalar(
                view,
                "machine_memory",
                super::take_role(&mut joined, "machine_memory"),
            ),
            fs_limit: self.degrade_scalar(
                view,
                "fs_limit",
                super::take_role(&mut joined, "fs_limit"),
            ),
        })
    }
}

/// Sum the usage of every container selected by `division` and `dims`.
///
/// Fails only when the dimensions cannot form a query. Individual query
/// failures contribute zero.
pub(crate) async fn child_usage(
    backend: SharedBackend,
    division: Division,
    dims: Dimensions,
    machine_memory: Option<f64>,
) -> Result<UsageTotals> {
    let cpu_use = build_child(Template::ChildCpuUse, division, &dims)?;
    let cpu_usage = build_child(Template::ChildCpuUsage, division, &dims)?;
    let memory_use = build_child(Template::ChildMemoryUse, division, &dims)?;
    let disk_use = build_child(Template::ChildDiskUse, division, &dims)?;

    let b = backend.as_ref();
    let (cpu_use, cpu_usage, memory_use, disk_use) = tokio::join!(
        backend::fetch_scalar(b, &cpu_use),
        backend::fetch_scalar(b, &cpu_usage),
        backend::fetch_scalar(b, &memory_use),
        backend::fetch_scalar(b, &disk_use),
    );

    let memory_use = or_zero("memory_use", memory_use);
    Ok(UsageTotals {
        cpu_use: or_zero("cpu_use", cpu_use),
        cpu_usage: or_zero("cpu_usage", cpu_usage),
        memory_use,
        memory_usage: units::ratio_percent(memory_use, machine_memory).unwrap_or(0.0),
        disk_use: or_zero("disk_use", disk_use),
    })
}

fn or_zero(role: &str, scalar: Result<crate::extract::ScalarResult>) -> f64 {
    match scalar {
        Ok(s) => s.or_zero(),
        Err(e) => {
            warn!(role, error = %e, "Child usage query failed, counting 0");
            crate::observability::MonitorMetrics::new().inc_degraded_values();
            0.0
        }
    }
}

/// Formatted usage fields of a workload or pod
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct UsageFields {
    pub cpu: String,
    pub cpu_usage: String,
    pub memory: String,
    pub memory_usage: String,
    pub disk: String,
    pub disk_usage: String,
}

impl UsageFields {
    /// Render summed totals. Percentages whose denominator is unknown are
    /// left absent.
    pub(crate) fn render(totals: &UsageTotals, denominators: &Denominators) -> Self {
        Self {
            cpu: units::fixed2(totals.cpu_use),
            cpu_usage: units::percent(totals.cpu_usage),
            memory: units::bytes_to_mb(totals.memory_use),
            memory_usage: denominators
                .machine_memory
                .filter(|m| *m != 0.0)
                .map(|_| units::percent(totals.memory_usage))
                .unwrap_or_default(),
            disk: units::bytes_to_mb(totals.disk_use),
            disk_usage: super::percent_or_absent(units::ratio_percent(
                totals.disk_use,
                denominators.fs_limit,
            )),
        }
    }
}
