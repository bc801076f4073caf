//! Workload CLI commands

use anyhow::Result;
use metrics_lib::{WorkloadStatus, WorkloadSummary};
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{color_usage, display_value, print_rows, OutputFormat};

#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "CPU")]
    cpu: String,
    #[tabled(rename = "CPU %")]
    cpu_usage: String,
    #[tabled(rename = "Mem (MB)")]
    memory: String,
    #[tabled(rename = "Mem %")]
    memory_usage: String,
    #[tabled(rename = "Disk (MB)")]
    disk: String,
    #[tabled(rename = "Disk %")]
    disk_usage: String,
}

#[derive(Tabled)]
struct StatusRow {
    #[tabled(rename = "Kind")]
    name: String,
    #[tabled(rename = "Total")]
    total: String,
    #[tabled(rename = "Ready")]
    ready: String,
    #[tabled(rename = "Available")]
    available: String,
    #[tabled(rename = "Unavailable")]
    unavailable: String,
    #[tabled(rename = "Updated")]
    updated: String,
    #[tabled(rename = "Running")]
    running: String,
    #[tabled(rename = "Restarts")]
    restart: String,
}

fn summary_rows(summaries: &[WorkloadSummary]) -> Vec<SummaryRow> {
    summaries
        .iter()
        .map(|s| SummaryRow {
            kind: s.name.clone(),
            cpu: display_value(&s.cpu),
            cpu_usage: color_usage(&s.cpu_usage),
            memory: display_value(&s.memory),
            memory_usage: color_usage(&s.memory_usage),
            disk: display_value(&s.disk),
            disk_usage: color_usage(&s.disk_usage),
        })
        .collect()
}

fn status_rows(statuses: &[WorkloadStatus]) -> Vec<StatusRow> {
    statuses
        .iter()
        .map(|s| StatusRow {
            name: s.name.clone(),
            total: display_value(&s.total),
            ready: display_value(&s.ready),
            available: display_value(&s.available),
            unavailable: display_value(&s.unavailable),
            updated: display_value(&s.updated),
            running: display_value(&s.running),
            restart: display_value(&s.restart),
        })
        .collect()
}

/// Show usage summaries, of every kind or of one
pub async fn show_summary(
    client: &ApiClient,
    kind: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let summaries: Vec<WorkloadSummary> = match kind {
        Some(kind) => vec![
            client
                .get(&format!("v1/workloads/summary/{}", kind))
                .await?,
        ],
        None => client.get("v1/workloads/summary").await?,
    };
    print_rows(&summaries, summary_rows, format)
}

/// Show replica counters per workload kind
pub async fn show_status(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let statuses: Vec<WorkloadStatus> = client.get("v1/workloads/status").await?;
    print_rows(&statuses, status_rows, format)
}
