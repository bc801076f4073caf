//! Pod CLI commands

use anyhow::Result;
use metrics_lib::{PodPhase, PodRecord};
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{
    color_usage, display_value, print_field, print_heading, print_json, print_rows, OutputFormat,
};

#[derive(Tabled)]
struct PodRow {
    #[tabled(rename = "Pod")]
    pod_name: String,
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

fn pod_rows(pods: &[PodRecord]) -> Vec<PodRow> {
    pods.iter()
        .map(|p| PodRow {
            pod_name: p.pod_name.clone(),
            cpu: display_value(&p.cpu),
            cpu_usage: color_usage(&p.cpu_usage),
            memory: display_value(&p.memory),
            memory_usage: color_usage(&p.memory_usage),
            disk: display_value(&p.disk),
            disk_usage: color_usage(&p.disk_usage),
        })
        .collect()
}

/// List pods with their usage
pub async fn list_pods(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let pods: Vec<PodRecord> = client.get("v1/pods").await?;
    print_rows(&pods, pod_rows, format)
}

/// Show pod counts by phase
pub async fn show_phase(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let phase: PodPhase = client.get("v1/pods/phase").await?;

    match format {
        OutputFormat::Json => print_json(&phase)?,
        OutputFormat::Table => {
            print_heading("Pod Phases");
            print_field("Running", &phase.running.to_string());
            print_field("Pending", &phase.pending.to_string());
            print_field("Succeeded", &phase.succeeded.to_string());
            print_field("Failed", &phase.failed.to_string());
            print_field("Unknown", &phase.unknown.to_string());
            print_field("Total", &phase.total.to_string());
        }
    }

    Ok(())
}
