//! Cluster-wide CLI commands

use anyhow::Result;
use metrics_lib::{ClusterSnapshot, HealthResponse};

use crate::client::ApiClient;
use crate::output::{color_usage, print_field, print_heading, print_json, OutputFormat};

/// Show cluster usage and counters
pub async fn show_cluster(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let snapshot: ClusterSnapshot = client.get("v1/cluster/snapshot").await?;

    match format {
        OutputFormat::Json => print_json(&snapshot)?,
        OutputFormat::Table => {
            let avg = &snapshot.average;
            print_heading("Cluster Usage");
            print_field("Pods", &color_usage(&avg.pod_usage));
            print_field("CPU", &color_usage(&avg.cpu_usage));
            print_field("Memory", &color_usage(&avg.memory_usage));
            print_field("Disk", &color_usage(&avg.disk_usage));
            println!();

            let ov = &snapshot.overview;
            print_heading("Cluster Overview");
            print_field("Nodes", &ov.nodes);
            print_field("Running pods", &ov.running_pod);
            print_field("Running containers", &ov.running_container);
            print_field("Pod restarts", &ov.pod_restart);
            print_field("Firing alerts", &ov.alerts);
        }
    }

    Ok(())
}

/// Show monitor backend health
pub async fn show_health(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let health: HealthResponse = client.get("healthz").await?;

    match format {
        OutputFormat::Json => print_json(&health)?,
        OutputFormat::Table => {
            print_heading("Monitor Health");
            print_field("Status", &format!("{:?}", health.status).to_lowercase());

            let mut names: Vec<&String> = health.components.keys().collect();
            names.sort();
            for name in names {
                let component = &health.components[name];
                let mut line = format!("{:?}", component.status).to_lowercase();
                if let Some(message) = &component.message {
                    line.push_str(&format!(" ({})", message));
                }
                print_field(name, &line);
            }
        }
    }

    Ok(())
}
