//! Work node CLI commands

use anyhow::Result;
use metrics_lib::{MetricsRequest, NodeRecord, WorkNodeInfo};
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{
    color_ready, color_usage, display_value, print_field, print_heading, print_json, print_rows,
    OutputFormat,
};

/// Row for the node table
#[derive(Tabled)]
struct NodeRow {
    #[tabled(rename = "Node")]
    node: String,
    #[tabled(rename = "Instance")]
    instance: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "CPU")]
    cpu: String,
    #[tabled(rename = "CPU %")]
    cpu_usage: String,
    #[tabled(rename = "Mem (GB)")]
    memory: String,
    #[tabled(rename = "Mem %")]
    memory_usage: String,
    #[tabled(rename = "Disk (GB)")]
    disk: String,
    #[tabled(rename = "Disk %")]
    disk_usage: String,
}

fn node_rows(nodes: &[NodeRecord]) -> Vec<NodeRow> {
    nodes
        .iter()
        .map(|n| NodeRow {
            node: display_value(&n.node_name),
            instance: n.instance.clone(),
            status: color_ready(n.ready),
            cpu: display_value(&n.cpu),
            cpu_usage: color_usage(&n.cpu_usage),
            memory: display_value(&n.memory),
            memory_usage: color_usage(&n.memory_usage),
            disk: display_value(&n.disk),
            disk_usage: color_usage(&n.disk_usage),
        })
        .collect()
}

/// List work nodes
pub async fn list_nodes(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let nodes: Vec<NodeRecord> = client.get("v1/nodes").await?;
    print_rows(&nodes, node_rows, format)
}

/// Show usage of one node
pub async fn show_node(
    client: &ApiClient,
    nodename: String,
    instance: String,
    format: OutputFormat,
) -> Result<()> {
    let request = MetricsRequest {
        nodename: Some(nodename.clone()),
        instance: Some(instance),
        ..Default::default()
    };
    let info: WorkNodeInfo = client.get_with("v1/nodes/info", &request).await?;

    match format {
        OutputFormat::Json => print_json(&info)?,
        OutputFormat::Table => {
            print_heading(&format!("Node {}", nodename));
            print_field("Pods", &color_usage(&info.pod_usage));
            print_field("CPU", &color_usage(&info.cpu_usage));
            print_field("Memory", &color_usage(&info.memory_usage));
            print_field("Disk", &color_usage(&info.disk_usage));
        }
    }

    Ok(())
}
