//! Container CLI commands

use anyhow::Result;
use metrics_lib::{ContainerInfo, ContainerLog, ContainerRecord, MetricsRequest};
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{
    color_usage, display_value, print_field, print_heading, print_json, print_rows, OutputFormat,
};

#[derive(Tabled)]
struct ContainerRow {
    #[tabled(rename = "Namespace")]
    namespace: String,
    #[tabled(rename = "Pod")]
    pod_name: String,
    #[tabled(rename = "Container")]
    container_name: String,
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
}

fn container_rows(containers: &[ContainerRecord]) -> Vec<ContainerRow> {
    containers
        .iter()
        .map(|c| ContainerRow {
            namespace: c.namespace.clone(),
            pod_name: c.pod_name.clone(),
            container_name: c.container_name.clone(),
            cpu: display_value(&c.cpu),
            cpu_usage: color_usage(&c.cpu_usage),
            memory: display_value(&c.memory),
            memory_usage: color_usage(&c.memory_usage),
            disk: display_value(&c.disk),
        })
        .collect()
}

/// List containers of a pod, of a workload kind, or of the whole cluster
pub async fn list_containers(
    client: &ApiClient,
    pod: Option<String>,
    workload: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let request = MetricsRequest {
        pod_name: pod,
        workloads_name: workload,
        ..Default::default()
    };
    let containers: Vec<ContainerRecord> = client.get_with("v1/containers", &request).await?;
    print_rows(&containers, container_rows, format)
}

/// Show usage of one container
pub async fn show_container(
    client: &ApiClient,
    namespace: String,
    pod: String,
    container: String,
    format: OutputFormat,
) -> Result<()> {
    let title = format!("Container {}/{}/{}", namespace, pod, container);
    let request = MetricsRequest {
        namespace: Some(namespace),
        pod_name: Some(pod),
        container_name: Some(container),
        ..Default::default()
    };
    let info: ContainerInfo = client.get_with("v1/containers/info", &request).await?;

    match format {
        OutputFormat::Json => print_json(&info)?,
        OutputFormat::Table => {
            print_heading(&title);
            print_field("CPU", &color_usage(&info.cpu_usage));
            print_field("Memory", &color_usage(&info.memory_usage));
            print_field("Disk", &color_usage(&info.disk_usage));
        }
    }

    Ok(())
}

/// Print the log of a pod
pub async fn show_log(
    client: &ApiClient,
    namespace: String,
    pod: String,
    format: OutputFormat,
) -> Result<()> {
    let request = MetricsRequest {
        namespace: Some(namespace),
        pod_name: Some(pod),
        ..Default::default()
    };
    let log: ContainerLog = client.get_with("v1/containers/log", &request).await?;

    match format {
        OutputFormat::Json => print_json(&log)?,
        OutputFormat::Table => print!("{}", log.log),
    }

    Ok(())
}
