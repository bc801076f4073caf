//! CaaS monitor CLI
//!
//! A command-line tool for browsing cluster, node, workload, pod and
//! container metrics served by the monitor API.

mod client;
mod commands;
mod config;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use commands::{cluster, containers, nodes, pods, workloads};

/// CaaS monitor CLI
#[derive(Parser)]
#[command(name = "cmon")]
#[command(author, version, about = "CLI for the CaaS monitor", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via CMON_API_URL env var)
    #[arg(long, env = "CMON_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show cluster usage and counters
    Cluster,

    /// Show monitor backend health
    Health,

    /// List work nodes, or show one node
    Nodes {
        /// Node name
        #[arg(long, requires = "instance")]
        node: Option<String>,

        /// Exporter instance of the node (host:port)
        #[arg(long, requires = "node")]
        instance: Option<String>,
    },

    /// Workload usage and replica status
    #[command(subcommand)]
    Workloads(WorkloadCommands),

    /// Pod usage and phases
    #[command(subcommand)]
    Pods(PodCommands),

    /// Container usage
    #[command(subcommand)]
    Containers(ContainerCommands),

    /// Print the log of a pod
    Logs {
        /// Pod name
        pod: String,

        /// Pod namespace (defaults to the configured namespace)
        #[arg(long, short)]
        namespace: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum WorkloadCommands {
    /// Show usage summaries per workload kind
    Summary {
        /// Only this kind (deployment, statefulset, daemonset)
        #[arg(long, short)]
        kind: Option<String>,
    },

    /// Show replica counters per workload kind
    Status,
}

#[derive(Subcommand)]
pub enum PodCommands {
    /// List pods with their usage
    List,

    /// Show pod counts by phase
    Phase,
}

#[derive(Subcommand)]
pub enum ContainerCommands {
    /// List containers
    List {
        /// Only containers of this pod
        #[arg(long, short, conflicts_with = "workload")]
        pod: Option<String>,

        /// Only containers of this workload kind
        #[arg(long, short)]
        workload: Option<String>,
    },

    /// Show usage of one container
    Info {
        /// Pod name
        pod: String,

        /// Container name
        container: String,

        /// Pod namespace (defaults to the configured namespace)
        #[arg(long, short)]
        namespace: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = config::Config::load()?;
    let client = client::ApiClient::new(&config.resolve_api_url(cli.api_url.as_deref()))?;

    let namespace = |explicit: Option<String>| -> Result<String> {
        explicit
            .or_else(|| config.default_namespace.clone())
            .context("No namespace given and no default_namespace configured")
    };

    match cli.command {
        Commands::Cluster => cluster::show_cluster(&client, cli.format).await?,
        Commands::Health => cluster::show_health(&client, cli.format).await?,
        Commands::Nodes { node, instance } => match (node, instance) {
            (Some(node), Some(instance)) => {
                nodes::show_node(&client, node, instance, cli.format).await?;
            }
            _ => nodes::list_nodes(&client, cli.format).await?,
        },
        Commands::Workloads(cmd) => match cmd {
            WorkloadCommands::Summary { kind } => {
                workloads::show_summary(&client, kind, cli.format).await?;
            }
            WorkloadCommands::Status => workloads::show_status(&client, cli.format).await?,
        },
        Commands::Pods(cmd) => match cmd {
            PodCommands::List => pods::list_pods(&client, cli.format).await?,
            PodCommands::Phase => pods::show_phase(&client, cli.format).await?,
        },
        Commands::Containers(cmd) => match cmd {
            ContainerCommands::List { pod, workload } => {
                containers::list_containers(&client, pod, workload, cli.format).await?;
            }
            ContainerCommands::Info {
                pod,
                container,
                namespace: ns,
            } => {
                containers::show_container(&client, namespace(ns)?, pod, container, cli.format)
                    .await?;
            }
        },
        Commands::Logs { pod, namespace: ns } => {
            containers::show_log(&client, namespace(ns)?, pod, cli.format).await?;
        }
    }

    Ok(())
}
