//! Fixed PromQL expressions that take no dimensions

// Cluster usage
pub const POD_USAGE: &str =
    "sum(kube_pod_info)/sum(kube_node_status_allocatable_pods{node=~'.*'})*100";
pub const CPU_USAGE: &str =
    "sum(rate(container_cpu_usage_seconds_total{id='/'}[10m]))/sum(machine_cpu_cores)*100";
pub const MEMORY_USAGE: &str =
    "sum(container_memory_working_set_bytes{id='/'})/sum(machine_memory_bytes)*100";
pub const DISK_USAGE: &str =
    "sum(container_fs_usage_bytes{id='/'})/sum(container_fs_limit_bytes{id='/'})*100";

// Cluster overview
pub const CLUSTER_ALERTS: &str = "sum(ALERTS)";
pub const CLUSTER_RUNNING_POD: &str = "sum(kubelet_running_pod_count)";
pub const CLUSTER_RUNNING_CONTAINER: &str = "sum(kubelet_running_container_count)";
pub const CLUSTER_POD_RESTART: &str = "sum(kube_pod_container_status_restarts_total)";
pub const CLUSTER_NODES: &str = "sum(kube_node_info)";

// Workload status counters
pub const DEPLOYMENT_TOTAL: &str = "sum(kube_deployment_status_replicas)";
pub const DEPLOYMENT_AVAILABLE: &str = "sum(kube_deployment_status_replicas_available)";
pub const DEPLOYMENT_UNAVAILABLE: &str = "sum(kube_deployment_status_replicas_unavailable)";
pub const DEPLOYMENT_UPDATED: &str = "sum(kube_deployment_status_replicas_updated)";
pub const DAEMONSET_READY: &str = "sum(kube_daemonset_status_number_ready)";
pub const DAEMONSET_AVAILABLE: &str = "sum(kube_daemonset_status_number_available)";
pub const DAEMONSET_UNAVAILABLE: &str = "sum(kube_daemonset_status_number_unavailable)";
pub const DAEMONSET_MISSCHEDULED: &str = "sum(kube_daemonset_status_number_misscheduled)";
pub const STATEFULSET_TOTAL: &str = "sum(kube_statefulset_status_replicas)";
pub const STATEFULSET_READY: &str = "sum(kube_statefulset_status_replicas_ready)";
pub const STATEFULSET_UPDATED: &str = "sum(kube_statefulset_status_replicas_updated)";
pub const STATEFULSET_REVISION: &str = "sum(kube_statefulset_status_update_revision)";
pub const PODCONTAINER_READY: &str = "sum(kube_pod_container_status_ready)";
pub const PODCONTAINER_RUNNING: &str = "sum(kube_pod_container_status_running)";
pub const PODCONTAINER_RESTARTS: &str = "sum(kube_pod_container_status_restarts_total)";
pub const PODCONTAINER_TERMINATED: &str = "sum(kube_pod_container_status_terminated)";

// Work node lists, one row per instance
pub const NODE_NAME_LIST: &str = "count(node_uname_info)by(instance,nodename,namespace)";
pub const NODE_CPU_USAGE: &str =
    "(sum(irate(node_cpu_seconds_total{mode!='idle',job='node-exporter'}[2m]))by(instance))*100";
pub const NODE_MEMORY_USAGE: &str = "max(((node_memory_MemTotal_bytes{job='node-exporter'}\
    -node_memory_MemFree_bytes{job='node-exporter'}\
    -node_memory_Buffers_bytes{job='node-exporter'}\
    -node_memory_Cached_bytes{job='node-exporter'})\
    /node_memory_MemTotal_bytes{job='node-exporter'})*100)by(instance)";
pub const NODE_CPU_USE: &str =
    "avg(node_cpu_seconds_total{job='node-exporter',mode!='idle'})by(instance)";
pub const NODE_MEMORY_USE: &str = "sum(node_memory_MemTotal_bytes{job='node-exporter'})by(instance)";
pub const NODE_DISK_USE: &str = "sum(node_filesystem_size_bytes{job='node-exporter'})by(instance)";
pub const NODE_DISK_USAGE: &str = "(1-sum(node_filesystem_free_bytes{job='node-exporter'})by(instance)\
    /sum(node_filesystem_size_bytes{job='node-exporter'})by(instance))*100";
pub const NODE_CONDITION: &str =
    "count(kube_node_status_condition{condition='Ready',status='true'})by(node)";

// Container lists, one row per (namespace, pod_name, container_name)
pub const CONTAINER_NAME_LIST: &str =
    "count(container_cpu_usage_seconds_total{container_name!='POD',image!=''})by(namespace,pod_name,container_name)";
pub const CONTAINER_CPU_USAGE: &str =
    "sum(rate(container_cpu_usage_seconds_total{container_name!='POD',image!=''}[2m]))by(namespace,pod_name,container_name)*100";
pub const CONTAINER_CPU_USE: &str =
    "sum(container_cpu_usage_seconds_total{container_name!='POD',image!=''})by(namespace,pod_name,container_name)";
pub const CONTAINER_MEMORY_USE: &str =
    "sum(container_memory_working_set_bytes{container_name!='POD',image!=''})by(namespace,pod_name,container_name)";
pub const CONTAINER_DISK_USE: &str =
    "sum(container_fs_usage_bytes{container_name!='POD',image!=''})by(namespace,pod_name,container_name)";

// Denominators
pub const MACHINE_MEMORY: &str = "avg(machine_memory_bytes)";
pub const CONTAINER_FS_LIMIT: &str = "sum(container_fs_limit_bytes{id='/'})";

// Pods
pub const POD_PHASE: &str = "count(kube_pod_status_phase>0)by(phase)";
pub const POD_NAME_LIST: &str =
    "count(container_cpu_usage_seconds_total{container_name!='',container_name!='POD'})by(pod_name)";
