pub mod cluster;
pub mod containers;
pub mod nodes;
pub mod pods;
pub mod workloads;
