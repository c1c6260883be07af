//! `preflight nodes`: list collected nodes with their resource properties

use anyhow::Result;
use preflight_lib::{ClusterNode, NodeProperty};
use std::path::Path;
use tabled::Tabled;

use super::{load_nodes, open_bundle};
use crate::output::{format_quantity, print_info, print_json, print_table, OutputFormat};

/// Row for the nodes table
#[derive(Tabled)]
struct NodeRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "CPU Cap")]
    cpu_capacity: String,
    #[tabled(rename = "CPU Alloc")]
    cpu_allocatable: String,
    #[tabled(rename = "Mem Cap")]
    memory_capacity: String,
    #[tabled(rename = "Mem Alloc")]
    memory_allocatable: String,
    #[tabled(rename = "Pods Cap")]
    pod_capacity: String,
    #[tabled(rename = "Pods Alloc")]
    pod_allocatable: String,
    #[tabled(rename = "Storage Cap")]
    storage_capacity: String,
    #[tabled(rename = "Storage Alloc")]
    storage_allocatable: String,
}

impl From<&ClusterNode> for NodeRow {
    fn from(node: &ClusterNode) -> Self {
        let get = |property| format_quantity(node.property(property));
        Self {
            name: node.name.clone(),
            cpu_capacity: get(NodeProperty::CpuCapacity),
            cpu_allocatable: get(NodeProperty::CpuAllocatable),
            memory_capacity: get(NodeProperty::MemoryCapacity),
            memory_allocatable: get(NodeProperty::MemoryAllocatable),
            pod_capacity: get(NodeProperty::PodCapacity),
            pod_allocatable: get(NodeProperty::PodAllocatable),
            storage_capacity: get(NodeProperty::EphemeralStorageCapacity),
            storage_allocatable: get(NodeProperty::EphemeralStorageAllocatable),
        }
    }
}

/// List the nodes collected in a bundle
pub fn list_nodes(bundle: &Path, format: OutputFormat) -> Result<()> {
    let store = open_bundle(bundle)?;
    let nodes = load_nodes(&store)?;

    match format {
        OutputFormat::Json => print_json(&nodes)?,
        OutputFormat::Table => {
            let rows: Vec<NodeRow> = nodes.iter().map(NodeRow::from).collect();
            print_table(rows, "No nodes found in bundle");
            if !nodes.is_empty() {
                print_info(&format!("Total: {} nodes", nodes.len()));
            }
        }
    }

    Ok(())
}
