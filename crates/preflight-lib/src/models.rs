//! Core data models for collected cluster state

use crate::error::{AnalyzeError, Result};
use crate::quantity::{Quantity, QuantityError};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Node;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity as KubeQuantity;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A numeric node property that filters and conditionals can refer to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeProperty {
    CpuCapacity,
    CpuAllocatable,
    MemoryCapacity,
    MemoryAllocatable,
    PodCapacity,
    PodAllocatable,
    EphemeralStorageCapacity,
    EphemeralStorageAllocatable,
}

impl NodeProperty {
    pub const ALL: [NodeProperty; 8] = [
        NodeProperty::CpuCapacity,
        NodeProperty::CpuAllocatable,
        NodeProperty::MemoryCapacity,
        NodeProperty::MemoryAllocatable,
        NodeProperty::PodCapacity,
        NodeProperty::PodAllocatable,
        NodeProperty::EphemeralStorageCapacity,
        NodeProperty::EphemeralStorageAllocatable,
    ];

    /// Name used in conditionals and filter specs
    pub fn name(self) -> &'static str {
        match self {
            NodeProperty::CpuCapacity => "cpuCapacity",
            NodeProperty::CpuAllocatable => "cpuAllocatable",
            NodeProperty::MemoryCapacity => "memoryCapacity",
            NodeProperty::MemoryAllocatable => "memoryAllocatable",
            NodeProperty::PodCapacity => "podCapacity",
            NodeProperty::PodAllocatable => "podAllocatable",
            NodeProperty::EphemeralStorageCapacity => "ephemeralStorageCapacity",
            NodeProperty::EphemeralStorageAllocatable => "ephemeralStorageAllocatable",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }
}

/// One side (capacity or allocatable) of a node's resource list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeResources {
    pub cpu: Option<Quantity>,
    pub memory: Option<Quantity>,
    pub pods: Option<Quantity>,
    pub ephemeral_storage: Option<Quantity>,
}

impl NodeResources {
    fn from_resource_list(
        list: Option<&BTreeMap<String, KubeQuantity>>,
    ) -> std::result::Result<Self, QuantityError> {
        let Some(list) = list else {
            return Ok(Self::default());
        };
        let get = |name: &str| list.get(name).map(|q| Quantity::parse(&q.0)).transpose();

        Ok(Self {
            cpu: get("cpu")?,
            memory: get("memory")?,
            pods: get("pods")?,
            ephemeral_storage: get("ephemeral-storage")?,
        })
    }
}

/// A cluster node as seen by the analyzers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterNode {
    pub name: String,
    pub labels: BTreeMap<String, String>,
    pub capacity: NodeResources,
    pub allocatable: NodeResources,
}

impl ClusterNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn with_property(mut self, property: NodeProperty, value: Quantity) -> Self {
        *self.slot_mut(property) = Some(value);
        self
    }

    fn slot_mut(&mut self, property: NodeProperty) -> &mut Option<Quantity> {
        match property {
            NodeProperty::CpuCapacity => &mut self.capacity.cpu,
            NodeProperty::CpuAllocatable => &mut self.allocatable.cpu,
            NodeProperty::MemoryCapacity => &mut self.capacity.memory,
            NodeProperty::MemoryAllocatable => &mut self.allocatable.memory,
            NodeProperty::PodCapacity => &mut self.capacity.pods,
            NodeProperty::PodAllocatable => &mut self.allocatable.pods,
            NodeProperty::EphemeralStorageCapacity => &mut self.capacity.ephemeral_storage,
            NodeProperty::EphemeralStorageAllocatable => &mut self.allocatable.ephemeral_storage,
        }
    }

    pub fn property(&self, property: NodeProperty) -> Option<Quantity> {
        match property {
            NodeProperty::CpuCapacity => self.capacity.cpu,
            NodeProperty::CpuAllocatable => self.allocatable.cpu,
            NodeProperty::MemoryCapacity => self.capacity.memory,
            NodeProperty::MemoryAllocatable => self.allocatable.memory,
            NodeProperty::PodCapacity => self.capacity.pods,
            NodeProperty::PodAllocatable => self.allocatable.pods,
            NodeProperty::EphemeralStorageCapacity => self.capacity.ephemeral_storage,
            NodeProperty::EphemeralStorageAllocatable => self.allocatable.ephemeral_storage,
        }
    }

    /// Look up a property by its conditional name
    ///
    /// Unknown names resolve to `None`, exactly like a property the node
    /// does not report.
    pub fn lookup(&self, name: &str) -> Option<Quantity> {
        NodeProperty::from_name(name).and_then(|p| self.property(p))
    }

    /// Convert a collected Kubernetes node
    pub fn from_kube(node: Node) -> std::result::Result<Self, QuantityError> {
        let status = node.status.unwrap_or_default();
        Ok(Self {
            name: node.metadata.name.unwrap_or_default(),
            labels: node.metadata.labels.unwrap_or_default(),
            capacity: NodeResources::from_resource_list(status.capacity.as_ref())?,
            allocatable: NodeResources::from_resource_list(status.allocatable.as_ref())?,
        })
    }
}

/// A workload known to exist in a namespace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadRecord {
    pub namespace: String,
    pub name: String,
}

/// Decode a collected `nodes.json` payload
pub fn decode_nodes(payload: &[u8]) -> Result<Vec<ClusterNode>> {
    let nodes: Vec<Node> = serde_json::from_slice(payload).map_err(|e| AnalyzeError::Decode {
        what: "node list",
        reason: e.to_string(),
    })?;

    nodes
        .into_iter()
        .map(|node| {
            let name = node.metadata.name.clone().unwrap_or_default();
            ClusterNode::from_kube(node).map_err(|e| AnalyzeError::Decode {
                what: "node list",
                reason: format!("node {name:?}: {e}"),
            })
        })
        .collect()
}

/// Decode a collected `deployments/<namespace>.json` payload
pub fn decode_deployments(payload: &[u8], namespace: &str) -> Result<Vec<WorkloadRecord>> {
    let deployments: Vec<Deployment> =
        serde_json::from_slice(payload).map_err(|e| AnalyzeError::Decode {
            what: "deployment list",
            reason: e.to_string(),
        })?;

    Ok(deployments
        .into_iter()
        .map(|d| WorkloadRecord {
            namespace: d
                .metadata
                .namespace
                .unwrap_or_else(|| namespace.to_string()),
            name: d.metadata.name.unwrap_or_default(),
        })
        .collect())
}
