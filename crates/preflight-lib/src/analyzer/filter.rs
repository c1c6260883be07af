//! Node filtering
//!
//! Selector labels and threshold clauses are conjunctive. A node missing a
//! selector label aborts the whole filtering pass with an error, while a node
//! below a threshold (or not reporting the property) is merely excluded.

use crate::error::{AnalyzeError, Result};
use crate::models::ClusterNode;
use crate::quantity::Quantity;
use crate::spec::FilterSpec;
use tracing::trace;

/// Decide whether a node passes every declared filter clause
pub fn node_matches_filters(node: &ClusterNode, filters: Option<&FilterSpec>) -> Result<bool> {
    let Some(filters) = filters else {
        return Ok(true);
    };

    for (key, value) in filters.match_labels() {
        if node.labels.get(key) != Some(value) {
            return Err(AnalyzeError::Filter { label: key.clone() });
        }
    }

    for (property, bound) in filters.thresholds() {
        let bound = Quantity::parse(bound).map_err(|error| AnalyzeError::Parse {
            field: property.name(),
            error,
        })?;

        match node.property(property) {
            Some(actual) if actual >= bound => {}
            _ => {
                trace!(node = %node.name, property = property.name(), "node excluded by threshold");
                return Ok(false);
            }
        }
    }

    Ok(true)
}

/// Collect the nodes passing the filters, aborting on the first error
pub fn matching_nodes<'a>(
    nodes: &'a [ClusterNode],
    filters: Option<&FilterSpec>,
) -> Result<Vec<&'a ClusterNode>> {
    let mut matching = Vec::with_capacity(nodes.len());
    for node in nodes {
        if node_matches_filters(node, filters)? {
            matching.push(node);
        }
    }
    Ok(matching)
}
