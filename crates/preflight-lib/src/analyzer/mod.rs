//! Node resources analyzer
//!
//! Evaluates a `nodeResources` analyzer against collected node state:
//! - gating on the presence of a deployment
//! - filtering nodes by labels and resource thresholds
//! - aggregating over the matching nodes
//! - selecting the first outcome whose conditional holds

mod aggregate;
mod conditional;
mod filter;
mod gate;
mod outcome;
mod result;

#[cfg(test)]
mod tests;

pub use aggregate::{aggregate, AggregateFunction, AggregateValue};
pub use conditional::{evaluate_conditional, Conditional, Literal, Operator};
pub use filter::{matching_nodes, node_matches_filters};
pub use gate::{deployment_exists, resolve_gate, GateDecision};
pub use outcome::{apply_outcomes, select_outcome};
pub use result::{AnalysisResult, Verdict, DEFAULT_TITLE, ICON_KEY, ICON_URI};

use crate::error::Result;
use crate::models::decode_nodes;
use crate::spec::NodeResourcesSpec;
use crate::store::{BlobStore, NODES_KEY};
use tracing::debug;

/// Evaluate one `nodeResources` analyzer against a collected bundle
///
/// The node list must have been collected even when gating ends up skipping
/// the analyzer, but it is only decoded when evaluation goes ahead.
pub fn analyze_node_resources(
    spec: &NodeResourcesSpec,
    store: &dyn BlobStore,
) -> Result<AnalysisResult> {
    let payload = store.fetch(NODES_KEY)?;
    let mut result = AnalysisResult::node_resources(&spec.check_name);

    let (filters, outcomes) = match resolve_gate(spec, |w| deployment_exists(store, w))? {
        GateDecision::Evaluate { filters, outcomes } => (filters, outcomes),
        GateDecision::Skip { message } => {
            result.title = format!("Skipped: {}", result.title);
            result.verdict = Some(Verdict::Warn);
            result.message = message;
            result.skipped = true;
            return Ok(result);
        }
    };

    let nodes = decode_nodes(&payload)?;
    let matching = matching_nodes(&nodes, filters)?;
    debug!(
        title = %result.title,
        total_nodes = nodes.len(),
        matching_nodes = matching.len(),
        "Filtered nodes"
    );

    Ok(apply_outcomes(result, outcomes, &matching, nodes.len())?)
}
