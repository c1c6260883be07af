//! Workload-existence gating
//!
//! A gated analyzer swaps in its `onUpdate` body when the referenced
//! deployment exists and its `onInstall` body when it does not. Without an
//! `onUpdate` body an existing deployment skips the analyzer with a warning;
//! without an `onInstall` body a missing deployment keeps the analyzer's own
//! filters and outcomes.

use crate::error::Result;
use crate::models::decode_deployments;
use crate::spec::{AlternativeSpec, FilterSpec, NodeResourcesSpec, Outcome, WorkloadRef};
use crate::store::{deployments_key, BlobStore};
use tracing::debug;

/// What the analyzer should do after gating
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision<'a> {
    /// Evaluate these filters and outcomes
    Evaluate {
        filters: Option<&'a FilterSpec>,
        outcomes: &'a [Outcome],
    },
    /// Skip evaluation and report a warning
    Skip { message: String },
}

impl<'a> From<&'a AlternativeSpec> for GateDecision<'a> {
    fn from(alternative: &'a AlternativeSpec) -> Self {
        GateDecision::Evaluate {
            filters: alternative.filters.as_ref(),
            outcomes: &alternative.outcomes,
        }
    }
}

/// Pick the filters and outcomes to evaluate
///
/// `workload_exists` is consulted only when the analyzer is gated; its
/// errors abort the analyzer.
pub fn resolve_gate<'a, F>(
    spec: &'a NodeResourcesSpec,
    workload_exists: F,
) -> Result<GateDecision<'a>>
where
    F: FnOnce(&WorkloadRef) -> Result<bool>,
{
    let own = GateDecision::Evaluate {
        filters: spec.filters.as_ref(),
        outcomes: &spec.outcomes,
    };

    let Some(workload) = spec.gating.deployment.as_ref() else {
        return Ok(own);
    };

    let exists = workload_exists(workload)?;
    debug!(
        namespace = %workload.namespace,
        deployment = %workload.name,
        exists,
        "Resolved analyzer gate"
    );

    if exists {
        Ok(match &spec.gating.on_update {
            Some(alternative) => alternative.into(),
            None => GateDecision::Skip {
                message: format!(
                    "Test skipped: Deployment {} found in the cluster, but no specs were found for updates, under 'onUpdate:' field",
                    workload.name
                ),
            },
        })
    } else {
        Ok(spec
            .gating
            .on_install
            .as_ref()
            .map_or(own, GateDecision::from))
    }
}

/// Whether a deployment was collected in its namespace
pub fn deployment_exists(store: &dyn BlobStore, workload: &WorkloadRef) -> Result<bool> {
    let payload = store.fetch(&deployments_key(&workload.namespace))?;
    let deployments = decode_deployments(&payload, &workload.namespace)?;
    Ok(deployments.iter().any(|d| d.name == workload.name))
}
