//! Ordered outcome selection

use super::conditional::evaluate_conditional;
use super::result::AnalysisResult;
use crate::error::ConditionalError;
use crate::models::ClusterNode;
use crate::spec::Outcome;

/// Return the first outcome whose conditional holds
///
/// Outcomes are tried strictly in declaration order, whatever their verdict.
/// Later outcomes are never evaluated once one matches, so a malformed
/// conditional after the winning entry goes unnoticed.
pub fn select_outcome<'a>(
    outcomes: &'a [Outcome],
    matching: &[&ClusterNode],
    total_node_count: usize,
) -> Result<Option<&'a Outcome>, ConditionalError> {
    for outcome in outcomes {
        if evaluate_conditional(&outcome.body().when, matching, total_node_count)? {
            return Ok(Some(outcome));
        }
    }
    Ok(None)
}

/// Apply the first matching outcome to `result`
///
/// When nothing matches the result is returned without a verdict.
pub fn apply_outcomes(
    mut result: AnalysisResult,
    outcomes: &[Outcome],
    matching: &[&ClusterNode],
    total_node_count: usize,
) -> Result<AnalysisResult, ConditionalError> {
    if let Some(outcome) = select_outcome(outcomes, matching, total_node_count)? {
        let body = outcome.body();
        result.verdict = Some(outcome.verdict());
        result.message = body.message.clone();
        result.uri = body.uri.clone();
    }
    Ok(result)
}
