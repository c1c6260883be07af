//! `preflight eval`: evaluate one conditional over the collected nodes

use anyhow::{anyhow, Context, Result};
use preflight_lib::analyzer::{evaluate_conditional, Conditional};
use preflight_lib::ClusterNode;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

use super::{load_nodes, open_bundle};
use crate::output::{color_bool, print_info, print_json, OutputFormat};

/// JSON result of an evaluation
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Evaluation<'a> {
    conditional: &'a str,
    matching_nodes: usize,
    total_nodes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    actual: Option<String>,
    result: bool,
}

/// Label selector for `preflight eval`
///
/// Unlike an analyzer's `matchLabel` filter, which fails the analyzer when
/// any node lacks a label, nodes that do not carry every label are simply
/// left out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSelector {
    labels: BTreeMap<String, String>,
}

impl LabelSelector {
    /// Parse repeated `key=value` arguments
    pub fn parse(selectors: &[String]) -> Result<Self> {
        let labels = selectors
            .iter()
            .map(|selector| {
                selector
                    .split_once('=')
                    .map(|(key, value)| (key.to_string(), value.to_string()))
                    .ok_or_else(|| anyhow!("Invalid selector {:?}, expected key=value", selector))
            })
            .collect::<Result<_>>()?;
        Ok(Self { labels })
    }

    pub fn matches(&self, node: &ClusterNode) -> bool {
        self.labels
            .iter()
            .all(|(key, value)| node.labels.get(key) == Some(value))
    }

    pub fn select<'a>(&self, nodes: &'a [ClusterNode]) -> Vec<&'a ClusterNode> {
        nodes.iter().filter(|node| self.matches(node)).collect()
    }
}

/// Evaluate `conditional` over the bundle's nodes
pub fn eval_conditional(
    bundle: &Path,
    conditional: &str,
    selectors: &[String],
    format: OutputFormat,
) -> Result<()> {
    let selector = LabelSelector::parse(selectors)?;
    let store = open_bundle(bundle)?;
    let nodes = load_nodes(&store)?;
    let matching = selector.select(&nodes);

    let result = evaluate_conditional(conditional, &matching, nodes.len())
        .with_context(|| format!("Failed to evaluate {:?}", conditional))?;
    let actual = if conditional.is_empty() {
        None
    } else {
        Conditional::parse(conditional)?
            .actual(&matching)
            .ok()
            .map(|value| value.to_string())
    };

    match format {
        OutputFormat::Json => print_json(&Evaluation {
            conditional,
            matching_nodes: matching.len(),
            total_nodes: nodes.len(),
            actual,
            result,
        })?,
        OutputFormat::Table => {
            print_info(&format!(
                "{} of {} nodes matched the selector",
                matching.len(),
                nodes.len()
            ));
            if let Some(actual) = actual {
                println!("Actual value: {}", actual);
            }
            println!("{} => {}", conditional, color_bool(result));
        }
    }

    Ok(())
}
