//! Analyzer specifications
//!
//! Serde models for `nodeResources` analyzers and the `Preflight` document
//! that carries them. Documents load from YAML or JSON.

use crate::analyzer::Verdict;
use crate::error::SpecError;
use crate::models::NodeProperty;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::warn;

/// Label selector applied to nodes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSelector {
    #[serde(default)]
    pub match_label: BTreeMap<String, String>,
}

/// Clauses deciding which nodes an analyzer aggregates over
///
/// Threshold clauses are inclusive lower bounds written as quantity strings.
/// Empty strings count as absent clauses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<NodeSelector>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_capacity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_allocatable: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_capacity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_allocatable: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pod_capacity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pod_allocatable: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ephemeral_storage_capacity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ephemeral_storage_allocatable: Option<String>,
}

impl FilterSpec {
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.selector
            .get_or_insert_with(NodeSelector::default)
            .match_label
            .insert(key.into(), value.into());
        self
    }

    pub fn with_threshold(mut self, property: NodeProperty, bound: impl Into<String>) -> Self {
        *self.threshold_slot(property) = Some(bound.into());
        self
    }

    fn threshold_slot(&mut self, property: NodeProperty) -> &mut Option<String> {
        match property {
            NodeProperty::CpuCapacity => &mut self.cpu_capacity,
            NodeProperty::CpuAllocatable => &mut self.cpu_allocatable,
            NodeProperty::MemoryCapacity => &mut self.memory_capacity,
            NodeProperty::MemoryAllocatable => &mut self.memory_allocatable,
            NodeProperty::PodCapacity => &mut self.pod_capacity,
            NodeProperty::PodAllocatable => &mut self.pod_allocatable,
            NodeProperty::EphemeralStorageCapacity => &mut self.ephemeral_storage_capacity,
            NodeProperty::EphemeralStorageAllocatable => &mut self.ephemeral_storage_allocatable,
        }
    }

    /// Declared bound for a property, if any
    pub fn threshold(&self, property: NodeProperty) -> Option<&str> {
        let bound = match property {
            NodeProperty::CpuCapacity => &self.cpu_capacity,
            NodeProperty::CpuAllocatable => &self.cpu_allocatable,
            NodeProperty::MemoryCapacity => &self.memory_capacity,
            NodeProperty::MemoryAllocatable => &self.memory_allocatable,
            NodeProperty::PodCapacity => &self.pod_capacity,
            NodeProperty::PodAllocatable => &self.pod_allocatable,
            NodeProperty::EphemeralStorageCapacity => &self.ephemeral_storage_capacity,
            NodeProperty::EphemeralStorageAllocatable => &self.ephemeral_storage_allocatable,
        };
        bound.as_deref().filter(|b| !b.is_empty())
    }

    /// Declared bounds in evaluation order
    pub fn thresholds(&self) -> impl Iterator<Item = (NodeProperty, &str)> + '_ {
        NodeProperty::ALL
            .into_iter()
            .filter_map(|p| self.threshold(p).map(|bound| (p, bound)))
    }

    pub fn match_labels(&self) -> impl Iterator<Item = (&String, &String)> + '_ {
        self.selector.iter().flat_map(|s| s.match_label.iter())
    }
}

/// Payload of one outcome entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeBody {
    /// Conditional; empty means always true
    #[serde(default)]
    pub when: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

/// One entry of an ordered outcome list
///
/// Written as a single-key map: `{fail: {...}}`, `{warn: {...}}` or
/// `{pass: {...}}`. When several keys are present fail wins over warn and
/// warn over pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawOutcome", into = "RawOutcome")]
pub enum Outcome {
    Fail(OutcomeBody),
    Warn(OutcomeBody),
    Pass(OutcomeBody),
}

impl Outcome {
    pub fn fail(when: impl Into<String>, message: impl Into<String>) -> Self {
        Outcome::Fail(OutcomeBody {
            when: when.into(),
            message: message.into(),
            uri: None,
        })
    }

    pub fn warn(when: impl Into<String>, message: impl Into<String>) -> Self {
        Outcome::Warn(OutcomeBody {
            when: when.into(),
            message: message.into(),
            uri: None,
        })
    }

    pub fn pass(when: impl Into<String>, message: impl Into<String>) -> Self {
        Outcome::Pass(OutcomeBody {
            when: when.into(),
            message: message.into(),
            uri: None,
        })
    }

    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        let body = match &mut self {
            Outcome::Fail(b) | Outcome::Warn(b) | Outcome::Pass(b) => b,
        };
        body.uri = Some(uri.into());
        self
    }

    pub fn verdict(&self) -> Verdict {
        match self {
            Outcome::Fail(_) => Verdict::Fail,
            Outcome::Warn(_) => Verdict::Warn,
            Outcome::Pass(_) => Verdict::Pass,
        }
    }

    pub fn body(&self) -> &OutcomeBody {
        match self {
            Outcome::Fail(b) | Outcome::Warn(b) | Outcome::Pass(b) => b,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct RawOutcome {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fail: Option<OutcomeBody>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    warn: Option<OutcomeBody>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pass: Option<OutcomeBody>,
}

impl RawOutcome {
    /// Resolve the verdict, preferring fail over warn over pass
    fn into_outcome(self) -> Option<Outcome> {
        self.fail
            .map(Outcome::Fail)
            .or_else(|| self.warn.map(Outcome::Warn))
            .or_else(|| self.pass.map(Outcome::Pass))
    }
}

impl TryFrom<RawOutcome> for Outcome {
    type Error = String;

    fn try_from(raw: RawOutcome) -> Result<Self, Self::Error> {
        raw.into_outcome()
            .ok_or_else(|| "outcome must declare one of fail, warn or pass".into())
    }
}

/// Deserialize an outcome list, dropping entries that declare no verdict
fn outcome_list<'de, D>(deserializer: D) -> Result<Vec<Outcome>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<RawOutcome>::deserialize(deserializer)?;
    let total = raw.len();
    let outcomes: Vec<_> = raw.into_iter().filter_map(RawOutcome::into_outcome).collect();
    if outcomes.len() < total {
        warn!(
            skipped = total - outcomes.len(),
            "Ignoring outcome entries without fail, warn or pass"
        );
    }
    Ok(outcomes)
}

impl From<Outcome> for RawOutcome {
    fn from(outcome: Outcome) -> Self {
        let mut raw = RawOutcome {
            fail: None,
            warn: None,
            pass: None,
        };
        match outcome {
            Outcome::Fail(b) => raw.fail = Some(b),
            Outcome::Warn(b) => raw.warn = Some(b),
            Outcome::Pass(b) => raw.pass = Some(b),
        }
        raw
    }
}

/// Reference to a workload whose presence switches the analyzer body
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadRef {
    pub namespace: String,
    pub name: String,
}

/// Alternative filters and outcomes used by a gated analyzer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlternativeSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<FilterSpec>,
    #[serde(default, deserialize_with = "outcome_list")]
    pub outcomes: Vec<Outcome>,
}

/// Workload-existence gating
///
/// Gating is active only when `deployment` is set. `on_install` applies
/// when the workload is absent, `on_update` when it is present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatingSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment: Option<WorkloadRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_install: Option<AlternativeSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_update: Option<AlternativeSpec>,
}

/// A `nodeResources` analyzer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeResourcesSpec {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub check_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<FilterSpec>,
    #[serde(default, deserialize_with = "outcome_list")]
    pub outcomes: Vec<Outcome>,
    #[serde(flatten)]
    pub gating: GatingSpec,
}

/// One entry of a preflight analyzer list
///
/// Analyzer types this crate does not implement are kept verbatim in
/// `unsupported` and skipped by the runner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzerSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_resources: Option<NodeResourcesSpec>,
    #[serde(flatten)]
    pub unsupported: BTreeMap<String, serde_json::Value>,
}

impl AnalyzerSpec {
    /// Names of the analyzer types in this entry that are not evaluated
    pub fn unsupported_kinds(&self) -> impl Iterator<Item = &str> + '_ {
        self.unsupported.keys().map(String::as_str)
    }
}

impl From<NodeResourcesSpec> for AnalyzerSpec {
    fn from(spec: NodeResourcesSpec) -> Self {
        Self {
            node_resources: Some(spec),
            unsupported: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreflightBody {
    #[serde(default)]
    pub analyzers: Vec<AnalyzerSpec>,
}

/// A `Preflight` document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreflightSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default)]
    pub metadata: SpecMetadata,
    #[serde(default)]
    pub spec: PreflightBody,
}

impl From<Vec<AnalyzerSpec>> for PreflightSpec {
    fn from(analyzers: Vec<AnalyzerSpec>) -> Self {
        PreflightSpec {
            spec: PreflightBody { analyzers },
            ..Default::default()
        }
    }
}

impl PreflightSpec {
    /// Parse a YAML `Preflight` document or a bare list of analyzers
    pub fn from_yaml_str(content: &str) -> Result<Self, SpecError> {
        let value: serde_yaml::Value = serde_yaml::from_str(content)?;
        if value.is_sequence() {
            Ok(serde_yaml::from_value::<Vec<AnalyzerSpec>>(value)?.into())
        } else {
            Ok(serde_yaml::from_value(value)?)
        }
    }

    /// Parse a JSON `Preflight` document or a bare list of analyzers
    pub fn from_json_str(content: &str) -> Result<Self, SpecError> {
        let value: serde_json::Value = serde_json::from_str(content)?;
        if value.is_array() {
            Ok(serde_json::from_value::<Vec<AnalyzerSpec>>(value)?.into())
        } else {
            Ok(serde_json::from_value(value)?)
        }
    }

    /// Load a document, picking the format from the file extension
    pub fn load(path: &Path) -> Result<Self, SpecError> {
        let content = std::fs::read_to_string(path).map_err(|error| SpecError::Io {
            path: path.to_path_buf(),
            error,
        })?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml_str(&content),
            Some("json") => Self::from_json_str(&content),
            other => Err(SpecError::UnsupportedExtension(
                other.unwrap_or_default().to_string(),
            )),
        }
    }

    pub fn name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or("preflight")
    }

    pub fn analyzers(&self) -> &[AnalyzerSpec] {
        &self.spec.analyzers
    }
}
