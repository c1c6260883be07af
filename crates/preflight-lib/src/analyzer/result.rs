//! Analyzer results

use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_TITLE: &str = "Node Resources";
pub const ICON_KEY: &str = "kubernetes_node_resources";
pub const ICON_URI: &str = "https://troubleshoot.sh/images/analyzer-icons/node-resources.svg?w=16&h=18";

/// Verdict carried by an analyzer result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Fail,
    Warn,
    Pass,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Fail => "fail",
            Verdict::Warn => "warn",
            Verdict::Pass => "pass",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of evaluating one analyzer
///
/// A result without a verdict is inconclusive: no outcome matched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub icon_key: String,
    #[serde(default, skip_serializing_if = "String::is_empty", rename = "iconURI")]
    pub icon_uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verdict: Option<Verdict>,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "URI")]
    pub uri: Option<String>,
    /// Set when workload gating skipped the analyzer
    #[serde(skip)]
    pub skipped: bool,
}

impl AnalysisResult {
    /// Result for a node resources analyzer, before any outcome is applied
    pub fn node_resources(check_name: &str) -> Self {
        let title = if check_name.is_empty() {
            DEFAULT_TITLE
        } else {
            check_name
        };
        Self {
            title: title.to_string(),
            icon_key: ICON_KEY.to_string(),
            icon_uri: ICON_URI.to_string(),
            verdict: None,
            message: String::new(),
            uri: None,
            skipped: false,
        }
    }

    /// Synthetic failure standing in for an analyzer that errored
    pub fn analyzer_failed(message: impl Into<String>) -> Self {
        Self {
            title: "Analyzer Failed".to_string(),
            icon_key: String::new(),
            icon_uri: String::new(),
            verdict: Some(Verdict::Fail),
            message: message.into(),
            uri: None,
            skipped: false,
        }
    }

    pub fn is_fail(&self) -> bool {
        self.verdict == Some(Verdict::Fail)
    }

    pub fn is_warn(&self) -> bool {
        self.verdict == Some(Verdict::Warn)
    }

    pub fn is_pass(&self) -> bool {
        self.verdict == Some(Verdict::Pass)
    }

    pub fn is_inconclusive(&self) -> bool {
        self.verdict.is_none()
    }
}
