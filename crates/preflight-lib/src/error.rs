//! Error types for analyzer evaluation
//!
//! Every error aborts only the analyzer being evaluated. Callers that run
//! many analyzers turn them into failed results at the boundary.

use crate::quantity::QuantityError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = AnalyzeError> = std::result::Result<T, E>;

/// Errors raised while evaluating a single analyzer
#[derive(Debug, Error)]
pub enum AnalyzeError {
    /// A collected file could not be read
    #[error("failed to read collected file {key}: {reason}")]
    Fetch { key: String, reason: String },

    /// A collected payload was not valid structured data
    #[error("failed to unmarshal {what}: {reason}")]
    Decode { what: &'static str, reason: String },

    /// A filter threshold was not a valid quantity
    #[error("failed to parse {field} filter: {error}")]
    Parse {
        field: &'static str,
        error: QuantityError,
    },

    /// A node did not carry a label required by the selector
    #[error("failed to check if node matches filter: failed to match label {label}")]
    Filter { label: String },

    /// An outcome conditional could not be parsed or evaluated
    #[error("failed to parse when: {0}")]
    Conditional(ConditionalError),
}

// Causes are rendered inline and never exposed again through `source()`
impl From<ConditionalError> for AnalyzeError {
    fn from(err: ConditionalError) -> Self {
        AnalyzeError::Conditional(err)
    }
}

impl AnalyzeError {
    pub(crate) fn not_collected(key: &str) -> Self {
        AnalyzeError::Fetch {
            key: key.to_string(),
            reason: "file was not collected".to_string(),
        }
    }
}

/// A conditional that failed to parse or evaluate
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to evaluate {conditional:?}: {kind}")]
pub struct ConditionalError {
    pub conditional: String,
    pub kind: ConditionalErrorKind,
}

impl ConditionalError {
    pub fn new(conditional: impl Into<String>, kind: ConditionalErrorKind) -> Self {
        Self {
            conditional: conditional.into(),
            kind,
        }
    }

    /// True when the expression itself is malformed, as opposed to failing
    /// against the data it was evaluated over
    pub fn is_parse_error(&self) -> bool {
        self.kind.is_parse_error()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConditionalErrorKind {
    #[error("unable to parse nodeResources conditional")]
    Malformed,

    #[error("conditional does not match pattern of function(property?)")]
    Pattern,

    #[error("unexpected operator {0:?} in nodeResources conditional")]
    UnknownOperator(String),

    #[error("unknown function {0:?}")]
    UnknownFunction(String),

    #[error("cannot compare a count with quantity {0:?}")]
    TypeMismatch(String),

    #[error("no matching node reports {0:?}")]
    NoValue(String),

    #[error("invalid quantity: {0}")]
    Quantity(QuantityError),
}

impl From<QuantityError> for ConditionalErrorKind {
    fn from(err: QuantityError) -> Self {
        ConditionalErrorKind::Quantity(err)
    }
}

impl ConditionalErrorKind {
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            ConditionalErrorKind::Malformed
                | ConditionalErrorKind::Pattern
                | ConditionalErrorKind::UnknownOperator(_)
        )
    }
}

/// Errors raised while loading analyzer specifications
#[derive(Debug, Error)]
pub enum SpecError {
    #[error("failed to read spec {path}: {error}")]
    Io {
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("invalid YAML spec: {0}")]
    Yaml(serde_yaml::Error),

    #[error("invalid JSON spec: {0}")]
    Json(serde_json::Error),

    #[error("unsupported spec file extension {0:?}, expected .yaml, .yml or .json")]
    UnsupportedExtension(String),
}

impl From<serde_yaml::Error> for SpecError {
    fn from(err: serde_yaml::Error) -> Self {
        SpecError::Yaml(err)
    }
}

impl From<serde_json::Error> for SpecError {
    fn from(err: serde_json::Error) -> Self {
        SpecError::Json(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    /// Render an error the way `anyhow`'s `{:#}` does: each cause, joined by ": "
    fn report(err: &dyn std::error::Error) -> String {
        let mut parts = vec![err.to_string()];
        let mut cause = err.source();
        while let Some(err) = cause {
            parts.push(err.to_string());
            cause = err.source();
        }
        parts.join(": ")
    }

    #[test]
    fn test_conditional_cause_reported_once() {
        let quantity = QuantityError::InvalidNumber("lots".into());
        let kind = ConditionalErrorKind::from(quantity.clone());
        let err = AnalyzeError::from(ConditionalError::new("min(cpuCapacity) < lots", kind));

        let text = report(&err);
        assert!(text.starts_with("failed to parse when: failed to evaluate"));
        assert_eq!(text.matches(&quantity.to_string()).count(), 1);
    }

    #[test]
    fn test_filter_parse_cause_reported_once() {
        let quantity = QuantityError::InvalidNumber("lots".into());
        let err = AnalyzeError::Parse {
            field: "memoryCapacity",
            error: quantity.clone(),
        };
        assert!(err.source().is_none());
        assert_eq!(report(&err).matches(&quantity.to_string()).count(), 1);
    }

    #[test]
    fn test_spec_load_causes_reported_once() {
        let yaml = serde_yaml::from_str::<Vec<u32>>("{").unwrap_err();
        let yaml_text = yaml.to_string();
        let err = SpecError::from(yaml);
        assert_eq!(report(&err).matches(&yaml_text).count(), 1);

        let json = serde_json::from_str::<Vec<u32>>("{").unwrap_err();
        let json_text = json.to_string();
        let err = SpecError::from(json);
        assert_eq!(report(&err).matches(&json_text).count(), 1);

        let err = SpecError::Io {
            path: "missing.yaml".into(),
            error: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        };
        assert_eq!(report(&err).matches("no such file").count(), 1);
    }
}
