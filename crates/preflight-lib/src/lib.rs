//! Node resources preflight analyzer
//!
//! This crate provides the core functionality for:
//! - Kubernetes resource quantities
//! - Reading collected cluster state from a support bundle
//! - Filtering nodes and aggregating their capacity
//! - Evaluating outcome conditionals and workload gating
//! - Running preflight documents with metrics and structured logs

pub mod analyzer;
pub mod error;
pub mod models;
pub mod observability;
pub mod preflight;
pub mod quantity;
pub mod spec;
pub mod store;

pub use analyzer::{analyze_node_resources, AnalysisResult, Verdict};
pub use error::{AnalyzeError, ConditionalError, ConditionalErrorKind, SpecError};
pub use models::*;
pub use observability::{AnalyzerMetrics, StructuredLogger};
pub use preflight::{analyze, run_preflight, run_preflight_parallel, PreflightRunner};
pub use quantity::{Quantity, QuantityError, QuantityFormat};
pub use spec::{AnalyzerSpec, NodeResourcesSpec, PreflightSpec};
pub use store::{BlobStore, DirectoryStore, MemoryStore};
