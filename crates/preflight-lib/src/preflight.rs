//! Preflight runner
//!
//! Evaluates every analyzer of a preflight document against one collected
//! bundle. An analyzer that errors is reported as a failed result so one
//! broken analyzer never hides the others.

use crate::analyzer::{analyze_node_resources, AnalysisResult};
use crate::error::Result;
use crate::observability::{AnalyzerMetrics, StructuredLogger};
use crate::spec::AnalyzerSpec;
use crate::store::BlobStore;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Evaluate one analyzer entry
///
/// Returns `None` for analyzer types that are not implemented.
pub fn analyze(spec: &AnalyzerSpec, store: &dyn BlobStore) -> Result<Option<AnalysisResult>> {
    match &spec.node_resources {
        Some(node_resources) => analyze_node_resources(node_resources, store).map(Some),
        None => Ok(None),
    }
}

/// Run analyzers against a bundle, reporting failures as results
pub struct PreflightRunner {
    metrics: AnalyzerMetrics,
    logger: StructuredLogger,
}

impl PreflightRunner {
    pub fn new(bundle: impl Into<String>) -> Self {
        Self {
            metrics: AnalyzerMetrics::new(),
            logger: StructuredLogger::new(bundle),
        }
    }

    /// Evaluate a single analyzer, turning errors into an `Analyzer Failed` result
    pub fn run_one(&self, spec: &AnalyzerSpec, store: &dyn BlobStore) -> Option<AnalysisResult> {
        // An entry may name unsupported kinds next to nodeResources
        for kind in spec.unsupported_kinds() {
            self.metrics.inc_unsupported();
            self.logger.log_analysis_skipped(kind);
        }
        let node_resources = spec.node_resources.as_ref()?;

        self.logger.log_analysis_started(&node_resources.check_name);
        let start = Instant::now();
        let outcome = analyze(spec, store);
        let elapsed = start.elapsed().as_secs_f64();
        self.metrics.observe_evaluation_latency(elapsed);

        let result = match outcome {
            Ok(result) => result?,
            Err(e) => {
                self.metrics.inc_errors();
                self.logger
                    .log_analysis_failed(&node_resources.check_name, &e.to_string());
                AnalysisResult::analyzer_failed(e.to_string())
            }
        };

        self.metrics.record_result(&result);
        self.logger.log_analysis_completed(&result, elapsed);
        Some(result)
    }

    /// Evaluate analyzers one after another in declaration order
    pub fn run(&self, store: &dyn BlobStore, analyzers: &[AnalyzerSpec]) -> Vec<AnalysisResult> {
        let results: Vec<_> = analyzers
            .iter()
            .filter_map(|spec| self.run_one(spec, store))
            .collect();
        self.logger.log_run_summary(&results);
        results
    }

    /// Evaluate analyzers concurrently on the blocking pool
    ///
    /// Results keep declaration order regardless of completion order.
    pub async fn run_parallel(
        self: Arc<Self>,
        store: Arc<dyn BlobStore>,
        analyzers: Vec<AnalyzerSpec>,
    ) -> Vec<AnalysisResult> {
        let handles: Vec<_> = analyzers
            .into_iter()
            .map(|spec| {
                let runner = Arc::clone(&self);
                let store = Arc::clone(&store);
                tokio::task::spawn_blocking(move || runner.run_one(&spec, store.as_ref()))
            })
            .collect();
        debug!(analyzers = handles.len(), "Spawned analyzer tasks");

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(Some(result)) => results.push(result),
                Ok(None) => {}
                Err(e) => {
                    self.metrics.inc_errors();
                    results.push(AnalysisResult::analyzer_failed(format!(
                        "analyzer task failed: {}",
                        e
                    )));
                }
            }
        }

        self.logger.log_run_summary(&results);
        results
    }
}

/// Run every analyzer sequentially against `store`
pub fn run_preflight(store: &dyn BlobStore, analyzers: &[AnalyzerSpec]) -> Vec<AnalysisResult> {
    PreflightRunner::new("bundle").run(store, analyzers)
}

/// Run every analyzer concurrently against `store`
pub async fn run_preflight_parallel(
    store: Arc<dyn BlobStore>,
    analyzers: Vec<AnalyzerSpec>,
) -> Vec<AnalysisResult> {
    Arc::new(PreflightRunner::new("bundle"))
        .run_parallel(store, analyzers)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::Verdict;
    use crate::spec::{NodeResourcesSpec, Outcome, PreflightSpec};
    use crate::store::{MemoryStore, NODES_KEY};

    const NODES: &str = r#"[
        {"metadata": {"name": "a"}, "status": {"capacity": {"cpu": "4", "memory": "8Gi"}}},
        {"metadata": {"name": "b"}, "status": {"capacity": {"cpu": "2", "memory": "8Gi"}}}
    ]"#;

    fn store() -> MemoryStore {
        MemoryStore::new().with_file(NODES_KEY, NODES)
    }

    fn analyzers() -> Vec<AnalyzerSpec> {
        let spec = PreflightSpec::from_yaml_str(
            r#"
spec:
  analyzers:
    - nodeResources:
        checkName: Node count
        outcomes:
          - pass:
              when: ">= 2"
              message: enough nodes
    - clusterVersion: {}
    - nodeResources:
        checkName: Broken
        outcomes:
          - fail:
              when: "min(cpuCapacity) !! 4"
              message: never
    - nodeResources:
        checkName: Small CPU
        outcomes:
          - fail:
              when: "min(cpuCapacity) < 4"
              message: a node has fewer than 4 cores
"#,
        )
        .unwrap();
        spec.analyzers().to_vec()
    }

    fn assert_expected(results: &[AnalysisResult]) {
        assert_eq!(results.len(), 3);

        assert_eq!(results[0].title, "Node count");
        assert_eq!(results[0].verdict, Some(Verdict::Pass));

        assert_eq!(results[1].title, "Analyzer Failed");
        assert!(results[1].is_fail());
        assert!(results[1].message.contains("failed to parse when"));

        assert_eq!(results[2].title, "Small CPU");
        assert!(results[2].is_fail());
    }

    #[test]
    fn test_analyze_skips_unsupported() {
        let spec = AnalyzerSpec::default();
        assert_eq!(analyze(&spec, &store()).unwrap(), None);
    }

    #[test]
    fn test_analyze_propagates_errors() {
        let spec = AnalyzerSpec::from(NodeResourcesSpec {
            outcomes: vec![Outcome::pass("", "ok")],
            ..Default::default()
        });
        assert!(analyze(&spec, &MemoryStore::new()).is_err());
    }

    #[test]
    fn test_sequential_run_reports_errors_as_results() {
        assert_expected(&run_preflight(&store(), &analyzers()));
    }

    #[tokio::test]
    async fn test_parallel_run_keeps_declaration_order() {
        let results = run_preflight_parallel(Arc::new(store()), analyzers()).await;
        assert_expected(&results);
    }

    #[tokio::test]
    async fn test_parallel_run_matches_sequential() {
        let sequential = run_preflight(&store(), &analyzers());
        let parallel = run_preflight_parallel(Arc::new(store()), analyzers()).await;
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_unsupported_kinds_beside_node_resources_are_reported() {
        let spec = PreflightSpec::from_yaml_str(
            r#"
- nodeResources:
    checkName: Node count
    outcomes:
      - pass:
          message: ok
  clusterVersion: {}
"#,
        )
        .unwrap();
        let entry = &spec.analyzers()[0];
        assert_eq!(entry.unsupported_kinds().collect::<Vec<_>>(), vec!["clusterVersion"]);

        let runner = PreflightRunner::new("mixed");
        let before = runner.metrics.unsupported();
        let result = runner.run_one(entry, &store()).unwrap();

        assert_eq!(result.title, "Node count");
        assert!(result.is_pass());
        assert!(runner.metrics.unsupported() > before);
    }

    #[test]
    fn test_outcome_entries_without_verdict_do_not_fail_the_run() {
        let spec = PreflightSpec::from_yaml_str(
            r#"
spec:
  analyzers:
    - nodeResources:
        checkName: Good
        outcomes:
          - pass:
              message: fine
    - nodeResources:
        checkName: Sloppy
        outcomes:
          - {}
          - pass:
              when: "count() == 2"
              message: two nodes
"#,
        )
        .unwrap();

        let results = run_preflight(&store(), spec.analyzers());
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(AnalysisResult::is_pass));
        assert_eq!(results[1].message, "two nodes");
    }

    #[test]
    fn test_missing_bundle_file_fails_each_analyzer() {
        let results = run_preflight(&MemoryStore::new(), &analyzers());
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(AnalysisResult::is_fail));
        assert!(results[0].message.contains("cluster-resources/nodes.json"));
    }
}
