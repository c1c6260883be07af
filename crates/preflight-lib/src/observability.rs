//! Observability for preflight runs
//!
//! Provides:
//! - Prometheus metrics (evaluation latency, results by verdict, errors, skips,
//!   unsupported analyzers)
//! - Structured logging with tracing

use crate::analyzer::{AnalysisResult, Verdict};
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, Histogram, IntCounter,
    IntCounterVec, TextEncoder,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for analyzer latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.00005, 0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.5,
];

/// Global metrics instance (registered once)
///
/// `None` when registration failed, in which case recording is a no-op.
static GLOBAL_METRICS: OnceLock<Option<AnalyzerMetricsInner>> = OnceLock::new();

struct AnalyzerMetricsInner {
    evaluation_latency_seconds: Histogram,
    results_total: IntCounterVec,
    errors_total: IntCounter,
    skipped_total: IntCounter,
    unsupported_total: IntCounter,
}

impl AnalyzerMetricsInner {
    fn register() -> prometheus::Result<Self> {
        Ok(Self {
            evaluation_latency_seconds: register_histogram!(
                "preflight_analyzer_evaluation_latency_seconds",
                "Time spent evaluating a single analyzer",
                LATENCY_BUCKETS.to_vec()
            )?,

            results_total: register_int_counter_vec!(
                "preflight_analyzer_results_total",
                "Analyzer results by verdict",
                &["verdict"]
            )?,

            errors_total: register_int_counter!(
                "preflight_analyzer_errors_total",
                "Analyzers that aborted with an error"
            )?,

            skipped_total: register_int_counter!(
                "preflight_analyzer_skipped_total",
                "Analyzers skipped by workload gating"
            )?,

            unsupported_total: register_int_counter!(
                "preflight_analyzer_unsupported_total",
                "Analyzer entries of a type this tool does not evaluate"
            )?,
        })
    }
}

/// Label used for results that carry no verdict
const NO_VERDICT: &str = "none";

/// Analyzer metrics for Prometheus exposition
///
/// A lightweight handle to the global metrics instance; clones share the
/// same underlying metrics.
#[derive(Clone)]
pub struct AnalyzerMetrics {
    _private: (),
}

impl Default for AnalyzerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalyzerMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(|| match AnalyzerMetricsInner::register() {
            Ok(inner) => Some(inner),
            Err(e) => {
                warn!(error = %e, "Failed to register analyzer metrics");
                None
            }
        });
        Self { _private: () }
    }

    fn inner(&self) -> Option<&AnalyzerMetricsInner> {
        GLOBAL_METRICS.get().and_then(Option::as_ref)
    }

    pub fn observe_evaluation_latency(&self, duration_secs: f64) {
        if let Some(inner) = self.inner() {
            inner.evaluation_latency_seconds.observe(duration_secs);
        }
    }

    /// Count a completed result under its verdict label
    pub fn record_result(&self, result: &AnalysisResult) {
        let Some(inner) = self.inner() else {
            return;
        };
        let label = result.verdict.map_or(NO_VERDICT, |v| v.as_str());
        inner.results_total.with_label_values(&[label]).inc();
        if result.skipped {
            inner.skipped_total.inc();
        }
    }

    pub fn inc_errors(&self) {
        if let Some(inner) = self.inner() {
            inner.errors_total.inc();
        }
    }

    pub fn inc_unsupported(&self) {
        if let Some(inner) = self.inner() {
            inner.unsupported_total.inc();
        }
    }

    /// Current count of results recorded with `verdict`
    pub fn results_for(&self, verdict: Option<Verdict>) -> u64 {
        let label = verdict.map_or(NO_VERDICT, |v| v.as_str());
        self.inner()
            .map_or(0, |inner| inner.results_total.with_label_values(&[label]).get())
    }

    pub fn errors(&self) -> u64 {
        self.inner().map_or(0, |inner| inner.errors_total.get())
    }

    pub fn skipped(&self) -> u64 {
        self.inner().map_or(0, |inner| inner.skipped_total.get())
    }

    pub fn unsupported(&self) -> u64 {
        self.inner().map_or(0, |inner| inner.unsupported_total.get())
    }
}

/// Render every registered metric in the Prometheus text format
pub fn gather_text() -> prometheus::Result<String> {
    TextEncoder::new().encode_to_string(&prometheus::gather())
}

/// Structured logger for preflight events
///
/// Every event carries the bundle it was evaluated against so logs from
/// several runs can be told apart.
#[derive(Clone)]
pub struct StructuredLogger {
    bundle: String,
}

impl StructuredLogger {
    pub fn new(bundle: impl Into<String>) -> Self {
        Self {
            bundle: bundle.into(),
        }
    }

    pub fn log_analysis_started(&self, check_name: &str) {
        info!(
            event = "analysis_started",
            bundle = %self.bundle,
            check_name = %check_name,
            "Evaluating analyzer"
        );
    }

    pub fn log_analysis_completed(&self, result: &AnalysisResult, duration_secs: f64) {
        info!(
            event = "analysis_completed",
            bundle = %self.bundle,
            title = %result.title,
            verdict = result.verdict.map_or(NO_VERDICT, |v| v.as_str()),
            message = %result.message,
            duration_secs = duration_secs,
            "Analyzer completed"
        );
    }

    pub fn log_analysis_skipped(&self, kind: &str) {
        info!(
            event = "analysis_skipped",
            bundle = %self.bundle,
            analyzer = %kind,
            "Skipping unsupported analyzer"
        );
    }

    pub fn log_analysis_failed(&self, check_name: &str, error: &str) {
        warn!(
            event = "analysis_failed",
            bundle = %self.bundle,
            check_name = %check_name,
            error = %error,
            "Analyzer failed"
        );
    }

    /// Log the verdict totals of a whole run
    pub fn log_run_summary(&self, results: &[AnalysisResult]) {
        let count = |f: fn(&AnalysisResult) -> bool| results.iter().filter(|r| f(r)).count();
        let failed = count(AnalysisResult::is_fail);

        if failed > 0 {
            warn!(
                event = "run_completed",
                bundle = %self.bundle,
                total = results.len(),
                fail = failed,
                warn = count(AnalysisResult::is_warn),
                pass = count(AnalysisResult::is_pass),
                "Preflight run completed with failures"
            );
        } else {
            info!(
                event = "run_completed",
                bundle = %self.bundle,
                total = results.len(),
                fail = failed,
                warn = count(AnalysisResult::is_warn),
                pass = count(AnalysisResult::is_pass),
                "Preflight run completed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_handles_share_state() {
        let metrics = AnalyzerMetrics::new();
        let other = metrics.clone();

        let before = metrics.results_for(Some(Verdict::Pass));
        let mut result = AnalysisResult::node_resources("Nodes");
        result.verdict = Some(Verdict::Pass);
        other.record_result(&result);

        assert!(metrics.results_for(Some(Verdict::Pass)) > before);
    }

    #[test]
    fn test_skipped_results_are_counted_by_flag() {
        let metrics = AnalyzerMetrics::new();

        // A check whose own name starts with "Skipped: " was still evaluated
        let mut evaluated = AnalysisResult::node_resources("Skipped: legacy nodes");
        evaluated.verdict = Some(Verdict::Pass);
        let mut skipped = AnalysisResult::node_resources("Nodes");
        skipped.verdict = Some(Verdict::Warn);
        skipped.skipped = true;

        let before = metrics.skipped();
        metrics.record_result(&evaluated);
        metrics.record_result(&skipped);
        assert_eq!(metrics.skipped() - before, 1);
    }

    #[test]
    fn test_gather_text_exposes_metrics() {
        let metrics = AnalyzerMetrics::new();
        metrics.observe_evaluation_latency(0.001);
        metrics.inc_errors();

        let text = gather_text().unwrap();
        assert!(text.contains("preflight_analyzer_evaluation_latency_seconds"));
        assert!(text.contains("preflight_analyzer_errors_total"));
    }

    #[test]
    fn test_logger_accepts_every_event() {
        let logger = StructuredLogger::new("bundle-under-test");
        let result = AnalysisResult::analyzer_failed("boom");

        logger.log_analysis_started("Nodes");
        logger.log_analysis_completed(&result, 0.01);
        logger.log_analysis_skipped("clusterVersion");
        logger.log_analysis_failed("Nodes", "boom");
        logger.log_run_summary(&[result]);
    }
}
