//! `preflight run`: evaluate a preflight document against a bundle

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use preflight_lib::observability::gather_text;
use preflight_lib::{AnalysisResult, BlobStore, PreflightRunner, PreflightSpec};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tabled::Tabled;
use tracing::info;

use super::open_bundle;
use crate::output::{
    color_verdict, print_json, print_success, print_table, print_warning, OutputFormat,
};

/// Options for a preflight run
pub struct RunOptions {
    pub spec: PathBuf,
    pub bundle: PathBuf,
    pub parallel: bool,
    pub metrics_out: Option<PathBuf>,
}

/// JSON report of a run
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Report<'a> {
    name: &'a str,
    bundle: String,
    generated_at: DateTime<Utc>,
    results: &'a [AnalysisResult],
}

/// Row for the results table
#[derive(Tabled)]
struct ResultRow {
    #[tabled(rename = "Verdict")]
    verdict: String,
    #[tabled(rename = "Check")]
    title: String,
    #[tabled(rename = "Message")]
    message: String,
    #[tabled(rename = "URI")]
    uri: String,
}

/// Evaluate every analyzer and print the results
///
/// Returns true when any result failed.
pub async fn run_preflight(options: RunOptions, format: OutputFormat) -> Result<bool> {
    let spec = PreflightSpec::load(&options.spec)
        .with_context(|| format!("Failed to load preflight spec {}", options.spec.display()))?;
    let store = open_bundle(&options.bundle)?;
    let bundle = options.bundle.display().to_string();

    info!(
        spec = %spec.name(),
        bundle = %bundle,
        analyzers = spec.analyzers().len(),
        parallel = options.parallel,
        "Starting preflight run"
    );

    let runner = PreflightRunner::new(bundle.clone());
    let results = if options.parallel {
        let store: Arc<dyn BlobStore> = Arc::new(store);
        Arc::new(runner)
            .run_parallel(store, spec.analyzers().to_vec())
            .await
    } else {
        runner.run(&store, spec.analyzers())
    };

    if let Some(path) = &options.metrics_out {
        write_metrics(path)?;
    }

    match format {
        OutputFormat::Json => print_json(&Report {
            name: spec.name(),
            bundle,
            generated_at: Utc::now(),
            results: &results,
        })?,
        OutputFormat::Table => print_results(&results),
    }

    Ok(results.iter().any(AnalysisResult::is_fail))
}

fn print_results(results: &[AnalysisResult]) {
    let rows: Vec<ResultRow> = results
        .iter()
        .map(|r| ResultRow {
            verdict: color_verdict(r.verdict),
            title: r.title.clone(),
            message: r.message.clone(),
            uri: r.uri.clone().unwrap_or_default(),
        })
        .collect();
    print_table(rows, "No analyzers were evaluated");

    let failed = results.iter().filter(|r| r.is_fail()).count();
    let warned = results.iter().filter(|r| r.is_warn()).count();
    if failed > 0 {
        print_warning(&format!(
            "{} of {} checks failed, {} warned",
            failed,
            results.len(),
            warned
        ));
    } else if !results.is_empty() {
        print_success(&format!("{} checks completed, {} warned", results.len(), warned));
    }
}

fn write_metrics(path: &Path) -> Result<()> {
    let text = gather_text().context("Failed to encode metrics")?;
    std::fs::write(path, text)
        .with_context(|| format!("Failed to write metrics to {}", path.display()))
}
