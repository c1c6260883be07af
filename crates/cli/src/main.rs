//! Node resources preflight CLI
//!
//! A command-line tool for evaluating preflight checks against a collected
//! support bundle, inspecting its nodes, and trying out conditionals.

mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{eval, nodes, run};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Node resources preflight CLI
#[derive(Parser)]
#[command(name = "preflight")]
#[command(author, version, about = "Preflight checks for node resources", long_about = None)]
pub struct Cli {
    /// Support bundle directory (can also be set via PREFLIGHT_BUNDLE env var)
    #[arg(long, short, global = true)]
    pub bundle: Option<PathBuf>,

    /// Output format
    #[arg(long, short, global = true)]
    pub format: Option<output::OutputFormat>,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Evaluate a preflight spec against the bundle
    Run {
        /// Preflight spec file (.yaml, .yml or .json)
        spec: PathBuf,

        /// Evaluate analyzers concurrently
        #[arg(long)]
        parallel: bool,

        /// Write Prometheus metrics to this file after the run
        #[arg(long)]
        metrics_out: Option<PathBuf>,
    },

    /// List the nodes collected in the bundle
    Nodes,

    /// Evaluate a single conditional over the bundle's nodes
    Eval {
        /// Conditional such as "min(memoryCapacity) >= 8Gi" or "count() < 3"
        when: String,

        /// Only consider nodes with this label (key=value, repeatable); other nodes are left out
        #[arg(long, short = 'l')]
        selector: Vec<String>,
    },
}

fn init_tracing(verbose: bool, json: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// Execute the command, returning true when a preflight check failed
async fn execute(cli: Cli) -> Result<bool> {
    let config = config::Config::load()?;
    let bundle = config.bundle(cli.bundle);
    let format = config.format(cli.format)?;

    match cli.command {
        Commands::Run {
            spec,
            parallel,
            metrics_out,
        } => {
            let options = run::RunOptions {
                spec,
                bundle,
                parallel: parallel || config.parallel,
                metrics_out,
            };
            run::run_preflight(options, format).await
        }
        Commands::Nodes => nodes::list_nodes(&bundle, format).map(|_| false),
        Commands::Eval { when, selector } => {
            eval::eval_conditional(&bundle, &when, &selector, format).map(|_| false)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    match execute(cli).await {
        Ok(false) => ExitCode::SUCCESS,
        Ok(true) => ExitCode::from(1),
        Err(e) => {
            output::print_error(&format!("{:#}", e));
            ExitCode::from(2)
        }
    }
}
