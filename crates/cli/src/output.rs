//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use preflight_lib::{Quantity, Verdict};
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a rounded table, or a warning when there is nothing to show
pub fn print_table<T: Tabled>(rows: Vec<T>, empty_message: &str) {
    if rows.is_empty() {
        print_warning(empty_message);
        return;
    }
    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{}", table);
}

/// Print a value as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Color a verdict; results without one are shown as inconclusive
pub fn color_verdict(verdict: Option<Verdict>) -> String {
    match verdict {
        Some(Verdict::Pass) => "PASS".green().bold().to_string(),
        Some(Verdict::Warn) => "WARN".yellow().bold().to_string(),
        Some(Verdict::Fail) => "FAIL".red().bold().to_string(),
        None => "NONE".dimmed().to_string(),
    }
}

/// Color a boolean conditional result
pub fn color_bool(value: bool) -> String {
    if value {
        "true".green().to_string()
    } else {
        "false".red().to_string()
    }
}

/// Format an optional quantity, using `-` when it is absent
pub fn format_quantity(quantity: Option<Quantity>) -> String {
    quantity.map_or_else(|| "-".to_string(), |q| q.to_string())
}
