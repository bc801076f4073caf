//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print rows as a table, or the raw records as JSON
pub fn print_rows<T: Serialize, R: Tabled>(
    records: &[T],
    rows: impl FnOnce(&[T]) -> Vec<R>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => print_json(&records)?,
        OutputFormat::Table => {
            if records.is_empty() {
                print_warning("No items found");
                return Ok(());
            }
            let table = Table::new(rows(records)).with(Style::rounded()).to_string();
            println!("{}", table);
            println!("\nTotal: {}", records.len());
        }
    }
    Ok(())
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a bold section title with an underline
pub fn print_heading(title: &str) {
    println!("{}", title.bold());
    println!("{}", "=".repeat(50));
}

/// Print an aligned `label: value` line
pub fn print_field(label: &str, value: &str) {
    println!("{:<22} {}", format!("{}:", label), display_value(value));
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Absent values are shown as a dimmed dash
pub fn display_value(value: &str) -> String {
    if value.is_empty() {
        "-".dimmed().to_string()
    } else {
        value.to_string()
    }
}

/// Percentage cell colored by pressure
pub fn color_usage(value: &str) -> String {
    match value.parse::<f64>() {
        Ok(pct) if pct >= 90.0 => format!("{}%", value).red().to_string(),
        Ok(pct) if pct >= 70.0 => format!("{}%", value).yellow().to_string(),
        Ok(_) => format!("{}%", value).green().to_string(),
        Err(_) => display_value(value),
    }
}

/// Color node readiness
pub fn color_ready(ready: bool) -> String {
    if ready {
        "Ready".green().to_string()
    } else {
        "NotReady".red().to_string()
    }
}
