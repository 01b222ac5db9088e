//! Shared utilities for CLI commands

use dbm_migrate::MigrateError;
use std::fmt;

/// Exit status when another run holds the schema.
pub(crate) const EXIT_BUSY: u8 = 2;

/// Error type representing a non-zero process exit code.
///
/// Commands return `Err(ExitCode(N).into())` after printing their own
/// diagnostics, and `main` turns it into the process status.
#[derive(Debug)]
pub(crate) struct ExitCode(pub(crate) u8);

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "")
    }
}

impl std::error::Error for ExitCode {}

/// Print a busy schema as a retryable condition and map it to [`EXIT_BUSY`].
/// Any other engine error is passed through for `main` to report.
pub(crate) fn busy_or(err: MigrateError) -> anyhow::Error {
    if err.is_busy() {
        eprintln!("{err}");
        eprintln!("Another migration run holds this schema; retry once it finishes.");
        ExitCode(EXIT_BUSY).into()
    } else {
        err.into()
    }
}

/// Render an optional stored version for humans.
pub(crate) fn version_label(version: Option<u64>) -> String {
    match version {
        Some(v) => v.to_string(),
        None => "none".to_string(),
    }
}

/// Print rows as a left-aligned table with a dashed header rule.
pub(crate) fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            rows.iter()
                .filter_map(|row| row.get(i))
                .map(|cell| cell.chars().count())
                .fold(h.chars().count(), usize::max)
        })
        .collect();

    let render = |cells: Vec<String>| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, &w)| format!("{:<width$}", cell, width = w))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    println!("{}", render(headers.iter().map(|h| h.to_string()).collect()));
    println!(
        "{}",
        widths
            .iter()
            .map(|&w| "-".repeat(w))
            .collect::<Vec<_>>()
            .join("  ")
    );
    for row in rows {
        println!("{}", render(row.clone()));
    }
}
