//! Status command implementation

use anyhow::{Context, Result};
use dbm_migrate::{status, MigrationStatus};
use serde::Serialize;

use crate::cli::{GlobalArgs, StatusArgs, StatusOutput};
use crate::commands::common::{busy_or, print_table, version_label};
use crate::context::RuntimeContext;

/// JSON shape of `dbm status --output json`
#[derive(Debug, Serialize)]
struct StatusReport {
    schema: String,
    version: Option<u64>,
    locked: bool,
    pending: Vec<PendingMigration>,
}

#[derive(Debug, Serialize)]
struct PendingMigration {
    version: u64,
    name: String,
}

impl From<&MigrationStatus> for StatusReport {
    fn from(status: &MigrationStatus) -> Self {
        Self {
            schema: status.schema.clone(),
            version: status.stored,
            locked: status.locked,
            pending: status
                .pending
                .iter()
                .map(|m| PendingMigration {
                    version: m.version(),
                    name: m.name().to_string(),
                })
                .collect(),
        }
    }
}

/// Execute the status command
pub(crate) fn execute(args: &StatusArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = RuntimeContext::new(global)?;
    let config = ctx.migrate_config(args.scripts_dir.as_deref(), None, false);
    let current = status(&ctx.db, &config).map_err(busy_or)?;

    match args.output {
        StatusOutput::Table => print_status(&current),
        StatusOutput::Json => {
            let json = serde_json::to_string_pretty(&StatusReport::from(&current))
                .context("Failed to serialize to JSON")?;
            println!("{}", json);
        }
    }
    Ok(())
}

fn print_status(current: &MigrationStatus) {
    println!("Schema:  {}", current.schema);
    println!("Version: {}", version_label(current.stored));
    if current.locked {
        println!("Locked:  yes (run `dbm unlock` if no migration is in progress)");
    }

    if current.pending.is_empty() {
        println!("\nUp to date");
        return;
    }

    println!("\n{} pending migration(s):", current.pending.len());
    let rows: Vec<Vec<String>> = current
        .pending
        .iter()
        .map(|m| vec![m.version().to_string(), m.name().to_string()])
        .collect();
    print_table(&["VERSION", "NAME"], &rows);
}
