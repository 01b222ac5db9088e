//! Migrate command implementation

use anyhow::Result;
use dbm_migrate::{migrate_with_listener, MigrateError, Migration, MigrationListener};

use crate::cli::{GlobalArgs, MigrateArgs};
use crate::commands::common::{busy_or, version_label};
use crate::context::RuntimeContext;

/// Prints one line per migration as it is applied.
struct ConsoleListener {
    verbose: bool,
}

impl MigrationListener for ConsoleListener {
    fn on_start(&self, schema: &str, stored: Option<u64>, pending: usize) {
        println!(
            "Schema '{}' at version {}, {} pending",
            schema,
            version_label(stored),
            pending
        );
    }

    fn before_apply(&self, migration: &Migration) {
        if self.verbose {
            eprintln!("[verbose] applying {}", migration.name());
        }
    }

    fn after_apply(&self, migration: &Migration) {
        println!("  ✓ {} (version {})", migration.name(), migration.version());
    }

    fn on_error(&self, migration: &Migration, _error: &MigrateError) {
        println!("  ✗ {} (version {})", migration.name(), migration.version());
    }
}

/// Execute the migrate command
pub(crate) fn execute(args: &MigrateArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = RuntimeContext::new(global)?;
    let config = ctx.migrate_config(
        args.scripts_dir.as_deref(),
        args.strategy.map(Into::into),
        args.allow_duplicates,
    );
    ctx.verbose(&format!(
        "database {}, scripts {}",
        ctx.database,
        ctx.scripts_dir(args.scripts_dir.as_deref()).display()
    ));

    let listener = ConsoleListener {
        verbose: ctx.verbose,
    };
    let report = migrate_with_listener(&ctx.db, &config, &listener).map_err(busy_or)?;

    if report.is_up_to_date() {
        println!("Schema '{}' is up to date", report.schema);
    } else {
        println!(
            "Applied {} migration(s): {} -> {}",
            report.applied.len(),
            version_label(report.previous),
            version_label(report.current)
        );
    }
    Ok(())
}
