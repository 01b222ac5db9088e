//! Migration runner: loads, orders, and applies pending migrations.

use crate::config::{validate_schema_name, MigrateConfig};
use crate::error::{MigrateError, MigrateResult};
use crate::guard::{
    ensure_lock_table, is_locked, lock_table_exists, run_locked, run_transactional, GuardStrategy,
};
use crate::migration::{sort_migrations, validate_migrations, Migration};
use crate::store::VersionStore;
use dbm_db::Database;

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    pub schema: String,
    /// Stored version before the run.
    pub previous: Option<u64>,
    /// Stored version after the run.
    pub current: Option<u64>,
    /// Versions applied, in execution order.
    pub applied: Vec<u64>,
}

impl MigrationReport {
    pub fn is_up_to_date(&self) -> bool {
        self.applied.is_empty()
    }
}

/// Read-only view of where a schema stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    pub schema: String,
    pub stored: Option<u64>,
    /// Migrations a run would apply, in order.
    pub pending: Vec<Migration>,
    /// Whether an explicit-lock run currently holds the schema.
    pub locked: bool,
}

/// Progress hooks for a run. Every method defaults to doing nothing.
pub trait MigrationListener {
    fn on_start(&self, _schema: &str, _stored: Option<u64>, _pending: usize) {}

    fn before_apply(&self, _migration: &Migration) {}

    fn after_apply(&self, _migration: &Migration) {}

    fn on_error(&self, _migration: &Migration, _error: &MigrateError) {}
}

/// A listener that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopListener;

impl MigrationListener for NoopListener {}

/// How each migration's script and version update are committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StepMode {
    /// Inside the caller's enclosing transaction.
    Enclosed,
    /// In a short transaction of its own.
    OwnTransaction,
}

/// Apply every pending migration for `config.schema`.
pub fn migrate(db: &dyn Database, config: &MigrateConfig) -> MigrateResult<MigrationReport> {
    migrate_with_listener(db, config, &NoopListener)
}

/// Like [`migrate`], reporting progress to `listener`.
pub fn migrate_with_listener(
    db: &dyn Database,
    config: &MigrateConfig,
    listener: &dyn MigrationListener,
) -> MigrateResult<MigrationReport> {
    config.validate()?;
    let migrations = config.source.load()?;
    validate_migrations(&migrations, config.duplicates)?;

    let schema = config.schema.as_str();
    log::info!(
        "Migrating schema '{schema}' on {} ({} strategy, {} migration(s) found)",
        db.db_type(),
        config.strategy,
        migrations.len()
    );

    VersionStore::new(db).ensure_table()?;

    let report = match config.strategy {
        GuardStrategy::Transactional => run_transactional(db, schema, || {
            apply_migrations(db, schema, migrations, StepMode::Enclosed, listener)
        })?,
        GuardStrategy::ExplicitLock => {
            ensure_lock_table(db)?;
            run_locked(db, schema, || {
                apply_migrations(db, schema, migrations, StepMode::OwnTransaction, listener)
            })?
        }
    };

    log::info!(
        "Schema '{schema}' at version {} ({} migration(s) applied)",
        display_version(report.current),
        report.applied.len()
    );
    Ok(report)
}

/// Report the stored version and pending migrations without writing anything.
pub fn status(db: &dyn Database, config: &MigrateConfig) -> MigrateResult<MigrationStatus> {
    config.validate()?;
    let mut migrations = config.source.load()?;
    validate_migrations(&migrations, config.duplicates)?;

    // A database nothing has migrated yet has neither table.
    let store = VersionStore::new(db);
    let stored = if store.has_table()? {
        store.peek_version(&config.schema)?
    } else {
        None
    };
    let locked = lock_table_exists(db)? && is_locked(db, &config.schema)?;

    sort_migrations(&mut migrations);
    migrations.retain(|m| is_pending(m, stored));

    Ok(MigrationStatus {
        schema: config.schema.clone(),
        stored,
        pending: migrations,
        locked,
    })
}

/// Remove a stale explicit lock on `schema`. Returns whether one existed.
pub fn force_unlock(db: &dyn Database, schema: &str) -> MigrateResult<bool> {
    validate_schema_name(schema)?;
    crate::guard::force_unlock(db, schema)
}

/// Pending is judged against the version read at the start of the run, so
/// migrations sharing a version are all applied when that version is new.
fn is_pending(migration: &Migration, stored: Option<u64>) -> bool {
    stored.map_or(true, |v| migration.version() > v)
}

fn apply_migrations(
    db: &dyn Database,
    schema: &str,
    mut migrations: Vec<Migration>,
    mode: StepMode,
    listener: &dyn MigrationListener,
) -> MigrateResult<MigrationReport> {
    let store = VersionStore::new(db);
    let previous = store.get_version(schema)?;

    sort_migrations(&mut migrations);
    let pending: Vec<&Migration> = migrations
        .iter()
        .filter(|m| is_pending(m, previous))
        .collect();

    listener.on_start(schema, previous, pending.len());
    log::debug!(
        "Schema '{schema}' stored version {}, {} pending",
        display_version(previous),
        pending.len()
    );

    let mut current = previous;
    let mut applied = Vec::with_capacity(pending.len());
    for migration in pending {
        listener.before_apply(migration);
        log::debug!(
            "Applying migration {} ('{}')",
            migration.version(),
            migration.name()
        );

        let step = || {
            db.execute_batch(migration.script())
                .map_err(|source| MigrateError::Apply {
                    version: migration.version(),
                    name: migration.name().to_string(),
                    source,
                })?;
            store.set_version(schema, migration.version())
        };
        let result = match mode {
            StepMode::Enclosed => step(),
            StepMode::OwnTransaction => run_transactional(db, schema, step),
        };

        if let Err(err) = result {
            log::warn!(
                "Migration {} ('{}') failed: {err}",
                migration.version(),
                migration.name()
            );
            listener.on_error(migration, &err);
            return Err(err);
        }

        current = Some(migration.version());
        applied.push(migration.version());
        listener.after_apply(migration);
    }

    Ok(MigrationReport {
        schema: schema.to_string(),
        previous,
        current,
        applied,
    })
}

fn display_version(version: Option<u64>) -> String {
    version.map_or_else(|| "none".to_string(), |v| v.to_string())
}

#[cfg(test)]
#[path = "applicator_test.rs"]
mod tests;
