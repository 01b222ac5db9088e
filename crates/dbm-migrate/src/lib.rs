//! Versioned SQL migration engine.
//!
//! Applies numbered SQL scripts to a schema exactly once each. The last
//! applied version is tracked per schema in `__dbmigrateinfo`, and a
//! concurrency guard keeps simultaneous runs from interleaving.
//!
//! ```no_run
//! use dbm_db::DuckDbBackend;
//! use dbm_migrate::{migrate, GuardStrategy, MigrateConfig, MigrationSource};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let db = DuckDbBackend::new("app.duckdb")?;
//! let config = MigrateConfig::new("app", MigrationSource::Directory("migrations".into()))
//!     .with_strategy(GuardStrategy::Transactional);
//! let report = migrate(&db, &config)?;
//! println!("now at {:?}", report.current);
//! # Ok(())
//! # }
//! ```

pub mod applicator;
pub mod config;
pub mod error;
pub mod guard;
pub mod migration;
pub mod source;
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;

pub use applicator::{
    force_unlock, migrate, migrate_with_listener, status, MigrationListener, MigrationReport,
    MigrationStatus, NoopListener,
};
pub use config::MigrateConfig;
pub use error::{MigrateError, MigrateResult};
pub use guard::{GuardStrategy, MIGRATION_LOCK_TABLE};
pub use migration::{parse_version, DuplicatePolicy, Migration};
pub use source::{discover, FsScriptDirectory, MigrationSource, ScriptDirectory, ScriptEntry};
pub use store::{VersionStore, MIGRATION_INFO_TABLE};
