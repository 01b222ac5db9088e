//! Runtime context for CLI commands

use anyhow::{bail, Context, Result};
use dbm_db::DuckDbBackend;
use dbm_migrate::{DuplicatePolicy, GuardStrategy, MigrateConfig, MigrationSource};
use std::path::{Path, PathBuf};

use crate::cli::GlobalArgs;
use crate::config::{Config, ConfigError};

/// Settings resolved from flags, environment, config file and defaults,
/// plus an open database connection.
pub(crate) struct RuntimeContext {
    /// Directory that relative paths resolve against
    pub project_dir: PathBuf,

    /// Project config file, when one was found
    pub config: Option<Config>,

    /// Resolved database path
    pub database: String,

    /// Resolved schema name
    pub schema: String,

    /// Database connection
    pub db: DuckDbBackend,

    /// Verbose output enabled
    pub verbose: bool,
}

impl RuntimeContext {
    /// Create a new runtime context from global arguments
    pub fn new(args: &GlobalArgs) -> Result<Self> {
        let project_dir = PathBuf::from(&args.project_dir);

        let config = if let Some(config_path) = &args.config {
            Some(Config::load(Path::new(config_path)).context("Failed to load configuration file")?)
        } else {
            match Config::load_from_dir(&project_dir) {
                Ok(config) => Some(config),
                Err(ConfigError::NotFound { .. }) => None,
                Err(e) => return Err(e).context("Failed to load project configuration"),
            }
        };

        let Some(database) = args
            .database
            .clone()
            .or_else(|| config.as_ref().map(|c| c.database.clone()))
        else {
            bail!("No database given: pass --database, set DBM_DATABASE, or add dbmigrate.yml");
        };
        let Some(schema) = args
            .schema
            .clone()
            .or_else(|| config.as_ref().map(|c| c.schema.clone()))
        else {
            bail!("No schema given: pass --schema, set DBM_SCHEMA, or add dbmigrate.yml");
        };

        let db_path = if database == ":memory:" {
            database
        } else {
            project_dir.join(&database).display().to_string()
        };
        let db = DuckDbBackend::new(&db_path)
            .with_context(|| format!("Failed to connect to database {db_path}"))?;
        log::debug!(
            "Resolved schema '{schema}' on {db_path} (config file: {})",
            if config.is_some() { "yes" } else { "no" }
        );

        Ok(Self {
            project_dir,
            config,
            database: db_path,
            schema,
            db,
            verbose: args.verbose,
        })
    }

    /// Print verbose output if enabled
    pub fn verbose(&self, msg: &str) {
        if self.verbose {
            eprintln!("[verbose] {}", msg);
        }
    }

    /// Scripts directory: the flag or env value, then the config file, then `migrations`
    pub fn scripts_dir(&self, override_dir: Option<&str>) -> PathBuf {
        let dir = override_dir
            .or_else(|| self.config.as_ref().map(|c| c.scripts_dir.as_str()))
            .unwrap_or("migrations");
        self.project_dir.join(dir)
    }

    /// Build the engine configuration for a run
    pub fn migrate_config(
        &self,
        scripts_dir: Option<&str>,
        strategy: Option<GuardStrategy>,
        allow_duplicates: bool,
    ) -> MigrateConfig {
        let strategy = strategy
            .or_else(|| self.config.as_ref().map(|c| c.strategy))
            .unwrap_or_default();
        let allow_duplicates = allow_duplicates
            || self
                .config
                .as_ref()
                .is_some_and(|c| c.allow_duplicate_versions);
        let duplicates = if allow_duplicates {
            DuplicatePolicy::Allow
        } else {
            DuplicatePolicy::Reject
        };

        MigrateConfig::new(
            self.schema.clone(),
            MigrationSource::Directory(self.scripts_dir(scripts_dir)),
        )
        .with_strategy(strategy)
        .with_duplicates(duplicates)
    }
}
