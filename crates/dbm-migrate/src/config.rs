//! Configuration bundle for a migration run.

use crate::error::{MigrateError, MigrateResult};
use crate::guard::GuardStrategy;
use crate::migration::DuplicatePolicy;
use crate::source::MigrationSource;
use crate::store::SCHEMA_NAME_MAX_LEN;

/// Everything a run needs apart from the database handle, which is passed
/// separately so the engine holds no connection state of its own.
#[derive(Debug, Clone)]
pub struct MigrateConfig {
    /// Schema (tenant) whose version is tracked.
    pub schema: String,

    /// Where migrations come from.
    pub source: MigrationSource,

    /// Mutual-exclusion strategy, which also fixes the failure contract.
    pub strategy: GuardStrategy,

    /// Policy for repeated versions within one migration set.
    pub duplicates: DuplicatePolicy,
}

impl MigrateConfig {
    pub fn new(schema: impl Into<String>, source: MigrationSource) -> Self {
        Self {
            schema: schema.into(),
            source,
            strategy: GuardStrategy::default(),
            duplicates: DuplicatePolicy::default(),
        }
    }

    pub fn with_strategy(mut self, strategy: GuardStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_duplicates(mut self, duplicates: DuplicatePolicy) -> Self {
        self.duplicates = duplicates;
        self
    }

    /// Check the schema name fits the metadata table.
    pub fn validate(&self) -> MigrateResult<()> {
        validate_schema_name(&self.schema)
    }
}

pub(crate) fn validate_schema_name(schema: &str) -> MigrateResult<()> {
    if schema.trim().is_empty() {
        return Err(MigrateError::InvalidConfig {
            message: "schema name cannot be empty".to_string(),
        });
    }
    if schema.chars().count() > SCHEMA_NAME_MAX_LEN {
        return Err(MigrateError::InvalidConfig {
            message: format!(
                "schema name '{schema}' exceeds {SCHEMA_NAME_MAX_LEN} characters"
            ),
        });
    }
    Ok(())
}
