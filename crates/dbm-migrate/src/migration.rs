//! The migration value type and version parsing.

use crate::error::{MigrateError, MigrateResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single versioned SQL script.
///
/// The script body is opaque; it is handed to the database verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
    version: u64,
    name: String,
    script: String,
}

impl Migration {
    /// Create a migration supplied directly by the caller.
    ///
    /// The name defaults to the zero-padded version (`0007`).
    pub fn new(version: u64, script: impl Into<String>) -> Self {
        Self {
            version,
            name: format!("{version:04}"),
            script: script.into(),
        }
    }

    /// Create a migration from a named script, parsing the version from the
    /// leading digits of `name`.
    pub fn from_named(name: impl Into<String>, script: impl Into<String>) -> MigrateResult<Self> {
        let name = name.into();
        let version = parse_version(&name)?;
        Ok(Self::from_parts(version, name, script.into()))
    }

    pub(crate) fn from_parts(version: u64, name: String, script: String) -> Self {
        Self {
            version,
            name,
            script,
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn script(&self) -> &str {
        &self.script
    }
}

/// What to do when two migrations in one set share a version.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Fail before anything touches the database.
    #[default]
    Reject,
    /// Apply both; a stable sort keeps their supplied order.
    Allow,
}

/// Largest version that fits the metadata table's signed column.
pub const MAX_VERSION: u64 = i64::MAX as u64;

/// Extract the version from the leading ASCII decimal digits of `name`.
///
/// `0007_add_index.sql` parses as 7. The rest of the name is ignored.
pub fn parse_version(name: &str) -> MigrateResult<u64> {
    let invalid = |reason: &str| MigrateError::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.is_empty() {
        return Err(invalid("name is empty"));
    }

    let digits = name.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return Err(invalid("does not start with a number"));
    }

    match name[..digits].parse::<u64>() {
        Ok(version) if version <= MAX_VERSION => Ok(version),
        _ => Err(invalid("version number is too large")),
    }
}

/// Stable-sort migrations ascending by version.
///
/// Migrations with equal versions keep their relative order.
pub fn sort_migrations(migrations: &mut [Migration]) {
    migrations.sort_by_key(Migration::version);
}

/// Enforce `policy` and the version range on a migration set.
pub fn validate_migrations(migrations: &[Migration], policy: DuplicatePolicy) -> MigrateResult<()> {
    let mut seen: HashMap<u64, &str> = HashMap::with_capacity(migrations.len());
    for migration in migrations {
        if migration.version > MAX_VERSION {
            return Err(MigrateError::InvalidName {
                name: migration.name.clone(),
                reason: "version number is too large".to_string(),
            });
        }
        if let Some(first) = seen.insert(migration.version, &migration.name) {
            if policy == DuplicatePolicy::Reject {
                return Err(MigrateError::DuplicateVersion {
                    version: migration.version,
                    first: first.to_string(),
                    second: migration.name.clone(),
                });
            }
            log::warn!(
                "Migration version {} appears more than once ('{}', '{}')",
                migration.version,
                first,
                migration.name
            );
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "migration_test.rs"]
mod tests;
