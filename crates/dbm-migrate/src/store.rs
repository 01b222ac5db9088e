//! Version store backed by the `__dbmigrateinfo` metadata table.
//!
//! One row per schema holds the last applied version. On disk the value `-1`
//! means "never migrated"; callers only ever see `Option<u64>`.

use crate::error::{MigrateError, MigrateResult};
use dbm_db::{Database, DbError, SqlValue};

/// Name of the metadata table.
pub const MIGRATION_INFO_TABLE: &str = "__dbmigrateinfo";

/// Longest schema name the metadata table accepts.
pub const SCHEMA_NAME_MAX_LEN: usize = 100;

/// On-disk marker for a schema that has never been migrated.
const NEVER_MIGRATED: i64 = -1;

pub(crate) const CREATE_INFO_TABLE_SQL: &str = r#"CREATE TABLE IF NOT EXISTS "__dbmigrateinfo" (
    "schema" VARCHAR(100) PRIMARY KEY,
    "version" BIGINT NOT NULL
)"#;
pub(crate) const SELECT_VERSION_SQL: &str =
    r#"SELECT "version" FROM "__dbmigrateinfo" WHERE "schema" = ?"#;
pub(crate) const INSERT_VERSION_SQL: &str =
    r#"INSERT INTO "__dbmigrateinfo" ("schema", "version") VALUES (?, ?)"#;
pub(crate) const UPDATE_VERSION_SQL: &str =
    r#"UPDATE "__dbmigrateinfo" SET "version" = ? WHERE "schema" = ?"#;
pub(crate) const TABLE_EXISTS_SQL: &str =
    "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = ?";

/// Whether `table` exists, checked without creating anything.
pub(crate) fn table_exists(db: &dyn Database, table: &str) -> Result<bool, DbError> {
    let count = db.query_i64(TABLE_EXISTS_SQL, &[SqlValue::Text(table)])?;
    Ok(count.unwrap_or(0) > 0)
}

/// Reads and writes the stored version for schemas.
pub struct VersionStore<'a> {
    db: &'a dyn Database,
}

impl<'a> VersionStore<'a> {
    pub fn new(db: &'a dyn Database) -> Self {
        Self { db }
    }

    /// Create the metadata table if it does not exist.
    pub fn ensure_table(&self) -> MigrateResult<()> {
        self.db
            .execute_batch(CREATE_INFO_TABLE_SQL)
            .map_err(|e| store_error("create metadata table", "*", e))
    }

    /// Whether the metadata table has been created yet.
    pub fn has_table(&self) -> MigrateResult<bool> {
        table_exists(self.db, MIGRATION_INFO_TABLE)
            .map_err(|e| store_error("inspect metadata table", "*", e))
    }

    /// Return the stored version for `schema`, creating its record if absent.
    pub fn get_version(&self, schema: &str) -> MigrateResult<Option<u64>> {
        if let Some(raw) = self.read_raw(schema)? {
            return decode(schema, raw);
        }

        self.db
            .execute(
                INSERT_VERSION_SQL,
                &[SqlValue::Text(schema), SqlValue::Int(NEVER_MIGRATED)],
            )
            .map_err(|e| store_error("create version record", schema, e))?;
        log::debug!("Created version record for schema '{schema}'");
        Ok(None)
    }

    /// Return the stored version for `schema` without creating a record.
    pub fn peek_version(&self, schema: &str) -> MigrateResult<Option<u64>> {
        match self.read_raw(schema)? {
            Some(raw) => decode(schema, raw),
            None => Ok(None),
        }
    }

    /// Overwrite the stored version for `schema`.
    ///
    /// The record must already exist (see [`VersionStore::get_version`]).
    pub fn set_version(&self, schema: &str, version: u64) -> MigrateResult<()> {
        let value = i64::try_from(version).map_err(|_| MigrateError::InvalidConfig {
            message: format!("version {version} does not fit the metadata table"),
        })?;
        let updated = self
            .db
            .execute(
                UPDATE_VERSION_SQL,
                &[SqlValue::Int(value), SqlValue::Text(schema)],
            )
            .map_err(|e| store_error("record version", schema, e))?;
        if updated == 0 {
            return Err(store_error(
                "record version",
                schema,
                DbError::ExecutionError(format!(
                    "no row for schema '{schema}' in {MIGRATION_INFO_TABLE}"
                )),
            ));
        }
        Ok(())
    }

    fn read_raw(&self, schema: &str) -> MigrateResult<Option<i64>> {
        self.db
            .query_i64(SELECT_VERSION_SQL, &[SqlValue::Text(schema)])
            .map_err(|e| store_error("read version", schema, e))
    }
}

fn decode(schema: &str, raw: i64) -> MigrateResult<Option<u64>> {
    match raw {
        NEVER_MIGRATED => Ok(None),
        v if v < 0 => Err(MigrateError::CorruptVersion {
            schema: schema.to_string(),
            value: v,
        }),
        v => Ok(Some(v as u64)),
    }
}

/// Map a store failure, turning contention with a concurrent run into `Busy`.
fn store_error(operation: &'static str, schema: &str, source: DbError) -> MigrateError {
    if source.is_contention() {
        log::warn!("Version store contention on schema '{schema}': {source}");
        return MigrateError::Busy {
            schema: schema.to_string(),
        };
    }
    MigrateError::Store {
        operation,
        schema: schema.to_string(),
        source,
    }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
