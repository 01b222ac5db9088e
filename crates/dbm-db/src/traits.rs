//! Database trait definition

use crate::error::{DbError, DbResult};

/// A bind parameter for [`Database::execute`] and [`Database::query_i64`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlValue<'a> {
    Text(&'a str),
    Int(i64),
}

/// Database-client capability handed to the migration engine.
///
/// The engine never opens connections itself; callers construct a backend
/// and pass it in. Implementations must be Send + Sync so a handle can be
/// shared across threads.
pub trait Database: Send + Sync {
    /// Execute one or more statements with no parameters
    fn execute_batch(&self, sql: &str) -> DbResult<()>;

    /// Execute a single parameterized statement, returns affected rows
    fn execute(&self, sql: &str, params: &[SqlValue<'_>]) -> DbResult<usize>;

    /// Read the first column of the first row as an integer.
    ///
    /// Returns `Ok(None)` when the query produced no rows.
    fn query_i64(&self, sql: &str, params: &[SqlValue<'_>]) -> DbResult<Option<i64>>;

    /// Database type identifier for logging
    fn db_type(&self) -> &'static str;

    /// Open an explicit transaction on this handle
    fn begin(&self) -> DbResult<()> {
        self.execute_batch("BEGIN TRANSACTION")
            .map_err(|e| transaction_error("BEGIN", e))
    }

    /// Commit the open transaction
    fn commit(&self) -> DbResult<()> {
        self.execute_batch("COMMIT")
            .map_err(|e| transaction_error("COMMIT", e))
    }

    /// Roll back the open transaction
    fn rollback(&self) -> DbResult<()> {
        self.execute_batch("ROLLBACK")
            .map_err(|e| transaction_error("ROLLBACK", e))
    }
}

/// Wrap a failed transaction-control statement, keeping contention
/// distinguishable from other failures.
///
/// A duplicate key reported while committing means a concurrent session
/// committed the same key first, so it is reported as a conflict.
fn transaction_error(stmt: &str, err: DbError) -> DbError {
    if err.is_contention() {
        return DbError::TransactionConflict(format!("{stmt} failed: {err}"));
    }
    DbError::TransactionError(format!("{stmt} failed: {err}"))
}

#[cfg(test)]
#[path = "traits_test.rs"]
mod tests;
