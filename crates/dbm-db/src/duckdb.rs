//! DuckDB database backend implementation

use crate::error::{DbError, DbResult};
use crate::traits::{Database, SqlValue};
use duckdb::types::{ToSqlOutput, Value};
use duckdb::{params_from_iter, Connection, ToSql};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// DuckDB database backend
pub struct DuckDbBackend {
    conn: Mutex<Connection>,
}

impl DuckDbBackend {
    /// Create a new in-memory DuckDB connection
    pub fn in_memory() -> DbResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create a new DuckDB connection from a file path
    pub fn from_path(path: &Path) -> DbResult<Self> {
        log::debug!("Opening DuckDB database at {}", path.display());
        let conn = Connection::open(path)
            .map_err(|e| DbError::ConnectionError(format!("{e}: {}", path.display())))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create from path string (handles :memory: special case)
    pub fn new(path: &str) -> DbResult<Self> {
        if path == ":memory:" {
            Self::in_memory()
        } else {
            Self::from_path(Path::new(path))
        }
    }

    /// Open a second connection to the same database.
    ///
    /// The new handle has its own transaction context, which is what a
    /// concurrent migration run in the same process looks like to DuckDB.
    pub fn try_clone(&self) -> DbResult<Self> {
        let conn = self
            .lock()?
            .try_clone()
            .map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))
    }
}

impl ToSql for SqlValue<'_> {
    fn to_sql(&self) -> duckdb::Result<ToSqlOutput<'_>> {
        Ok(match *self {
            SqlValue::Text(s) => ToSqlOutput::Owned(Value::Text(s.to_string())),
            SqlValue::Int(i) => ToSqlOutput::Owned(Value::BigInt(i)),
        })
    }
}

impl Database for DuckDbBackend {
    fn execute_batch(&self, sql: &str) -> DbResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(sql).map_err(DbError::from)
    }

    fn execute(&self, sql: &str, params: &[SqlValue<'_>]) -> DbResult<usize> {
        let conn = self.lock()?;
        conn.execute(sql, params_from_iter(params.iter()))
            .map_err(DbError::from)
    }

    fn query_i64(&self, sql: &str, params: &[SqlValue<'_>]) -> DbResult<Option<i64>> {
        let conn = self.lock()?;
        match conn.query_row(sql, params_from_iter(params.iter()), |row| {
            row.get::<_, i64>(0)
        }) {
            Ok(value) => Ok(Some(value)),
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(DbError::from(e)),
        }
    }

    fn db_type(&self) -> &'static str {
        "duckdb"
    }
}

#[cfg(test)]
#[path = "duckdb_test.rs"]
mod tests;
