//! Error types for dbm-db

use thiserror::Error;

/// Database operation errors
#[derive(Error, Debug)]
pub enum DbError {
    /// Connection error (D001)
    #[error("[D001] Database connection failed: {0}")]
    ConnectionError(String),

    /// Query execution error (D002)
    #[error("[D002] SQL execution failed: {0}")]
    ExecutionError(String),

    /// Primary key or unique constraint violated (D003)
    #[error("[D003] Constraint violated: {0}")]
    ConstraintViolation(String),

    /// Write-write conflict with a concurrent transaction (D004)
    #[error("[D004] Transaction conflict: {0}")]
    TransactionConflict(String),

    /// BEGIN / COMMIT / ROLLBACK failed (D005)
    #[error("[D005] Transaction control failed: {0}")]
    TransactionError(String),

    /// Mutex poisoned (D006)
    #[error("[D006] Database mutex poisoned: {0}")]
    MutexPoisoned(String),
}

/// Result type alias for DbError
pub type DbResult<T> = Result<T, DbError>;

impl DbError {
    /// True when the failure was caused by another session holding the same
    /// row, key, or transaction.
    pub fn is_contention(&self) -> bool {
        matches!(
            self,
            DbError::ConstraintViolation(_) | DbError::TransactionConflict(_)
        )
    }

    /// Classify a driver error message.
    ///
    /// duckdb::Error carries no structured variant for these, so this goes
    /// by message text. Syntax and catalog errors stay `ExecutionError`.
    pub fn classify(msg: String) -> Self {
        if msg.contains("Constraint Error")
            || msg.contains("Duplicate key")
            || msg.contains("duplicate key")
        {
            DbError::ConstraintViolation(msg)
        } else if msg.contains("write-write conflict")
            || msg.contains("Conflict on")
            || (msg.contains("TransactionContext Error") && msg.contains("onflict"))
        {
            DbError::TransactionConflict(msg)
        } else {
            DbError::ExecutionError(msg)
        }
    }
}

impl From<duckdb::Error> for DbError {
    fn from(err: duckdb::Error) -> Self {
        DbError::classify(err.to_string())
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
