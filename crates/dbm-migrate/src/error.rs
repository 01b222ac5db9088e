//! Error types for the migration engine.

use dbm_db::DbError;
use thiserror::Error;

/// Migration engine errors.
///
/// Every variant is terminal for the current run; nothing is retried.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Script name does not start with a decimal version (MG001).
    #[error("[MG001] Invalid migration name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// Scripts location could not be listed or a script could not be read (MG002).
    #[error("[MG002] Failed to read migrations from {location}")]
    Discovery {
        location: String,
        #[source]
        source: std::io::Error,
    },

    /// Two migrations share a version and duplicates are rejected (MG003).
    #[error("[MG003] Duplicate migration version {version}: '{first}' and '{second}'")]
    DuplicateVersion {
        version: u64,
        first: String,
        second: String,
    },

    /// Metadata table could not be created, read, or written (MG004).
    #[error("[MG004] Version store failed to {operation} for schema '{schema}'")]
    Store {
        operation: &'static str,
        schema: String,
        #[source]
        source: DbError,
    },

    /// Stored version is negative but not the "never migrated" marker (MG005).
    #[error("[MG005] Corrupt version record for schema '{schema}': {value}")]
    CorruptVersion { schema: String, value: i64 },

    /// Another run holds the schema (MG006).
    #[error("[MG006] Schema '{schema}' is busy: another migration run holds it")]
    Busy { schema: String },

    /// Schema lock could not be established or released (MG007).
    #[error("[MG007] Failed to {operation} migration lock for schema '{schema}'")]
    Lock {
        operation: &'static str,
        schema: String,
        #[source]
        source: DbError,
    },

    /// A migration script failed to execute (MG008).
    #[error("[MG008] Migration {version} ('{name}') failed")]
    Apply {
        version: u64,
        name: String,
        #[source]
        source: DbError,
    },

    /// BEGIN or COMMIT of the enclosing transaction failed (MG009).
    #[error("[MG009] Migration transaction failed for schema '{schema}'")]
    Transaction {
        schema: String,
        #[source]
        source: DbError,
    },

    /// The run failed and so did the rollback (MG010).
    #[error("[MG010] {error}; rollback also failed: {rollback}")]
    RollbackFailed {
        #[source]
        error: Box<MigrateError>,
        rollback: DbError,
    },

    /// The run failed and so did releasing the schema lock (MG011).
    #[error("[MG011] {error}; releasing the migration lock also failed: {unlock}")]
    UnlockFailed {
        #[source]
        error: Box<MigrateError>,
        unlock: DbError,
    },

    /// Invalid engine configuration (MG012).
    #[error("[MG012] Invalid migration config: {message}")]
    InvalidConfig { message: String },
}

/// Result type alias for [`MigrateError`].
pub type MigrateResult<T> = Result<T, MigrateError>;

impl MigrateError {
    /// True when the run failed because another run holds the schema,
    /// including when that failure is wrapped by a cleanup error.
    pub fn is_busy(&self) -> bool {
        match self {
            MigrateError::Busy { .. } => true,
            MigrateError::RollbackFailed { error, .. } | MigrateError::UnlockFailed { error, .. } => {
                error.is_busy()
            }
            _ => false,
        }
    }

    /// Version of the migration that failed, if the failure was a script.
    pub fn failed_version(&self) -> Option<u64> {
        match self {
            MigrateError::Apply { version, .. } => Some(*version),
            MigrateError::RollbackFailed { error, .. } | MigrateError::UnlockFailed { error, .. } => {
                error.failed_version()
            }
            _ => None,
        }
    }
}
