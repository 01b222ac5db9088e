//! In-memory fake of the database capability for engine unit tests.
//!
//! Understands exactly the statements the version store and lock guard
//! issue; every other batch is treated as a migration script and recorded.

use crate::guard::{
    ACQUIRE_LOCK_SQL, CREATE_LOCK_TABLE_SQL, LOCK_HELD_SQL, MIGRATION_LOCK_TABLE, RELEASE_LOCK_SQL,
};
use crate::store::{
    CREATE_INFO_TABLE_SQL, INSERT_VERSION_SQL, MIGRATION_INFO_TABLE, SELECT_VERSION_SQL,
    TABLE_EXISTS_SQL, UPDATE_VERSION_SQL,
};
use dbm_db::{Database, DbError, DbResult, SqlValue};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

#[derive(Debug, Default, Clone)]
struct Data {
    tables: BTreeSet<&'static str>,
    versions: BTreeMap<String, i64>,
    locks: BTreeSet<String>,
}

#[derive(Debug, Default)]
struct State {
    data: Data,
    snapshot: Option<Data>,
    executed: Vec<String>,
    events: Vec<&'static str>,
}

#[derive(Debug, Default)]
pub(crate) struct FakeDatabase {
    state: Mutex<State>,
    failing_scripts: BTreeSet<String>,
    fail_rollback: bool,
    fail_release: bool,
    commit_failure: Option<fn(String) -> DbError>,
}

impl FakeDatabase {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Make `script` fail when executed.
    pub(crate) fn failing_on(mut self, script: &str) -> Self {
        self.failing_scripts.insert(script.to_string());
        self
    }

    pub(crate) fn with_failing_rollback(mut self) -> Self {
        self.fail_rollback = true;
        self
    }

    pub(crate) fn with_failing_release(mut self) -> Self {
        self.fail_release = true;
        self
    }

    /// Fail COMMIT with a write-write conflict.
    pub(crate) fn with_commit_conflict(mut self) -> Self {
        self.commit_failure = Some(DbError::TransactionConflict);
        self
    }

    /// Fail COMMIT the way DuckDB does when a concurrent session committed
    /// the same primary key first.
    pub(crate) fn with_commit_duplicate_key(mut self) -> Self {
        self.commit_failure = Some(DbError::ConstraintViolation);
        self
    }

    /// Seed a stored version as if a previous run had committed it.
    pub(crate) fn with_version(self, schema: &str, version: i64) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.data.tables.insert(MIGRATION_INFO_TABLE);
            state.data.versions.insert(schema.to_string(), version);
        }
        self
    }

    /// Seed a lock row as if another run held the schema.
    pub(crate) fn with_lock(self, schema: &str) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.data.tables.insert(MIGRATION_LOCK_TABLE);
            state.data.locks.insert(schema.to_string());
        }
        self
    }

    /// Scripts executed successfully, in order, including rolled-back ones.
    pub(crate) fn executed(&self) -> Vec<String> {
        self.state.lock().unwrap().executed.clone()
    }

    /// Raw stored value for `schema`.
    pub(crate) fn raw_version(&self, schema: &str) -> Option<i64> {
        self.state
            .lock()
            .unwrap()
            .data
            .versions
            .get(schema)
            .copied()
    }

    pub(crate) fn has_table(&self, table: &str) -> bool {
        self.state.lock().unwrap().data.tables.contains(table)
    }

    pub(crate) fn has_lock(&self, schema: &str) -> bool {
        self.state.lock().unwrap().data.locks.contains(schema)
    }

    /// Transaction control statements seen, in order.
    pub(crate) fn events(&self) -> Vec<&'static str> {
        self.state.lock().unwrap().events.clone()
    }
}

fn text<'a>(params: &[SqlValue<'a>], idx: usize) -> &'a str {
    match params.get(idx) {
        Some(SqlValue::Text(s)) => *s,
        other => panic!("expected text parameter at {idx}, got {other:?}"),
    }
}

fn int(params: &[SqlValue<'_>], idx: usize) -> i64 {
    match params.get(idx) {
        Some(SqlValue::Int(i)) => *i,
        other => panic!("expected integer parameter at {idx}, got {other:?}"),
    }
}

impl Database for FakeDatabase {
    fn execute_batch(&self, sql: &str) -> DbResult<()> {
        if sql == CREATE_INFO_TABLE_SQL {
            self.state.lock().unwrap().data.tables.insert(MIGRATION_INFO_TABLE);
            return Ok(());
        }
        if sql == CREATE_LOCK_TABLE_SQL {
            self.state.lock().unwrap().data.tables.insert(MIGRATION_LOCK_TABLE);
            return Ok(());
        }
        if self.failing_scripts.contains(sql) {
            return Err(DbError::ExecutionError(format!("syntax error in: {sql}")));
        }
        self.state.lock().unwrap().executed.push(sql.to_string());
        Ok(())
    }

    fn execute(&self, sql: &str, params: &[SqlValue<'_>]) -> DbResult<usize> {
        let mut state = self.state.lock().unwrap();
        let data = &mut state.data;
        match sql {
            INSERT_VERSION_SQL => {
                let schema = text(params, 0);
                if data.versions.contains_key(schema) {
                    return Err(DbError::ConstraintViolation(format!(
                        "Duplicate key \"schema: {schema}\""
                    )));
                }
                data.versions.insert(schema.to_string(), int(params, 1));
                Ok(1)
            }
            UPDATE_VERSION_SQL => {
                let schema = text(params, 1);
                match data.versions.get_mut(schema) {
                    Some(v) => {
                        *v = int(params, 0);
                        Ok(1)
                    }
                    None => Ok(0),
                }
            }
            ACQUIRE_LOCK_SQL => {
                let schema = text(params, 0);
                if !data.locks.insert(schema.to_string()) {
                    return Err(DbError::ConstraintViolation(format!(
                        "Duplicate key \"schema: {schema}\""
                    )));
                }
                Ok(1)
            }
            RELEASE_LOCK_SQL => {
                if self.fail_release {
                    return Err(DbError::ExecutionError("connection reset".to_string()));
                }
                Ok(usize::from(data.locks.remove(text(params, 0))))
            }
            other => panic!("fake database does not understand: {other}"),
        }
    }

    fn query_i64(&self, sql: &str, params: &[SqlValue<'_>]) -> DbResult<Option<i64>> {
        let state = self.state.lock().unwrap();
        match sql {
            TABLE_EXISTS_SQL => Ok(Some(i64::from(
                state.data.tables.contains(text(params, 0)),
            ))),
            SELECT_VERSION_SQL => Ok(state.data.versions.get(text(params, 0)).copied()),
            LOCK_HELD_SQL => Ok(Some(i64::from(
                state.data.locks.contains(text(params, 0)),
            ))),
            other => panic!("fake database does not understand: {other}"),
        }
    }

    fn db_type(&self) -> &'static str {
        "fake"
    }

    fn begin(&self) -> DbResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.snapshot.is_some() {
            return Err(DbError::TransactionError("already in a transaction".into()));
        }
        state.snapshot = Some(state.data.clone());
        state.events.push("begin");
        Ok(())
    }

    fn commit(&self) -> DbResult<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(fail) = self.commit_failure {
            // Like DuckDB, a conflicting commit aborts the transaction.
            if let Some(snapshot) = state.snapshot.take() {
                state.data = snapshot;
            }
            state.events.push("commit-conflict");
            return Err(fail("COMMIT failed: duplicate key \"app\"".into()));
        }
        if state.snapshot.take().is_none() {
            return Err(DbError::TransactionError("no transaction is active".into()));
        }
        state.events.push("commit");
        Ok(())
    }

    fn rollback(&self) -> DbResult<()> {
        let mut state = self.state.lock().unwrap();
        state.events.push("rollback");
        if self.fail_rollback {
            return Err(DbError::TransactionError("ROLLBACK failed: connection lost".into()));
        }
        match state.snapshot.take() {
            Some(snapshot) => {
                state.data = snapshot;
                Ok(())
            }
            None => Err(DbError::TransactionError("no transaction is active".into())),
        }
    }
}
