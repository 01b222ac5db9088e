//! Tests for the version store against an in-memory DuckDB.

use super::*;
use dbm_db::DuckDbBackend;

fn raw_version(db: &DuckDbBackend, schema: &str) -> Option<i64> {
    db.query_i64(SELECT_VERSION_SQL, &[SqlValue::Text(schema)])
        .unwrap()
}

fn setup() -> DuckDbBackend {
    let db = DuckDbBackend::in_memory().unwrap();
    VersionStore::new(&db).ensure_table().unwrap();
    db
}

#[test]
fn ensure_table_is_idempotent() {
    let db = setup();
    let store = VersionStore::new(&db);
    store.ensure_table().unwrap();
    store.ensure_table().unwrap();
}

#[test]
fn sql_targets_metadata_table() {
    for sql in [
        CREATE_INFO_TABLE_SQL,
        SELECT_VERSION_SQL,
        INSERT_VERSION_SQL,
        UPDATE_VERSION_SQL,
    ] {
        assert!(sql.contains(MIGRATION_INFO_TABLE), "{sql}");
    }
}

#[test]
fn get_version_creates_record_for_new_schema() {
    let db = setup();
    let store = VersionStore::new(&db);

    assert_eq!(raw_version(&db, "app"), None);
    assert_eq!(store.get_version("app").unwrap(), None);
    assert_eq!(raw_version(&db, "app"), Some(-1));

    // A second read finds the record instead of inserting again.
    assert_eq!(store.get_version("app").unwrap(), None);
}

#[test]
fn set_then_get_round_trips() {
    let db = setup();
    let store = VersionStore::new(&db);
    store.get_version("app").unwrap();
    store.set_version("app", 4).unwrap();
    assert_eq!(store.get_version("app").unwrap(), Some(4));
    assert_eq!(raw_version(&db, "app"), Some(4));
}

#[test]
fn version_zero_is_distinct_from_never_migrated() {
    let db = setup();
    let store = VersionStore::new(&db);
    store.get_version("app").unwrap();
    store.set_version("app", 0).unwrap();
    assert_eq!(store.get_version("app").unwrap(), Some(0));
}

#[test]
fn schemas_are_tracked_independently() {
    let db = setup();
    let store = VersionStore::new(&db);
    store.get_version("a").unwrap();
    store.get_version("b").unwrap();
    store.set_version("a", 3).unwrap();

    assert_eq!(store.peek_version("a").unwrap(), Some(3));
    assert_eq!(store.peek_version("b").unwrap(), None);
}

#[test]
fn set_version_without_record_fails() {
    let db = setup();
    let store = VersionStore::new(&db);
    let err = store.set_version("ghost", 1).unwrap_err();
    assert!(matches!(err, MigrateError::Store { .. }), "{err}");
}

#[test]
fn peek_does_not_create_record() {
    let db = setup();
    let store = VersionStore::new(&db);
    assert_eq!(store.peek_version("app").unwrap(), None);
    assert_eq!(raw_version(&db, "app"), None);
}

#[test]
fn corrupt_negative_version_is_reported() {
    let db = setup();
    db.execute(INSERT_VERSION_SQL, &[SqlValue::Text("bad"), SqlValue::Int(-5)])
        .unwrap();
    let err = VersionStore::new(&db).get_version("bad").unwrap_err();
    assert!(matches!(err, MigrateError::CorruptVersion { value: -5, .. }));
}

#[test]
fn missing_table_is_store_error() {
    let db = DuckDbBackend::in_memory().unwrap();
    let err = VersionStore::new(&db).get_version("app").unwrap_err();
    assert!(matches!(err, MigrateError::Store { .. }), "{err}");
}

#[test]
fn reads_existing_table_written_by_other_tools() {
    // Tables created with a 32-bit version column keep working.
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch(
        r#"CREATE TABLE "__dbmigrateinfo" ("schema" VARCHAR(100) PRIMARY KEY, "version" INTEGER NOT NULL);
           INSERT INTO "__dbmigrateinfo" VALUES ('legacy', 12);"#,
    )
    .unwrap();
    let store = VersionStore::new(&db);
    store.ensure_table().unwrap();
    assert_eq!(store.get_version("legacy").unwrap(), Some(12));
}

#[test]
fn has_table_tracks_creation() {
    let db = DuckDbBackend::in_memory().unwrap();
    let store = VersionStore::new(&db);
    assert!(!store.has_table().unwrap());
    store.ensure_table().unwrap();
    assert!(store.has_table().unwrap());
}
