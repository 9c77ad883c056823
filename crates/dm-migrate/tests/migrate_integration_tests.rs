//! Integration tests for the migration engine against DuckDB

use dm_core::{ColumnType, TableSchema, Value};
use dm_db::{Database, DbError, DbResult, DuckDbBackend};
use dm_migrate::{MigrateError, MigrationSet, TrackingStore};
use std::collections::BTreeSet;

const TRACKING: &str = "_duckmig_migrations";

/// Insert a named animal, creating the table on first use
fn insert_name(db: &dyn Database, table: &str, name: &str) -> DbResult<()> {
    if !db.table_exists(table)? {
        db.create_table(table, &TableSchema::new().column("name", ColumnType::Text))?;
    }
    db.insert_row(table, &[("name", name.into())])
}

fn dogs_and_cats() -> MigrationSet {
    MigrationSet::builder("test")
        .unwrap()
        .add("m001", |db| insert_name(db, "dogs", "Cleo"))
        .unwrap()
        .add("m002", |db| {
            db.create_table("cats", &TableSchema::new().column("name", ColumnType::Text))?;
            insert_name(db, "dogs", "Pancakes")
        })
        .unwrap()
        .build()
}

fn second_set() -> MigrationSet {
    MigrationSet::builder("test2")
        .unwrap()
        .add("m001", |db| insert_name(db, "dogs2", "Cleo"))
        .unwrap()
        .build()
}

fn tables(db: &dyn Database) -> BTreeSet<String> {
    db.table_names().unwrap().into_iter().collect()
}

fn expected(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|n| n.to_string()).collect()
}

fn count(db: &dyn Database, table: &str) -> i64 {
    let rows = db
        .query_rows(&format!("SELECT COUNT(*) FROM {table}"), &[])
        .unwrap();
    rows[0][0].as_i64().unwrap()
}

fn tracking_rows(db: &dyn Database) -> Vec<(String, String)> {
    db.query_rows(
        &format!("SELECT migration_set, name FROM {TRACKING} ORDER BY migration_set, name"),
        &[],
    )
    .unwrap()
    .into_iter()
    .map(|row| (row[0].to_string(), row[1].to_string()))
    .collect()
}

/// Test applying a set to an empty database
#[test]
fn test_basic_apply() {
    let db = DuckDbBackend::in_memory().unwrap();
    assert!(db.table_names().unwrap().is_empty());

    dogs_and_cats().apply(&db, None).unwrap();

    assert_eq!(tables(&db), expected(&[TRACKING, "cats", "dogs"]));
    assert_eq!(count(&db, "dogs"), 2);
    assert_eq!(count(&db, "cats"), 0);
    assert_eq!(
        db.columns("cats").unwrap().into_iter().map(|c| c.name).collect::<Vec<_>>(),
        vec!["name"]
    );
    assert_eq!(
        tracking_rows(&db),
        vec![
            ("test".to_string(), "m001".to_string()),
            ("test".to_string(), "m002".to_string())
        ]
    );
}

/// Test stopping before a step and finishing later
#[test]
fn test_stop_before_then_complete() {
    let db = DuckDbBackend::in_memory().unwrap();
    let set = dogs_and_cats();

    set.apply(&db, Some("m002")).unwrap();
    assert_eq!(tables(&db), expected(&[TRACKING, "dogs"]));
    assert_eq!(count(&db, "dogs"), 1);

    set.apply(&db, None).unwrap();
    assert_eq!(tables(&db), expected(&[TRACKING, "cats", "dogs"]));
    assert_eq!(count(&db, "dogs"), 2);
}

/// Test re-applying a set is a no-op
#[test]
fn test_reapply_is_idempotent() {
    let db = DuckDbBackend::in_memory().unwrap();
    let set = dogs_and_cats();

    set.apply(&db, None).unwrap();
    let report = set.apply(&db, None).unwrap();

    assert!(report.is_noop());
    assert_eq!(report.already_applied, 2);
    assert_eq!(count(&db, "dogs"), 2);
    assert_eq!(tracking_rows(&db).len(), 2);
}

/// Test two sets sharing a database and tracking table
#[test]
fn test_two_migration_sets() {
    let db = DuckDbBackend::in_memory().unwrap();
    dogs_and_cats().apply(&db, None).unwrap();
    second_set().apply(&db, None).unwrap();

    assert_eq!(tables(&db), expected(&[TRACKING, "cats", "dogs", "dogs2"]));
    assert_eq!(count(&db, "dogs2"), 1);
    assert_eq!(
        tracking_rows(&db),
        vec![
            ("test".to_string(), "m001".to_string()),
            ("test".to_string(), "m002".to_string()),
            ("test2".to_string(), "m001".to_string())
        ]
    );

    // Neither set re-runs because of the other's records
    assert!(dogs_and_cats().apply(&db, None).unwrap().is_noop());
    assert!(second_set().apply(&db, None).unwrap().is_noop());
    assert_eq!(count(&db, "dogs2"), 1);
}

/// Test the second set still runs its m001 after the first recorded one
#[test]
fn test_same_step_name_in_two_sets_applies_both() {
    let db = DuckDbBackend::in_memory().unwrap();
    second_set().apply(&db, None).unwrap();

    let report = dogs_and_cats().apply(&db, None).unwrap();
    assert_eq!(report.applied.len(), 2);
    assert_eq!(count(&db, "dogs"), 2);
}

/// Test steps run in registration order, not name order
#[test]
fn test_registration_order_wins_over_names() {
    let db = DuckDbBackend::in_memory().unwrap();
    let set = MigrationSet::builder("ordered")
        .unwrap()
        .add("z_create", |db| {
            db.execute_batch("CREATE TABLE log (step VARCHAR)")
        })
        .unwrap()
        .add("a_insert", |db| {
            db.insert_row("log", &[("step", "a_insert".into())])
        })
        .unwrap()
        .build();

    let report = set.apply(&db, None).unwrap();
    let applied: Vec<&str> = report.applied.iter().map(|n| n.as_str()).collect();
    assert_eq!(applied, vec!["z_create", "a_insert"]);
    assert_eq!(count(&db, "log"), 1);
}

/// Test a failing step leaves neither its changes nor a record
#[test]
fn test_failing_step_is_not_recorded() {
    let db = DuckDbBackend::in_memory().unwrap();
    let set = MigrationSet::builder("test")
        .unwrap()
        .add("m001", |db| insert_name(db, "dogs", "Cleo"))
        .unwrap()
        .add("m002", |db| {
            insert_name(db, "dogs", "Pancakes")?;
            db.create_table("cats", &TableSchema::new().column("name", ColumnType::Text))?;
            Err(DbError::ExecutionError("cats refused".to_string()))
        })
        .unwrap()
        .build();

    let err = set.apply(&db, None).unwrap_err();
    assert!(matches!(err, MigrateError::StepFailed { .. }), "got {err}");

    assert_eq!(tables(&db), expected(&[TRACKING, "dogs"]));
    assert_eq!(count(&db, "dogs"), 1);
    assert_eq!(
        tracking_rows(&db),
        vec![("test".to_string(), "m001".to_string())]
    );

    // The fixed set picks up where the failed one stopped
    dogs_and_cats().apply(&db, None).unwrap();
    assert_eq!(tables(&db), expected(&[TRACKING, "cats", "dogs"]));
    assert_eq!(count(&db, "dogs"), 2);
}

/// Test registering a duplicate name fails before anything runs
#[test]
fn test_duplicate_registration() {
    let err = MigrationSet::builder("test")
        .unwrap()
        .add("m001", |_| Ok(()))
        .unwrap()
        .add("m001", |_| Ok(()))
        .unwrap_err();
    assert!(matches!(err, MigrateError::DuplicateMigrationName { .. }));
}

/// Test upgrading a tracking table keyed on the step name alone
#[test]
fn test_upgrade_from_name_keyed_tracking_table() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch(&format!(
        "CREATE TABLE dogs (name VARCHAR);
         INSERT INTO dogs VALUES ('Cleo');
         CREATE TABLE {TRACKING} (
             migration_set VARCHAR, name VARCHAR PRIMARY KEY, applied_at VARCHAR);
         INSERT INTO {TRACKING} VALUES ('test', 'm001', '2023-08-01T10:00:00Z');"
    ))
    .unwrap();

    let report = dogs_and_cats().apply(&db, None).unwrap();
    assert_eq!(report.already_applied, 1);
    assert_eq!(report.applied.len(), 1);

    assert_eq!(
        db.primary_key(TRACKING).unwrap(),
        vec!["migration_set", "name"]
    );
    assert_eq!(count(&db, "dogs"), 2);

    // m001 can now be applied for another set
    second_set().apply(&db, None).unwrap();
    assert_eq!(tracking_rows(&db).len(), 3);

    let applied = dogs_and_cats().applied(&db).unwrap();
    assert_eq!(
        applied[0].applied_at.as_deref(),
        Some("2023-08-01T10:00:00Z")
    );
}

/// Test upgrading a tracking table keyed on a synthetic id
#[test]
fn test_upgrade_from_id_keyed_tracking_table() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch(&format!(
        "CREATE TABLE dogs (name VARCHAR);
         INSERT INTO dogs VALUES ('Cleo'), ('Pancakes');
         CREATE TABLE cats (name VARCHAR);
         CREATE TABLE {TRACKING} (
             id INTEGER PRIMARY KEY, migration_set VARCHAR, name VARCHAR, applied_at VARCHAR);
         INSERT INTO {TRACKING} VALUES
             (1, 'test', 'm001', '2023-08-01T10:00:00Z'),
             (2, 'test', 'm002', '2023-08-02T10:00:00Z');"
    ))
    .unwrap();

    let report = dogs_and_cats().apply(&db, None).unwrap();
    assert!(report.is_noop());
    assert_eq!(report.already_applied, 2);

    let columns: Vec<String> = db
        .columns(TRACKING)
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(columns, vec!["migration_set", "name", "applied_at"]);
    assert_eq!(count(&db, "dogs"), 2);
    assert_eq!(tracking_rows(&db).len(), 2);
}

/// Test a custom tracking table is used for everything
#[test]
fn test_custom_tracking_table() {
    let db = DuckDbBackend::in_memory().unwrap();
    let store = TrackingStore::new("schema_history");

    dogs_and_cats().apply_with(&store, &db, None).unwrap();
    assert_eq!(tables(&db), expected(&["cats", "dogs", "schema_history"]));

    let records = store
        .applied_records(&db, dogs_and_cats().name())
        .unwrap();
    assert_eq!(records.len(), 2);
}

/// Test migrations persist across reopening a database file
#[test]
fn test_file_database_resumes() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("app.duckdb");

    {
        let db = DuckDbBackend::from_path(&path).unwrap();
        dogs_and_cats().apply(&db, Some("m002")).unwrap();
    }

    let db = DuckDbBackend::from_path(&path).unwrap();
    let report = dogs_and_cats().apply(&db, None).unwrap();
    let applied: Vec<&str> = report.applied.iter().map(|n| n.as_str()).collect();
    assert_eq!(applied, vec!["m002"]);

    let rows = db
        .query_rows("SELECT name FROM dogs ORDER BY name", &[])
        .unwrap();
    assert_eq!(
        rows,
        vec![
            vec![Value::Text("Cleo".to_string())],
            vec![Value::Text("Pancakes".to_string())]
        ]
    );
}
