//! Database capability trait

use crate::error::{DbError, DbResult};
use dm_core::{ColumnDef, ColumnInfo, TableSchema, Value};

/// Capabilities the migration engine and migration steps need from a
/// database.
///
/// All operations are synchronous and run to completion. Table names may be
/// schema-qualified (`staging.orders`); unqualified names live in `main`.
pub trait Database {
    /// Execute one statement, returning the affected row count
    fn execute(&self, sql: &str) -> DbResult<usize>;

    /// Execute several `;`-separated statements
    fn execute_batch(&self, sql: &str) -> DbResult<()>;

    /// Run a parameterised query and return every row
    fn query_rows(&self, sql: &str, params: &[Value]) -> DbResult<Vec<Vec<Value>>>;

    /// Check if a table exists
    fn table_exists(&self, name: &str) -> DbResult<bool>;

    /// Names of all base tables in the default schema, sorted
    fn table_names(&self) -> DbResult<Vec<String>>;

    /// Columns of a table in ordinal order
    fn columns(&self, table: &str) -> DbResult<Vec<ColumnInfo>>;

    /// Primary key columns in key order; empty when the table has no key
    fn primary_key(&self, table: &str) -> DbResult<Vec<String>>;

    /// Create a table from a declarative description
    fn create_table(&self, name: &str, schema: &TableSchema) -> DbResult<()>;

    /// Insert a single row given as `(column, value)` pairs
    fn insert_row(&self, table: &str, row: &[(&str, Value)]) -> DbResult<()>;

    /// Copy the named columns of every row in `from` into `to`.
    ///
    /// Rows whose key already exists in `to`, or that repeat a key earlier
    /// in `from`, are skipped. Returns the number of rows inserted.
    fn copy_rows(&self, from: &str, to: &str, columns: &[&str]) -> DbResult<usize>;

    /// Add a nullable column to an existing table
    fn add_column(&self, table: &str, column: &ColumnDef) -> DbResult<()>;

    /// Drop a table if it exists
    fn drop_table(&self, name: &str) -> DbResult<()>;

    /// Rename a table; `to` is a bare name in the same schema
    fn rename_table(&self, from: &str, to: &str) -> DbResult<()>;

    /// Start an explicit transaction
    fn begin(&self) -> DbResult<()>;

    /// Commit the open transaction
    fn commit(&self) -> DbResult<()>;

    /// Roll back the open transaction
    fn rollback(&self) -> DbResult<()>;

    /// Database type identifier for logging
    fn db_type(&self) -> &'static str;
}

/// Execute `body` within a `BEGIN` / `COMMIT` transaction, rolling back on
/// error.
///
/// A failed `COMMIT` is also rolled back and reported. `body` must not open
/// a transaction of its own.
pub fn with_transaction<D, T, E, F>(db: &D, body: F) -> Result<T, E>
where
    D: Database + ?Sized,
    E: From<DbError>,
    F: FnOnce(&D) -> Result<T, E>,
{
    db.begin()?;

    let result = body(db);

    match &result {
        Ok(_) => {
            if let Err(commit_err) = db.commit() {
                if let Err(e) = db.rollback() {
                    log::warn!("ROLLBACK after failed COMMIT also failed: {e}");
                }
                return Err(commit_err.into());
            }
        }
        Err(_) => {
            if let Err(e) = db.rollback() {
                log::warn!("ROLLBACK failed: {e}");
            }
        }
    }
    result
}
