//! DuckDB database backend implementation

use crate::error::{DbError, DbResult};
use crate::traits::Database;
use dm_core::{ColumnDef, ColumnInfo, ColumnType, TableSchema, Value};
use duckdb::types::Value as DuckValue;
use duckdb::Connection;
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

    fn connection(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))
    }

    fn execute_params(&self, sql: &str, params: &[Value]) -> DbResult<usize> {
        let conn = self.connection()?;
        conn.execute(sql, duckdb::params_from_iter(to_duck_params(params)))
            .map_err(|e| with_sql(e, sql))
    }

    fn transaction_statement(&self, sql: &str) -> DbResult<()> {
        let conn = self.connection()?;
        conn.execute_batch(sql)
            .map_err(|e| DbError::TransactionError(format!("{sql} failed: {e}")))
    }
}

impl Database for DuckDbBackend {
    fn execute(&self, sql: &str) -> DbResult<usize> {
        self.execute_params(sql, &[])
    }

    fn execute_batch(&self, sql: &str) -> DbResult<()> {
        let conn = self.connection()?;
        conn.execute_batch(sql).map_err(DbError::from)
    }

    fn query_rows(&self, sql: &str, params: &[Value]) -> DbResult<Vec<Vec<Value>>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(sql).map_err(|e| with_sql(e, sql))?;
        let mut rows = stmt
            .query(duckdb::params_from_iter(to_duck_params(params)))
            .map_err(|e| with_sql(e, sql))?;

        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let width = row.as_ref().column_count();
            let mut values = Vec::with_capacity(width);
            for idx in 0..width {
                let value: DuckValue = row.get(idx)?;
                values.push(from_duck_value(value));
            }
            out.push(values);
        }
        Ok(out)
    }

    fn table_exists(&self, name: &str) -> DbResult<bool> {
        let (schema, table) = split_name(name);
        let rows = self.query_rows(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = ? AND table_name = ?",
            &[schema.into(), table.into()],
        )?;
        Ok(first_count(&rows) > 0)
    }

    fn table_names(&self) -> DbResult<Vec<String>> {
        let rows = self.query_rows(
            "SELECT table_name FROM information_schema.tables
             WHERE table_schema = 'main' AND table_type = 'BASE TABLE'
             ORDER BY table_name",
            &[],
        )?;
        Ok(rows
            .into_iter()
            .filter_map(|row| row.into_iter().next().and_then(Value::into_text))
            .collect())
    }

    fn columns(&self, table: &str) -> DbResult<Vec<ColumnInfo>> {
        let (schema, name) = split_name(table);
        let rows = self.query_rows(
            "SELECT column_name, data_type, is_nullable FROM information_schema.columns
             WHERE table_schema = ? AND table_name = ?
             ORDER BY ordinal_position",
            &[schema.into(), name.into()],
        )?;

        let mut columns = Vec::with_capacity(rows.len());
        for row in rows {
            let mut cells = row.into_iter().map(|v| v.into_text().unwrap_or_default());
            let (Some(column_name), Some(sql_type), Some(is_nullable)) =
                (cells.next(), cells.next(), cells.next())
            else {
                return Err(DbError::Internal(format!(
                    "unexpected information_schema.columns row for {table}"
                )));
            };
            columns.push(ColumnInfo {
                name: column_name,
                column_type: ColumnType::from_sql_type(&sql_type),
                sql_type,
                nullable: is_nullable.eq_ignore_ascii_case("YES"),
            });
        }
        Ok(columns)
    }

    fn primary_key(&self, table: &str) -> DbResult<Vec<String>> {
        let (schema, name) = split_name(table);
        let rows = self.query_rows(
            "SELECT unnest(constraint_column_names) FROM duckdb_constraints()
             WHERE schema_name = ? AND table_name = ? AND constraint_type = 'PRIMARY KEY'",
            &[schema.into(), name.into()],
        )?;
        Ok(rows
            .into_iter()
            .filter_map(|row| row.into_iter().next().and_then(Value::into_text))
            .collect())
    }

    fn create_table(&self, name: &str, schema: &TableSchema) -> DbResult<()> {
        schema.validate()?;
        let sql = create_table_sql(name, schema);
        log::debug!("Creating table {name}");
        self.execute(&sql)?;
        Ok(())
    }

    fn insert_row(&self, table: &str, row: &[(&str, Value)]) -> DbResult<()> {
        let sql = insert_sql(table, row);
        let params: Vec<Value> = row.iter().map(|(_, v)| v.clone()).collect();
        self.execute_params(&sql, &params)?;
        Ok(())
    }

    fn copy_rows(&self, from: &str, to: &str, columns: &[&str]) -> DbResult<usize> {
        if columns.is_empty() {
            return Err(DbError::InvalidSchema(format!(
                "no columns given to copy from {from} to {to}"
            )));
        }
        let key = self.primary_key(to)?;
        let sql = copy_rows_sql(from, to, columns, &key);
        self.execute(&sql)
    }

    fn add_column(&self, table: &str, column: &ColumnDef) -> DbResult<()> {
        // DuckDB cannot add a column together with a constraint.
        if !column.nullable {
            return Err(DbError::InvalidSchema(format!(
                "cannot add NOT NULL column '{}' to existing table {table}",
                column.name
            )));
        }
        let sql = format!(
            "ALTER TABLE {} ADD COLUMN {} {}",
            quote_qualified(table),
            quote_ident(&column.name),
            column.column_type.sql_type()
        );
        self.execute(&sql)?;
        Ok(())
    }

    fn drop_table(&self, name: &str) -> DbResult<()> {
        self.execute(&format!("DROP TABLE IF EXISTS {}", quote_qualified(name)))?;
        Ok(())
    }

    fn rename_table(&self, from: &str, to: &str) -> DbResult<()> {
        let sql = format!(
            "ALTER TABLE {} RENAME TO {}",
            quote_qualified(from),
            quote_ident(to)
        );
        self.execute(&sql)?;
        Ok(())
    }

    fn begin(&self) -> DbResult<()> {
        self.transaction_statement("BEGIN TRANSACTION")
    }

    fn commit(&self) -> DbResult<()> {
        self.transaction_statement("COMMIT")
    }

    fn rollback(&self) -> DbResult<()> {
        self.transaction_statement("ROLLBACK")
    }

    fn db_type(&self) -> &'static str {
        "duckdb"
    }
}

/// Quote an identifier, doubling embedded quotes
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quote a possibly schema-qualified table name
pub fn quote_qualified(name: &str) -> String {
    match name.rfind('.') {
        Some(pos) => format!(
            "{}.{}",
            quote_ident(&name[..pos]),
            quote_ident(&name[pos + 1..])
        ),
        None => quote_ident(name),
    }
}

/// Split `schema.table` into its parts, defaulting the schema to `main`
fn split_name(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(pos) => (&name[..pos], &name[pos + 1..]),
        None => ("main", name),
    }
}

fn create_table_sql(name: &str, schema: &TableSchema) -> String {
    let mut parts: Vec<String> = schema
        .columns
        .iter()
        .map(|c| {
            let mut def = format!("{} {}", quote_ident(&c.name), c.column_type.sql_type());
            if !c.nullable {
                def.push_str(" NOT NULL");
            }
            def
        })
        .collect();

    if !schema.primary_key.is_empty() {
        parts.push(format!("PRIMARY KEY ({})", quote_list(&schema.primary_key)));
    }

    format!("CREATE TABLE {} ({})", quote_qualified(name), parts.join(", "))
}

fn insert_sql(table: &str, row: &[(&str, Value)]) -> String {
    if row.is_empty() {
        return format!("INSERT INTO {} DEFAULT VALUES", quote_qualified(table));
    }
    let columns: Vec<&str> = row.iter().map(|(c, _)| *c).collect();
    let placeholders = vec!["?"; row.len()].join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_qualified(table),
        quote_list(&columns),
        placeholders
    )
}

fn copy_rows_sql(from: &str, to: &str, columns: &[&str], key: &[String]) -> String {
    let column_list = quote_list(columns);
    // ON CONFLICT is rejected by DuckDB on tables without a key, and does not
    // cover duplicates inside the inserted batch itself.
    let keyed = !key.is_empty() && key.iter().all(|k| columns.contains(&k.as_str()));
    if keyed {
        format!(
            "INSERT OR IGNORE INTO {to} ({cols}) SELECT {cols} FROM {from} \
             QUALIFY row_number() OVER (PARTITION BY {key} ORDER BY rowid) = 1",
            to = quote_qualified(to),
            from = quote_qualified(from),
            cols = column_list,
            key = quote_list(key),
        )
    } else {
        format!(
            "INSERT INTO {} ({cols}) SELECT {cols} FROM {}",
            quote_qualified(to),
            quote_qualified(from),
            cols = column_list,
        )
    }
}

fn quote_list<S: AsRef<str>>(idents: &[S]) -> String {
    idents
        .iter()
        .map(|i| quote_ident(i.as_ref()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn first_count(rows: &[Vec<Value>]) -> i64 {
    rows.first()
        .and_then(|row| row.first())
        .and_then(Value::as_i64)
        .unwrap_or(0)
}

fn with_sql(err: duckdb::Error, sql: &str) -> DbError {
    match DbError::from(err) {
        DbError::ExecutionError(msg) => DbError::ExecutionError(format!("{msg}: {sql}")),
        other => other,
    }
}

fn to_duck_params(params: &[Value]) -> Vec<DuckValue> {
    params
        .iter()
        .map(|v| match v {
            Value::Null => DuckValue::Null,
            Value::Boolean(b) => DuckValue::Boolean(*b),
            Value::Integer(i) => DuckValue::BigInt(*i),
            Value::Float(x) => DuckValue::Double(*x),
            Value::Text(s) => DuckValue::Text(s.clone()),
        })
        .collect()
}

fn from_duck_value(value: DuckValue) -> Value {
    match value {
        DuckValue::Null => Value::Null,
        DuckValue::Boolean(b) => Value::Boolean(b),
        DuckValue::TinyInt(i) => Value::Integer(i64::from(i)),
        DuckValue::SmallInt(i) => Value::Integer(i64::from(i)),
        DuckValue::Int(i) => Value::Integer(i64::from(i)),
        DuckValue::BigInt(i) => Value::Integer(i),
        DuckValue::UTinyInt(i) => Value::Integer(i64::from(i)),
        DuckValue::USmallInt(i) => Value::Integer(i64::from(i)),
        DuckValue::UInt(i) => Value::Integer(i64::from(i)),
        DuckValue::UBigInt(i) => match i64::try_from(i) {
            Ok(v) => Value::Integer(v),
            Err(_) => Value::Text(i.to_string()),
        },
        DuckValue::HugeInt(i) => match i64::try_from(i) {
            Ok(v) => Value::Integer(v),
            Err(_) => Value::Text(i.to_string()),
        },
        DuckValue::Float(x) => Value::Float(f64::from(x)),
        DuckValue::Double(x) => Value::Float(x),
        DuckValue::Text(s) => Value::Text(s),
        other => Value::Text(format!("{other:?}")),
    }
}

#[cfg(test)]
#[path = "duckdb_test.rs"]
mod tests;
