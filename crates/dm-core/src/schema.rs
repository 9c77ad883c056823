//! Declarative table descriptions passed to the database layer.
//!
//! Migrations and the tracking store describe the tables they need with a
//! [`TableSchema`] value instead of hand-written DDL. The database backend
//! turns it into `CREATE TABLE` for its own dialect.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Semantic column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Text,
    Integer,
    Float,
    Boolean,
    Timestamp,
    Blob,
}

impl ColumnType {
    /// SQL type name used when creating a column.
    pub fn sql_type(self) -> &'static str {
        match self {
            ColumnType::Text => "VARCHAR",
            ColumnType::Integer => "BIGINT",
            ColumnType::Float => "DOUBLE",
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Timestamp => "TIMESTAMP",
            ColumnType::Blob => "BLOB",
        }
    }

    /// Classify a type name reported by the database.
    ///
    /// Unrecognised types map to `Text`.
    pub fn from_sql_type(sql_type: &str) -> Self {
        let upper = sql_type.trim().to_ascii_uppercase();
        let base = upper.split('(').next().unwrap_or("").trim();
        match base {
            "BOOLEAN" | "BOOL" | "LOGICAL" => ColumnType::Boolean,
            "BLOB" | "BYTEA" | "BINARY" | "VARBINARY" => ColumnType::Blob,
            "DOUBLE" | "FLOAT" | "REAL" | "FLOAT4" | "FLOAT8" | "DECIMAL" | "NUMERIC" => {
                ColumnType::Float
            }
            "TINYINT" | "SMALLINT" | "INTEGER" | "INT" | "BIGINT" | "HUGEINT" | "UTINYINT"
            | "USMALLINT" | "UINTEGER" | "UBIGINT" | "UHUGEINT" | "INT1" | "INT2" | "INT4"
            | "INT8" => ColumnType::Integer,
            b if b.starts_with("TIMESTAMP") || b == "DATE" || b == "DATETIME" => {
                ColumnType::Timestamp
            }
            _ => ColumnType::Text,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql_type())
    }
}

/// One column in a [`TableSchema`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub column_type: ColumnType,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
}

fn default_nullable() -> bool {
    true
}

impl ColumnDef {
    /// A nullable column.
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: true,
        }
    }

    /// A `NOT NULL` column.
    pub fn not_null(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: false,
        }
    }
}

/// Declarative table definition: ordered columns plus an optional
/// (possibly composite) primary key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub columns: Vec<ColumnDef>,
    #[serde(default)]
    pub primary_key: Vec<String>,
}

impl TableSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a nullable column.
    pub fn column(mut self, name: impl Into<String>, column_type: ColumnType) -> Self {
        self.columns.push(ColumnDef::new(name, column_type));
        self
    }

    /// Append a `NOT NULL` column.
    pub fn not_null(mut self, name: impl Into<String>, column_type: ColumnType) -> Self {
        self.columns.push(ColumnDef::not_null(name, column_type));
        self
    }

    /// Set the primary key columns, in key order.
    pub fn primary_key<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_key = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Column names in declaration order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Check that the description can be turned into a table.
    pub fn validate(&self) -> CoreResult<()> {
        if self.columns.is_empty() {
            return Err(CoreError::InvalidSchema {
                message: "a table needs at least one column".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for column in &self.columns {
            if column.name.is_empty() {
                return Err(CoreError::InvalidSchema {
                    message: "column names must not be empty".to_string(),
                });
            }
            if !seen.insert(column.name.as_str()) {
                return Err(CoreError::InvalidSchema {
                    message: format!("duplicate column '{}'", column.name),
                });
            }
        }

        let mut key_seen = HashSet::new();
        for key in &self.primary_key {
            if !seen.contains(key.as_str()) {
                return Err(CoreError::InvalidSchema {
                    message: format!("primary key column '{key}' is not a declared column"),
                });
            }
            if !key_seen.insert(key.as_str()) {
                return Err(CoreError::InvalidSchema {
                    message: format!("primary key column '{key}' listed twice"),
                });
            }
        }
        Ok(())
    }
}

/// A column as reported by the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    /// Type name exactly as the database reports it.
    pub sql_type: String,
    pub column_type: ColumnType,
    pub nullable: bool,
}

#[cfg(test)]
#[path = "schema_test.rs"]
mod tests;
