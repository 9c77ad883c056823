//! Tracking table for applied migrations.
//!
//! One row per applied step, keyed by `(migration_set, name)`. Databases
//! written by older releases may carry a tracking table keyed on `name`
//! alone or on a synthetic id, or one without `applied_at`; [`TrackingStore::ensure`]
//! brings any of those up to the current layout without losing records.

use crate::error::{MigrateError, MigrateResult};
use chrono::{SecondsFormat, Utc};
use dm_core::config::DEFAULT_TRACKING_TABLE;
use dm_core::{ColumnDef, ColumnType, MigrationName, SetName, TableSchema, Value};
use dm_db::{quote_qualified, with_transaction, Database};
use serde::Serialize;
use std::collections::HashSet;

const SET_COLUMN: &str = "migration_set";
const NAME_COLUMN: &str = "name";
const APPLIED_AT_COLUMN: &str = "applied_at";

/// Suffix of the temporary name the old table takes during a rebuild.
const PREVIOUS_SUFFIX: &str = "_previous";

/// A row of the tracking table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedRecord {
    pub set: SetName,
    pub name: MigrationName,
    /// RFC 3339 UTC timestamp; `None` for rows written before the column existed
    pub applied_at: Option<String>,
}

/// One layout upgrade: a probe that decides whether it is needed and the
/// change that performs it.
struct UpgradeCheck {
    description: &'static str,
    needed: fn(&TrackingStore, &dyn Database) -> MigrateResult<bool>,
    apply: fn(&TrackingStore, &dyn Database) -> MigrateResult<()>,
}

/// Upgrades run in this order on every `ensure`.
const UPGRADE_CHECKS: &[UpgradeCheck] = &[
    UpgradeCheck {
        description: "create tracking table",
        needed: TrackingStore::is_missing,
        apply: TrackingStore::create,
    },
    UpgradeCheck {
        description: "add applied_at column",
        needed: TrackingStore::lacks_applied_at,
        apply: TrackingStore::add_applied_at,
    },
    UpgradeCheck {
        description: "rebuild with (migration_set, name) primary key",
        needed: TrackingStore::has_outdated_key,
        apply: TrackingStore::rebuild_with_composite_key,
    },
];

/// Reads and writes the tracking table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingStore {
    table: String,
}

impl Default for TrackingStore {
    fn default() -> Self {
        Self::new(DEFAULT_TRACKING_TABLE)
    }
}

impl TrackingStore {
    /// Store backed by `table`, which may be schema-qualified.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
        }
    }

    /// Name of the tracking table
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Current layout of the tracking table.
    pub fn schema() -> TableSchema {
        TableSchema::new()
            .not_null(SET_COLUMN, ColumnType::Text)
            .not_null(NAME_COLUMN, ColumnType::Text)
            .column(APPLIED_AT_COLUMN, ColumnType::Text)
            .primary_key([SET_COLUMN, NAME_COLUMN])
    }

    /// Create the tracking table, or upgrade an older layout in place.
    ///
    /// Idempotent. Fails with [`MigrateError::TrackingUpgradeFailure`] when
    /// the existing table cannot be brought to the current layout; the
    /// table is then left as it was.
    pub fn ensure(&self, db: &dyn Database) -> MigrateResult<()> {
        for check in UPGRADE_CHECKS {
            if (check.needed)(self, db)? {
                log::debug!("Tracking table {}: {}", self.table, check.description);
                (check.apply)(self, db)?;
            }
        }
        Ok(())
    }

    /// Whether `name` has been recorded for `set`.
    pub fn is_applied(
        &self,
        db: &dyn Database,
        set: &SetName,
        name: &MigrationName,
    ) -> MigrateResult<bool> {
        let rows = db.query_rows(
            &format!(
                "SELECT COUNT(*) FROM {} WHERE {SET_COLUMN} = ? AND {NAME_COLUMN} = ?",
                quote_qualified(&self.table)
            ),
            &[set.as_str().into(), name.as_str().into()],
        )?;
        let count = rows
            .first()
            .and_then(|row| row.first())
            .and_then(Value::as_i64)
            .unwrap_or(0);
        Ok(count > 0)
    }

    /// Record `name` as applied for `set`, stamped with the current UTC time.
    pub fn record(
        &self,
        db: &dyn Database,
        set: &SetName,
        name: &MigrationName,
    ) -> MigrateResult<()> {
        if self.is_applied(db, set, name)? {
            return Err(MigrateError::DuplicateRecord {
                set: set.clone(),
                name: name.clone(),
            });
        }
        let applied_at = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
        db.insert_row(
            &self.table,
            &[
                (SET_COLUMN, set.as_str().into()),
                (NAME_COLUMN, name.as_str().into()),
                (APPLIED_AT_COLUMN, applied_at.into()),
            ],
        )?;
        Ok(())
    }

    /// Names recorded for `set`.
    pub fn applied_names(
        &self,
        db: &dyn Database,
        set: &SetName,
    ) -> MigrateResult<HashSet<MigrationName>> {
        let rows = db.query_rows(
            &format!(
                "SELECT {NAME_COLUMN} FROM {} WHERE {SET_COLUMN} = ?",
                quote_qualified(&self.table)
            ),
            &[set.as_str().into()],
        )?;
        rows.into_iter()
            .map(|row| MigrationName::try_new(text_at(&row, 0)).map_err(MigrateError::from))
            .collect()
    }

    /// Records for `set`, oldest first.
    pub fn applied_records(
        &self,
        db: &dyn Database,
        set: &SetName,
    ) -> MigrateResult<Vec<AppliedRecord>> {
        let rows = db.query_rows(
            &format!(
                "SELECT {SET_COLUMN}, {NAME_COLUMN}, {APPLIED_AT_COLUMN} FROM {} \
                 WHERE {SET_COLUMN} = ? ORDER BY {APPLIED_AT_COLUMN}, {NAME_COLUMN}",
                quote_qualified(&self.table)
            ),
            &[set.as_str().into()],
        )?;
        rows.into_iter()
            .map(|row| -> MigrateResult<AppliedRecord> {
                Ok(AppliedRecord {
                    set: SetName::try_new(text_at(&row, 0))?,
                    name: MigrationName::try_new(text_at(&row, 1))?,
                    applied_at: row.get(2).and_then(Value::as_str).map(str::to_string),
                })
            })
            .collect()
    }

    /// Every set with at least one record, sorted.
    pub fn set_names(&self, db: &dyn Database) -> MigrateResult<Vec<SetName>> {
        let rows = db.query_rows(
            &format!(
                "SELECT DISTINCT {SET_COLUMN} FROM {} ORDER BY 1",
                quote_qualified(&self.table)
            ),
            &[],
        )?;
        rows.into_iter()
            .map(|row| SetName::try_new(text_at(&row, 0)).map_err(MigrateError::from))
            .collect()
    }

    fn is_missing(&self, db: &dyn Database) -> MigrateResult<bool> {
        Ok(!db.table_exists(&self.table)?)
    }

    fn create(&self, db: &dyn Database) -> MigrateResult<()> {
        db.create_table(&self.table, &Self::schema())?;
        Ok(())
    }

    fn lacks_applied_at(&self, db: &dyn Database) -> MigrateResult<bool> {
        let columns = db.columns(&self.table)?;
        Ok(!columns.iter().any(|c| c.name == APPLIED_AT_COLUMN))
    }

    fn add_applied_at(&self, db: &dyn Database) -> MigrateResult<()> {
        db.add_column(&self.table, &ColumnDef::new(APPLIED_AT_COLUMN, ColumnType::Text))
            .map_err(|e| self.upgrade_failure(format!("could not add {APPLIED_AT_COLUMN}: {e}")))
    }

    fn has_outdated_key(&self, db: &dyn Database) -> MigrateResult<bool> {
        let key = db.primary_key(&self.table)?;
        Ok(key != [SET_COLUMN, NAME_COLUMN])
    }

    /// Rebuild the table under the composite key in a single transaction.
    ///
    /// DuckDB cannot alter a primary key, so the old table is renamed aside,
    /// the current layout is created under the real name, and the records
    /// are copied across with duplicate `(migration_set, name)` pairs
    /// collapsed to their earliest row.
    fn rebuild_with_composite_key(&self, db: &dyn Database) -> MigrateResult<()> {
        let columns = db.columns(&self.table)?;
        for required in [SET_COLUMN, NAME_COLUMN] {
            if !columns.iter().any(|c| c.name == required) {
                return Err(
                    self.upgrade_failure(format!("existing table has no {required} column"))
                );
            }
        }

        let (schema, bare) = split_table(&self.table);
        let previous_bare = format!("{bare}{PREVIOUS_SUFFIX}");
        let previous = match schema {
            Some(schema) => format!("{schema}.{previous_bare}"),
            None => previous_bare.clone(),
        };
        if db.table_exists(&previous)? {
            return Err(self.upgrade_failure(format!("{previous} already exists")));
        }

        log::info!(
            "Upgrading tracking table {} from primary key ({}) to ({SET_COLUMN}, {NAME_COLUMN})",
            self.table,
            db.primary_key(&self.table)?.join(", ")
        );

        let copied = with_transaction(db, |tx| -> dm_db::DbResult<usize> {
            tx.rename_table(&self.table, &previous_bare)?;
            tx.create_table(&self.table, &Self::schema())?;
            let copied = tx.copy_rows(
                &previous,
                &self.table,
                &[SET_COLUMN, NAME_COLUMN, APPLIED_AT_COLUMN],
            )?;
            tx.drop_table(&previous)?;
            Ok(copied)
        })
        .map_err(|e| self.upgrade_failure(e.to_string()))?;

        log::debug!(
            "Copied {copied} record(s) into rebuilt tracking table {}",
            self.table
        );
        Ok(())
    }

    fn upgrade_failure(&self, message: String) -> MigrateError {
        MigrateError::TrackingUpgradeFailure {
            table: self.table.clone(),
            message,
        }
    }
}

/// Split `schema.table` into its parts; `None` when unqualified.
fn split_table(name: &str) -> (Option<&str>, &str) {
    match name.rfind('.') {
        Some(pos) => (Some(&name[..pos]), &name[pos + 1..]),
        None => (None, name),
    }
}

fn text_at(row: &[Value], index: usize) -> String {
    row.get(index).map(Value::to_string).unwrap_or_default()
}

#[cfg(test)]
#[path = "tracking_test.rs"]
mod tests;
