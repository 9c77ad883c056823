//! Applying migration sets.

use crate::error::{MigrateError, MigrateResult};
use crate::migration::{MigrationSet, MigrationStep};
use crate::tracking::{AppliedRecord, TrackingStore};
use dm_core::{MigrationName, SetName};
use dm_db::{with_transaction, Database};
use serde::Serialize;

/// Outcome of a single `apply` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    /// Set that was applied
    pub set: SetName,
    /// Steps applied by this call, in order
    pub applied: Vec<MigrationName>,
    /// Steps skipped because they were already recorded
    pub already_applied: usize,
    /// Step the run stopped at, when `stop_before` named a pending step
    pub stopped_before: Option<MigrationName>,
}

impl ApplyReport {
    fn new(set: &SetName) -> Self {
        Self {
            set: set.clone(),
            applied: Vec::new(),
            already_applied: 0,
            stopped_before: None,
        }
    }

    /// True when nothing was applied
    pub fn is_noop(&self) -> bool {
        self.applied.is_empty()
    }
}

impl MigrationSet {
    /// Apply every pending step in registration order, using the default
    /// tracking table.
    ///
    /// See [`MigrationSet::apply_with`].
    pub fn apply(
        &self,
        db: &dyn Database,
        stop_before: Option<&str>,
    ) -> MigrateResult<ApplyReport> {
        self.apply_with(&TrackingStore::default(), db, stop_before)
    }

    /// Apply every pending step in registration order.
    ///
    /// Each step runs in its own transaction together with its tracking
    /// record, so a failing step leaves neither its changes nor a record
    /// behind and the error is returned as [`MigrateError::StepFailed`].
    /// Steps applied before the failure stay applied.
    ///
    /// When `stop_before` names a pending step, that step and everything
    /// after it are left for a later call. A name that is not registered,
    /// or is already applied, has no effect.
    pub fn apply_with(
        &self,
        store: &TrackingStore,
        db: &dyn Database,
        stop_before: Option<&str>,
    ) -> MigrateResult<ApplyReport> {
        store.ensure(db)?;
        let applied = store.applied_names(db, self.name())?;

        if let Some(stop) = stop_before {
            if !self.contains(stop) {
                log::warn!(
                    "stop_before '{stop}' is not a migration in set '{}'; ignoring it",
                    self.name()
                );
            }
        }

        let mut report = ApplyReport::new(self.name());
        for step in self.steps() {
            if applied.contains(step.name()) {
                log::debug!("Skipping {}/{}: already applied", self.name(), step.name());
                report.already_applied += 1;
                continue;
            }
            if stop_before.is_some_and(|stop| step.name() == stop) {
                log::debug!("Stopping before {}/{}", self.name(), step.name());
                report.stopped_before = Some(step.name().clone());
                break;
            }
            self.apply_step(store, db, step)?;
            report.applied.push(step.name().clone());
        }

        log::info!(
            "Set '{}': applied {} migration(s), {} already applied",
            self.name(),
            report.applied.len(),
            report.already_applied
        );
        Ok(report)
    }

    fn apply_step(
        &self,
        store: &TrackingStore,
        db: &dyn Database,
        step: &MigrationStep,
    ) -> MigrateResult<()> {
        log::debug!("Applying migration {}/{}", self.name(), step.name());
        with_transaction(db, |tx| {
            step.run(tx).map_err(|source| MigrateError::StepFailed {
                set: self.name().clone(),
                name: step.name().clone(),
                source,
            })?;
            store.record(tx, self.name(), step.name())
        })
    }

    /// Registered steps not yet recorded in the default tracking table.
    pub fn pending(&self, db: &dyn Database) -> MigrateResult<Vec<&MigrationStep>> {
        self.pending_with(&TrackingStore::default(), db)
    }

    /// Registered steps not yet recorded, in registration order.
    pub fn pending_with(
        &self,
        store: &TrackingStore,
        db: &dyn Database,
    ) -> MigrateResult<Vec<&MigrationStep>> {
        store.ensure(db)?;
        let applied = store.applied_names(db, self.name())?;
        Ok(self
            .steps()
            .iter()
            .filter(|s| !applied.contains(s.name()))
            .collect())
    }

    /// Records of this set in the default tracking table.
    pub fn applied(&self, db: &dyn Database) -> MigrateResult<Vec<AppliedRecord>> {
        self.applied_with(&TrackingStore::default(), db)
    }

    /// Tracking records of this set.
    ///
    /// Registered steps come first in registration order, followed by any
    /// recorded names no longer registered, oldest first.
    pub fn applied_with(
        &self,
        store: &TrackingStore,
        db: &dyn Database,
    ) -> MigrateResult<Vec<AppliedRecord>> {
        store.ensure(db)?;
        let mut records = store.applied_records(db, self.name())?;
        records.sort_by_key(|r| self.position(&r.name).unwrap_or(usize::MAX));
        Ok(records)
    }
}

#[cfg(test)]
#[path = "runner_test.rs"]
mod tests;
