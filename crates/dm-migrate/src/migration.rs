//! Migration sets and their registration.

use crate::error::{MigrateError, MigrateResult};
use dm_core::{MigrationName, SetName};
use dm_db::{Database, DbResult};
use std::fmt;

/// Action run for a migration step.
///
/// The action receives the database inside the step's transaction and
/// must not commit or roll back on its own.
pub type MigrationFn = Box<dyn Fn(&dyn Database) -> DbResult<()>>;

/// A named, registered step of a migration set.
pub struct MigrationStep {
    name: MigrationName,
    action: MigrationFn,
}

impl MigrationStep {
    /// Step name, unique within its set
    pub fn name(&self) -> &MigrationName {
        &self.name
    }

    /// Run the step's action against `db`.
    pub fn run(&self, db: &dyn Database) -> DbResult<()> {
        (self.action)(db)
    }
}

impl fmt::Debug for MigrationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationStep")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// An ordered, named collection of migration steps.
///
/// Steps apply in registration order. Names never imply order.
#[derive(Debug)]
pub struct MigrationSet {
    name: SetName,
    steps: Vec<MigrationStep>,
}

impl MigrationSet {
    /// Start building a set called `name`.
    ///
    /// ```ignore
    /// let set = MigrationSet::builder("core")?
    ///     .add("m001_dogs", |db| db.execute_batch("CREATE TABLE dogs (name VARCHAR)"))?
    ///     .build();
    /// ```
    pub fn builder(name: impl Into<String>) -> MigrateResult<MigrationSetBuilder> {
        Ok(MigrationSetBuilder {
            set: MigrationSet {
                name: SetName::try_new(name)?,
                steps: Vec::new(),
            },
        })
    }

    /// Set name
    pub fn name(&self) -> &SetName {
        &self.name
    }

    /// Steps in registration order
    pub fn steps(&self) -> &[MigrationStep] {
        &self.steps
    }

    /// Number of registered steps
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether no steps are registered
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Step names in registration order
    pub fn step_names(&self) -> Vec<&MigrationName> {
        self.steps.iter().map(MigrationStep::name).collect()
    }

    /// Whether a step called `name` is registered
    pub fn contains(&self, name: &str) -> bool {
        self.steps.iter().any(|s| s.name == name)
    }

    /// Position of `name` in registration order
    pub(crate) fn position(&self, name: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.name == name)
    }
}

/// Registers steps into a [`MigrationSet`], rejecting duplicate names.
#[derive(Debug)]
pub struct MigrationSetBuilder {
    set: MigrationSet,
}

impl MigrationSetBuilder {
    /// Register a step after every step added so far.
    ///
    /// Fails with [`MigrateError::DuplicateMigrationName`] when the set
    /// already has a step called `name`.
    pub fn add<F>(mut self, name: impl Into<String>, action: F) -> MigrateResult<Self>
    where
        F: Fn(&dyn Database) -> DbResult<()> + 'static,
    {
        let name = MigrationName::try_new(name)?;
        if self.set.contains(&name) {
            return Err(MigrateError::DuplicateMigrationName {
                set: self.set.name.clone(),
                name,
            });
        }
        log::debug!("Registered migration {}/{}", self.set.name, name);
        self.set.steps.push(MigrationStep {
            name,
            action: Box::new(action),
        });
        Ok(self)
    }

    /// Finish registration
    pub fn build(self) -> MigrationSet {
        self.set
    }
}

#[cfg(test)]
#[path = "migration_test.rs"]
mod tests;
