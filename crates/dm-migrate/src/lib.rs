//! dm-migrate - Migration engine for duckmig
//!
//! Migration sets are ordered, named collections of steps. Applying a set
//! runs every step not yet recorded in the tracking table, each in its own
//! transaction together with its record. Several independent sets can share
//! one database and one tracking table.
//!
//! ```ignore
//! use dm_migrate::MigrationSet;
//!
//! let set = MigrationSet::builder("core")?
//!     .add("m001_dogs", |db| db.execute_batch("CREATE TABLE dogs (name VARCHAR)"))?
//!     .add("m002_cats", |db| db.execute_batch("CREATE TABLE cats (name VARCHAR)"))?
//!     .build();
//! set.apply(&db, None)?;
//! ```

pub mod error;
pub mod migration;
pub mod runner;
pub mod sql_files;
pub mod tracking;

pub use error::{MigrateError, MigrateResult};
pub use migration::{MigrationFn, MigrationSet, MigrationSetBuilder, MigrationStep};
pub use runner::ApplyReport;
pub use sql_files::{load_sql_set, load_sql_sets, validate_sql};
pub use tracking::{AppliedRecord, TrackingStore};
