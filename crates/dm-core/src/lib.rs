//! dm-core - Core library for duckmig
//!
//! Shared types used across the duckmig crates: strongly-typed set and step
//! names, the declarative table description handed to the database layer,
//! the value type crossing that boundary, and `duckmig.yml` parsing.

pub mod config;
pub mod error;
pub mod names;
mod newtype_string;
pub mod schema;
pub mod value;

pub use config::{Config, SetConfig};
pub use error::{CoreError, CoreResult};
pub use names::{MigrationName, SetName};
pub use schema::{ColumnDef, ColumnInfo, ColumnType, TableSchema};
pub use value::Value;
