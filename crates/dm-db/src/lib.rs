//! dm-db - Database capability layer for duckmig
//!
//! This crate provides the synchronous `Database` trait the migration engine
//! and migration steps program against, the `with_transaction` helper, and
//! the DuckDB implementation.

pub mod duckdb;
pub mod error;
pub mod traits;

pub use crate::duckdb::{quote_ident, quote_qualified, DuckDbBackend};
pub use error::{DbError, DbResult};
pub use traits::{with_transaction, Database};
