//! Strongly-typed migration identifiers.

use crate::newtype_string::define_newtype_string;

define_newtype_string! {
    /// Name of a migration set.
    ///
    /// Each set is tracked independently, so two sets may both contain a
    /// step called `m001` without colliding.
    pub struct SetName;
}

define_newtype_string! {
    /// Name of a single migration step, unique within its set.
    ///
    /// Names are identifiers, not sort keys: steps run in the order they
    /// were registered.
    pub struct MigrationName;
}

#[cfg(test)]
#[path = "names_test.rs"]
mod tests;
