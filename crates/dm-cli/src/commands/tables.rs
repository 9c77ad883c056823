//! Tables command implementation

use anyhow::{Context, Result};
use dm_db::Database;

use crate::cli::GlobalArgs;
use crate::commands::common::{database_path, load_config, open_database};

/// Execute the tables command
pub fn execute(global: &GlobalArgs) -> Result<()> {
    // --database is enough on its own; the config is only needed without it
    let path = match &global.database {
        Some(path) => path.clone(),
        None => database_path(&load_config(global)?, global),
    };
    let db = open_database(&path, global)?;

    let tables = db.table_names().context("Failed to list tables")?;
    for table in &tables {
        println!("{table}");
    }
    if global.verbose {
        eprintln!("[verbose] {} table(s)", tables.len());
    }
    Ok(())
}
