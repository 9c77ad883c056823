//! Apply command implementation

use anyhow::{Context, Result};
use dm_db::Database;
use std::collections::BTreeSet;

use crate::cli::{ApplyArgs, GlobalArgs};
use crate::commands::common::{
    database_path, load_config, load_sets, open_database, selected_sets, tracking_store, ExitCode,
};

/// Execute the apply command
pub fn execute(args: &ApplyArgs, global: &GlobalArgs) -> Result<()> {
    let config = load_config(global)?;
    let selected = selected_sets(&config, args.set.as_deref())?;
    let sets = load_sets(&config, &selected)?;

    let db = open_database(&database_path(&config, global), global)?;
    let store = tracking_store(&config);
    let tables_before: BTreeSet<String> = db
        .table_names()
        .context("Failed to list tables")?
        .into_iter()
        .collect();

    let mut applied_count = 0;
    let mut skipped_count = 0;

    for set in &sets {
        println!("Applying set '{}' ({} migrations)", set.name(), set.len());

        match set.apply_with(&store, &db, args.stop_before.as_deref()) {
            Ok(report) => {
                for name in &report.applied {
                    println!("  ✓ {name}");
                }
                if let Some(stop) = &report.stopped_before {
                    println!("  Stopped before {stop}");
                }
                if report.is_noop() && global.verbose {
                    eprintln!("[verbose] Nothing to apply in '{}'", set.name());
                }
                applied_count += report.applied.len();
                skipped_count += report.already_applied;
            }
            Err(e) => {
                eprintln!("  ✗ {e}");
                println!();
                println!("Applied {applied_count} migration(s) before the failure");
                return Err(ExitCode(1).into());
            }
        }
    }

    if global.verbose {
        let tables_after = db.table_names().context("Failed to list tables")?;
        let created: Vec<&String> = tables_after
            .iter()
            .filter(|t| !tables_before.contains(*t))
            .collect();
        for table in created {
            eprintln!("[verbose] Created table: {table}");
        }
    }

    println!();
    println!("Applied {applied_count} migration(s), {skipped_count} already applied");
    Ok(())
}

#[cfg(test)]
#[path = "apply_test.rs"]
mod tests;
