//! List command implementation

use anyhow::{Context, Result};
use dm_db::Database;
use dm_migrate::{AppliedRecord, MigrationSet, TrackingStore};
use serde::Serialize;

use crate::cli::{GlobalArgs, ListArgs, ListOutput};
use crate::commands::common::{
    database_path, load_config, load_sets, open_database, selected_sets, tracking_store,
};

/// Applied and pending migrations of one set
#[derive(Debug, Serialize)]
struct SetStatus {
    set: String,
    applied: Vec<AppliedRecord>,
    pending: Vec<String>,
}

/// Execute the list command
pub fn execute(args: &ListArgs, global: &GlobalArgs) -> Result<()> {
    let config = load_config(global)?;
    let selected = selected_sets(&config, args.set.as_deref())?;
    let sets = load_sets(&config, &selected)?;

    let db = open_database(&database_path(&config, global), global)?;
    let store = tracking_store(&config);
    let statuses = sets
        .iter()
        .map(|set| set_status(set, &store, &db))
        .collect::<Result<Vec<_>>>()?;

    match args.output {
        ListOutput::Table => print_table(&statuses),
        ListOutput::Json => print_json(&statuses)?,
    }
    Ok(())
}

fn set_status(set: &MigrationSet, store: &TrackingStore, db: &dyn Database) -> Result<SetStatus> {
    let applied = set
        .applied_with(store, db)
        .with_context(|| format!("Failed to read applied migrations for '{}'", set.name()))?;
    let pending = set
        .pending_with(store, db)
        .with_context(|| format!("Failed to read pending migrations for '{}'", set.name()))?
        .into_iter()
        .map(|step| step.name().to_string())
        .collect();

    Ok(SetStatus {
        set: set.name().to_string(),
        applied,
        pending,
    })
}

/// Print migrations in table format
fn print_table(statuses: &[SetStatus]) {
    let set_width = statuses
        .iter()
        .map(|s| s.set.len())
        .max()
        .unwrap_or(3)
        .max(3);
    let name_width = statuses
        .iter()
        .flat_map(|s| {
            s.applied
                .iter()
                .map(|r| r.name.len())
                .chain(s.pending.iter().map(String::len))
        })
        .max()
        .unwrap_or(9)
        .max(9);
    let status_width = 7;

    println!(
        "{:<set_width$}  {:<name_width$}  {:<status_width$}  APPLIED_AT",
        "SET", "MIGRATION", "STATUS"
    );
    println!(
        "{:-<set_width$}  {:-<name_width$}  {:-<status_width$}  {}",
        "",
        "",
        "",
        "-".repeat(27)
    );

    for status in statuses {
        for record in &status.applied {
            println!(
                "{:<set_width$}  {:<name_width$}  {:<status_width$}  {}",
                status.set,
                record.name.as_str(),
                "applied",
                record.applied_at.as_deref().unwrap_or("-")
            );
        }
        for name in &status.pending {
            println!(
                "{:<set_width$}  {:<name_width$}  {:<status_width$}  -",
                status.set, name, "pending"
            );
        }
    }

    let applied: usize = statuses.iter().map(|s| s.applied.len()).sum();
    let pending: usize = statuses.iter().map(|s| s.pending.len()).sum();
    println!();
    println!("{applied} applied, {pending} pending");
}

/// Print migrations in JSON format
fn print_json(statuses: &[SetStatus]) -> Result<()> {
    let json = serde_json::to_string_pretty(statuses).context("Failed to serialize to JSON")?;
    println!("{}", json);
    Ok(())
}

#[cfg(test)]
#[path = "list_test.rs"]
mod tests;
