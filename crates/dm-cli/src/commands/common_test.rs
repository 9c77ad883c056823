use super::*;
use std::fs;
use tempfile::tempdir;

fn global(config: &Path, database: Option<&str>) -> GlobalArgs {
    GlobalArgs {
        verbose: false,
        config: config.display().to_string(),
        database: database.map(str::to_string),
    }
}

fn two_sets() -> Config {
    Config::parse(
        "database: app.duckdb
sets:
  - name: test
    dir: migrations/test
    steps: [m001]
  - name: test2
    dir: migrations/test2
    steps: [m001]
",
    )
    .unwrap()
}

#[test]
fn test_load_config_missing_file() {
    let temp = tempdir().unwrap();
    let err = load_config(&global(&temp.path().join("duckmig.yml"), None)).unwrap_err();
    assert!(format!("{err:#}").contains("Failed to load config"));
}

#[test]
fn test_database_override_wins() {
    let temp = tempdir().unwrap();
    let config_path = temp.path().join("duckmig.yml");
    fs::write(&config_path, "database: app.duckdb\nsets:\n  - {name: core, dir: m, steps: []}\n")
        .unwrap();
    let config = load_config(&global(&config_path, None)).unwrap();

    let from_config = database_path(&config, &global(&config_path, None));
    assert_eq!(
        from_config,
        temp.path().join("app.duckdb").display().to_string()
    );

    let overridden = database_path(&config, &global(&config_path, Some("other.duckdb")));
    assert_eq!(overridden, "other.duckdb");
}

#[test]
fn test_selected_sets() {
    let config = two_sets();

    let all: Vec<&str> = selected_sets(&config, None)
        .unwrap()
        .iter()
        .map(|s| s.name.as_str())
        .collect();
    assert_eq!(all, vec!["test", "test2"]);

    let one = selected_sets(&config, Some("test2")).unwrap();
    assert_eq!(one.len(), 1);
    assert_eq!(one[0].name, "test2");

    let err = selected_sets(&config, Some("nope")).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("Unknown migration set 'nope'"));
    assert!(message.contains("test, test2"));
}

#[test]
fn test_tracking_store_uses_configured_table() {
    let config = Config::parse(
        "tracking_table: history\nsets:\n  - {name: core, dir: m, steps: []}\n",
    )
    .unwrap();
    assert_eq!(tracking_store(&config).table(), "history");
}

#[test]
fn test_exit_code_displays_nothing() {
    let err: anyhow::Error = ExitCode(2).into();
    assert_eq!(err.to_string(), "");
    assert!(matches!(err.downcast_ref::<ExitCode>(), Some(ExitCode(2))));
}
