//! Command tests for the `insights` binary.

use std::fs;

use tempfile::tempdir;

use super::common::{run_mock, write_config};

#[test]
fn test_tables_command() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), "sales", dir.path());

    let (code, stdout, _) = run_mock(&config, &["tables"]);

    assert_eq!(code, 0);
    assert_eq!(stdout, "Tables in sales:\n  - orders\n  - customers\n");
}

#[test]
fn test_query_command_wraps_and_formats() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), "sales", dir.path());

    let (code, stdout, _) = run_mock(&config, &["query", "SELECT 1", "--max-rows", "3"]);

    assert_eq!(code, 0);
    assert!(stdout.starts_with("Query ID: mock-0001\nColumns: result\nTotal rows: 1\n"));
    assert!(stdout.contains("Mock result for: SELECT * FROM ("));
}

#[test]
fn test_describe_full_shows_partitions() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), "sales", dir.path());

    let (code, stdout, _) = run_mock(&config, &["describe", "orders", "--full"]);

    assert_eq!(code, 0);
    assert!(stdout.contains("**Partition columns**"));
    assert!(stdout.contains("| dt | string |  |"));
}

#[test]
fn test_tools_command_prints_json() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), "sales", dir.path());

    let (code, stdout, _) = run_mock(&config, &["tools"]);

    assert_eq!(code, 0);
    let tools: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(tools.as_array().map(Vec::len), Some(5));
    assert_eq!(tools[0]["name"], "run_query");
}

#[test]
fn test_resource_commands() {
    let dir = tempdir().unwrap();
    let knowledge = dir.path().join("knowledge");
    fs::create_dir_all(knowledge.join("queries")).unwrap();
    fs::write(knowledge.join("metrics.txt"), "GMV = sum(amount)").unwrap();
    fs::write(knowledge.join("queries").join("Daily revenue.sql"), "SELECT 1").unwrap();
    let config = write_config(dir.path(), "sales", &knowledge);

    let (code, stdout, _) = run_mock(&config, &["resources"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("insights://knowledge/queries/daily-revenue"));

    let (code, stdout, _) = run_mock(&config, &["resource", "insights://knowledge/metrics"]);
    assert_eq!(code, 0);
    assert_eq!(stdout, "GMV = sum(amount)\n");
}

#[test]
fn test_invalid_config_exits_with_error() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("config.toml");
    fs::write(&config, "[warehouse]\npage_size = 5000\n").unwrap();

    let (code, stdout, stderr) = run_mock(&config, &["tables"]);

    assert_eq!(code, 1);
    assert!(stdout.is_empty());
    assert!(stderr.contains("page_size"), "stderr: {stderr}");
}

#[test]
fn test_generate_writes_catalog_and_examples() {
    let dir = tempdir().unwrap();
    let knowledge = dir.path().join("knowledge");
    fs::create_dir_all(knowledge.join("queries")).unwrap();
    fs::write(
        knowledge.join("queries").join("Order totals.sql"),
        "SELECT amount FROM sales.orders\n",
    )
    .unwrap();
    let config = write_config(dir.path(), "sales", &knowledge);

    let (code, stdout, stderr) = run_mock(&config, &["generate", "--ddl"]);

    assert_eq!(code, 0, "stderr: {stderr}");
    assert!(stdout.contains("catalog.txt"));
    assert!(stdout.contains("examples.txt"));

    let catalog = fs::read_to_string(knowledge.join("catalog.txt")).unwrap();
    assert!(catalog.starts_with("# Data catalog (generated)"));
    assert!(catalog.contains("### `sales.orders`"));
    assert!(catalog.contains("CREATE EXTERNAL TABLE"));

    let examples = fs::read_to_string(knowledge.join("examples.txt")).unwrap();
    assert!(examples.contains("## Order totals"));
    assert!(examples.contains("**Result preview**"));

    let (code, stdout, _) = run_mock(&config, &["resource", "insights://knowledge/catalog"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("### `sales.orders`"));
}
