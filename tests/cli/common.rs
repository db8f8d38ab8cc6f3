//! Common test utilities for CLI tests.

use std::path::Path;
use std::process::Command;

/// Environment variables that would override the test config.
const OVERRIDES: &[&str] = &[
    "INSIGHTS_WORKGROUP",
    "INSIGHTS_DATABASE",
    "AWS_REGION",
    "INSIGHTS_ENDPOINT",
    "INSIGHTS_BEARER_TOKEN",
];

/// Writes a config file selecting `database` and `knowledge_dir`.
pub fn write_config(dir: &Path, database: &str, knowledge_dir: &Path) -> std::path::PathBuf {
    let path = dir.join("config.toml");
    let content = format!(
        "[warehouse]\ndatabase = \"{database}\"\npoll_interval_ms = 5\n\n[knowledge]\ndir = {:?}\n",
        knowledge_dir.display().to_string()
    );
    std::fs::write(&path, content).expect("Failed to write config");
    path
}

/// Runs `insights --mock --config <config> <args>` and returns (exit code, stdout, stderr).
pub fn run_mock(config: &Path, args: &[&str]) -> (i32, String, String) {
    let mut command = Command::new(env!("CARGO_BIN_EXE_insights"));
    command
        .arg("--mock")
        .arg("--config")
        .arg(config)
        .args(args)
        .current_dir(config.parent().unwrap_or(Path::new(".")))
        .env("RUST_LOG", "warn");
    for var in OVERRIDES {
        command.env_remove(var);
    }

    let output = command.output().expect("Failed to execute command");

    let exit_code = output.status.code().unwrap_or(-1);
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    (exit_code, stdout, stderr)
}
