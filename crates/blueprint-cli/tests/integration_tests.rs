//! Integration tests for the `blueprint` binary.

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const MANIFEST: &str = include_str!("../../blueprint-adapters/templates/daily_etl.toml");

const CUSTOMER_CONFIG: &str = "\
blueprint: daily_etl
job_id: customer_etl
source_table: raw.customers
target_table: clean.customers
retries: 3
";

/// A project directory with the example manifest under `templates/`.
fn project() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "templates/daily_etl.toml", MANIFEST);
    dir
}

fn write(root: &Path, rel: &str, text: &str) -> PathBuf {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, text).unwrap();
    path
}

/// The binary, isolated from the user's config and Airflow install.
fn blueprint(root: &Path) -> Command {
    let mut cmd = Command::cargo_bin("blueprint").unwrap();
    cmd.current_dir(root)
        .env("XDG_CONFIG_HOME", root.join(".xdg"))
        .env("BLUEPRINT_LINT__ENABLED", "false")
        .env("NO_COLOR", "1")
        .env_remove("AIRFLOW_HOME")
        .env_remove("BLUEPRINT_TEMPLATE_PATH")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help_lists_subcommands() {
    let dir = project();
    blueprint(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("render"))
        .stdout(predicate::str::contains("lint"));
}

#[test]
fn test_version_flag() {
    let dir = project();
    blueprint(dir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_list_names() {
    let dir = project();
    blueprint(dir.path())
        .args(["list", "--template-dir", "templates", "--format", "list"])
        .assert()
        .success()
        .stdout("daily_etl\nhello_world\n");
}

#[test]
fn test_list_json() {
    let dir = project();
    let out = blueprint(dir.path())
        .args(["list", "--template-dir", "templates", "--format", "json"])
        .output()
        .unwrap();
    assert!(out.status.success());

    let listed: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    let listed = listed.as_array().unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0]["name"], "daily_etl");
    assert_eq!(listed[0]["class"], "DailyETL");
}

#[test]
fn test_list_table_uses_project_config() {
    let dir = project();
    write(dir.path(), "blueprint.toml", "[templates]\ndirs = [\"templates\"]\n");
    blueprint(dir.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("Available Blueprints:"))
        .stdout(predicate::str::contains("NAME"))
        .stdout(predicate::str::contains("DailyETL"));
}

#[test]
fn test_describe_shows_parameters_and_example() {
    let dir = project();
    blueprint(dir.path())
        .args(["describe", "daily_etl", "--template-dir", "templates"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Blueprint: daily_etl"))
        .stdout(predicate::str::contains("retries"))
        .stdout(predicate::str::contains(">= 0, <= 5"))
        .stdout(predicate::str::contains("blueprint: daily_etl"))
        .stdout(predicate::str::contains("build(*, job_id"));
}

#[test]
fn test_schema_to_stdout_and_file() {
    let dir = project();
    let out = blueprint(dir.path())
        .args(["schema", "daily_etl", "--template-dir", "templates"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let schema: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(schema["$schema"], "http://json-schema.org/draft-07/schema#");
    assert_eq!(schema["properties"]["blueprint"]["const"], "daily_etl");
    assert_eq!(schema["required"][0], "blueprint");

    blueprint(dir.path())
        .args(["schema", "daily_etl", "--template-dir", "templates"])
        .args(["-o", "schemas/daily_etl.json"])
        .assert()
        .success();
    let written = fs::read_to_string(dir.path().join("schemas/daily_etl.json")).unwrap();
    assert!(written.contains("\"$schema\""));
}

#[test]
fn test_render_writes_dag_to_output() {
    let dir = project();
    write(dir.path(), "configs/customer.dag.yaml", CUSTOMER_CONFIG);

    blueprint(dir.path())
        .args(["render", "configs/customer.dag.yaml", "--template-dir", "templates"])
        .args(["-o", "dags/customer_etl.py"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Generated DAG 'customer_etl'"));

    let source = fs::read_to_string(dir.path().join("dags/customer_etl.py")).unwrap();
    assert!(source.starts_with("\"\"\"Auto-generated DAG file from Blueprint.\"\"\""));
    assert!(source.contains("dag_id=\"customer_etl\""));
    assert!(source.contains("BashOperator"));
}

#[test]
fn test_render_uses_configured_dags_folder() {
    let dir = project();
    write(dir.path(), "customer.dag.yaml", CUSTOMER_CONFIG);
    write(
        dir.path(),
        "blueprint.toml",
        "[templates]\ndirs = [\"templates\"]\n\n[output]\ndags_folder = \"airflow/dags\"\n",
    );

    blueprint(dir.path())
        .args(["render", "customer.dag.yaml", "--no-lint"])
        .assert()
        .success();
    assert!(dir.path().join("airflow/dags/customer_etl.py").is_file());
}

#[test]
fn test_render_dry_run_prints_source() {
    let dir = project();
    write(dir.path(), "customer.dag.yaml", CUSTOMER_CONFIG);

    blueprint(dir.path())
        .args(["render", "customer.dag.yaml", "--template-dir", "templates"])
        .args(["--dry-run", "--set", "job_id=override_etl"])
        .assert()
        .success()
        .stdout(predicate::str::contains("dag_id=\"override_etl\""));
    assert!(!dir.path().join("dags").exists());
}

#[test]
fn test_render_template_strategy() {
    let dir = project();
    write(
        dir.path(),
        "hello.dag.yaml",
        "blueprint: hello_world\njob_id: hello_dag\n",
    );

    blueprint(dir.path())
        .args(["render", "hello.dag.yaml", "--template-dir", "templates"])
        .args(["--strategy", "template", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("dag_id=\"hello_dag\""))
        .stdout(predicate::str::contains("Hello, world"));
}

#[test]
fn test_lint_valid_configs() {
    let dir = project();
    write(dir.path(), "configs/customer.dag.yaml", CUSTOMER_CONFIG);

    blueprint(dir.path())
        .args(["lint", "configs", "--template-dir", "templates"])
        .assert()
        .success()
        .stdout(predicate::str::contains("customer.dag.yaml - Valid"))
        .stdout(predicate::str::contains("1 config(s) valid"));
}

#[test]
fn test_lint_without_configs_warns() {
    let dir = project();
    blueprint(dir.path())
        .args(["lint", "--template-dir", "templates"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No configuration files found."));
}

#[test]
fn test_init_creates_project_files() {
    let dir = tempfile::tempdir().unwrap();
    blueprint(dir.path()).arg("init").assert().success();

    assert!(dir.path().join("blueprint.toml").is_file());
    assert!(dir.path().join("templates/daily_etl.toml").is_file());

    blueprint(dir.path())
        .args(["list", "--format", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("daily_etl"));
}

#[test]
fn test_completions_bash() {
    let dir = project();
    blueprint(dir.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("blueprint"));
}
