//! Tests for error reporting, suggestions and exit codes.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const MANIFEST: &str = include_str!("../../blueprint-adapters/templates/daily_etl.toml");

fn project() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "templates/daily_etl.toml", MANIFEST);
    dir
}

fn write(root: &Path, rel: &str, text: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, text).unwrap();
}

fn blueprint(root: &Path) -> Command {
    let mut cmd = Command::cargo_bin("blueprint").unwrap();
    cmd.current_dir(root)
        .env("XDG_CONFIG_HOME", root.join(".xdg"))
        .env("BLUEPRINT_LINT__ENABLED", "false")
        .env("NO_COLOR", "1")
        .env_remove("AIRFLOW_HOME")
        .env_remove("BLUEPRINT_TEMPLATE_PATH");
    cmd
}

#[test]
fn test_unknown_blueprint_suggests_close_names() {
    let dir = project();
    blueprint(dir.path())
        .args(["describe", "daly_etl", "--template-dir", "templates"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Blueprint 'daly_etl' not found"))
        .stderr(predicate::str::contains("Did you mean 'daily_etl'?"));
}

#[test]
fn test_malformed_yaml_reports_position() {
    let dir = project();
    write(
        dir.path(),
        "broken.dag.yaml",
        "blueprint: daily_etl\njob_id: [unclosed\n",
    );

    blueprint(dir.path())
        .args(["render", "broken.dag.yaml", "--template-dir", "templates", "--dry-run"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("Configuration Error in broken.dag.yaml"))
        .stderr(predicate::str::contains("Line"));
}

#[test]
fn test_missing_blueprint_key() {
    let dir = project();
    write(dir.path(), "orphan.dag.yaml", "job_id: orphan\n");

    blueprint(dir.path())
        .args(["render", "orphan.dag.yaml", "--template-dir", "templates", "--dry-run"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("Missing required field 'blueprint'"));
}

#[test]
fn test_invalid_parameters_fail_validation() {
    let dir = project();
    write(
        dir.path(),
        "bad.dag.yaml",
        "blueprint: daily_etl\njob_id: bad_retries\nsource_table: a\ntarget_table: b\nretries: 9\n",
    );

    blueprint(dir.path())
        .args(["render", "bad.dag.yaml", "--template-dir", "templates", "--dry-run"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("Configuration validation failed"))
        .stderr(predicate::str::contains("blueprint describe daily_etl"));
}

#[test]
fn test_lint_reports_every_invalid_config() {
    let dir = project();
    write(
        dir.path(),
        "configs/good.dag.yaml",
        "blueprint: daily_etl\njob_id: good\nsource_table: a\ntarget_table: b\n",
    );
    write(
        dir.path(),
        "configs/missing.dag.yaml",
        "blueprint: daily_etl\njob_id: missing\n",
    );

    blueprint(dir.path())
        .args(["lint", "configs", "--template-dir", "templates"])
        .assert()
        .code(2)
        .stdout(predicate::str::contains("good.dag.yaml - Valid"))
        .stdout(predicate::str::contains("missing.dag.yaml"))
        .stderr(predicate::str::contains("1 invalid config(s)"));
}

#[test]
fn test_lint_detects_duplicate_dag_ids() {
    let dir = project();
    let config = "blueprint: daily_etl\njob_id: shared\nsource_table: a\ntarget_table: b\n";
    write(dir.path(), "configs/one.dag.yaml", config);
    write(dir.path(), "configs/two.dag.yaml", config);

    blueprint(dir.path())
        .args(["lint", "configs", "--template-dir", "templates"])
        .assert()
        .code(2)
        .stdout(predicate::str::contains("Duplicate DAG ID detected:"))
        .stdout(predicate::str::contains("shared"));
}

#[test]
fn test_missing_explicit_config_file() {
    let dir = project();
    blueprint(dir.path())
        .args(["--config", "nope.toml", "list"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("nope.toml"));
}

#[test]
fn test_invalid_override_syntax() {
    let dir = project();
    blueprint(dir.path())
        .args(["render", "x.dag.yaml", "--set", "no_equals_sign"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("KEY=VALUE"));
}

#[test]
fn test_quiet_and_verbose_conflict() {
    let dir = project();
    blueprint(dir.path())
        .args(["-q", "-v", "list"])
        .assert()
        .code(2);
}
