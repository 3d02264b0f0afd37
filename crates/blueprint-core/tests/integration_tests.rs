//! Integration tests for blueprint-core: registry -> build method -> code writer.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use blueprint_core::application::ports::{BlueprintLoader, DeclarationSummary, Filesystem};
use blueprint_core::domain::{
    CallableRef, ConfigSchema, DomainError, FieldType, SchemaField, Timestamp,
};
use blueprint_core::prelude::*;
use serde_json::json;

#[derive(Debug)]
struct DailyEtl {
    bases: Vec<String>,
    schema: Arc<dyn SchemaValidator>,
}

impl DailyEtl {
    fn new() -> Self {
        let schema = ConfigSchema::new(
            "DailyETLConfig",
            vec![
                SchemaField::new("job_id", FieldType::String).pattern("^[a-zA-Z0-9_-]+$"),
                SchemaField::new("source_table", FieldType::String),
                SchemaField::new("target_table", FieldType::String),
                SchemaField::new("schedule", FieldType::String).with_default(json!("@daily")),
                SchemaField::new("retries", FieldType::Integer)
                    .with_default(json!(2))
                    .minimum(0.0)
                    .maximum(5.0),
            ],
        )
        .unwrap();
        Self {
            bases: vec!["Blueprint[DailyETLConfig]".into()],
            schema: Arc::new(schema),
        }
    }
}

impl Renderer for DailyEtl {
    fn class_name(&self) -> &str {
        "DailyETL"
    }

    fn render(&self, config: &ConfigInstance) -> Result<WorkflowGraph, DomainError> {
        let source = config.get_str("source_table").unwrap_or_default();
        let target = config.get_str("target_table").unwrap_or_default();
        let bash = OperatorKind::new("airflow.operators.bash", "BashOperator");
        let python = OperatorKind::new("airflow.operators.python", "PythonOperator");

        let mut graph = WorkflowGraph::new(config.get_str("job_id").unwrap_or_default())
            .with_default_arg("owner", "data-team")
            .with_default_arg("retries", config.get_i64("retries").unwrap_or(0))
            .with_default_arg("retry_delay", Duration::from_secs(300))
            .with_description(format!("ETL from {source} to {target}"))
            .with_schedule(config.get_str("schedule").unwrap_or("@daily"))
            .with_start_date(Timestamp::utc(2024, 1, 1).unwrap())
            .with_tags(["etl", "blueprint"]);

        graph.add_task(
            Task::new("check_source_data", bash.clone())
                .with_param("bash_command", format!(r#"echo "Checking {source}""#)),
        )?;
        graph.add_task(
            Task::new("transform", python)
                .with_param("python_callable", CallableRef::new("transform_rows")),
        )?;
        graph.add_task(
            Task::new("load_data", bash).with_param("bash_command", format!("echo load {target}")),
        )?;
        graph.chain(&["check_source_data", "transform", "load_data"])?;
        Ok(graph)
    }
}

impl Blueprint for DailyEtl {
    fn bases(&self) -> &[String] {
        &self.bases
    }

    fn doc(&self) -> Option<&str> {
        Some("Daily ETL job that moves data between tables")
    }

    fn schema(&self) -> Option<Arc<dyn SchemaValidator>> {
        Some(Arc::clone(&self.schema))
    }
}

/// Serves one `DailyETL` declaration per listed file.
struct FixedLoader {
    files: Vec<PathBuf>,
}

impl BlueprintLoader for FixedLoader {
    fn candidates(&self, dir: &Path) -> BlueprintResult<Vec<PathBuf>> {
        Ok(self
            .files
            .iter()
            .filter(|f| f.parent() == Some(dir))
            .cloned()
            .collect())
    }

    fn load(&self, _path: &Path) -> BlueprintResult<Vec<Arc<dyn Blueprint>>> {
        Ok(vec![Arc::new(DailyEtl::new())])
    }

    fn scan(&self, _path: &Path) -> BlueprintResult<Vec<DeclarationSummary>> {
        Ok(vec![DeclarationSummary {
            class_name: "DailyETL".into(),
            bases: vec!["Blueprint[DailyETLConfig]".into()],
            doc: None,
        }])
    }
}

#[derive(Default)]
struct VecFilesystem {
    files: Mutex<BTreeMap<PathBuf, String>>,
}

impl Filesystem for VecFilesystem {
    fn create_dir_all(&self, _path: &Path) -> BlueprintResult<()> {
        Ok(())
    }

    fn write_file(&self, path: &Path, content: &str) -> BlueprintResult<()> {
        self.files
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), content.to_string());
        Ok(())
    }

    fn read_to_string(&self, path: &Path) -> BlueprintResult<String> {
        Ok(self.files.lock().unwrap().get(path).cloned().unwrap_or_default())
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.lock().unwrap().contains_key(path)
    }
}

fn registry(files: &[&str]) -> Registry {
    let loader = FixedLoader {
        files: files.iter().map(PathBuf::from).collect(),
    };
    Registry::new(
        SearchPaths::only(["/proj/a/templates", "/proj/b/templates"]),
        Arc::new(loader),
    )
}

#[test]
fn test_resolve_build_and_write() {
    let mut registry = registry(&["/proj/a/templates/daily_etl.toml"]);
    let descriptor = registry.resolve("daily_etl").unwrap();
    let build = descriptor.build_method().unwrap();
    assert_eq!(
        build.signature(),
        r#"build(*, job_id: str, source_table: str, target_table: str, schedule: str = "@daily", retries: int = 2)"#
    );

    let kwargs: Kwargs = json!({
        "job_id": "customer_etl",
        "source_table": "raw.customers",
        "target_table": "analytics.customers",
    })
    .as_object()
    .cloned()
    .unwrap();
    let graph = build.call(&kwargs).unwrap();

    let fs = VecFilesystem::default();
    let path = Path::new("/airflow/dags/customer_etl.py");
    CodeWriter::default().write_to(&graph, path, &fs).unwrap();

    let source = fs.read_to_string(path).unwrap();
    assert!(source.contains("dag_id=\"customer_etl\","));
    assert!(source.contains("bash_command='echo \"Checking raw.customers\"',"));
    assert!(source.contains("def transform_rows(**_):"));
    assert!(source.contains("check_source_data >> transform\ntransform >> load_data\n"));
}

#[test]
fn test_same_name_in_two_directories_is_a_conflict() {
    let mut registry = registry(&[
        "/proj/a/templates/daily_etl.toml",
        "/proj/b/templates/etl.toml",
    ]);

    let err = registry.list().unwrap_err();
    assert!(err.to_string().contains("daily_etl"));

    let err = registry.resolve("daily_etl").unwrap_err();
    let BlueprintError::Application(blueprint_core::application::ApplicationError::DuplicateName {
        locations,
        ..
    }) = err
    else {
        panic!("expected a duplicate-name error");
    };
    assert_eq!(
        locations,
        ["a/templates/daily_etl.toml", "b/templates/etl.toml"]
    );
}

#[test]
fn test_validation_error_names_field() {
    let mut registry = registry(&["/proj/a/templates/daily_etl.toml"]);
    let build = registry
        .resolve("daily_etl")
        .unwrap()
        .build_method()
        .cloned()
        .unwrap();

    let kwargs: Kwargs = json!({
        "job_id": "x",
        "source_table": "a",
        "target_table": "b",
        "retries": 9,
    })
    .as_object()
    .cloned()
    .unwrap();
    let err = build.call(&kwargs).unwrap_err();
    assert_eq!(
        err.as_validation().and_then(|v| v.field.as_deref()),
        Some("retries")
    );
}
