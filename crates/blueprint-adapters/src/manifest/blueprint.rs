//! Blueprints declared in a manifest.

use std::sync::Arc;

use tracing::debug;

use blueprint_core::domain::{
    Blueprint, CodeWriter, ConfigInstance, ConfigSchema, DomainError, OperatorKind, Renderer,
    Schedule, SchemaValidator, Task, Timestamp, Value, WorkflowGraph,
};

use super::format::{BlueprintEntry, GraphSection};
use super::placeholder::{RenderError, interpolate, render_value};
use super::ManifestError;

/// A `[[blueprint]]` entry bound to its schema.
///
/// `render` builds the graph described by `[blueprint.graph]`;
/// `render_template` interpolates `source_template` when one is given and
/// otherwise serializes the rendered graph.
#[derive(Debug, Clone)]
pub struct ManifestBlueprint {
    class_name: String,
    bases: Vec<String>,
    doc: Option<String>,
    schema: Option<Arc<dyn SchemaValidator>>,
    graph: Option<GraphTemplate>,
    source_template: Option<String>,
}

#[derive(Debug, Clone)]
struct GraphTemplate {
    section: GraphSection,
    operators: Vec<OperatorKind>,
}

impl ManifestBlueprint {
    /// Check the declaration and bind it to `schema`.
    pub fn from_entry(
        entry: BlueprintEntry,
        schema: Option<ConfigSchema>,
    ) -> Result<Self, ManifestError> {
        let class = entry.class.trim().to_string();
        let declaration = |reason: String| ManifestError::Declaration {
            class: class.clone(),
            reason,
        };
        if class.is_empty() {
            return Err(declaration("class must not be empty".into()));
        }

        let graph = match entry.graph {
            Some(section) => Some(GraphTemplate::check(section).map_err(declaration)?),
            None => None,
        };

        Ok(Self {
            class_name: class,
            bases: entry.bases,
            doc: entry.doc.map(|d| d.trim().to_string()).filter(|d| !d.is_empty()),
            schema: schema.map(|s| Arc::new(s) as Arc<dyn SchemaValidator>),
            graph,
            source_template: entry.source_template,
        })
    }

    pub fn has_graph(&self) -> bool {
        self.graph.is_some()
    }

    pub fn has_source_template(&self) -> bool {
        self.source_template.is_some()
    }

    fn template_error(&self, err: impl ToString) -> DomainError {
        DomainError::Template {
            class: self.class_name.clone(),
            reason: err.to_string(),
        }
    }
}

impl GraphTemplate {
    /// Operator paths must parse and upstream ids must name tasks in the
    /// same graph.
    fn check(section: GraphSection) -> Result<Self, String> {
        let mut operators = Vec::with_capacity(section.tasks.len());
        for task in &section.tasks {
            let operator = OperatorKind::parse(&task.operator).ok_or_else(|| {
                format!(
                    "task '{}': operator '{}' is not a dotted 'module.Class' path",
                    task.task_id, task.operator
                )
            })?;
            operators.push(operator);
            if let Some(missing) = task
                .upstream
                .iter()
                .find(|up| !section.tasks.iter().any(|t| &t.task_id == *up))
            {
                return Err(format!(
                    "task '{}': upstream '{missing}' is not a task in this graph",
                    task.task_id
                ));
            }
        }
        Ok(Self { section, operators })
    }

    fn render(&self, config: &ConfigInstance) -> Result<WorkflowGraph, GraphError> {
        let section = &self.section;
        let mut graph = WorkflowGraph::new(interpolate(&section.dag_id, config)?);

        if let Some(description) = &section.description {
            graph.description = Some(interpolate(description, config)?);
        }
        if let Some(schedule) = &section.schedule {
            graph.schedule = schedule_value(render_value(schedule, config)?)?;
        }
        if let Some(schedule) = &section.schedule_interval {
            graph.schedule_interval = schedule_value(render_value(schedule, config)?)?;
        }
        if let Some(start) = &section.start_date {
            graph.start_date = start_date(render_value(start, config)?)?;
        }
        if let Some(catchup) = &section.catchup {
            graph.catchup = match render_value(catchup, config)? {
                Value::Bool(b) => b,
                other => return Err(GraphError::shape("catchup", "a boolean", &other)),
            };
        }
        graph.tags = section
            .tags
            .iter()
            .map(|tag| interpolate(tag, config))
            .collect::<Result<_, _>>()?;
        for (key, value) in &section.default_args {
            graph.set_default_arg(key.as_str(), render_value(value, config)?);
        }

        for (entry, operator) in section.tasks.iter().zip(&self.operators) {
            let mut task = Task::new(&entry.task_id, operator.clone());
            for (key, value) in &entry.params {
                task.set_param(key.as_str(), render_value(value, config)?);
            }
            graph.add_task(task)?;
        }
        for entry in &section.tasks {
            for upstream in &entry.upstream {
                graph.set_upstream(&entry.task_id, upstream)?;
            }
        }
        Ok(graph)
    }
}

enum GraphError {
    Render(String),
    Domain(DomainError),
}

impl GraphError {
    fn shape(field: &str, expected: &str, got: &Value) -> Self {
        Self::Render(format!("{field} must be {expected}, got {}", got.type_name()))
    }
}

impl From<RenderError> for GraphError {
    fn from(e: RenderError) -> Self {
        Self::Render(e.to_string())
    }
}

impl From<DomainError> for GraphError {
    fn from(e: DomainError) -> Self {
        Self::Domain(e)
    }
}

fn schedule_value(value: Value) -> Result<Option<Schedule>, GraphError> {
    match value {
        Value::None => Ok(None),
        Value::Str(expr) => Ok(Some(Schedule::Expression(expr))),
        Value::Duration(every) => Ok(Some(Schedule::Interval(every))),
        other => Err(GraphError::shape("schedule", "a string or timedelta", &other)),
    }
}

fn start_date(value: Value) -> Result<Option<Timestamp>, GraphError> {
    match value {
        Value::None => Ok(None),
        Value::DateTime(ts) => Ok(Some(ts)),
        Value::Str(text) => Timestamp::parse(&text)
            .map(Some)
            .ok_or_else(|| GraphError::Render(format!("start_date '{text}' is not a date-time"))),
        other => Err(GraphError::shape("start_date", "a date-time", &other)),
    }
}

impl Renderer for ManifestBlueprint {
    fn class_name(&self) -> &str {
        &self.class_name
    }

    fn render(&self, config: &ConfigInstance) -> Result<WorkflowGraph, DomainError> {
        let Some(graph) = &self.graph else {
            return Err(DomainError::RenderNotImplemented {
                class: self.class_name.clone(),
            });
        };
        debug!(class = %self.class_name, "rendering manifest graph");
        graph.render(config).map_err(|e| match e {
            GraphError::Render(reason) => self.template_error(reason),
            GraphError::Domain(e) => e,
        })
    }

    fn render_template(&self, config: &ConfigInstance) -> Result<String, DomainError> {
        match &self.source_template {
            Some(template) => interpolate(template, config).map_err(|e| self.template_error(e)),
            None => CodeWriter::default().write(&self.render(config)?),
        }
    }
}

impl Blueprint for ManifestBlueprint {
    fn bases(&self) -> &[String] {
        &self.bases
    }

    fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    fn schema(&self) -> Option<Arc<dyn SchemaValidator>> {
        self.schema.clone()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::manifest::Manifest;

    const MANIFEST: &str = r#"
        [[blueprint]]
        class = "NightlyLoad"
        bases = ["Blueprint[LoadConfig]"]
        doc = """
            Nightly load.
        """

        [blueprint.graph]
        dag_id = "{{ job_id }}"
        description = "Load {{ table }}"
        schedule = "{{ schedule }}"
        start_date = 2024-01-01T00:00:00Z
        catchup = "{{ catchup }}"
        tags = ["load", "{{ table }}"]

        [blueprint.graph.default_args]
        owner = "data-team"
        retries = "{{ retries }}"
        retry_delay = { timedelta = { minutes = 5 } }

        [[blueprint.graph.tasks]]
        task_id = "extract"
        operator = "airflow.operators.bash.BashOperator"
        [blueprint.graph.tasks.params]
        bash_command = "echo {{ table }}"

        [[blueprint.graph.tasks]]
        task_id = "load"
        operator = "airflow.operators.python.PythonOperator"
        upstream = ["extract"]
        [blueprint.graph.tasks.params.python_callable]
        callable = "load_rows"
    "#;

    fn nightly() -> ManifestBlueprint {
        let mut manifest: Manifest = toml::from_str(MANIFEST).unwrap();
        ManifestBlueprint::from_entry(manifest.blueprint.remove(0), None).unwrap()
    }

    fn config() -> ConfigInstance {
        ConfigInstance::new(
            "LoadConfig",
            vec![
                ("job_id".into(), json!("nightly_orders")),
                ("table".into(), json!("orders")),
                ("schedule".into(), json!("@daily")),
                ("catchup".into(), json!(false)),
                ("retries".into(), json!(2)),
            ],
        )
    }

    #[test]
    fn renders_graph_from_manifest() {
        let blueprint = nightly();
        assert_eq!(blueprint.doc(), Some("Nightly load."));

        let graph = blueprint.render(&config()).unwrap();
        assert_eq!(graph.dag_id(), "nightly_orders");
        assert_eq!(graph.description.as_deref(), Some("Load orders"));
        assert_eq!(graph.schedule, Some(Schedule::Expression("@daily".into())));
        assert!(graph.start_date.unwrap().is_timezone_aware());
        assert!(!graph.catchup);
        assert_eq!(graph.tags, ["load", "orders"]);
        assert_eq!(
            graph.default_args,
            vec![
                ("owner".to_string(), Value::Str("data-team".into())),
                ("retries".to_string(), Value::Int(2)),
                ("retry_delay".to_string(), Value::Duration(Duration::from_secs(300))),
            ]
        );

        assert_eq!(graph.edges(), [("extract", "load")]);
        let load = graph.task("load").unwrap();
        assert!(matches!(load.param("python_callable"), Some(Value::Callable(c)) if c.name == "load_rows"));
    }

    #[test]
    fn render_template_without_source_uses_code_writer() {
        let source = nightly().render_template(&config()).unwrap();
        assert!(source.contains("from airflow.operators.bash import BashOperator"));
        assert!(source.contains("extract >> load"));
    }

    #[test]
    fn source_template_is_interpolated() {
        let entry: Manifest = toml::from_str(
            r##"
            [[blueprint]]
            class = "Raw"
            bases = ["Blueprint"]
            source_template = "# {{ job_id }}\nDAG_ID = '{{ job_id }}'\n"
            "##,
        )
        .unwrap();
        let blueprint =
            ManifestBlueprint::from_entry(entry.blueprint[0].clone(), None).unwrap();
        assert!(blueprint.has_source_template());
        assert!(!blueprint.has_graph());
        assert_eq!(
            blueprint.render_template(&config()).unwrap(),
            "# nightly_orders\nDAG_ID = 'nightly_orders'\n"
        );
        assert!(matches!(
            blueprint.render(&config()),
            Err(DomainError::RenderNotImplemented { .. })
        ));
    }

    #[test]
    fn unknown_placeholder_is_a_template_error() {
        let config = ConfigInstance::new("LoadConfig", vec![("job_id".into(), json!("x"))]);
        let err = nightly().render(&config).unwrap_err();
        assert!(matches!(err, DomainError::Template { class, .. } if class == "NightlyLoad"));
    }

    #[test]
    fn bad_operator_and_upstream_fail_at_load() {
        let manifest: Manifest = toml::from_str(
            r#"
            [[blueprint]]
            class = "Broken"
            [blueprint.graph]
            dag_id = "broken"
            [[blueprint.graph.tasks]]
            task_id = "a"
            operator = "BashOperator"
            "#,
        )
        .unwrap();
        let err = ManifestBlueprint::from_entry(manifest.blueprint[0].clone(), None).unwrap_err();
        assert!(err.to_string().contains("not a dotted 'module.Class' path"));

        let manifest: Manifest = toml::from_str(
            r#"
            [[blueprint]]
            class = "Broken"
            [blueprint.graph]
            dag_id = "broken"
            [[blueprint.graph.tasks]]
            task_id = "a"
            operator = "airflow.operators.empty.EmptyOperator"
            upstream = ["ghost"]
            "#,
        )
        .unwrap();
        let err = ManifestBlueprint::from_entry(manifest.blueprint[0].clone(), None).unwrap_err();
        assert_eq!(
            err.to_string(),
            "blueprint 'Broken': task 'a': upstream 'ghost' is not a task in this graph"
        );
    }
}
