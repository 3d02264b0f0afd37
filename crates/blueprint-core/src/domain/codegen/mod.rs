//! DAG source generation.
//!
//! [`CodeWriter`] serializes a live [`WorkflowGraph`] into a standalone,
//! re-loadable Airflow DAG module without consulting the template the graph
//! came from. The pipeline has four fixed stages, each a pure function of the
//! graph:
//!
//! 1. imports (fixed set + one per operator kind, deduplicated and sorted)
//! 2. the `dag = DAG(...)` header with conditionally included parameters
//! 3. one construction call per task, in insertion order
//! 4. one `a >> b` line per downstream edge
//!
//! ```
//! use blueprint_core::domain::{CodeWriter, OperatorKind, Task, WorkflowGraph};
//!
//! let mut graph = WorkflowGraph::new("hello");
//! graph
//!     .add_task(Task::new("say", OperatorKind::new("airflow.operators.bash", "BashOperator"))
//!         .with_param("bash_command", "echo hello"))
//!     .unwrap();
//!
//! let source = CodeWriter::default().write(&graph).unwrap();
//! assert!(source.contains("say = BashOperator("));
//! ```

pub mod literal;

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::debug;

use crate::domain::{
    CallableRef, DomainError, Schedule, Task, Value, WorkflowGraph, python_identifier,
};

pub const MODULE_DOCSTRING: &str = "\"\"\"Auto-generated DAG file from Blueprint.\"\"\"";

const BASE_IMPORTS: &[&str] = &[
    "from airflow import DAG",
    "from datetime import datetime, timedelta, timezone",
];

/// Module-level names a task variable must not shadow.
const RESERVED_NAMES: &[&str] = &["dag", "DAG", "datetime", "timedelta", "timezone"];

const INDENT: &str = "    ";

/// How the writer treats upstream/downstream sets that disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EdgePolicy {
    /// Serialize recorded downstream edges as they are.
    #[default]
    BestEffort,
    /// Reject graphs whose edges are not mirrored on both endpoints.
    Strict,
}

/// Serializes workflow graphs into DAG source text.
#[derive(Debug, Clone, Copy, Default)]
pub struct CodeWriter {
    policy: EdgePolicy,
}

impl CodeWriter {
    pub fn new(policy: EdgePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> EdgePolicy {
        self.policy
    }

    /// Generate the module source for `graph`.
    ///
    /// # Errors
    ///
    /// Under [`EdgePolicy::Strict`], when an edge is missing its mirror.
    /// Under either policy, when an inline callable source would define one
    /// of the module-level names; source-less callables are renamed instead.
    pub fn write(&self, graph: &WorkflowGraph) -> Result<String, DomainError> {
        if self.policy == EdgePolicy::Strict {
            graph.check_edge_consistency()?;
        }

        let callables = callable_names(graph.tasks())?;
        let variables = task_variables(graph.tasks(), &callables);

        let mut sections = vec![
            MODULE_DOCSTRING.to_string(),
            String::new(),
            imports(graph),
            String::new(),
            header(graph),
        ];

        let tasks = task_blocks(graph.tasks(), &variables, &callables);
        if !tasks.is_empty() {
            sections.push(String::new());
            sections.push(tasks);
        }

        let dependencies = dependency_lines(graph, &variables);
        if !dependencies.is_empty() {
            sections.push(String::new());
            sections.push(dependencies);
        }

        debug!(
            dag_id = graph.dag_id(),
            tasks = graph.tasks().len(),
            "generated DAG source"
        );

        let mut source = sections.join("\n");
        source.push('\n');
        Ok(source)
    }
}

fn imports(graph: &WorkflowGraph) -> String {
    let mut lines: BTreeSet<String> = BASE_IMPORTS.iter().map(|s| s.to_string()).collect();
    lines.extend(graph.tasks().iter().map(|t| t.operator.import_line()));
    lines.into_iter().collect::<Vec<_>>().join("\n")
}

fn header(graph: &WorkflowGraph) -> String {
    let mut params = vec![format!("{INDENT}dag_id={},", literal::quote(graph.dag_id()))];

    if !graph.default_args.is_empty() {
        let mut block = vec![format!("{INDENT}default_args={{")];
        for (key, value) in &graph.default_args {
            block.push(format!(
                "{INDENT}{INDENT}{}: {},",
                literal::quote(key),
                literal::value(value)
            ));
        }
        block.push(format!("{INDENT}}},"));
        params.push(block.join("\n"));
    }

    if let Some(description) = &graph.description {
        params.push(format!("{INDENT}description={},", literal::quote(description)));
    }

    if let Some(schedule) = graph.effective_schedule() {
        let rendered = match schedule {
            Schedule::Expression(expr) => literal::quote(expr),
            Schedule::Interval(every) => literal::duration(*every),
        };
        params.push(format!("{INDENT}schedule={rendered},"));
    }

    if let Some(start) = &graph.start_date {
        params.push(format!("{INDENT}start_date={},", literal::timestamp(start)));
    }

    params.push(format!(
        "{INDENT}catchup={},",
        if graph.catchup { "True" } else { "False" }
    ));

    if !graph.tags.is_empty() {
        let tags: Vec<String> = graph.tags.iter().map(|t| literal::quote(t)).collect();
        params.push(format!("{INDENT}tags=[{}],", tags.join(", ")));
    }

    format!("dag = DAG(\n{}\n)", params.join("\n"))
}

fn task_callables(task: &Task) -> impl Iterator<Item = &CallableRef> {
    task.params.iter().filter_map(|(_, value)| match value {
        Value::Callable(c) => Some(c),
        _ => None,
    })
}

/// Function name emitted for each callable, keyed by its declared name.
///
/// A source-less callable whose identifier is reserved gets a `_callable`
/// suffix; one with inline source cannot be renamed and is rejected.
fn callable_names(tasks: &[Task]) -> Result<HashMap<String, String>, DomainError> {
    let mut names = HashMap::new();
    let mut taken: HashSet<String> = RESERVED_NAMES.iter().map(|s| s.to_string()).collect();
    let mut clashing = Vec::new();

    for task in tasks {
        for callable in task_callables(task) {
            let ident = python_identifier(&callable.name);
            if !RESERVED_NAMES.contains(&ident.as_str()) {
                taken.insert(ident.clone());
                names.insert(callable.name.clone(), ident);
            } else if callable.source.is_some() {
                return Err(DomainError::ReservedCallable {
                    task_id: task.task_id.clone(),
                    name: callable.name.clone(),
                });
            } else {
                clashing.push((callable.name.clone(), ident));
            }
        }
    }

    for (name, ident) in clashing {
        if names.contains_key(&name) {
            continue;
        }
        let base = format!("{ident}_callable");
        let mut candidate = base.clone();
        let mut n = 2;
        while taken.contains(&candidate) {
            candidate = format!("{base}_{n}");
            n += 1;
        }
        taken.insert(candidate.clone());
        names.insert(name, candidate);
    }
    Ok(names)
}

/// Unique Python variable per task id.
fn task_variables(tasks: &[Task], callables: &HashMap<String, String>) -> HashMap<String, String> {
    let mut taken: HashSet<String> = RESERVED_NAMES.iter().map(|s| s.to_string()).collect();
    taken.extend(callables.values().cloned());

    let mut variables = HashMap::with_capacity(tasks.len());
    for task in tasks {
        let base = python_identifier(&task.task_id);
        let mut candidate = base.clone();
        let mut n = 2;
        while taken.contains(&candidate) {
            candidate = format!("{base}_{n}");
            n += 1;
        }
        taken.insert(candidate.clone());
        variables.insert(task.task_id.clone(), candidate);
    }
    variables
}

fn task_blocks(
    tasks: &[Task],
    variables: &HashMap<String, String>,
    callables: &HashMap<String, String>,
) -> String {
    let function = |callable: &CallableRef| {
        callables
            .get(&callable.name)
            .cloned()
            .unwrap_or_else(|| python_identifier(&callable.name))
    };

    let mut defined: HashSet<String> = HashSet::new();
    let mut blocks = Vec::with_capacity(tasks.len());

    for task in tasks {
        let mut parts = Vec::new();
        for callable in task_callables(task) {
            let name = function(callable);
            if defined.insert(name.clone()) {
                parts.push(callable_definition(&name, callable.source.as_deref()));
            }
        }

        let mut lines = vec![
            format!("{INDENT}task_id={},", literal::quote(&task.task_id)),
            format!("{INDENT}dag=dag,"),
        ];
        for (key, value) in &task.params {
            let rendered = match value {
                Value::Callable(callable) => function(callable),
                other => literal::value(other),
            };
            lines.push(format!("{INDENT}{}={rendered},", python_identifier(key)));
        }

        let variable = variables
            .get(&task.task_id)
            .cloned()
            .unwrap_or_else(|| python_identifier(&task.task_id));
        parts.push(format!(
            "{variable} = {}(\n{}\n)",
            task.operator.class,
            lines.join("\n")
        ));
        blocks.push(parts.join("\n\n"));
    }

    blocks.join("\n\n")
}

/// Inline source, dedented; or a no-op placeholder when no source exists.
fn callable_definition(name: &str, source: Option<&str>) -> String {
    match source.map(dedent).filter(|s| !s.is_empty()) {
        Some(text) => text,
        None => format!(
            "def {name}(**_):\n{INDENT}\"\"\"Auto-generated function placeholder.\"\"\"\n{INDENT}pass"
        ),
    }
}

/// Strip the longest run of spaces and tabs shared by every non-blank line.
fn dedent(source: &str) -> String {
    let is_margin = |c: char| c == ' ' || c == '\t';
    let lines: Vec<&str> = source.lines().collect();

    let mut margin: Option<&str> = None;
    for line in lines.iter().filter(|l| !l.trim_start_matches(is_margin).is_empty()) {
        let indent = &line[..line.len() - line.trim_start_matches(is_margin).len()];
        margin = Some(match margin {
            Some(m) => common_prefix(m, indent),
            None => indent,
        });
    }
    let margin = margin.unwrap_or_default();

    let body: Vec<&str> = lines
        .iter()
        .map(|&l| {
            if l.trim_start_matches(is_margin).is_empty() {
                ""
            } else {
                l.strip_prefix(margin).unwrap_or(l)
            }
        })
        .collect();
    body.join("\n").trim_matches('\n').trim_end().to_string()
}

fn common_prefix<'a>(a: &'a str, b: &str) -> &'a str {
    let end = a
        .char_indices()
        .zip(b.chars())
        .find(|((_, x), y)| x != y)
        .map_or(a.len().min(b.len()), |((i, _), _)| i);
    &a[..end]
}

fn dependency_lines(graph: &WorkflowGraph, variables: &HashMap<String, String>) -> String {
    let name = |id: &str| {
        variables
            .get(id)
            .cloned()
            .unwrap_or_else(|| python_identifier(id))
    };

    let mut seen = HashSet::new();
    let mut lines = Vec::new();
    for (from, to) in graph.edges() {
        let line = format!("{} >> {}", name(from), name(to));
        if seen.insert(line.clone()) {
            lines.push(line);
        }
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::domain::{CallableRef, OperatorKind, Timestamp};

    fn bash() -> OperatorKind {
        OperatorKind::new("airflow.operators.bash", "BashOperator")
    }

    fn python() -> OperatorKind {
        OperatorKind::new("airflow.operators.python", "PythonOperator")
    }

    fn daily_etl_graph() -> WorkflowGraph {
        let mut graph = WorkflowGraph::new("customer_etl")
            .with_default_arg("owner", "data-team")
            .with_default_arg("retries", 2i64)
            .with_default_arg("retry_delay", Duration::from_secs(300))
            .with_default_arg("email_on_failure", false)
            .with_description("ETL from raw.customers to analytics.customers")
            .with_schedule("@daily")
            .with_start_date(Timestamp::utc(2024, 1, 1).unwrap())
            .with_tags(["etl", "blueprint"]);

        graph
            .add_task(
                Task::new("check_source_data", bash())
                    .with_param("bash_command", r#"echo "Checking raw.customers""#),
            )
            .unwrap();
        graph
            .add_task(Task::new("extract_transform", python()).with_param(
                "python_callable",
                CallableRef::new("extract_transform").with_source(
                    "    def extract_transform(**_):\n        return {\"records\": 1000}\n",
                ),
            ))
            .unwrap();
        graph
            .add_task(Task::new("load_data", bash()).with_param("bash_command", "echo load"))
            .unwrap();
        graph
            .chain(&["check_source_data", "extract_transform", "load_data"])
            .unwrap();
        graph
    }

    /// Minimal reader for the generated text: task ids, operator classes and
    /// dependency edges.
    fn reload(source: &str) -> (Vec<(String, String)>, BTreeSet<(String, String)>) {
        let mut tasks = Vec::new();
        let mut edges = BTreeSet::new();
        let mut pending: Option<String> = None;

        for line in source.lines() {
            if let Some((var, rest)) = line.split_once(" = ") {
                if let Some(class) = rest.strip_suffix('(') {
                    if var != "dag" {
                        pending = Some(class.to_string());
                    }
                    continue;
                }
            }
            if let (Some(class), Some(id)) = (&pending, line.trim().strip_prefix("task_id=")) {
                let id = id.trim_end_matches(',').trim_matches('"').to_string();
                tasks.push((id, class.clone()));
                pending = None;
                continue;
            }
            if let Some((a, b)) = line.split_once(" >> ") {
                edges.insert((a.to_string(), b.to_string()));
            }
        }
        (tasks, edges)
    }

    #[test]
    fn full_layout_matches_expected_text() {
        let source = CodeWriter::default().write(&daily_etl_graph()).unwrap();
        let expected = r#""""Auto-generated DAG file from Blueprint."""

from airflow import DAG
from airflow.operators.bash import BashOperator
from airflow.operators.python import PythonOperator
from datetime import datetime, timedelta, timezone

dag = DAG(
    dag_id="customer_etl",
    default_args={
        "owner": "data-team",
        "retries": 2,
        "retry_delay": timedelta(minutes=5),
        "email_on_failure": False,
    },
    description="ETL from raw.customers to analytics.customers",
    schedule="@daily",
    start_date=datetime(2024, 1, 1, tzinfo=timezone.utc),
    catchup=False,
    tags=["etl", "blueprint"],
)

check_source_data = BashOperator(
    task_id="check_source_data",
    dag=dag,
    bash_command='echo "Checking raw.customers"',
)

def extract_transform(**_):
    return {"records": 1000}

extract_transform_2 = PythonOperator(
    task_id="extract_transform",
    dag=dag,
    python_callable=extract_transform,
)

load_data = BashOperator(
    task_id="load_data",
    dag=dag,
    bash_command="echo load",
)

check_source_data >> extract_transform_2
extract_transform_2 >> load_data
"#;
        assert_eq!(source, expected);
    }

    #[test]
    fn reloaded_text_preserves_nodes_kinds_and_edges() {
        let graph = daily_etl_graph();
        let source = CodeWriter::default().write(&graph).unwrap();
        let (tasks, edges) = reload(&source);

        let expected_tasks: Vec<(String, String)> = graph
            .tasks()
            .iter()
            .map(|t| (t.task_id.clone(), t.operator.class.clone()))
            .collect();
        assert_eq!(tasks, expected_tasks);

        let variables = task_variables(graph.tasks(), &callable_names(graph.tasks()).unwrap());
        let expected_edges: BTreeSet<(String, String)> = graph
            .edges()
            .into_iter()
            .map(|(a, b)| (variables[a].clone(), variables[b].clone()))
            .collect();
        assert_eq!(edges, expected_edges);
    }

    #[test]
    fn output_is_deterministic() {
        let graph = daily_etl_graph();
        let writer = CodeWriter::default();
        assert_eq!(writer.write(&graph).unwrap(), writer.write(&graph).unwrap());
    }

    #[test]
    fn empty_graph_has_header_only() {
        let source = CodeWriter::default()
            .write(&WorkflowGraph::new("empty"))
            .unwrap();
        assert!(source.ends_with("dag = DAG(\n    dag_id=\"empty\",\n    catchup=False,\n)\n"));
        assert!(!source.contains(">>"));
    }

    #[test]
    fn single_command_with_double_quote_uses_single_quotes() {
        let mut graph = WorkflowGraph::new("quotes");
        graph
            .add_task(Task::new("say", bash()).with_param("bash_command", r#"echo "hi""#))
            .unwrap();
        let source = CodeWriter::default().write(&graph).unwrap();
        assert!(source.contains(r#"    bash_command='echo "hi"',"#));
    }

    #[test]
    fn callable_without_source_gets_placeholder() {
        let mut graph = WorkflowGraph::new("stub");
        graph
            .add_task(
                Task::new("run", python()).with_param("python_callable", CallableRef::new("do_work")),
            )
            .unwrap();
        let source = CodeWriter::default().write(&graph).unwrap();
        assert!(source.contains(
            "def do_work(**_):\n    \"\"\"Auto-generated function placeholder.\"\"\"\n    pass\n\nrun = PythonOperator("
        ));
        assert!(source.contains("    python_callable=do_work,"));
    }

    #[test]
    fn dedent_strips_only_the_shared_margin() {
        assert_eq!(
            dedent("    def f():\n        return 1\n\n    # done"),
            "def f():\n    return 1\n\n# done"
        );
        assert_eq!(
            dedent("\tdef f():\n\t    pass\n    # note"),
            "\tdef f():\n\t    pass\n    # note"
        );
        assert_eq!(dedent("\tdef f():\n\t\tpass"), "def f():\n\tpass");
    }

    #[test]
    fn dedent_leaves_non_ascii_whitespace_in_place() {
        assert_eq!(
            callable_definition("f", Some("  \u{3000}x = 1\n   y = 2")),
            "\u{3000}x = 1\n y = 2"
        );
    }

    #[test]
    fn callables_named_like_module_globals_are_renamed() {
        let mut graph = WorkflowGraph::new("shadow");
        graph
            .add_task(Task::new("first", python()).with_param("python_callable", CallableRef::new("dag")))
            .unwrap();
        graph
            .add_task(
                Task::new("second", python())
                    .with_param("python_callable", CallableRef::new("timedelta")),
            )
            .unwrap();

        let source = CodeWriter::default().write(&graph).unwrap();
        assert!(source.contains("def dag_callable(**_):"));
        assert!(source.contains("    python_callable=dag_callable,"));
        assert!(source.contains("def timedelta_callable(**_):"));
        assert!(!source.contains("def dag("));
        assert!(!source.contains("def timedelta("));
    }

    #[test]
    fn inline_source_defining_a_module_global_is_rejected() {
        let mut graph = WorkflowGraph::new("shadow");
        graph
            .add_task(Task::new("run", python()).with_param(
                "python_callable",
                CallableRef::new("DAG").with_source("def DAG(**_):\n    pass"),
            ))
            .unwrap();

        let err = CodeWriter::default().write(&graph).unwrap_err();
        assert_eq!(
            err,
            DomainError::ReservedCallable {
                task_id: "run".into(),
                name: "DAG".into(),
            }
        );
    }

    #[test]
    fn legacy_schedule_interval_is_used_as_fallback() {
        let mut graph = WorkflowGraph::new("legacy");
        graph.schedule_interval = Some(Schedule::Interval(Duration::from_secs(3600)));
        let source = CodeWriter::default().write(&graph).unwrap();
        assert!(source.contains("    schedule=timedelta(hours=1),"));
        assert!(!source.contains("schedule_interval"));
    }

    #[test]
    fn fan_out_emits_one_line_per_edge() {
        let mut graph = WorkflowGraph::new("fan");
        for id in ["start", "a", "b"] {
            graph.add_task(Task::new(id, bash())).unwrap();
        }
        graph.set_downstream("start", "b").unwrap();
        graph.set_downstream("start", "a").unwrap();
        graph.set_downstream("start", "a").unwrap();

        let source = CodeWriter::default().write(&graph).unwrap();
        assert!(source.ends_with("start >> a\nstart >> b\n"));
    }

    #[test]
    fn reserved_and_invalid_task_ids_get_safe_variables() {
        let mut graph = WorkflowGraph::new("names");
        graph.add_task(Task::new("dag", bash())).unwrap();
        graph.add_task(Task::new("load-data", bash())).unwrap();
        graph.set_downstream("dag", "load-data").unwrap();

        let source = CodeWriter::default().write(&graph).unwrap();
        assert!(source.contains("dag_2 = BashOperator(\n    task_id=\"dag\","));
        assert!(source.contains("load_data = BashOperator(\n    task_id=\"load-data\","));
        assert!(source.contains("dag_2 >> load_data"));
    }

    fn asymmetric_graph() -> WorkflowGraph {
        let mut graph = WorkflowGraph::new("skewed");
        graph.add_task(Task::new("a", bash())).unwrap();
        graph.add_task(Task::new("b", bash())).unwrap();
        graph.task_mut("a").unwrap().downstream.insert("b".into());
        graph
    }

    #[test]
    fn best_effort_serializes_asymmetric_edges() {
        let source = CodeWriter::new(EdgePolicy::BestEffort)
            .write(&asymmetric_graph())
            .unwrap();
        assert!(source.ends_with("a >> b\n"));
    }

    #[test]
    fn strict_rejects_asymmetric_edges() {
        let err = CodeWriter::new(EdgePolicy::Strict)
            .write(&asymmetric_graph())
            .unwrap_err();
        assert!(matches!(err, DomainError::InconsistentEdges { .. }));

        let ok = CodeWriter::new(EdgePolicy::Strict).write(&daily_etl_graph());
        assert!(ok.is_ok());
    }
}
