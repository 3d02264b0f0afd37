//! In-memory workflow graph.
//!
//! A [`WorkflowGraph`] is what a renderer produces and what the code writer
//! consumes: graph-level metadata plus tasks in insertion order, each with
//! mirrored upstream/downstream id sets.

use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

use crate::domain::{DomainError, Timestamp, Value};

/// Where an operator type comes from: `module` + `class`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OperatorKind {
    pub module: String,
    pub class: String,
}

impl OperatorKind {
    pub fn new(module: impl Into<String>, class: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            class: class.into(),
        }
    }

    /// Split a dotted path such as `airflow.operators.bash.BashOperator`.
    pub fn parse(path: &str) -> Option<Self> {
        let (module, class) = path.trim().rsplit_once('.')?;
        if module.is_empty() || class.is_empty() {
            return None;
        }
        Some(Self::new(module, class))
    }

    pub fn import_line(&self) -> String {
        format!("from {} import {}", self.module, self.class)
    }
}

impl fmt::Display for OperatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.module, self.class)
    }
}

/// One node of the graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub task_id: String,
    pub operator: OperatorKind,
    /// Operator-specific parameters in the order they were set.
    pub params: Vec<(String, Value)>,
    pub upstream: BTreeSet<String>,
    pub downstream: BTreeSet<String>,
}

impl Task {
    pub fn new(task_id: impl Into<String>, operator: OperatorKind) -> Self {
        Self {
            task_id: task_id.into(),
            operator,
            params: Vec::new(),
            upstream: BTreeSet::new(),
            downstream: BTreeSet::new(),
        }
    }

    /// Set a parameter, replacing an earlier value for the same key.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set_param(key, value);
        self
    }

    pub fn set_param(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        match self.params.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.params.push((key, value)),
        }
    }

    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

/// Schedule expression: a preset/cron string or a fixed interval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Schedule {
    Expression(String),
    Interval(Duration),
}

impl From<&str> for Schedule {
    fn from(s: &str) -> Self {
        Self::Expression(s.to_string())
    }
}

/// A rendered workflow: metadata plus tasks in insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowGraph {
    dag_id: String,
    pub default_args: Vec<(String, Value)>,
    pub description: Option<String>,
    pub schedule: Option<Schedule>,
    /// Legacy spelling; only consulted when `schedule` is unset.
    pub schedule_interval: Option<Schedule>,
    pub start_date: Option<Timestamp>,
    pub catchup: bool,
    pub tags: Vec<String>,
    tasks: Vec<Task>,
}

impl WorkflowGraph {
    pub fn new(dag_id: impl Into<String>) -> Self {
        Self {
            dag_id: dag_id.into(),
            default_args: Vec::new(),
            description: None,
            schedule: None,
            schedule_interval: None,
            start_date: None,
            catchup: false,
            tags: Vec::new(),
            tasks: Vec::new(),
        }
    }

    pub fn dag_id(&self) -> &str {
        &self.dag_id
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_schedule(mut self, schedule: impl Into<Schedule>) -> Self {
        self.schedule = Some(schedule.into());
        self
    }

    pub fn with_start_date(mut self, start: Timestamp) -> Self {
        self.start_date = Some(start);
        self
    }

    pub fn with_catchup(mut self, catchup: bool) -> Self {
        self.catchup = catchup;
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_default_arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set_default_arg(key, value);
        self
    }

    /// Set a `default_args` entry, replacing an earlier value for the key.
    pub fn set_default_arg(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        match self.default_args.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.default_args.push((key, value)),
        }
    }

    /// Schedule to serialize: `schedule` wins over `schedule_interval`.
    pub fn effective_schedule(&self) -> Option<&Schedule> {
        self.schedule.as_ref().or(self.schedule_interval.as_ref())
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, task_id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.task_id == task_id)
    }

    pub fn task_mut(&mut self, task_id: &str) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.task_id == task_id)
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Append a task. Task ids are unique within a graph.
    pub fn add_task(&mut self, task: Task) -> Result<(), DomainError> {
        if self.task(&task.task_id).is_some() {
            return Err(DomainError::DuplicateTask {
                dag_id: self.dag_id.clone(),
                task_id: task.task_id,
            });
        }
        self.tasks.push(task);
        Ok(())
    }

    /// Wire `from >> to`, updating both sides of the edge.
    pub fn set_downstream(&mut self, from: &str, to: &str) -> Result<(), DomainError> {
        for id in [from, to] {
            if self.task(id).is_none() {
                return Err(DomainError::UnknownTask {
                    dag_id: self.dag_id.clone(),
                    task_id: id.to_string(),
                });
            }
        }
        if let Some(task) = self.task_mut(from) {
            task.downstream.insert(to.to_string());
        }
        if let Some(task) = self.task_mut(to) {
            task.upstream.insert(from.to_string());
        }
        Ok(())
    }

    /// Wire `upstream >> task`.
    pub fn set_upstream(&mut self, task: &str, upstream: &str) -> Result<(), DomainError> {
        self.set_downstream(upstream, task)
    }

    /// Wire `ids[0] >> ids[1] >> ...`.
    pub fn chain(&mut self, ids: &[&str]) -> Result<(), DomainError> {
        for pair in ids.windows(2) {
            self.set_downstream(pair[0], pair[1])?;
        }
        Ok(())
    }

    /// Downstream edges in task order, then downstream-id order.
    pub fn edges(&self) -> Vec<(&str, &str)> {
        self.tasks
            .iter()
            .flat_map(|t| {
                t.downstream
                    .iter()
                    .map(move |d| (t.task_id.as_str(), d.as_str()))
            })
            .collect()
    }

    /// Verify every edge is recorded on both of its endpoints.
    pub fn check_edge_consistency(&self) -> Result<(), DomainError> {
        for task in &self.tasks {
            for down in &task.downstream {
                let mirrored = self
                    .task(down)
                    .is_some_and(|peer| peer.upstream.contains(&task.task_id));
                if !mirrored {
                    return Err(DomainError::InconsistentEdges {
                        task: task.task_id.clone(),
                        peer: down.clone(),
                        direction: "upstream",
                    });
                }
            }
            for up in &task.upstream {
                let mirrored = self
                    .task(up)
                    .is_some_and(|peer| peer.downstream.contains(&task.task_id));
                if !mirrored {
                    return Err(DomainError::InconsistentEdges {
                        task: task.task_id.clone(),
                        peer: up.clone(),
                        direction: "downstream",
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bash() -> OperatorKind {
        OperatorKind::new("airflow.operators.bash", "BashOperator")
    }

    fn three_task_graph() -> WorkflowGraph {
        let mut graph = WorkflowGraph::new("etl");
        for id in ["extract", "transform", "load"] {
            graph.add_task(Task::new(id, bash())).unwrap();
        }
        graph
    }

    #[test]
    fn operator_kind_parses_dotted_path() {
        let kind = OperatorKind::parse("airflow.operators.bash.BashOperator").unwrap();
        assert_eq!(kind, bash());
        assert_eq!(kind.import_line(), "from airflow.operators.bash import BashOperator");
        assert!(OperatorKind::parse("BashOperator").is_none());
    }

    #[test]
    fn duplicate_task_ids_are_rejected() {
        let mut graph = three_task_graph();
        let err = graph.add_task(Task::new("load", bash())).unwrap_err();
        assert!(matches!(err, DomainError::DuplicateTask { task_id, .. } if task_id == "load"));
    }

    #[test]
    fn set_downstream_mirrors_both_sides() {
        let mut graph = three_task_graph();
        graph.chain(&["extract", "transform", "load"]).unwrap();

        assert!(graph.task("extract").unwrap().downstream.contains("transform"));
        assert!(graph.task("transform").unwrap().upstream.contains("extract"));
        assert!(graph.check_edge_consistency().is_ok());
        assert_eq!(graph.edges(), vec![("extract", "transform"), ("transform", "load")]);
    }

    #[test]
    fn wiring_unknown_task_fails() {
        let mut graph = three_task_graph();
        let err = graph.set_downstream("extract", "publish").unwrap_err();
        assert!(matches!(err, DomainError::UnknownTask { task_id, .. } if task_id == "publish"));
    }

    #[test]
    fn asymmetric_edges_are_detected() {
        let mut graph = three_task_graph();
        graph
            .task_mut("extract")
            .unwrap()
            .downstream
            .insert("load".into());

        let err = graph.check_edge_consistency().unwrap_err();
        assert!(matches!(
            err,
            DomainError::InconsistentEdges { task, peer, direction: "upstream" }
                if task == "extract" && peer == "load"
        ));
    }

    #[test]
    fn schedule_prefers_unified_field() {
        let mut graph = WorkflowGraph::new("x");
        graph.schedule_interval = Some("@hourly".into());
        assert_eq!(graph.effective_schedule(), Some(&Schedule::from("@hourly")));

        graph.schedule = Some("@daily".into());
        assert_eq!(graph.effective_schedule(), Some(&Schedule::from("@daily")));
    }

    #[test]
    fn set_param_replaces_existing_key() {
        let task = Task::new("t", bash())
            .with_param("bash_command", "echo 1")
            .with_param("bash_command", "echo 2");
        assert_eq!(task.params.len(), 1);
        assert_eq!(task.param("bash_command"), Some(&Value::from("echo 2")));
    }

    #[test]
    fn default_args_keep_one_entry_per_key() {
        let graph = WorkflowGraph::new("x")
            .with_default_arg("owner", "data")
            .with_default_arg("retries", 1_i64)
            .with_default_arg("owner", "platform");
        assert_eq!(
            graph.default_args,
            vec![
                ("owner".to_string(), Value::from("platform")),
                ("retries".to_string(), Value::from(1_i64)),
            ]
        );
    }
}
