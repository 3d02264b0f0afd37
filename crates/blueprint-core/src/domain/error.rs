use std::fmt;

use thiserror::Error;

/// A configuration rejected by a blueprint's schema.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationError {
    pub message: String,
    pub field: Option<String>,
    pub expected: Option<String>,
    pub actual: Option<String>,
    pub suggestions: Vec<String>,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn expected(mut self, expected: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self
    }

    pub fn actual(mut self, actual: impl Into<String>) -> Self {
        self.actual = Some(actual.into());
        self
    }

    pub fn suggest(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(f, "Validation failed for field '{field}': {}", self.message)?,
            None => write!(f, "Validation failed: {}", self.message)?,
        }
        if let (Some(expected), Some(actual)) = (&self.expected, &self.actual) {
            write!(f, " (expected {expected}, got {actual})")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Root domain error type.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    // ========================================================================
    // Validation Errors
    // ========================================================================
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Invalid schema '{schema}': {reason}")]
    InvalidSchema { schema: String, reason: String },

    // ========================================================================
    // Rendering Errors
    // ========================================================================
    #[error("Blueprint '{class}' implements neither render() nor render_template()")]
    RenderNotImplemented { class: String },

    #[error("Template error in '{class}': {reason}")]
    Template { class: String, reason: String },

    // ========================================================================
    // Graph Invariants
    // ========================================================================
    #[error("Task '{task_id}' already exists in DAG '{dag_id}'")]
    DuplicateTask { dag_id: String, task_id: String },

    #[error("Task '{task_id}' does not exist in DAG '{dag_id}'")]
    UnknownTask { dag_id: String, task_id: String },

    #[error("Edge between '{task}' and '{peer}' is missing its {direction} mirror")]
    InconsistentEdges {
        task: String,
        peer: String,
        direction: &'static str,
    },

    #[error("Callable '{name}' in task '{task_id}' would shadow a name the generated module defines")]
    ReservedCallable { task_id: String, name: String },
}

impl DomainError {
    /// Get user-actionable suggestions for fixing this error.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Validation(e) => {
                let mut out = e.suggestions.clone();
                if out.is_empty() {
                    out.push("Check that all required parameters are provided".into());
                    out.push("Verify parameter types match the blueprint requirements".into());
                }
                out
            }
            Self::InvalidSchema { schema, .. } => vec![
                format!("Fix the field definitions of '{schema}'"),
                "Each field needs a name and a supported type".into(),
            ],
            Self::RenderNotImplemented { class } => vec![
                format!("Add a [blueprint.graph] table or a source_template to '{class}'"),
            ],
            Self::Template { .. } => vec!["Check the placeholders used in the blueprint".into()],
            Self::DuplicateTask { task_id, .. } => {
                vec![format!("Give task '{task_id}' a unique task_id")]
            }
            Self::UnknownTask { task_id, .. } => {
                vec![format!("Declare task '{task_id}' before wiring dependencies to it")]
            }
            Self::InconsistentEdges { .. } => vec![
                "Wire dependencies with set_downstream/set_upstream so both sides agree".into(),
                "Or serialize with the best-effort edge policy".into(),
            ],
            Self::ReservedCallable { name, .. } => vec![
                format!("Rename the function '{name}' in its inline source"),
                "dag, DAG, datetime, timedelta and timezone are taken by the generated module".into(),
            ],
        }
    }

    /// Error category for CLI display styling.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation(_) | Self::InvalidSchema { .. } => ErrorCategory::Validation,
            Self::RenderNotImplemented { .. } | Self::Template { .. } => ErrorCategory::Rendering,
            Self::DuplicateTask { .. }
            | Self::UnknownTask { .. }
            | Self::InconsistentEdges { .. }
            | Self::ReservedCallable { .. } => ErrorCategory::Graph,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Rendering,
    Graph,
}
