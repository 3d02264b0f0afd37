//! Application layer errors.
//!
//! These errors represent failures in discovery, resolution and I/O
//! orchestration. Schema and rendering failures are `DomainError` from
//! `crate::domain`.

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::error::ErrorCategory;

/// Errors that occur during application orchestration.
#[derive(Debug, Error, Clone)]
pub enum ApplicationError {
    /// No blueprint is registered under the requested name.
    #[error("Blueprint '{name}' not found")]
    NotFound {
        name: String,
        suggestions: Vec<String>,
        available: Vec<String>,
    },

    /// Two or more source locations declare the same derived name.
    #[error("Duplicate blueprint name '{name}' found in multiple locations: {}", locations.join(", "))]
    DuplicateName { name: String, locations: Vec<String> },

    /// A candidate file could not be loaded.
    #[error("Failed to load blueprints from {path}: {reason}")]
    Discovery { path: PathBuf, reason: String },

    /// Malformed or missing configuration input.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// Several instance configs produce the same DAG id.
    #[error("Duplicate DAG ID '{dag_id}' found in multiple configuration files")]
    DuplicateDagId { dag_id: String, files: Vec<PathBuf> },

    /// Filesystem operation failed.
    #[error("Filesystem error at {path}: {reason}")]
    Filesystem { path: PathBuf, reason: String },

    /// The linter could not be run.
    #[error("Linting {path} failed: {reason}")]
    Lint { path: PathBuf, reason: String },

    /// The blueprint exposes no configuration schema, so it cannot be built.
    #[error("Blueprint '{class}' has no configuration schema")]
    NoBuildMethod { class: String },
}

impl ApplicationError {
    pub fn filesystem(path: impl Into<PathBuf>, reason: impl fmt::Display) -> Self {
        Self::Filesystem {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Get user-actionable suggestions.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::NotFound { suggestions, .. } => suggestions.clone(),
            Self::DuplicateName { locations, .. } => {
                let mut out: Vec<String> = locations.iter().map(|l| format!("Declared in {l}")).collect();
                out.push("Rename one of the blueprint classes".into());
                out.push("Use unique names for each blueprint".into());
                out
            }
            Self::Discovery { path, .. } => vec![
                format!("Check the syntax of {}", path.display()),
                "Files starting with '_' are ignored by discovery".into(),
            ],
            Self::Configuration(e) => e.suggestions.clone(),
            Self::DuplicateDagId { files, .. } => {
                let mut out: Vec<String> = files
                    .iter()
                    .map(|f| format!("Used by {}", file_name(f)))
                    .collect();
                out.push("Change the 'job_id' field in one of the configuration files".into());
                out.push("Use unique DAG IDs for each configuration".into());
                out.push(
                    "Consider using a naming convention like '<team>-<service>-<purpose>'".into(),
                );
                out
            }
            Self::Filesystem { path, .. } => vec![
                format!("Failed to access: {}", path.display()),
                "Check that you have write permissions".into(),
            ],
            Self::Lint { .. } => vec![
                "Install ruff or set lint.command in blueprint.toml".into(),
                "Or skip linting with --no-lint".into(),
            ],
            Self::NoBuildMethod { class } => vec![format!(
                "Declare a config table for '{class}' or reference one with Blueprint[ConfigType]"
            )],
        }
    }

    /// Get error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::DuplicateName { .. } | Self::DuplicateDagId { .. } => ErrorCategory::Conflict,
            Self::Discovery { .. } | Self::Configuration(_) | Self::NoBuildMethod { .. } => {
                ErrorCategory::Configuration
            }
            Self::Filesystem { .. } | Self::Lint { .. } => ErrorCategory::Io,
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Malformed or missing input, with position when it can be derived.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConfigurationError {
    pub message: String,
    pub file: Option<PathBuf>,
    /// 1-based.
    pub line: Option<usize>,
    /// 1-based.
    pub column: Option<usize>,
    pub suggestions: Vec<String>,
}

impl ConfigurationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn in_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn at(mut self, line: usize, column: usize) -> Self {
        self.line = Some(line);
        self.column = Some(column);
        self
    }

    pub fn suggest(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Lines around the error position, the failing one marked with `>` and
    /// a caret under the column. Empty when no line is known or it falls
    /// outside `source`.
    pub fn context(&self, source: &str) -> Vec<String> {
        let Some(line) = self.line else {
            return Vec::new();
        };
        let lines: Vec<&str> = source.lines().collect();
        if line == 0 || line > lines.len() {
            return Vec::new();
        }

        let start = line.saturating_sub(3);
        let end = (line + 2).min(lines.len());
        let mut out = Vec::with_capacity(end - start + 1);
        for (idx, text) in lines.iter().enumerate().take(end).skip(start) {
            let number = idx + 1;
            let marker = if number == line { "  > " } else { "    " };
            let prefix = format!("{marker}{number:3} | ");
            out.push(format!("{prefix}{}", text.trim_end()));
            if number == line {
                if let Some(column) = self.column.filter(|c| *c > 0) {
                    out.push(format!("{}^", " ".repeat(prefix.len() + column - 1)));
                }
            }
        }
        out
    }

    /// Multi-line report: header, location, message and, when the file text
    /// is supplied, the surrounding lines.
    pub fn report(&self, source: Option<&str>) -> String {
        let mut lines = vec![match &self.file {
            Some(file) => format!("Configuration Error in {}", file_name(file)),
            None => "Configuration Error".to_string(),
        }];
        if let Some(line) = self.line {
            match self.column {
                Some(column) => lines.push(format!("  Line {line}, Column {column}")),
                None => lines.push(format!("  Line {line}")),
            }
        }
        lines.push(format!("  {}", self.message));
        if let Some(source) = source {
            let context = self.context(source);
            if !context.is_empty() {
                lines.push(String::new());
                lines.push("  File context:".into());
                lines.extend(context);
            }
        }
        lines.join("\n")
    }
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.file, self.line) {
            (Some(file), Some(line)) => {
                write!(f, "{}:{line}: {}", file.display(), self.message)
            }
            (Some(file), None) => write!(f, "{}: {}", file.display(), self.message),
            _ => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for ConfigurationError {}
