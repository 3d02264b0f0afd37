//! TOML blueprint manifests.
//!
//! A manifest declares one or more blueprints and the configuration
//! schemas they accept. The registry sees each `[[blueprint]]` entry as a
//! declaration; this module turns entries into [`ManifestBlueprint`]s.
//!
//! # Manifest format
//!
//! ```toml
//! [[blueprint]]
//! class  = "DailyETL"
//! bases  = ["Blueprint[DailyETLConfig]"]
//! doc    = "Daily ETL job"
//! config = "DailyETLConfig"          # optional; defaults to the base parameter
//! source_template = """..."""        # optional; used by render_template
//!
//! [blueprint.graph]                  # optional; used by render
//! dag_id   = "{{ job_id }}"
//! schedule = "{{ schedule }}"
//! start_date = 2024-01-01T00:00:00Z
//!
//! [blueprint.graph.default_args]
//! retries     = "{{ retries }}"
//! retry_delay = { timedelta = { minutes = 5 } }
//!
//! [[blueprint.graph.tasks]]
//! task_id  = "extract"
//! operator = "airflow.operators.bash.BashOperator"
//! upstream = []
//! [blueprint.graph.tasks.params]
//! bash_command = "echo {{ source_table }}"
//!
//! [config.DailyETLConfig]
//! doc = "..."
//! [[config.DailyETLConfig.fields]]
//! name    = "job_id"
//! type    = "string"                  # string | integer | number | boolean | array | object | any
//! pattern = "^[a-zA-Z0-9_-]+$"
//! ```
//!
//! A string that is exactly one `{{ field }}` placeholder takes the typed
//! config value; any other string has its placeholders replaced by display
//! forms. Three single-purpose tables produce non-TOML literals:
//! `{ timedelta = { days, hours, minutes, seconds } }`,
//! `{ callable = "name", source = "..." }` and `{ datetime = "..." }`.

mod blueprint;
mod format;
mod loader;
mod placeholder;

use thiserror::Error;

use blueprint_core::domain::DomainError;

pub use blueprint::ManifestBlueprint;
pub use format::{
    BlueprintEntry, ConfigEntry, FieldEntry, GraphSection, Manifest, TaskEntry,
};
pub use loader::{MANIFEST_EXTENSION, ManifestLoader};
pub use placeholder::{RenderError, interpolate, render_value};

/// Starter manifest written by `blueprint init`.
pub const EXAMPLE_MANIFEST: &str = include_str!("../../templates/daily_etl.toml");

/// Why a manifest file could not be turned into blueprints.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("cannot read manifest: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid TOML at line {line}, column {column}: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("blueprint '{class}': {reason}")]
    Declaration { class: String, reason: String },

    #[error("config '{schema}' field '{field}': {reason}")]
    Field {
        schema: String,
        field: String,
        reason: String,
    },

    #[error(transparent)]
    Schema(#[from] DomainError),
}

impl ManifestError {
    /// Locate a TOML parse error in `source`.
    fn syntax(source: &str, err: &toml::de::Error) -> Self {
        let offset = err.span().map_or(0, |span| span.start).min(source.len());
        let before = &source[..offset];
        let line = before.matches('\n').count() + 1;
        let column = before
            .rsplit('\n')
            .next()
            .map_or(1, |tail| tail.chars().count() + 1);
        Self::Syntax {
            line,
            column,
            message: err.message().trim().to_string(),
        }
    }
}
