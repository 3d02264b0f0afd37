//! CLI error type, exit codes and the text printed on failure.
//!
//! Core errors pass through unchanged inside [`CliError::Core`]; malformed
//! instance configs are shown with their positioned report.

use std::path::PathBuf;
use std::{error::Error as StdError, fs};

use owo_colors::OwoColorize;
use thiserror::Error;

use blueprint_core::application::{ApplicationError, ConfigurationError};
use blueprint_core::error::BlueprintError;

pub use blueprint_core::error::ErrorCategory as CoreCategory;

pub type CliResult<T> = Result<T, CliError>;

/// Everything a command can fail with.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user input that clap could not catch.
    #[error("Invalid input: {message}")]
    InvalidInput {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A file the command would create is already there.
    #[error("File already exists: {}", path.display())]
    FileExists { path: PathBuf },

    /// `blueprint lint` found problems; each was already reported.
    #[error("{failures} invalid config(s), {duplicates} duplicate DAG id(s)")]
    LintFailed { failures: usize, duplicates: usize },

    /// The CLI's own configuration could not be read or written.
    #[error("Configuration error: {message}")]
    ConfigError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// An error propagated from `blueprint-core` or the adapters.
    #[error("{0}")]
    Core(#[from] BlueprintError),

    /// Reading or writing a file outside the core failed.
    #[error("I/O error: {message}")]
    IoError {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// The user declined a prompt or pressed Ctrl-C.
    #[error("Operation cancelled")]
    Cancelled,

    /// Feature not compiled in (e.g. interactive prompts).
    #[error("Feature not available: {feature}")]
    FeatureNotAvailable { feature: &'static str },
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::IoError {
            message: err.to_string(),
            source: err,
        }
    }
}

impl CliError {
    /// User-actionable suggestions for fixing this error.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::InvalidInput { message, .. } => vec![
                format!("Check your input: {message}"),
                "Run 'blueprint --help' to see the accepted arguments".into(),
            ],

            Self::FileExists { path } => vec![
                format!("'{}' already exists", path.display()),
                "Use --force to overwrite it".into(),
            ],

            Self::LintFailed { .. } => vec![
                "Fix the configs reported above and run 'blueprint lint' again".into(),
                "Use 'blueprint describe <name>' to see a blueprint's parameters".into(),
            ],

            Self::ConfigError { message, .. } => vec![
                format!("Configuration issue: {message}"),
                "Check blueprint.toml in the current directory".into(),
                "Use 'blueprint init' to create a default config".into(),
            ],

            Self::Core(core_err) => core_err.suggestions(),

            Self::IoError { message, .. } => vec![
                format!("I/O operation failed: {message}"),
                "Check that the path is writable".into(),
            ],

            Self::Cancelled => vec!["No changes were made".into()],

            Self::FeatureNotAvailable { feature } => vec![
                format!("The '{feature}' feature is not available in this build"),
                format!("Install with the feature enabled: cargo install blueprint-cli --features {feature}"),
            ],
        }
    }

    /// The error category for styling and exit codes.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidInput { .. } => ErrorCategory::UserError,
            Self::FileExists { .. } => ErrorCategory::UserError,
            Self::LintFailed { .. } => ErrorCategory::UserError,
            Self::ConfigError { .. } => ErrorCategory::Configuration,
            Self::Core(core) => match core.category() {
                CoreCategory::Validation => ErrorCategory::UserError,
                CoreCategory::Conflict => ErrorCategory::UserError,
                CoreCategory::Rendering => ErrorCategory::UserError,
                CoreCategory::NotFound => ErrorCategory::NotFound,
                CoreCategory::Configuration => ErrorCategory::Configuration,
                CoreCategory::Io => ErrorCategory::Internal,
                CoreCategory::Internal => ErrorCategory::Internal,
            },
            Self::IoError { .. } => ErrorCategory::Internal,
            Self::Cancelled => ErrorCategory::UserError,
            Self::FeatureNotAvailable { .. } => ErrorCategory::Configuration,
        }
    }

    /// Process exit status; see the table in `main.rs`.
    pub fn exit_code(&self) -> u8 {
        match self.category() {
            ErrorCategory::UserError => 2,
            ErrorCategory::NotFound => 3,
            ErrorCategory::Configuration => 4,
            ErrorCategory::Internal => 1,
        }
    }

    /// Position-aware report for malformed instance configs, with the
    /// surrounding lines when the file can still be read.
    pub fn configuration_report(&self) -> Option<String> {
        let config = self.configuration_error()?;
        let source = config
            .file
            .as_ref()
            .and_then(|f| fs::read_to_string(f).ok());
        Some(config.report(source.as_deref()))
    }

    fn configuration_error(&self) -> Option<&ConfigurationError> {
        match self {
            Self::Core(BlueprintError::Application(ApplicationError::Configuration(e))) => Some(e),
            _ => None,
        }
    }

    /// Terminal rendering: red headline, dimmed cause chain, yellow
    /// suggestions.
    pub fn format_colored(&self, verbose: bool) -> String {
        self.render(verbose, true)
    }

    /// Same layout as [`Self::format_colored`] without ANSI codes, for
    /// redirected stderr.
    pub fn format_plain(&self, verbose: bool) -> String {
        self.render(verbose, false)
    }

    fn render(&self, verbose: bool, color: bool) -> String {
        let paint = |text: &str, style: fn(&str) -> String| -> String {
            if color { style(text) } else { text.to_string() }
        };
        let mut out = String::new();

        let body = self
            .configuration_report()
            .unwrap_or_else(|| self.to_string());
        out.push_str(&format!(
            "\n{} {}\n",
            paint("\u{2717} Error:", |t| t.red().bold().to_string()),
            paint(&body, |t| t.red().to_string()),
        ));

        if verbose {
            for cause in causes(self) {
                out.push_str(&format!(
                    "  {}\n",
                    paint(&format!("caused by: {cause}"), |t| t.dimmed().to_string())
                ));
            }
        }

        let suggestions = self.suggestions();
        if !suggestions.is_empty() {
            out.push_str(&format!(
                "\n{}\n",
                paint("Suggestions:", |t| t.yellow().bold().to_string())
            ));
            for suggestion in &suggestions {
                out.push_str(&format!("  - {suggestion}\n"));
            }
        }

        if !verbose {
            let hint = paint("Run again with --verbose for more details.", |t| {
                t.dimmed().to_string()
            });
            out.push_str(&format!("\n{hint}\n"));
        }
        out
    }

    /// Record the failure in the log before it is printed.
    pub fn log(&self) {
        let category = self.category();
        let code = self.exit_code();
        match category {
            ErrorCategory::UserError | ErrorCategory::NotFound => {
                tracing::warn!(?category, code, error = %self, "command failed")
            }
            ErrorCategory::Configuration | ErrorCategory::Internal => {
                tracing::error!(?category, code, error = %self, "command failed")
            }
        }
        for cause in causes(self) {
            tracing::debug!(%cause, "caused by");
        }
    }
}

fn causes(err: &dyn StdError) -> impl Iterator<Item = &(dyn StdError + 'static)> {
    std::iter::successors(err.source(), |e| StdError::source(*e))
}

/// Coarse grouping that selects the exit status and log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    UserError,
    NotFound,
    Configuration,
    Internal,
}

/// Converts foreign error types into [`CliError`] at call-sites, attaching a
/// context message.
pub trait IntoCli<T> {
    fn with_cli_context<F, S>(self, f: F) -> CliResult<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T> IntoCli<T> for Result<T, std::io::Error> {
    fn with_cli_context<F, S>(self, f: F) -> CliResult<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| CliError::IoError {
            message: f().into(),
            source: e,
        })
    }
}

impl<T> IntoCli<T> for Result<T, BlueprintError> {
    /// Core errors already carry their context; the message is dropped.
    fn with_cli_context<F, S>(self, _f: F) -> CliResult<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(CliError::Core)
    }
}
