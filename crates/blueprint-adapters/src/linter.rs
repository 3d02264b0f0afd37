//! Linting generated DAG files with an external tool.

use std::io;
use std::path::Path;
use std::process::{Command, Output};

use tracing::{debug, info, warn};

use blueprint_core::application::ApplicationError;
use blueprint_core::application::ports::{LintOptions, Linter};
use blueprint_core::error::BlueprintResult;

/// Default lint program.
pub const DEFAULT_LINT_COMMAND: &str = "ruff";

/// Runs `<program> check [--fix] <file>`, then `<program> format <file>`
/// when formatting is enabled.
///
/// A non-zero exit from either step makes the file unclean; failing to
/// start the program at all is an error.
#[derive(Debug, Clone)]
pub struct CommandLinter {
    program: String,
}

impl CommandLinter {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn run(&self, path: &Path, args: &[&str]) -> BlueprintResult<Output> {
        info!(program = %self.program, ?args, path = %path.display(), "running linter");
        Command::new(&self.program)
            .args(args)
            .arg(path)
            .output()
            .map_err(|e| {
                let reason = match e.kind() {
                    io::ErrorKind::NotFound => format!("'{}' was not found on PATH", self.program),
                    _ => format!("could not run '{}': {e}", self.program),
                };
                ApplicationError::Lint {
                    path: path.to_path_buf(),
                    reason,
                }
                .into()
            })
    }
}

impl Default for CommandLinter {
    fn default() -> Self {
        Self::new(DEFAULT_LINT_COMMAND)
    }
}

impl Linter for CommandLinter {
    fn lint(&self, path: &Path, options: &LintOptions) -> BlueprintResult<bool> {
        let mut clean = true;

        let check: &[&str] = if options.fix {
            &["check", "--fix"]
        } else {
            &["check"]
        };
        let output = self.run(path, check)?;
        if !output.status.success() {
            warn!(
                path = %path.display(),
                stdout = %String::from_utf8_lossy(&output.stdout).trim(),
                "lint check reported issues"
            );
            clean = false;
        }

        if options.format {
            let output = self.run(path, &["format"])?;
            if !output.status.success() {
                warn!(
                    path = %path.display(),
                    stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                    "formatting failed"
                );
                clean = false;
            }
        }

        debug!(path = %path.display(), clean, "lint finished");
        Ok(clean)
    }
}

/// Accepts every file without running anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLinter;

impl Linter for NoopLinter {
    fn lint(&self, _path: &Path, _options: &LintOptions) -> BlueprintResult<bool> {
        Ok(true)
    }
}
