//! `blueprint lint`: validate every instance config, report each result,
//! then fail if anything was wrong.

use std::path::{Path, PathBuf};

use tracing::{instrument, warn};
use walkdir::WalkDir;

use blueprint_adapters::yaml::is_config_file;
use blueprint_core::application::{LintEntry, LintReport};

use crate::{
    cli::LintArgs,
    config::AppConfig,
    error::{CliError, CliResult},
    output::OutputManager,
};

#[instrument(skip_all)]
pub fn execute(args: LintArgs, config: AppConfig, output: OutputManager) -> CliResult<()> {
    let root = args.path.unwrap_or_else(|| PathBuf::from("."));
    let paths = config_files(&root);

    if paths.is_empty() {
        output.warning("No configuration files found.")?;
        return Ok(());
    }

    output.info(&format!("Checking {} config(s)", paths.len()))?;
    let mut service = super::service(&config, &args.templates, false);
    let report = service.lint_configs(&paths);
    print_report(&report, &output)?;

    if report.is_ok() {
        output.success(&format!("{} config(s) valid", report.entries.len()))?;
        Ok(())
    } else {
        Err(CliError::LintFailed {
            failures: report.failures(),
            duplicates: report.duplicates.len(),
        })
    }
}

/// `root` itself when it is a file, else every `*.dag.yaml` below it in a
/// stable order.
pub fn config_files(root: &Path) -> Vec<PathBuf> {
    if root.is_file() {
        return vec![root.to_path_buf()];
    }

    WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, "skipping unreadable path");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && is_config_file(entry.path()))
        .map(|entry| clean(entry.path()))
        .collect()
}

/// `./a/b.dag.yaml` -> `a/b.dag.yaml`.
fn clean(path: &Path) -> PathBuf {
    path.strip_prefix(".").unwrap_or(path).to_path_buf()
}

fn print_report(report: &LintReport, output: &OutputManager) -> CliResult<()> {
    for entry in &report.entries {
        print_entry(entry, output)?;
    }

    for duplicate in &report.duplicates {
        output.failure("Duplicate DAG ID detected:")?;
        output.failure(&format!("  {duplicate}"))?;
        for suggestion in duplicate.suggestions() {
            output.failure(&format!("    {suggestion}"))?;
        }
    }
    Ok(())
}

fn print_entry(entry: &LintEntry, output: &OutputManager) -> CliResult<()> {
    match &entry.error {
        None => output.success(&format!("{} - Valid", entry.path.display()))?,
        Some(error) => {
            output.failure(&entry.path.display().to_string())?;
            let detail = CliError::Core(error.clone())
                .configuration_report()
                .unwrap_or_else(|| format!("Error: {error}"));
            for line in detail.lines() {
                output.failure(&format!("  {line}"))?;
            }
        }
    }
    Ok(())
}
