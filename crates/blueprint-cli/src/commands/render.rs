//! `blueprint render`: turn one instance config into a DAG file.

use serde_json::Value as Json;
use tracing::{info, instrument};

use blueprint_core::application::RenderStrategy;
use blueprint_core::domain::Kwargs;

use crate::{
    cli::{RenderArgs, Strategy},
    config::AppConfig,
    error::CliResult,
    output::OutputManager,
};

#[instrument(skip_all, fields(config = %args.config.display()))]
pub fn execute(args: RenderArgs, config: AppConfig, output: OutputManager) -> CliResult<()> {
    let lint = !args.no_lint && config.lint.enabled;
    let mut service = super::service(&config, &args.templates, lint);
    let overrides = overrides(&args.overrides);
    let strategy = match args.strategy {
        Strategy::Graph => RenderStrategy::Graph,
        Strategy::Template => RenderStrategy::Template,
    };

    if args.dry_run {
        let rendered = service.render_config(&args.config, &overrides, strategy)?;
        output.data(&rendered.source)?;
        return Ok(());
    }

    let written =
        service.render_to_file(&args.config, &overrides, strategy, args.output.as_deref())?;
    info!(dag_id = %written.dag_id, path = %written.path.display(), "rendered config");

    output.success(&format!(
        "Generated DAG '{}' at {}",
        written.dag_id,
        written.path.display()
    ))?;
    match written.lint_clean {
        Some(true) => output.muted(&format!("  {} passed linting", config.lint.command))?,
        Some(false) => output.warning(&format!(
            "{} reported issues it could not fix in {}",
            config.lint.command,
            written.path.display()
        ))?,
        None if lint => output.warning(&format!(
            "Could not run '{}'; the file was written without linting",
            config.lint.command
        ))?,
        None => {}
    }
    Ok(())
}

/// `--set` pairs as typed values: YAML scalars, falling back to the raw text.
fn overrides(pairs: &[(String, String)]) -> Kwargs {
    pairs
        .iter()
        .map(|(key, raw)| {
            let value = serde_yaml::from_str::<Json>(raw)
                .unwrap_or_else(|_| Json::String(raw.clone()));
            (key.clone(), value)
        })
        .collect()
}
