//! Implementation of the `blueprint new` command.
//!
//! Dispatch sequence:
//! 1. Pick a blueprint (or take `--blueprint`)
//! 2. Prompt for each parameter, offering defaults
//! 3. Validate through the synthesized build method; offer to save anyway
//! 4. Write `<job_id>.dag.yaml`

use serde_json::{Value as Json, json};

use blueprint_core::application::ParameterInfo;
use blueprint_core::domain::Kwargs;

use crate::{
    cli::{GlobalArgs, NewArgs},
    config::AppConfig,
    error::{CliError, CliResult},
    output::OutputManager,
};

#[cfg(feature = "interactive")]
pub use interactive::execute;

#[cfg(not(feature = "interactive"))]
pub fn execute(
    _args: NewArgs,
    _global: GlobalArgs,
    _config: AppConfig,
    _output: OutputManager,
) -> CliResult<()> {
    Err(CliError::FeatureNotAvailable {
        feature: "interactive",
    })
}

#[cfg(feature = "interactive")]
mod interactive {
    use std::fs;
    use std::io;
    use std::path::{Path, PathBuf};

    use dialoguer::{
        Confirm, FuzzySelect, Input,
        theme::{ColorfulTheme, SimpleTheme, Theme},
    };
    use tracing::{info, instrument};

    use blueprint_core::application::{BlueprintInfo, Registry};

    use super::*;
    use crate::error::IntoCli;

    #[instrument(skip_all)]
    pub fn execute(
        args: NewArgs,
        global: GlobalArgs,
        config: AppConfig,
        output: OutputManager,
    ) -> CliResult<()> {
        let theme: Box<dyn Theme> = if global.no_color || !output.supports_color() {
            Box::new(SimpleTheme)
        } else {
            Box::new(ColorfulTheme::default())
        };
        let theme = &*theme;

        let mut registry = super::super::registry(&config, &args.templates);
        let name = match &args.blueprint {
            Some(name) => name.clone(),
            None => select_blueprint(&mut registry, theme)?,
        };
        let info = registry.info(&name)?;
        output.success(&format!("Selected: {} ({})", info.name, info.class))?;

        let params = collect_parameters(&info, theme, &output)?;

        let descriptor = registry.resolve(&name)?;
        if let Err(e) = descriptor.require_build_method()?.validate(&params) {
            output.failure(&format!("Configuration error: {e}"))?;
            let save = Confirm::with_theme(theme)
                .with_prompt("Save anyway?")
                .default(false)
                .interact()
                .map_err(prompt_error)?;
            if !save {
                return Err(CliError::Cancelled);
            }
        } else {
            output.success("Configuration is valid")?;
        }

        let dir = args
            .output_dir
            .or(config.output.configs_dir)
            .unwrap_or_else(|| PathBuf::from("."));
        let path = dir.join(config_file_name(&name, &params));
        if path.exists() && !args.force {
            let overwrite = Confirm::with_theme(theme)
                .with_prompt(format!("{} already exists. Overwrite?", path.display()))
                .default(false)
                .interact()
                .map_err(prompt_error)?;
            if !overwrite {
                return Err(CliError::FileExists { path });
            }
        }

        write_config(&path, &name, &params)?;
        info!(path = %path.display(), blueprint = %name, "wrote instance config");
        output.success(&format!("Created {}", path.display()))?;
        output.print(&format!(
            "Render it with: blueprint render {}",
            path.display()
        ))?;
        Ok(())
    }

    fn select_blueprint(registry: &mut Registry, theme: &dyn Theme) -> CliResult<String> {
        let blueprints = registry.list()?;
        if blueprints.is_empty() {
            let dirs: Vec<String> = registry
                .search_directories()
                .iter()
                .map(|d| d.display().to_string())
                .collect();
            return Err(CliError::InvalidInput {
                message: format!("no blueprints found in {}", dirs.join(", ")),
                source: None,
            });
        }

        let items: Vec<String> = blueprints
            .iter()
            .map(|b| format!("{} - {}", b.name, b.description.lines().next().unwrap_or_default()))
            .collect();
        let choice = FuzzySelect::with_theme(theme)
            .with_prompt("Select a blueprint")
            .items(&items)
            .default(0)
            .interact_opt()
            .map_err(prompt_error)?
            .ok_or(CliError::Cancelled)?;
        Ok(blueprints[choice].name.clone())
    }

    fn collect_parameters(
        info: &BlueprintInfo,
        theme: &dyn Theme,
        output: &OutputManager,
    ) -> CliResult<Kwargs> {
        let mut params = Kwargs::new();
        for param in &info.parameters {
            let mut prompt = param.name.clone();
            if !param.description.is_empty() {
                prompt.push_str(&format!(" ({})", param.description));
            }

            let default = param
                .default
                .as_ref()
                .filter(|d| !d.is_null())
                .map(|d| super::super::display_value(Some(d)));
            let mut input = Input::<String>::with_theme(theme)
                .with_prompt(prompt)
                .allow_empty(!param.required);
            if let Some(default) = &default {
                input = input.default(default.clone()).show_default(true);
            }
            let raw = input.interact_text().map_err(prompt_error)?;

            if raw.trim().is_empty() {
                continue;
            }
            let (value, exact) = convert_value(&raw, param);
            if !exact {
                output.warning(&format!(
                    "Expected {} for '{}', keeping the text as entered",
                    param.ty, param.name
                ))?;
            }
            params.insert(param.name.clone(), value);
        }
        Ok(params)
    }

    fn write_config(path: &Path, name: &str, params: &Kwargs) -> CliResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_cli_context(|| format!("Failed to create directory '{}'", parent.display()))?;
        }
        let text = config_yaml(name, params)?;
        fs::write(path, text)
            .with_cli_context(|| format!("Failed to write config to '{}'", path.display()))
    }

    fn prompt_error(e: dialoguer::Error) -> CliError {
        let source = io::Error::from(e);
        if source.kind() == io::ErrorKind::Interrupted {
            return CliError::Cancelled;
        }
        CliError::IoError {
            message: format!("interactive prompt failed: {source}"),
            source,
        }
    }
}

/// Typed value for prompt input, and whether it matched the declared type.
pub fn convert_value(raw: &str, param: &ParameterInfo) -> (Json, bool) {
    let raw = raw.trim();
    match param.ty.as_str() {
        "integer" => match raw.parse::<i64>() {
            Ok(n) => (json!(n), true),
            Err(_) => (json!(raw), false),
        },
        "number" => match raw.parse::<f64>() {
            Ok(n) => (json!(n), true),
            Err(_) => (json!(raw), false),
        },
        "boolean" => (
            json!(matches!(
                raw.to_ascii_lowercase().as_str(),
                "true" | "yes" | "1" | "on"
            )),
            true,
        ),
        "array" => (
            Json::Array(raw.split(',').map(|v| json!(v.trim())).collect()),
            true,
        ),
        _ => (json!(raw), true),
    }
}

/// `<job_id>.dag.yaml`, falling back to `dag_id`, then the blueprint name;
/// dashes become underscores.
pub fn config_file_name(blueprint: &str, params: &Kwargs) -> String {
    let stem = ["job_id", "dag_id"]
        .iter()
        .find_map(|key| params.get(*key).and_then(Json::as_str))
        .unwrap_or(blueprint);
    format!("{}.dag.yaml", stem.replace('-', "_"))
}

/// YAML text with `blueprint` first, then parameters in prompt order.
pub fn config_yaml(blueprint: &str, params: &Kwargs) -> CliResult<String> {
    let mut document = Kwargs::new();
    document.insert("blueprint".into(), json!(blueprint));
    document.extend(params.clone());
    serde_yaml::to_string(&document).map_err(|e| CliError::InvalidInput {
        message: format!("could not serialise the config: {e}"),
        source: Some(Box::new(e)),
    })
}
