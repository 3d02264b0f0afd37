//! `blueprint describe`: parameters, an example config and the build
//! signature of one blueprint.

use tracing::instrument;

use blueprint_core::application::{BlueprintInfo, ParameterInfo};

use crate::{
    cli::{DescribeArgs, OutputFormat},
    config::AppConfig,
    error::{CliError, CliResult},
    output::{OutputManager, table},
};

use super::{display_value, example_config};

#[instrument(skip_all, fields(blueprint = %args.name))]
pub fn execute(args: DescribeArgs, config: AppConfig, output: OutputManager) -> CliResult<()> {
    let mut registry = super::registry(&config, &args.templates);
    let info = registry.info(&args.name)?;

    if output.format() == OutputFormat::Json {
        output.json(&info)?;
        return Ok(());
    }

    output.header(&format!("Blueprint: {}", info.name))?;
    output.print(&format!("  Class:       {}", info.class))?;
    output.print(&format!("  Description: {}", info.description))?;
    for location in &info.locations {
        output.print(&format!("  Defined in:  {location}"))?;
    }

    if !info.parameters.is_empty() {
        output.print("")?;
        output.header("Parameters:")?;
        let rows: Vec<Vec<String>> = info.parameters.iter().map(parameter_row).collect();
        for line in table(
            &["NAME", "TYPE", "REQUIRED", "DEFAULT", "CONSTRAINTS", "DESCRIPTION"],
            &rows,
        ) {
            output.print(&format!("  {line}"))?;
        }
    }

    output.print("")?;
    output.header("Example YAML configuration:")?;
    output.data(&example_yaml(&info)?)?;

    if let Some(signature) = &info.signature {
        output.print("")?;
        output.header("Build signature:")?;
        output.print(&format!("  {signature}"))?;
    }

    Ok(())
}

fn parameter_row(param: &ParameterInfo) -> Vec<String> {
    vec![
        param.name.clone(),
        param.ty.clone(),
        if param.required { "yes" } else { "no" }.into(),
        display_value(param.default.as_ref()),
        constraints(param),
        if param.description.is_empty() {
            "-".into()
        } else {
            param.description.clone()
        },
    ]
}

fn constraints(param: &ParameterInfo) -> String {
    let mut parts = Vec::new();
    if let Some(pattern) = &param.pattern {
        parts.push(format!("pattern {pattern}"));
    }
    if let Some(min) = &param.minimum {
        parts.push(format!(">= {min}"));
    }
    if let Some(max) = &param.maximum {
        parts.push(format!("<= {max}"));
    }
    if let Some(values) = &param.enum_values {
        let values: Vec<String> = values.iter().map(|v| display_value(Some(v))).collect();
        parts.push(format!("one of {}", values.join("|")));
    }
    if parts.is_empty() {
        "-".into()
    } else {
        parts.join(", ")
    }
}

fn example_yaml(info: &BlueprintInfo) -> CliResult<String> {
    serde_yaml::to_string(&example_config(info)).map_err(|e| CliError::InvalidInput {
        message: format!("could not render an example config: {e}"),
        source: Some(Box::new(e)),
    })
}
