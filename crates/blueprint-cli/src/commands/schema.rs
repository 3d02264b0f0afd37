//! `blueprint schema`: a JSON schema for editor validation of instance
//! configs.

use std::fs;
use std::path::Path;

use serde_json::{Map, Value as Json, json};
use tracing::instrument;

use blueprint_core::application::BlueprintInfo;

use crate::{
    cli::SchemaArgs,
    config::AppConfig,
    error::{CliError, CliResult, IntoCli},
    output::OutputManager,
};

const DRAFT_07: &str = "http://json-schema.org/draft-07/schema#";

#[instrument(skip_all, fields(blueprint = %args.name))]
pub fn execute(args: SchemaArgs, config: AppConfig, output: OutputManager) -> CliResult<()> {
    let mut registry = super::registry(&config, &args.templates);
    let info = registry.info(&args.name)?;
    let document = config_schema(&info);

    let text = serde_json::to_string_pretty(&document).map_err(|e| CliError::InvalidInput {
        message: format!("could not serialise the schema: {e}"),
        source: Some(Box::new(e)),
    })?;

    match &args.output {
        Some(path) => {
            write_file(path, &text)?;
            output.success(&format!("Schema written to {}", path.display()))?;
        }
        None => output.data(&text)?,
    }
    Ok(())
}

/// The blueprint's config schema with a leading `blueprint` const property,
/// which also comes first in `required`.
pub fn config_schema(info: &BlueprintInfo) -> Json {
    let schema = info.schema.as_object().cloned().unwrap_or_default();

    let mut properties = Map::new();
    properties.insert(
        "blueprint".into(),
        json!({
            "type": "string",
            "const": info.name,
            "description": "The blueprint template to use",
        }),
    );
    if let Some(existing) = schema.get("properties").and_then(Json::as_object) {
        properties.extend(existing.clone());
    }

    let mut required = vec![json!("blueprint")];
    if let Some(existing) = schema.get("required").and_then(Json::as_array) {
        required.extend(existing.iter().cloned());
    }

    let mut document = Map::new();
    document.insert("$schema".into(), json!(DRAFT_07));
    document.insert("title".into(), json!(format!("{} Configuration", info.class)));
    for (key, value) in schema {
        match key.as_str() {
            "$schema" | "title" | "properties" | "required" => {}
            _ => {
                document.insert(key, value);
            }
        }
    }
    document.insert("properties".into(), Json::Object(properties));
    document.insert("required".into(), Json::Array(required));
    Json::Object(document)
}

fn write_file(path: &Path, text: &str) -> CliResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_cli_context(|| format!("Failed to create directory '{}'", parent.display()))?;
    }
    fs::write(path, format!("{text}\n"))
        .with_cli_context(|| format!("Failed to write schema to '{}'", path.display()))
}
