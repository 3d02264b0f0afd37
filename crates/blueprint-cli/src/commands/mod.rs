//! Command handlers. Each module translates parsed arguments into calls on
//! the core services and renders the results; no business logic lives here.

use std::sync::Arc;

use serde_json::{Value as Json, json};
use tracing::debug;

use blueprint_adapters::{CommandLinter, LocalFilesystem, ManifestLoader, YamlConfigReader};
use blueprint_core::application::{BlueprintInfo, BlueprintService, Registry, SearchPaths};
use blueprint_core::domain::Kwargs;

use crate::cli::TemplateDirArgs;
use crate::config::AppConfig;

pub mod completions;
pub mod describe;
pub mod init;
pub mod lint;
pub mod list;
pub mod new;
pub mod render;
pub mod schema;

/// Registry over `--template-dir` when given, else the configured
/// directories layered over the environment defaults.
pub(crate) fn registry(config: &AppConfig, templates: &TemplateDirArgs) -> Registry {
    let search = if templates.template_dirs.is_empty() {
        SearchPaths::with_overrides(&config.templates.dirs)
    } else {
        SearchPaths::only(templates.template_dirs.iter().cloned())
    };
    debug!(dirs = ?search.dirs(), "blueprint search path");
    Registry::new(search, Arc::new(ManifestLoader::new()))
}

/// Config-driven service wired to the local adapters. `lint` switches the
/// post-write linter off regardless of configuration when false.
pub(crate) fn service(config: &AppConfig, templates: &TemplateDirArgs, lint: bool) -> BlueprintService {
    let options = if lint { config.lint.options() } else { None };
    let mut service = BlueprintService::new(
        registry(config, templates),
        Box::new(YamlConfigReader::new()),
        Box::new(LocalFilesystem::new()),
        Box::new(CommandLinter::new(config.lint.command.clone())),
    )
    .with_lint(options);
    if let Some(folder) = &config.output.dags_folder {
        service = service.with_dags_folder(folder);
    }
    service
}

/// Example instance config: required parameters get a `<type>` placeholder,
/// optional ones their default.
pub(crate) fn example_config(info: &BlueprintInfo) -> Kwargs {
    let mut example = Kwargs::new();
    example.insert("blueprint".into(), json!(info.name));
    for param in &info.parameters {
        if param.required {
            example.insert(param.name.clone(), json!(format!("<{}>", param.ty)));
        } else if let Some(default) = param.default.as_ref().filter(|d| !d.is_null()) {
            example.insert(param.name.clone(), default.clone());
        }
    }
    example
}

/// One-line display of a JSON default: strings unquoted, `-` for none.
pub(crate) fn display_value(value: Option<&Json>) -> String {
    match value {
        None | Some(Json::Null) => "-".into(),
        Some(Json::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use blueprint_core::application::ParameterInfo;

    use super::*;

    fn param(name: &str, ty: &str, default: Option<Json>) -> ParameterInfo {
        ParameterInfo {
            name: name.into(),
            ty: ty.into(),
            description: String::new(),
            required: default.is_none(),
            default,
            pattern: None,
            minimum: None,
            maximum: None,
            enum_values: None,
        }
    }

    #[test]
    fn example_config_uses_placeholders_and_defaults() {
        let info = BlueprintInfo {
            name: "daily_etl".into(),
            class: "DailyETL".into(),
            description: String::new(),
            parameters: vec![
                param("job_id", "string", None),
                param("retries", "integer", Some(json!(2))),
            ],
            defaults: Kwargs::new(),
            schema: json!({}),
            locations: vec![],
            signature: None,
        };
        let example = example_config(&info);
        assert_eq!(
            Json::Object(example),
            json!({"blueprint": "daily_etl", "job_id": "<string>", "retries": 2})
        );
    }

    #[test]
    fn display_value_unquotes_strings() {
        assert_eq!(display_value(Some(&json!("@daily"))), "@daily");
        assert_eq!(display_value(Some(&json!(2))), "2");
        assert_eq!(display_value(None), "-");
    }

    #[test]
    fn template_dir_flag_replaces_search_path() {
        let templates = TemplateDirArgs {
            template_dirs: vec!["only/here".into()],
        };
        let registry = registry(&AppConfig::default(), &templates);
        assert_eq!(registry.search_directories(), [std::path::PathBuf::from("only/here")]);
    }
}
