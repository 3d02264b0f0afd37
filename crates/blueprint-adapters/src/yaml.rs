//! YAML instance configs (`*.dag.yaml`).
//!
//! A config names the blueprint to build and supplies its parameters:
//!
//! ```yaml
//! blueprint: daily_etl
//! job_id: customer-daily-sync
//! source_table: raw.customers
//! target_table: analytics.customers
//! retries: 4
//! ```

use std::path::Path;
use std::sync::Arc;

use serde_json::Value as Json;
use tracing::debug;

use blueprint_core::application::ConfigurationError;
use blueprint_core::application::ports::{ConfigReader, DagConfig, Filesystem};
use blueprint_core::domain::Kwargs;
use blueprint_core::error::BlueprintResult;

use crate::filesystem::LocalFilesystem;

/// Key naming the blueprint to build.
pub const BLUEPRINT_KEY: &str = "blueprint";

/// Suffix of instance config files picked up by `blueprint lint`.
pub const CONFIG_SUFFIX: &str = ".dag.yaml";

/// Reads configs through a [`Filesystem`].
#[derive(Clone)]
pub struct YamlConfigReader {
    fs: Arc<dyn Filesystem>,
}

impl std::fmt::Debug for YamlConfigReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YamlConfigReader").finish_non_exhaustive()
    }
}

impl Default for YamlConfigReader {
    fn default() -> Self {
        Self::new()
    }
}

impl YamlConfigReader {
    /// Reader over the local filesystem.
    pub fn new() -> Self {
        Self::with_filesystem(Arc::new(LocalFilesystem::new()))
    }

    pub fn with_filesystem(fs: Arc<dyn Filesystem>) -> Self {
        Self { fs }
    }

    /// Parse config text that was read from `path`.
    pub fn parse(path: &Path, text: &str) -> Result<DagConfig, ConfigurationError> {
        let error = |message: &str| ConfigurationError::new(message).in_file(path);

        let document: serde_yaml::Value =
            serde_yaml::from_str(text).map_err(|e| syntax_error(path, &e))?;

        let mapping = match document {
            serde_yaml::Value::Null => None,
            serde_yaml::Value::Mapping(m) if m.is_empty() => None,
            serde_yaml::Value::Mapping(m) => Some(m),
            _ => {
                return Err(error("Configuration must be a mapping of parameter names to values")
                    .suggest("Write one 'name: value' pair per line"));
            }
        };
        let Some(mut mapping) = mapping else {
            return Err(error("Configuration file is empty")
                .suggest("Add a 'blueprint' field to specify which blueprint to use")
                .suggest("Add configuration parameters for your blueprint"));
        };

        let blueprint = match mapping.shift_remove(BLUEPRINT_KEY) {
            Some(serde_yaml::Value::String(name)) if !name.trim().is_empty() => {
                name.trim().to_string()
            }
            _ => {
                return Err(error("Missing required field 'blueprint'")
                    .suggest("Add 'blueprint: <blueprint_name>' to your configuration")
                    .suggest("Use 'blueprint list' to see available blueprints"));
            }
        };

        let params = match serde_json::to_value(&mapping) {
            Ok(Json::Object(params)) => params,
            Ok(_) => Kwargs::new(),
            Err(e) => {
                return Err(error(&format!("Unsupported configuration value: {e}"))
                    .suggest("Use plain string keys for every parameter"));
            }
        };

        debug!(path = %path.display(), %blueprint, params = params.len(), "parsed config");
        Ok(DagConfig {
            path: path.to_path_buf(),
            blueprint,
            params,
        })
    }
}

fn syntax_error(path: &Path, err: &serde_yaml::Error) -> ConfigurationError {
    let mut error = ConfigurationError::new(format!("Invalid YAML syntax: {err}")).in_file(path);
    if let Some(location) = err.location() {
        error = error.at(location.line(), location.column());
    }
    error
        .suggest("Check YAML syntax (proper indentation, quotes, etc.)")
        .suggest("Validate that all strings are properly quoted")
        .suggest("Ensure lists use '- ' prefix and maps use 'key: value' format")
}

impl ConfigReader for YamlConfigReader {
    fn read(&self, path: &Path) -> BlueprintResult<DagConfig> {
        let text = self.fs.read_to_string(path)?;
        Ok(Self::parse(path, &text)?)
    }
}

/// Whether `path` looks like an instance config.
pub fn is_config_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(CONFIG_SUFFIX))
}
