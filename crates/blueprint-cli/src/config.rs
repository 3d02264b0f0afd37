//! Application configuration.
//!
//! [`AppConfig`] is loaded once at startup and passed down by value. The CLI
//! layer owns config; the core crate never sees it.
//!
//! # Resolution order (highest priority first)
//!
//! 1. CLI flags (handled at the call-site, not here)
//! 2. `BLUEPRINT_*` environment variables, `__` between sections
//!    (`BLUEPRINT_LINT__ENABLED=false`)
//! 3. `--config FILE`, or else `blueprint.toml` / `.blueprint.toml` in the
//!    current directory, then the per-user config file
//! 4. Built-in defaults (always present)

use std::path::{Path, PathBuf};

use anyhow::Context;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use blueprint_adapters::linter::DEFAULT_LINT_COMMAND;
use blueprint_core::application::ports::LintOptions;

/// Project config file written by `blueprint init`.
pub const PROJECT_CONFIG_FILE: &str = "blueprint.toml";

/// Hidden alternative to [`PROJECT_CONFIG_FILE`].
pub const HIDDEN_CONFIG_FILE: &str = ".blueprint.toml";

const ENV_PREFIX: &str = "BLUEPRINT";

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Where blueprints are discovered.
    pub templates: TemplateConfig,
    /// Output settings.
    pub output: OutputConfig,
    /// Post-write linting.
    pub lint: LintConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    /// Searched before `BLUEPRINT_TEMPLATE_PATH` and the Airflow defaults.
    pub dirs: Vec<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub no_color: bool,
    /// Folder for generated DAG files; `$AIRFLOW_HOME/dags` when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dags_folder: Option<PathBuf>,
    /// Where `blueprint new` writes instance configs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configs_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LintConfig {
    pub enabled: bool,
    pub fix: bool,
    pub format: bool,
    /// Linter executable.
    pub command: String,
}

impl Default for LintConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            fix: true,
            format: true,
            command: DEFAULT_LINT_COMMAND.into(),
        }
    }
}

impl LintConfig {
    /// Options for the linter port, or `None` when linting is off.
    pub fn options(&self) -> Option<LintOptions> {
        self.enabled.then_some(LintOptions {
            fix: self.fix,
            format: self.format,
        })
    }
}

impl AppConfig {
    /// Load configuration from files and the environment over the defaults.
    ///
    /// An explicit `config_file` must exist; the implicit locations are
    /// optional.
    pub fn load(config_file: Option<&PathBuf>) -> anyhow::Result<Self> {
        Self::load_from(config_file.map(PathBuf::as_path), Path::new("."))
    }

    fn load_from(config_file: Option<&Path>, project_dir: &Path) -> anyhow::Result<Self> {
        let mut builder = Config::builder();

        match config_file {
            Some(path) => {
                if !path.is_file() {
                    anyhow::bail!("config file '{}' does not exist", path.display());
                }
                builder = builder.add_source(File::from(path).required(true));
            }
            None => {
                if let Some(user) = Self::config_path() {
                    builder = builder.add_source(File::from(user).required(false));
                }
                builder = builder
                    .add_source(File::from(project_dir.join(HIDDEN_CONFIG_FILE)).required(false))
                    .add_source(File::from(project_dir.join(PROJECT_CONFIG_FILE)).required(false));
            }
        }

        let config = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("could not read configuration sources")?;

        config
            .try_deserialize()
            .context("configuration has an invalid shape")
    }

    /// Per-user config file, e.g. `~/.config/blueprint/config.toml`.
    pub fn config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("io", "blueprint", "blueprint")
            .map(|d| d.config_dir().join("config.toml"))
    }

    /// Serialized form written by `blueprint init`.
    pub fn to_toml(&self) -> anyhow::Result<String> {
        toml::to_string_pretty(self).context("failed to serialise configuration")
    }
}
