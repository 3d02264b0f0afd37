//! `blueprint init`: write `blueprint.toml` and a starter manifest into the
//! current project.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use blueprint_adapters::manifest::EXAMPLE_MANIFEST;

use crate::{
    cli::InitArgs,
    config::{AppConfig, OutputConfig, PROJECT_CONFIG_FILE, TemplateConfig},
    error::{CliError, CliResult, IntoCli},
    output::OutputManager,
};

const EXAMPLE_MANIFEST_FILE: &str = "daily_etl.toml";

/// Where `init` puts things, chosen from what the project already has.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub templates: PathBuf,
    pub configs: PathBuf,
    pub dags_folder: Option<PathBuf>,
}

impl Layout {
    /// Airflow projects with a `dags/` folder keep everything under it.
    pub fn detect(root: &Path) -> Self {
        if root.join("dags").is_dir() {
            Self {
                templates: PathBuf::from("dags/blueprints/templates"),
                configs: PathBuf::from("dags/blueprints/instances"),
                dags_folder: Some(PathBuf::from("dags")),
            }
        } else {
            Self {
                templates: PathBuf::from("templates"),
                configs: PathBuf::from("configs"),
                dags_folder: None,
            }
        }
    }

    pub fn config(&self) -> AppConfig {
        AppConfig {
            templates: TemplateConfig {
                dirs: vec![self.templates.clone()],
            },
            output: OutputConfig {
                dags_folder: self.dags_folder.clone(),
                configs_dir: Some(self.configs.clone()),
                ..OutputConfig::default()
            },
            ..AppConfig::default()
        }
    }
}

#[instrument(skip_all)]
pub fn execute(args: InitArgs, output: OutputManager) -> CliResult<()> {
    init_in(Path::new("."), args.force, &output)
}

fn init_in(root: &Path, force: bool, output: &OutputManager) -> CliResult<()> {
    let config_path = root.join(PROJECT_CONFIG_FILE);
    if config_path.exists() && !force {
        output.warning(&format!(
            "{PROJECT_CONFIG_FILE} already exists (use --force to overwrite)"
        ))?;
        return Ok(());
    }

    let layout = Layout::detect(root);
    debug!(?layout, "project layout");

    let text = layout.config().to_toml().map_err(|e| CliError::ConfigError {
        message: format!("could not serialise {PROJECT_CONFIG_FILE}"),
        source: Some(e.into()),
    })?;
    fs::write(&config_path, text)
        .with_cli_context(|| format!("Failed to write '{}'", config_path.display()))?;
    output.success(&format!("Created {PROJECT_CONFIG_FILE}"))?;

    for dir in [&layout.templates, &layout.configs] {
        let dir = root.join(dir);
        fs::create_dir_all(&dir)
            .with_cli_context(|| format!("Failed to create directory '{}'", dir.display()))?;
    }

    let relative = layout.templates.join(EXAMPLE_MANIFEST_FILE);
    let manifest = root.join(&relative);
    if manifest.exists() && !force {
        output.warning(&format!(
            "{} already exists, leaving it alone",
            relative.display()
        ))?;
    } else {
        fs::write(&manifest, EXAMPLE_MANIFEST)
            .with_cli_context(|| format!("Failed to write '{}'", manifest.display()))?;
        output.success(&format!("Created example blueprint {}", relative.display()))?;
    }

    output.print("")?;
    output.header("Next steps:")?;
    output.print("  1. Inspect it:       blueprint describe daily_etl")?;
    output.print(&format!(
        "  2. Create a config:  blueprint new --output-dir {}",
        layout.configs.display()
    ))?;
    output.print("  3. Render it:        blueprint render <config>.dag.yaml")?;
    Ok(())
}
