//! Blueprint Service - config-driven use cases.
//!
//! This service coordinates the workflow behind the CLI:
//! 1. Read an instance config (`*.dag.yaml`) through the reader port
//! 2. Resolve the named blueprint in the registry
//! 3. Validate through the synthesized build method and render
//! 4. Serialize, write through the filesystem port, then lint

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{info, instrument, warn};

use crate::application::ports::{ConfigReader, DagConfig, Filesystem, LintOptions, Linter};
use crate::application::services::dag_writer::{dag_file_path, default_dags_folder, write_source};
use crate::application::services::registry::Registry;
use crate::application::services::synthesizer::BuildMethod;
use crate::application::{ApplicationError, ConfigurationError};
use crate::domain::{CodeWriter, ConfigInstance, Kwargs, WorkflowGraph};
use crate::error::{BlueprintError, BlueprintResult};

/// How a config is turned into source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderStrategy {
    /// Render a graph, then serialize it with the code writer.
    #[default]
    Graph,
    /// Ask the blueprint for source text directly.
    Template,
}

/// Generated source for one config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDag {
    pub blueprint: String,
    pub dag_id: String,
    pub source: String,
}

/// Result of writing a DAG file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenDag {
    pub path: PathBuf,
    pub dag_id: String,
    /// `None` when linting is disabled or the linter could not run.
    pub lint_clean: Option<bool>,
}

/// Validation outcome for one config file.
#[derive(Debug, Clone)]
pub struct LintEntry {
    pub path: PathBuf,
    pub dag_id: Option<String>,
    pub error: Option<BlueprintError>,
}

impl LintEntry {
    pub fn is_valid(&self) -> bool {
        self.error.is_none()
    }
}

/// Every file's outcome, plus DAG ids shared between valid files.
#[derive(Debug, Clone, Default)]
pub struct LintReport {
    pub entries: Vec<LintEntry>,
    pub duplicates: Vec<ApplicationError>,
}

impl LintReport {
    pub fn is_ok(&self) -> bool {
        self.duplicates.is_empty() && self.entries.iter().all(LintEntry::is_valid)
    }

    pub fn failures(&self) -> usize {
        self.entries.iter().filter(|e| !e.is_valid()).count()
    }
}

/// Config-driven blueprint operations.
pub struct BlueprintService {
    registry: Registry,
    reader: Box<dyn ConfigReader>,
    filesystem: Box<dyn Filesystem>,
    linter: Box<dyn Linter>,
    writer: CodeWriter,
    lint: Option<LintOptions>,
    dags_folder: PathBuf,
}

impl BlueprintService {
    pub fn new(
        registry: Registry,
        reader: Box<dyn ConfigReader>,
        filesystem: Box<dyn Filesystem>,
        linter: Box<dyn Linter>,
    ) -> Self {
        Self {
            registry,
            reader,
            filesystem,
            linter,
            writer: CodeWriter::default(),
            lint: Some(LintOptions::default()),
            dags_folder: default_dags_folder(),
        }
    }

    pub fn with_writer(mut self, writer: CodeWriter) -> Self {
        self.writer = writer;
        self
    }

    /// `None` disables linting of written files.
    pub fn with_lint(mut self, lint: Option<LintOptions>) -> Self {
        self.lint = lint;
        self
    }

    pub fn with_dags_folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.dags_folder = folder.into();
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn dags_folder(&self) -> &Path {
        &self.dags_folder
    }

    /// Parse an instance config.
    pub fn load_config(&self, path: &Path) -> BlueprintResult<DagConfig> {
        self.reader.read(path)
    }

    /// Validate a config without rendering anything.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn validate_config(
        &mut self,
        path: &Path,
        overrides: &Kwargs,
    ) -> BlueprintResult<ConfigInstance> {
        let (config, method) = self.prepare(path, overrides)?;
        method
            .validate(&config.params)
            .map_err(|e| with_config_context(e, &config))
    }

    /// Validate and render the graph described by a config.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn build_from_config(
        &mut self,
        path: &Path,
        overrides: &Kwargs,
    ) -> BlueprintResult<WorkflowGraph> {
        let (config, method) = self.prepare(path, overrides)?;
        method
            .call(&config.params)
            .map_err(|e| with_config_context(e, &config))
    }

    /// Produce source text for a config without writing it.
    #[instrument(skip_all, fields(path = %path.display(), ?strategy))]
    pub fn render_config(
        &mut self,
        path: &Path,
        overrides: &Kwargs,
        strategy: RenderStrategy,
    ) -> BlueprintResult<RenderedDag> {
        let (config, method) = self.prepare(path, overrides)?;
        let (dag_id, source) = match strategy {
            RenderStrategy::Graph => {
                let graph = method
                    .call(&config.params)
                    .map_err(|e| with_config_context(e, &config))?;
                let source = self.writer.write(&graph)?;
                (graph.dag_id().to_string(), source)
            }
            RenderStrategy::Template => {
                let source = method
                    .call_template(&config.params)
                    .map_err(|e| with_config_context(e, &config))?;
                let dag_id = dag_id_of(&config.params).unwrap_or_else(|| config_stem(path));
                (dag_id, source)
            }
        };

        Ok(RenderedDag {
            blueprint: config.blueprint,
            dag_id,
            source,
        })
    }

    /// Render a config and write the result, by default to
    /// `<dags_folder>/<dag_id>.py`.
    pub fn render_to_file(
        &mut self,
        path: &Path,
        overrides: &Kwargs,
        strategy: RenderStrategy,
        output: Option<&Path>,
    ) -> BlueprintResult<WrittenDag> {
        let rendered = self.render_config(path, overrides, strategy)?;
        let target = output
            .map(Path::to_path_buf)
            .unwrap_or_else(|| dag_file_path(&self.dags_folder, &rendered.dag_id));

        write_source(&rendered.source, &target, self.filesystem.as_ref())?;
        info!(dag_id = %rendered.dag_id, path = %target.display(), "wrote DAG file");

        Ok(WrittenDag {
            lint_clean: self.lint_file(&target),
            path: target,
            dag_id: rendered.dag_id,
        })
    }

    /// Build a blueprint from keyword arguments and write the DAG file.
    ///
    /// `dag_id` names the default output file; it falls back to the id of
    /// the rendered graph.
    #[instrument(skip_all, fields(blueprint = name))]
    pub fn write_dag_file(
        &mut self,
        name: &str,
        kwargs: &Kwargs,
        dag_id: Option<&str>,
        output: Option<&Path>,
    ) -> BlueprintResult<WrittenDag> {
        let descriptor = self.registry.resolve(name)?;
        let graph = descriptor.require_build_method()?.call(kwargs)?;
        let dag_id = dag_id.unwrap_or(graph.dag_id()).to_string();

        let target = output
            .map(Path::to_path_buf)
            .unwrap_or_else(|| dag_file_path(&self.dags_folder, &dag_id));
        self.writer
            .write_to(&graph, &target, self.filesystem.as_ref())?;

        Ok(WrittenDag {
            lint_clean: self.lint_file(&target),
            path: target,
            dag_id,
        })
    }

    /// Validate every config, collecting all failures.
    ///
    /// Shared DAG ids are only checked when more than one file validated
    /// and none failed.
    #[instrument(skip_all, fields(files = paths.len()))]
    pub fn lint_configs(&mut self, paths: &[PathBuf]) -> LintReport {
        let mut report = LintReport::default();
        for path in paths {
            let entry = match self.validate_config(path, &Kwargs::new()) {
                Ok(instance) => LintEntry {
                    path: path.clone(),
                    dag_id: instance
                        .get_str("job_id")
                        .or_else(|| instance.get_str("dag_id"))
                        .map(str::to_string),
                    error: None,
                },
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "config failed validation");
                    LintEntry {
                        path: path.clone(),
                        dag_id: None,
                        error: Some(e),
                    }
                }
            };
            report.entries.push(entry);
        }

        let valid = report.entries.iter().filter(|e| e.is_valid()).count();
        if valid > 1 && report.failures() == 0 {
            let mut by_id: BTreeMap<&str, Vec<PathBuf>> = BTreeMap::new();
            for entry in &report.entries {
                if let Some(id) = &entry.dag_id {
                    by_id.entry(id.as_str()).or_default().push(entry.path.clone());
                }
            }
            report.duplicates = by_id
                .into_iter()
                .filter(|(_, files)| files.len() > 1)
                .map(|(dag_id, files)| ApplicationError::DuplicateDagId {
                    dag_id: dag_id.to_string(),
                    files,
                })
                .collect();
        }
        report
    }

    fn prepare(
        &mut self,
        path: &Path,
        overrides: &Kwargs,
    ) -> BlueprintResult<(DagConfig, BuildMethod)> {
        let mut config = self.reader.read(path)?;
        for (key, value) in overrides {
            config.params.insert(key.clone(), value.clone());
        }
        let descriptor = self.registry.resolve(&config.blueprint)?;
        let method = descriptor.require_build_method()?.clone();
        Ok((config, method))
    }

    fn lint_file(&self, path: &Path) -> Option<bool> {
        let options = self.lint?;
        match self.linter.lint(path, &options) {
            Ok(clean) => {
                if !clean {
                    warn!(path = %path.display(), "lint issues remain in generated file");
                }
                Some(clean)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "linter did not run");
                None
            }
        }
    }
}

/// Re-express a schema rejection as a configuration error about `config`.
fn with_config_context(err: BlueprintError, config: &DagConfig) -> BlueprintError {
    let Some(validation) = err.as_validation() else {
        return err;
    };

    let mut wrapped =
        ConfigurationError::new(format!("Configuration validation failed: {validation}"))
            .in_file(&config.path);
    for suggestion in &validation.suggestions {
        wrapped = wrapped.suggest(suggestion);
    }
    wrapped
        .suggest("Check that all required parameters are provided")
        .suggest("Verify parameter types match the blueprint requirements")
        .suggest(format!(
            "Use 'blueprint describe {}' to see parameter details",
            config.blueprint
        ))
        .into()
}

fn dag_id_of(params: &Kwargs) -> Option<String> {
    ["dag_id", "job_id"]
        .iter()
        .find_map(|key| params.get(*key).and_then(|v| v.as_str()))
        .map(str::to_string)
}

/// `daily.dag.yaml` -> `daily`.
fn config_stem(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.split('.').next().unwrap_or_default().to_string()
}
