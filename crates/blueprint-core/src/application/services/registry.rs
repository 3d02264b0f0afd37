//! Blueprint registry: discovery, name resolution and conflict tracking.
//!
//! The registry is a plain value built from [`SearchPaths`] and a
//! [`BlueprintLoader`]. It keeps a `name -> descriptor` map and a
//! `name -> [location, ...]` map; more than one location for a name is the
//! only thing that makes the name ambiguous.
//!
//! Conflicts surface lazily through [`Registry::resolve`] (only for the
//! requested name) and eagerly through [`Registry::list`], which scans
//! declaration headers and fails on the first repeated name.

use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value as Json;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::application::ApplicationError;
use crate::application::ports::{BlueprintLoader, DeclarationSummary};
use crate::application::services::synthesizer::{BuildMethod, synthesize};
use crate::domain::{Blueprint, Kwargs, SchemaValidator, blueprint_name, declares_blueprint_base};
use crate::error::BlueprintResult;

/// Environment variable holding extra search directories, colon-separated.
pub const TEMPLATE_PATH_ENV: &str = "BLUEPRINT_TEMPLATE_PATH";

/// Used when `AIRFLOW_HOME` is unset.
pub const DEFAULT_AIRFLOW_HOME: &str = "/usr/local/airflow";

/// Template directory relative to an Airflow home or the working directory.
pub const TEMPLATES_SUBDIR: &str = ".astro/templates";

const NO_DESCRIPTION: &str = "No description";
const SUGGESTION_CUTOFF: f64 = 0.6;
const MAX_SUGGESTIONS: usize = 3;

/// Ordered, deduplicated list of directories to search.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchPaths {
    dirs: Vec<PathBuf>,
}

impl SearchPaths {
    /// Exactly these directories, nothing else.
    pub fn only<I, P>(dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut paths = Self::default();
        for dir in dirs {
            paths.push(dir.into());
        }
        paths
    }

    /// Layered resolution: explicit overrides, then the colon-separated
    /// `env_value`, then `<airflow_home>/.astro/templates`, then the local
    /// `.astro/templates` when `include_local` is set.
    pub fn layered(
        overrides: &[PathBuf],
        env_value: Option<&str>,
        airflow_home: Option<&str>,
        include_local: bool,
    ) -> Self {
        let mut paths = Self::only(overrides.iter().cloned());

        if let Some(value) = env_value {
            for part in value.split(':').map(str::trim).filter(|p| !p.is_empty()) {
                paths.push(PathBuf::from(part));
            }
        }

        let home = airflow_home
            .filter(|h| !h.trim().is_empty())
            .unwrap_or(DEFAULT_AIRFLOW_HOME);
        paths.push(Path::new(home).join(TEMPLATES_SUBDIR));

        if include_local {
            paths.push(PathBuf::from(TEMPLATES_SUBDIR));
        }
        paths
    }

    /// Layered resolution from the process environment.
    pub fn from_env() -> Self {
        Self::with_overrides(&[])
    }

    /// Like [`SearchPaths::from_env`], with `overrides` searched first.
    pub fn with_overrides(overrides: &[PathBuf]) -> Self {
        let env_value = env::var(TEMPLATE_PATH_ENV).ok();
        let airflow_home = env::var("AIRFLOW_HOME").ok();
        Self::layered(
            overrides,
            env_value.as_deref(),
            airflow_home.as_deref(),
            Path::new(TEMPLATES_SUBDIR).is_dir(),
        )
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    fn push(&mut self, dir: PathBuf) {
        if !self.dirs.contains(&dir) {
            self.dirs.push(dir);
        }
    }
}

/// Registry metadata about one blueprint.
#[derive(Debug, Clone)]
pub struct BlueprintDescriptor {
    name: String,
    location: String,
    blueprint: Arc<dyn Blueprint>,
    build: Option<BuildMethod>,
}

impl BlueprintDescriptor {
    fn new(location: String, blueprint: Arc<dyn Blueprint>) -> Self {
        let build = synthesize(&blueprint);
        Self {
            name: blueprint_name(blueprint.class_name()),
            location,
            blueprint,
            build,
        }
    }

    /// Derived registry key, e.g. `daily_etl`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn class_name(&self) -> &str {
        self.blueprint.class_name()
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn description(&self) -> &str {
        self.blueprint.doc().unwrap_or(NO_DESCRIPTION)
    }

    pub fn blueprint(&self) -> &Arc<dyn Blueprint> {
        &self.blueprint
    }

    pub fn schema(&self) -> Option<Arc<dyn SchemaValidator>> {
        self.blueprint.schema()
    }

    /// Synthesized at registration; `None` when there is no schema.
    pub fn build_method(&self) -> Option<&BuildMethod> {
        self.build.as_ref()
    }

    /// Like [`BlueprintDescriptor::build_method`], failing instead of `None`.
    pub fn require_build_method(&self) -> BlueprintResult<&BuildMethod> {
        self.build.as_ref().ok_or_else(|| {
            ApplicationError::NoBuildMethod {
                class: self.class_name().to_string(),
            }
            .into()
        })
    }
}

/// Listing entry produced by the light scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlueprintSummary {
    pub name: String,
    pub class: String,
    /// Location of the declaring file.
    pub module: String,
    pub description: String,
    pub locations: Vec<String>,
}

/// One row of [`BlueprintInfo::parameters`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    pub description: String,
    pub default: Option<Json>,
    pub required: bool,
    pub pattern: Option<String>,
    pub minimum: Option<Json>,
    pub maximum: Option<Json>,
    #[serde(rename = "enum")]
    pub enum_values: Option<Vec<Json>>,
}

/// Detailed description of a resolved blueprint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlueprintInfo {
    pub name: String,
    pub class: String,
    pub description: String,
    pub parameters: Vec<ParameterInfo>,
    pub defaults: Kwargs,
    pub schema: Json,
    pub locations: Vec<String>,
    /// Synthesized build signature, when the blueprint has a schema.
    pub signature: Option<String>,
}

/// Explicit registry context. Not synchronized; wrap it in a lock to share.
pub struct Registry {
    search: SearchPaths,
    loader: Arc<dyn BlueprintLoader>,
    builtins: Vec<(String, Arc<dyn Blueprint>)>,
    descriptors: BTreeMap<String, BlueprintDescriptor>,
    locations: BTreeMap<String, Vec<String>>,
    discovered: bool,
    cached_list: Option<Vec<BlueprintSummary>>,
    snapshot: Uuid,
}

impl Registry {
    pub fn new(search: SearchPaths, loader: Arc<dyn BlueprintLoader>) -> Self {
        Self {
            search,
            loader,
            builtins: Vec::new(),
            descriptors: BTreeMap::new(),
            locations: BTreeMap::new(),
            discovered: false,
            cached_list: None,
            snapshot: Uuid::new_v4(),
        }
    }

    /// A fresh registry over exactly `dirs`, sharing this one's loader and
    /// compiled-in blueprints.
    pub fn with_directories<I, P>(&self, dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut registry = Self::new(SearchPaths::only(dirs), Arc::clone(&self.loader));
        registry.builtins = self.builtins.clone();
        registry
    }

    pub fn search_directories(&self) -> &[PathBuf] {
        self.search.dirs()
    }

    /// Add a compiled-in blueprint. It takes part in discovery and conflict
    /// tracking like a file-backed one.
    pub fn register(&mut self, location: impl Into<String>, blueprint: Arc<dyn Blueprint>) {
        self.builtins.push((location.into(), blueprint));
        self.discovered = false;
        self.cached_list = None;
    }

    /// Identifies the current discovery pass; changes on every pass.
    pub fn snapshot_id(&self) -> Uuid {
        self.snapshot
    }

    /// Load every candidate file and rebuild both maps wholesale.
    ///
    /// A file that fails to load is logged and skipped. No-op when already
    /// discovered, unless `force` is set.
    #[instrument(skip_all, fields(force))]
    pub fn discover(&mut self, force: bool) {
        if self.discovered && !force {
            return;
        }

        self.descriptors.clear();
        self.locations.clear();
        self.cached_list = None;

        let builtins = self.builtins.clone();
        for (location, blueprint) in builtins {
            self.insert(location, blueprint);
        }

        let loader = Arc::clone(&self.loader);
        for dir in self.search.dirs().to_vec() {
            for file in candidates(loader.as_ref(), &dir) {
                let blueprints = match loader.load(&file) {
                    Ok(blueprints) => blueprints,
                    Err(e) => {
                        warn!(path = %file.display(), error = %e, "failed to load blueprint file");
                        continue;
                    }
                };
                for blueprint in blueprints {
                    if declares_blueprint_base(blueprint.bases()) {
                        self.insert(location_of(&dir, &file), blueprint);
                    }
                }
            }
        }

        self.discovered = true;
        self.snapshot = Uuid::new_v4();
        info!(
            blueprints = self.descriptors.len(),
            snapshot = %self.snapshot,
            "blueprint discovery complete"
        );
    }

    fn insert(&mut self, location: String, blueprint: Arc<dyn Blueprint>) {
        let descriptor = BlueprintDescriptor::new(location.clone(), blueprint);
        debug!(name = descriptor.name(), %location, "registered blueprint");
        self.locations
            .entry(descriptor.name.clone())
            .or_default()
            .push(location);
        self.descriptors.insert(descriptor.name.clone(), descriptor);
    }

    /// Look up a blueprint by derived name.
    ///
    /// # Errors
    ///
    /// `DuplicateName` with every known location when more than one file
    /// declares the name; `NotFound` with close-match suggestions otherwise.
    pub fn resolve(&mut self, name: &str) -> BlueprintResult<BlueprintDescriptor> {
        self.discover(false);

        if let Some(locations) = self.locations.get(name).filter(|l| l.len() > 1) {
            return Err(ApplicationError::DuplicateName {
                name: name.to_string(),
                locations: locations.clone(),
            }
            .into());
        }

        match self.descriptors.get(name) {
            Some(descriptor) => Ok(descriptor.clone()),
            None => {
                let available: Vec<String> = self.descriptors.keys().cloned().collect();
                Err(ApplicationError::NotFound {
                    name: name.to_string(),
                    suggestions: not_found_suggestions(name, &available),
                    available,
                }
                .into())
            }
        }
    }

    /// Registered names after discovery, sorted.
    pub fn names(&mut self) -> Vec<String> {
        self.discover(false);
        self.descriptors.keys().cloned().collect()
    }

    /// Sorted summaries from the light scan; cached until the next forced
    /// discovery or [`Registry::clear`].
    ///
    /// # Errors
    ///
    /// `DuplicateName` as soon as a second location for a name is seen.
    #[instrument(skip_all)]
    pub fn list(&mut self) -> BlueprintResult<Vec<BlueprintSummary>> {
        if let Some(cached) = &self.cached_list {
            return Ok(cached.clone());
        }

        let mut seen: BTreeMap<String, BlueprintSummary> = BTreeMap::new();
        let mut record = |decl: DeclarationSummary, location: String| -> BlueprintResult<()> {
            let name = blueprint_name(&decl.class_name);
            if let Some(existing) = seen.get(&name) {
                let mut locations = existing.locations.clone();
                locations.push(location);
                return Err(ApplicationError::DuplicateName { name, locations }.into());
            }
            seen.insert(
                name.clone(),
                BlueprintSummary {
                    name,
                    class: decl.class_name,
                    module: location.clone(),
                    description: decl.doc.unwrap_or_else(|| NO_DESCRIPTION.to_string()),
                    locations: vec![location],
                },
            );
            Ok(())
        };

        for (location, blueprint) in &self.builtins {
            record(
                DeclarationSummary {
                    class_name: blueprint.class_name().to_string(),
                    bases: blueprint.bases().to_vec(),
                    doc: blueprint.doc().map(str::to_string),
                },
                location.clone(),
            )?;
        }

        for dir in self.search.dirs() {
            for file in candidates(self.loader.as_ref(), dir) {
                let declarations = match self.loader.scan(&file) {
                    Ok(declarations) => declarations,
                    Err(e) => {
                        warn!(path = %file.display(), error = %e, "could not scan blueprint file");
                        continue;
                    }
                };
                for decl in declarations {
                    if declares_blueprint_base(&decl.bases) {
                        record(decl, location_of(dir, &file))?;
                    }
                }
            }
        }

        let list: Vec<BlueprintSummary> = seen.into_values().collect();
        self.cached_list = Some(list.clone());
        Ok(list)
    }

    /// Parameters, defaults, schema and locations of one blueprint.
    pub fn info(&mut self, name: &str) -> BlueprintResult<BlueprintInfo> {
        let descriptor = self.resolve(name)?;
        let schema = descriptor
            .schema()
            .map(|s| s.json_schema())
            .unwrap_or_else(|| Json::Object(Kwargs::new()));

        let parameters = parameters_from_schema(&schema);
        let defaults: Kwargs = parameters
            .iter()
            .filter_map(|p| match &p.default {
                Some(Json::Null) | None => None,
                Some(default) => Some((p.name.clone(), default.clone())),
            })
            .collect();

        Ok(BlueprintInfo {
            name: name.to_string(),
            class: descriptor.class_name().to_string(),
            description: descriptor.description().to_string(),
            parameters,
            defaults,
            schema,
            locations: self.locations.get(name).cloned().unwrap_or_default(),
            signature: descriptor.build_method().map(BuildMethod::signature),
        })
    }

    /// Drop everything discovered; the next access rediscovers.
    pub fn clear(&mut self) {
        self.descriptors.clear();
        self.locations.clear();
        self.cached_list = None;
        self.discovered = false;
    }
}

fn candidates(loader: &dyn BlueprintLoader, dir: &Path) -> Vec<PathBuf> {
    match loader.candidates(dir) {
        Ok(files) => files,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "could not read template directory");
            Vec::new()
        }
    }
}

/// `file` relative to the grandparent of its search directory, or the full
/// path when that is not possible.
fn location_of(dir: &Path, file: &Path) -> String {
    dir.parent()
        .and_then(Path::parent)
        .and_then(|root| file.strip_prefix(root).ok())
        .filter(|rel| !rel.as_os_str().is_empty())
        .unwrap_or(file)
        .display()
        .to_string()
}

fn parameters_from_schema(schema: &Json) -> Vec<ParameterInfo> {
    let required: Vec<&str> = schema
        .get("required")
        .and_then(Json::as_array)
        .map(|r| r.iter().filter_map(Json::as_str).collect())
        .unwrap_or_default();

    let Some(properties) = schema.get("properties").and_then(Json::as_object) else {
        return Vec::new();
    };

    properties
        .iter()
        .map(|(name, prop)| ParameterInfo {
            name: name.clone(),
            ty: prop
                .get("type")
                .and_then(Json::as_str)
                .unwrap_or("string")
                .to_string(),
            description: prop
                .get("description")
                .and_then(Json::as_str)
                .unwrap_or_default()
                .to_string(),
            default: prop.get("default").cloned(),
            required: required.contains(&name.as_str()),
            pattern: prop
                .get("pattern")
                .and_then(Json::as_str)
                .map(str::to_string),
            minimum: prop.get("minimum").cloned(),
            maximum: prop.get("maximum").cloned(),
            enum_values: prop.get("enum").and_then(Json::as_array).cloned(),
        })
        .collect()
}

/// "Did you mean" hints for a missing name, then the full sorted list.
pub fn not_found_suggestions(name: &str, available: &[String]) -> Vec<String> {
    if available.is_empty() {
        return vec![
            "No blueprints found. Check that:".into(),
            format!("1. Your templates directory exists ({TEMPLATES_SUBDIR}/)"),
            "2. Your blueprint files are in the templates directory".into(),
            "3. Your blueprint classes inherit from Blueprint[ConfigType]".into(),
        ];
    }

    let mut scored: Vec<(&str, f64)> = available
        .iter()
        .map(|candidate| {
            (
                candidate.as_str(),
                strsim::normalized_levenshtein(name, candidate),
            )
        })
        .filter(|(_, score)| *score >= SUGGESTION_CUTOFF)
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    scored.truncate(MAX_SUGGESTIONS);

    let mut out = Vec::new();
    match scored.as_slice() {
        [] => {}
        [(only, _)] => out.push(format!("Did you mean '{only}'?")),
        many => {
            let quoted: Vec<String> = many.iter().map(|(m, _)| format!("'{m}'")).collect();
            out.push(format!("Did you mean one of: {}?", quoted.join(", ")));
        }
    }

    let mut sorted = available.to_vec();
    sorted.sort();
    out.push(format!("Available blueprints: {}", sorted.join(", ")));
    out
}
