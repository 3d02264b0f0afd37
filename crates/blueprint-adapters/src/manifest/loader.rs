//! Filesystem-backed [`BlueprintLoader`] over TOML manifests.

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, instrument, warn};
use walkdir::WalkDir;

use blueprint_core::application::ApplicationError;
use blueprint_core::application::ports::{BlueprintLoader, DeclarationSummary};
use blueprint_core::domain::Blueprint;
use blueprint_core::error::{BlueprintError, BlueprintResult};

use super::format::{Manifest, ManifestHeaders};
use super::{ManifestBlueprint, ManifestError};

/// Extension of blueprint manifest files.
pub const MANIFEST_EXTENSION: &str = "toml";

/// Loads blueprints from `*.toml` manifests directly inside a search
/// directory. Files whose name starts with `_` are ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManifestLoader;

impl ManifestLoader {
    pub fn new() -> Self {
        Self
    }

    /// Build every declaration in `text`.
    pub fn parse(text: &str) -> Result<Vec<ManifestBlueprint>, ManifestError> {
        let manifest: Manifest =
            toml::from_str(text).map_err(|e| ManifestError::syntax(text, &e))?;

        let mut blueprints = Vec::with_capacity(manifest.blueprint.len());
        for entry in &manifest.blueprint {
            let schema = manifest.schema_for(entry)?;
            blueprints.push(ManifestBlueprint::from_entry(entry.clone(), schema)?);
        }
        Ok(blueprints)
    }

    /// Read declaration headers only; graphs and schemas are not checked.
    pub fn parse_headers(text: &str) -> Result<Vec<DeclarationSummary>, ManifestError> {
        let headers: ManifestHeaders =
            toml::from_str(text).map_err(|e| ManifestError::syntax(text, &e))?;
        Ok(headers
            .blueprint
            .into_iter()
            .map(|h| DeclarationSummary {
                class_name: h.class.trim().to_string(),
                bases: h.bases,
                doc: h.doc.map(|d| d.trim().to_string()).filter(|d| !d.is_empty()),
            })
            .collect())
    }
}

fn is_candidate(path: &Path) -> bool {
    let hidden = path
        .file_name()
        .and_then(OsStr::to_str)
        .is_none_or(|name| name.starts_with('_'));
    !hidden && path.extension() == Some(OsStr::new(MANIFEST_EXTENSION))
}

fn discovery_error(path: &Path, err: ManifestError) -> BlueprintError {
    ApplicationError::Discovery {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
    .into()
}

fn read(path: &Path) -> BlueprintResult<String> {
    fs::read_to_string(path).map_err(|e| discovery_error(path, e.into()))
}

impl BlueprintLoader for ManifestLoader {
    #[instrument(skip(self), fields(dir = %dir.display()))]
    fn candidates(&self, dir: &Path) -> BlueprintResult<Vec<PathBuf>> {
        if !dir.is_dir() {
            debug!("search directory does not exist");
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name()
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    // One unreadable entry must not hide the others.
                    warn!(error = %e, "skipping unreadable directory entry");
                    continue;
                }
            };
            if entry.file_type().is_file() && is_candidate(entry.path()) {
                files.push(entry.into_path());
            }
        }
        debug!(count = files.len(), "found manifest candidates");
        Ok(files)
    }

    #[instrument(skip(self), fields(path = %path.display()))]
    fn load(&self, path: &Path) -> BlueprintResult<Vec<Arc<dyn Blueprint>>> {
        let text = read(path)?;
        let blueprints = Self::parse(&text).map_err(|e| discovery_error(path, e))?;
        debug!(count = blueprints.len(), "loaded manifest");
        Ok(blueprints
            .into_iter()
            .map(|b| Arc::new(b) as Arc<dyn Blueprint>)
            .collect())
    }

    fn scan(&self, path: &Path) -> BlueprintResult<Vec<DeclarationSummary>> {
        let text = read(path)?;
        Self::parse_headers(&text).map_err(|e| discovery_error(path, e))
    }
}
