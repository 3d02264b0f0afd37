//! Driven (output) ports - implemented by infrastructure.
//!
//! These traits define what the application needs from external systems.
//! The `blueprint-adapters` crate provides implementations.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::domain::{Blueprint, Kwargs};
use crate::error::BlueprintResult;

/// What the light scan learns about one declaration without loading it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclarationSummary {
    pub class_name: String,
    pub bases: Vec<String>,
    pub doc: Option<String>,
}

/// Port for blueprint definition files.
///
/// Implemented by:
/// - `blueprint_adapters::manifest::ManifestLoader` (TOML manifests)
///
/// `load` builds every declaration in a file; `scan` only reads the
/// declaration headers. Both report the same declarations so the registry
/// can apply one membership predicate to either.
#[cfg_attr(test, mockall::automock)]
pub trait BlueprintLoader: Send + Sync {
    /// Candidate files directly inside `dir`, in a stable order.
    /// A missing directory yields no candidates.
    fn candidates(&self, dir: &Path) -> BlueprintResult<Vec<PathBuf>>;

    /// Fully load every declaration in `path`.
    fn load(&self, path: &Path) -> BlueprintResult<Vec<Arc<dyn Blueprint>>>;

    /// Read declaration headers in `path` without building them.
    fn scan(&self, path: &Path) -> BlueprintResult<Vec<DeclarationSummary>>;
}

/// Port for filesystem operations.
///
/// Implemented by:
/// - `blueprint_adapters::filesystem::LocalFilesystem` (production)
/// - `blueprint_adapters::filesystem::MemoryFilesystem` (testing)
#[cfg_attr(test, mockall::automock)]
pub trait Filesystem: Send + Sync {
    /// Create a directory and all parent directories.
    fn create_dir_all(&self, path: &Path) -> BlueprintResult<()>;

    /// Write content to a file, replacing it if present.
    fn write_file(&self, path: &Path, content: &str) -> BlueprintResult<()>;

    fn read_to_string(&self, path: &Path) -> BlueprintResult<String>;

    /// Check if path exists.
    fn exists(&self, path: &Path) -> bool;
}

/// An instance configuration: which blueprint to build, and with what.
#[derive(Debug, Clone, PartialEq)]
pub struct DagConfig {
    pub path: PathBuf,
    pub blueprint: String,
    pub params: Kwargs,
}

/// Port for instance-config files (`*.dag.yaml`).
///
/// Implementations report parse failures, empty files and a missing
/// `blueprint` key as configuration errors carrying the file and, when
/// known, line and column.
#[cfg_attr(test, mockall::automock)]
pub trait ConfigReader: Send + Sync {
    fn read(&self, path: &Path) -> BlueprintResult<DagConfig>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LintOptions {
    /// Apply automatic fixes.
    pub fix: bool,
    /// Run the formatter after checking.
    pub format: bool,
}

impl Default for LintOptions {
    fn default() -> Self {
        Self {
            fix: true,
            format: true,
        }
    }
}

/// Port for linting generated DAG files.
///
/// Returns `Ok(true)` when the file is clean (after fixes, if enabled).
#[cfg_attr(test, mockall::automock)]
pub trait Linter: Send + Sync {
    fn lint(&self, path: &Path, options: &LintOptions) -> BlueprintResult<bool>;
}
