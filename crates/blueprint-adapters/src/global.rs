//! Process-wide default registry.
//!
//! Library callers that do not want to thread a [`Registry`] through their
//! code can use these functions. The registry is created on first use from
//! the environment-derived search paths and the TOML manifest loader, and
//! discovery still happens lazily on the first lookup.

use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use blueprint_core::application::{
    BlueprintDescriptor, BlueprintInfo, BlueprintSummary, Registry, SearchPaths,
};
use blueprint_core::error::BlueprintResult;

use crate::manifest::ManifestLoader;

static DEFAULT_REGISTRY: OnceLock<Mutex<Registry>> = OnceLock::new();

/// A fresh registry over the environment-derived search paths.
pub fn default_registry() -> Registry {
    Registry::new(SearchPaths::from_env(), Arc::new(ManifestLoader::new()))
}

/// Run `f` with exclusive access to the process-wide registry.
pub fn with_default_registry<R>(f: impl FnOnce(&mut Registry) -> R) -> R {
    let registry = DEFAULT_REGISTRY.get_or_init(|| Mutex::new(default_registry()));
    let mut guard = registry.lock().unwrap_or_else(PoisonError::into_inner);
    f(&mut guard)
}

pub fn resolve(name: &str) -> BlueprintResult<BlueprintDescriptor> {
    with_default_registry(|r| r.resolve(name))
}

pub fn list() -> BlueprintResult<Vec<BlueprintSummary>> {
    with_default_registry(Registry::list)
}

pub fn info(name: &str) -> BlueprintResult<BlueprintInfo> {
    with_default_registry(|r| r.info(name))
}

pub fn discover(force: bool) {
    with_default_registry(|r| r.discover(force));
}
