//! [`Filesystem`] backed by maps, for service tests that must not touch disk.

use std::{
    collections::{BTreeMap, BTreeSet},
    path::{Path, PathBuf},
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use blueprint_core::{
    application::{ApplicationError, ports::Filesystem},
    error::{BlueprintError, BlueprintResult},
};

/// Clones share the same contents, so a test can hand one clone to a
/// service and inspect the other.
#[derive(Debug, Clone, Default)]
pub struct MemoryFilesystem {
    inner: Arc<RwLock<MemoryFilesystemInner>>,
}

#[derive(Debug, Default)]
struct MemoryFilesystemInner {
    files: BTreeMap<PathBuf, String>,
    directories: BTreeSet<PathBuf>,
}

impl MemoryFilesystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a file, creating its parent directories.
    pub fn with_file(self, path: impl AsRef<Path>, content: impl Into<String>) -> Self {
        if let Ok(mut inner) = self.inner.write() {
            let path = path.as_ref();
            if let Some(parent) = path.parent() {
                inner.add_dirs(parent);
            }
            inner.files.insert(path.to_path_buf(), content.into());
        }
        self
    }

    pub fn contents(&self, path: &Path) -> Option<String> {
        let inner = self.inner.read().ok()?;
        inner.files.get(path).cloned()
    }

    /// Every stored file, sorted by path.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.inner
            .read()
            .map(|inner| inner.files.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut inner) = self.inner.write() {
            inner.files.clear();
            inner.directories.clear();
        }
    }

    fn read(&self) -> BlueprintResult<RwLockReadGuard<'_, MemoryFilesystemInner>> {
        self.inner.read().map_err(|_| poisoned())
    }

    fn write(&self) -> BlueprintResult<RwLockWriteGuard<'_, MemoryFilesystemInner>> {
        self.inner.write().map_err(|_| poisoned())
    }
}

impl MemoryFilesystemInner {
    fn add_dirs(&mut self, path: &Path) {
        let mut prefix = PathBuf::new();
        for part in path.components() {
            prefix.push(part);
            self.directories.insert(prefix.clone());
        }
    }
}

fn poisoned() -> BlueprintError {
    BlueprintError::Internal {
        message: "memory filesystem lock poisoned".into(),
    }
}

impl Filesystem for MemoryFilesystem {
    fn create_dir_all(&self, path: &Path) -> BlueprintResult<()> {
        self.write()?.add_dirs(path);
        Ok(())
    }

    fn write_file(&self, path: &Path, content: &str) -> BlueprintResult<()> {
        let mut inner = self.write()?;

        let orphaned = path
            .parent()
            .is_some_and(|p| !p.as_os_str().is_empty() && !inner.directories.contains(p));
        if orphaned {
            return Err(ApplicationError::filesystem(path, "Parent directory does not exist").into());
        }

        inner.files.insert(path.to_path_buf(), content.to_string());
        Ok(())
    }

    fn read_to_string(&self, path: &Path) -> BlueprintResult<String> {
        self.read()?
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| ApplicationError::filesystem(path, "No such file").into())
    }

    fn exists(&self, path: &Path) -> bool {
        self.inner
            .read()
            .map(|inner| inner.files.contains_key(path) || inner.directories.contains(path))
            .unwrap_or(false)
    }
}
