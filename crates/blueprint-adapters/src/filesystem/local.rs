//! Local filesystem adapter using std::fs.

use std::io;
use std::path::Path;

use blueprint_core::{
    application::{ApplicationError, ports::Filesystem},
    error::{BlueprintError, BlueprintResult},
};

/// Production filesystem implementation using `std::fs`.
#[derive(Debug, Clone, Copy)]
pub struct LocalFilesystem;

impl LocalFilesystem {
    /// Create a new local filesystem adapter.
    pub fn new() -> Self {
        Self
    }
}

impl Default for LocalFilesystem {
    fn default() -> Self {
        Self::new()
    }
}

impl Filesystem for LocalFilesystem {
    fn create_dir_all(&self, path: &Path) -> BlueprintResult<()> {
        std::fs::create_dir_all(path).map_err(|e| map_io_error(path, e, "create directory"))
    }

    fn write_file(&self, path: &Path, content: &str) -> BlueprintResult<()> {
        std::fs::write(path, content).map_err(|e| map_io_error(path, e, "write file"))
    }

    fn read_to_string(&self, path: &Path) -> BlueprintResult<String> {
        std::fs::read_to_string(path).map_err(|e| map_io_error(path, e, "read file"))
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

fn map_io_error(path: &Path, e: io::Error, operation: &str) -> BlueprintError {
    ApplicationError::filesystem(path, format!("Failed to {operation}: {e}")).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let fs = LocalFilesystem::new();
        let nested = dir.path().join("dags/nested");
        fs.create_dir_all(&nested).unwrap();

        let file = nested.join("nightly.py");
        fs.write_file(&file, "dag = None\n").unwrap();
        assert!(fs.exists(&file));
        assert_eq!(fs.read_to_string(&file).unwrap(), "dag = None\n");
    }

    #[test]
    fn missing_file_is_a_filesystem_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = LocalFilesystem
            .read_to_string(&dir.path().join("absent.yaml"))
            .unwrap_err();
        assert!(matches!(
            err,
            BlueprintError::Application(ApplicationError::Filesystem { .. })
        ));
        assert!(err.to_string().contains("Failed to read file"));
    }
}
