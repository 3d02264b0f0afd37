//! Persisting generated DAG source through the filesystem port.

use std::env;
use std::path::{MAIN_SEPARATOR, Path, PathBuf};

use tracing::info;

use crate::application::ports::Filesystem;
use crate::domain::{CodeWriter, WorkflowGraph};
use crate::error::BlueprintResult;

impl CodeWriter {
    /// Write `graph` to `path`, creating parent directories.
    pub fn write_to(
        &self,
        graph: &WorkflowGraph,
        path: &Path,
        fs: &dyn Filesystem,
    ) -> BlueprintResult<()> {
        let source = self.write(graph)?;
        write_source(&source, path, fs)?;
        info!(dag_id = graph.dag_id(), path = %path.display(), "wrote DAG file");
        Ok(())
    }
}

/// Write already-generated source text, creating parent directories.
pub fn write_source(source: &str, path: &Path, fs: &dyn Filesystem) -> BlueprintResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs.create_dir_all(parent)?;
    }
    fs.write_file(path, source)
}

/// Airflow's DAG folder: `$AIRFLOW_HOME/dags`, else `~/airflow/dags`.
pub fn default_dags_folder() -> PathBuf {
    match env::var("AIRFLOW_HOME") {
        Ok(home) if !home.trim().is_empty() => PathBuf::from(home).join("dags"),
        _ => {
            let home = env::var("HOME").unwrap_or_else(|_| MAIN_SEPARATOR.to_string());
            PathBuf::from(home).join("airflow").join("dags")
        }
    }
}

/// `<folder>/<dag_id>.py`.
pub fn dag_file_path(folder: &Path, dag_id: &str) -> PathBuf {
    folder.join(format!("{dag_id}.py"))
}
