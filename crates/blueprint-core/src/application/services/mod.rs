//! Application services - orchestrate use cases.
//!
//! Services coordinate the domain layer and ports to accomplish
//! high-level use cases like "resolve a blueprint" or "render a config".

pub mod blueprint_service;
pub mod dag_writer;
pub mod registry;
pub mod synthesizer;

pub use blueprint_service::{
    BlueprintService, LintEntry, LintReport, RenderStrategy, RenderedDag, WrittenDag,
};
pub use dag_writer::{dag_file_path, default_dags_folder, write_source};
pub use registry::{
    BlueprintDescriptor, BlueprintInfo, BlueprintSummary, ParameterInfo, Registry, SearchPaths,
    not_found_suggestions,
};
pub use synthesizer::{BuildMethod, BuildParam, synthesize};
