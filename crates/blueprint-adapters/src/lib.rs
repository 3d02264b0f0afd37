//! Infrastructure adapters for Blueprint.
//!
//! This crate implements the ports defined in `blueprint-core::application::ports`.
//! It contains all external dependencies and I/O operations.

pub mod filesystem;
pub mod global;
pub mod linter;
pub mod manifest;
pub mod yaml;

// Re-export commonly used adapters
pub use filesystem::{LocalFilesystem, MemoryFilesystem};
pub use linter::{CommandLinter, NoopLinter};
pub use manifest::{ManifestBlueprint, ManifestLoader};
pub use yaml::YamlConfigReader;
