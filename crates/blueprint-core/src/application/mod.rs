//! Application layer for Blueprint.
//!
//! This layer contains:
//! - **Services**: Use case orchestration (Registry, BuildMethod, BlueprintService)
//! - **Ports**: Interface definitions (traits) for external dependencies
//! - **Errors**: Application-specific error types
//!
//! The application layer coordinates the domain layer but contains no
//! schema or rendering rules itself. Those live in `crate::domain`.

pub mod error;
pub mod ports;
pub mod services;

pub use services::{
    BlueprintDescriptor, BlueprintInfo, BlueprintService, BlueprintSummary, BuildMethod,
    BuildParam, LintEntry, LintReport, ParameterInfo, Registry, RenderStrategy, RenderedDag,
    SearchPaths, WrittenDag,
};

// Re-export port traits (for adapter implementation)
pub use ports::{BlueprintLoader, ConfigReader, Filesystem, Linter};

pub use error::{ApplicationError, ConfigurationError};
