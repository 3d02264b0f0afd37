//! Application ports (traits) for external dependencies.
//!
//! In hexagonal architecture, ports define interfaces that the application
//! needs from the outside world. Adapters in `blueprint-adapters` implement these.
//!
//! ## Port Types
//!
//! - **Driven (Output) Ports**: Called by application, implemented by infrastructure
//!   - `BlueprintLoader`: Blueprint definition discovery (full load + light scan)
//!   - `Filesystem`: File operations
//!   - `ConfigReader`: Instance-config parsing
//!   - `Linter`: Generated-source linting/formatting
//!
//! - **Driving (Input) Ports**: Called by external world, implemented by application
//!   - (Defined in CLI layer, implemented by services)

pub mod output;

pub use output::{
    BlueprintLoader, ConfigReader, DagConfig, DeclarationSummary, Filesystem, LintOptions, Linter,
};

#[cfg(test)]
pub use output::{MockBlueprintLoader, MockConfigReader, MockFilesystem, MockLinter};
