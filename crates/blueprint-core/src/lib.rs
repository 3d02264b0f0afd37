//! Blueprint Core - Hexagonal Architecture Implementation
//!
//! This crate provides the domain and application layers for the Blueprint
//! DAG templating tool, following hexagonal (ports and adapters) architecture.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │          blueprint-cli (CLI)            │
//! │     (Implements Driving Ports)          │
//! └──────────────────┬──────────────────────┘
//!                    │ calls
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │         Application Services            │
//! │ (Registry, BuildMethod, BlueprintService)│
//! └──────────────────┬──────────────────────┘
//!                    │ uses
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │      Application Ports (Traits)         │
//! │ (BlueprintLoader, Filesystem, Linter,   │
//! │  ConfigReader)                          │
//! └──────────────────┬──────────────────────┘
//!                    │ implemented by
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │   blueprint-adapters (Infrastructure)   │
//! │ (ManifestLoader, LocalFilesystem, etc)  │
//! └─────────────────────────────────────────┘
//!                    │
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │         Domain Layer (Pure Logic)       │
//! │ (WorkflowGraph, ConfigSchema, Renderer, │
//! │  CodeWriter)                            │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use blueprint_core::{
//!     application::{Registry, SearchPaths},
//!     domain::CodeWriter,
//! };
//!
//! // 1. Build a registry over the configured search directories
//! let mut registry = Registry::new(SearchPaths::from_env(), loader);
//!
//! // 2. Resolve a blueprint and call its synthesized build method
//! let descriptor = registry.resolve("daily_etl")?;
//! let graph = descriptor.build_method().unwrap().call(&kwargs)?;
//!
//! // 3. Serialize the graph into a standalone DAG file
//! let source = CodeWriter::default().write(&graph)?;
//! ```

pub mod domain;

pub mod application;

pub mod error;

// Public API - what external crates should use
pub mod prelude {
    pub use crate::application::{
        BlueprintDescriptor, BlueprintInfo, BlueprintService, BlueprintSummary, BuildMethod,
        Registry, SearchPaths,
        ports::{BlueprintLoader, ConfigReader, Filesystem, Linter},
    };
    pub use crate::domain::{
        Blueprint, CodeWriter, ConfigInstance, ConfigSchema, EdgePolicy, Kwargs, OperatorKind,
        Renderer, SchemaValidator, Task, Value, WorkflowGraph,
    };
    pub use crate::error::{BlueprintError, BlueprintResult};
}

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
