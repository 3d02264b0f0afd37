//! Core domain layer for Blueprint.
//!
//! This module contains pure logic: the in-memory workflow graph, literal
//! values, configuration schemas, the blueprint/renderer contract and the
//! code writer that turns a graph back into DAG source text.
//!
//! ## Hexagonal Architecture Compliance
//!
//! - **No async**: Domain logic is synchronous
//! - **No I/O**: No filesystem, network, or external calls
//! - **Deterministic**: Every serialization is a pure function of its input
//!
pub mod blueprint;
pub mod codegen;
pub mod error;
pub mod graph;
pub mod naming;
pub mod schema;
pub mod value;

pub use blueprint::{Blueprint, Renderer, declares_blueprint_base, schema_parameter};
pub use codegen::{CodeWriter, EdgePolicy};
pub use error::{DomainError, ErrorCategory, ValidationError};
pub use graph::{OperatorKind, Schedule, Task, WorkflowGraph};
pub use naming::{blueprint_name, python_identifier};
pub use schema::{
    ConfigInstance, ConfigSchema, Constraints, FieldDefault, FieldType, Kwargs, SchemaField,
    SchemaValidator,
};
pub use value::{CallableRef, Timestamp, Value};
