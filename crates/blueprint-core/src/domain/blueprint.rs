//! The blueprint contract.
//!
//! A blueprint is a named, schema-backed template for producing a workflow
//! graph. [`Renderer`] is the polymorphic capability every variant
//! implements; [`Blueprint`] adds the identity the registry needs.

use std::fmt;
use std::sync::Arc;

use crate::domain::{CodeWriter, ConfigInstance, DomainError, SchemaValidator, WorkflowGraph};

/// Base name a declaration must reference to count as a blueprint.
pub const BLUEPRINT_BASE: &str = "Blueprint";

/// Turns validated configuration into a graph or into source text.
///
/// Implement at least one of the two methods. `render_template` defaults to
/// rendering the graph and serializing it with the [`CodeWriter`], so a
/// variant that provides neither fails with
/// [`DomainError::RenderNotImplemented`] from both.
pub trait Renderer: Send + Sync + fmt::Debug {
    /// Declared class identifier, e.g. `DailyETL`.
    fn class_name(&self) -> &str;

    fn render(&self, config: &ConfigInstance) -> Result<WorkflowGraph, DomainError> {
        let _ = config;
        Err(DomainError::RenderNotImplemented {
            class: self.class_name().to_string(),
        })
    }

    fn render_template(&self, config: &ConfigInstance) -> Result<String, DomainError> {
        let graph = self.render(config)?;
        CodeWriter::default().write(&graph)
    }
}

/// A discoverable blueprint.
pub trait Blueprint: Renderer {
    /// Base types named in the declaration, e.g. `["Blueprint[DailyETLConfig]"]`.
    fn bases(&self) -> &[String];

    fn doc(&self) -> Option<&str> {
        None
    }

    /// Configuration schema, when one could be determined.
    fn schema(&self) -> Option<Arc<dyn SchemaValidator>>;
}

/// Whether a declaration's base list references the blueprint base, with or
/// without a schema parameter (`Blueprint` or `Blueprint[Config]`).
///
/// Both the full loading path and the light listing scan decide membership
/// with this predicate.
pub fn declares_blueprint_base<S: AsRef<str>>(bases: &[S]) -> bool {
    bases.iter().any(|base| {
        let base = base.as_ref().trim();
        base == BLUEPRINT_BASE || schema_parameter(base).is_some()
    })
}

/// Extract `Config` from `Blueprint[Config]`.
pub fn schema_parameter(base: &str) -> Option<&str> {
    let inner = base
        .trim()
        .strip_prefix(BLUEPRINT_BASE)?
        .trim_start()
        .strip_prefix('[')?
        .strip_suffix(']')?
        .trim();
    (!inner.is_empty()).then_some(inner)
}
