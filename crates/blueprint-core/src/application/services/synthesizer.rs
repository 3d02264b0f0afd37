//! Build-method synthesis.
//!
//! For every registered blueprint with a schema, the registry calls
//! [`synthesize`] once and keeps the resulting [`BuildMethod`] on the
//! descriptor. The method's parameter list mirrors the schema: keyword-only,
//! one per field, each carrying its resolved default or marked required.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value as Json;
use tracing::{debug, warn};

use crate::domain::codegen::literal;
use crate::domain::{
    Blueprint, ConfigInstance, Kwargs, SchemaValidator, Value, WorkflowGraph,
};
use crate::error::BlueprintResult;

/// One keyword-only parameter of a build method.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildParam {
    pub name: String,
    /// Host-language annotation, e.g. `str` or `int`.
    pub type_name: &'static str,
    /// `None` means the caller must supply the value.
    pub default: Option<Json>,
    pub description: Option<String>,
}

impl BuildParam {
    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

impl fmt::Display for BuildParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.type_name)?;
        if let Some(default) = &self.default {
            write!(f, " = {}", literal::value(&Value::from(default)))?;
        }
        Ok(())
    }
}

/// A bound constructor for one blueprint: validate keyword arguments against
/// the schema, then render.
#[derive(Debug, Clone)]
pub struct BuildMethod {
    blueprint: Arc<dyn Blueprint>,
    schema: Arc<dyn SchemaValidator>,
    params: Vec<BuildParam>,
    accepts_extra: bool,
}

impl BuildMethod {
    pub fn blueprint(&self) -> &Arc<dyn Blueprint> {
        &self.blueprint
    }

    pub fn schema(&self) -> &Arc<dyn SchemaValidator> {
        &self.schema
    }

    pub fn params(&self) -> &[BuildParam] {
        &self.params
    }

    /// True when a field was left out of the parameter list and is only
    /// reachable through `**kwargs`.
    pub fn accepts_extra_kwargs(&self) -> bool {
        self.accepts_extra
    }

    /// `build(*, job_id: str, retries: int = 2, **kwargs)`.
    pub fn signature(&self) -> String {
        let mut parts: Vec<String> = self.params.iter().map(ToString::to_string).collect();
        if self.accepts_extra {
            parts.push("**kwargs".into());
        }
        match (self.params.is_empty(), parts.is_empty()) {
            (_, true) => "build()".into(),
            (true, false) => format!("build({})", parts.join(", ")),
            (false, false) => format!("build(*, {})", parts.join(", ")),
        }
    }

    /// Validate only; nothing is rendered.
    pub fn validate(&self, kwargs: &Kwargs) -> BlueprintResult<ConfigInstance> {
        Ok(self.schema.validate(kwargs)?)
    }

    /// Validate, then render the graph.
    pub fn call(&self, kwargs: &Kwargs) -> BlueprintResult<WorkflowGraph> {
        let config = self.validate(kwargs)?;
        debug!(blueprint = self.blueprint.class_name(), "rendering graph");
        Ok(self.blueprint.render(&config)?)
    }

    /// Validate, then render source text directly.
    pub fn call_template(&self, kwargs: &Kwargs) -> BlueprintResult<String> {
        let config = self.validate(kwargs)?;
        debug!(blueprint = self.blueprint.class_name(), "rendering template");
        Ok(self.blueprint.render_template(&config)?)
    }
}

/// Derive the build method for `blueprint`, or `None` when it exposes no
/// schema.
///
/// A field whose default cannot be produced is left out of the parameter
/// list with a warning; the remaining fields are still synthesized.
pub fn synthesize(blueprint: &Arc<dyn Blueprint>) -> Option<BuildMethod> {
    let schema = blueprint.schema()?;

    let mut params = Vec::with_capacity(schema.fields().len());
    let mut accepts_extra = false;
    for field in schema.fields() {
        match field.resolve_default() {
            Ok(default) => params.push(BuildParam {
                name: field.name.clone(),
                type_name: field.ty.python_type(),
                default,
                description: field.description.clone(),
            }),
            Err(reason) => {
                warn!(
                    blueprint = blueprint.class_name(),
                    field = %field.name,
                    %reason,
                    "skipping build parameter"
                );
                accepts_extra = true;
            }
        }
    }

    Some(BuildMethod {
        blueprint: Arc::clone(blueprint),
        schema,
        params,
        accepts_extra,
    })
}
