//! Deserialised manifest tables and their conversion into schemas.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value as Json;
use tracing::debug;

use blueprint_core::domain::{ConfigSchema, FieldType, SchemaField, schema_parameter};

use super::ManifestError;

/// A whole manifest file.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Manifest {
    #[serde(default)]
    pub blueprint: Vec<BlueprintEntry>,
    /// Schemas keyed by title.
    #[serde(default)]
    pub config: BTreeMap<String, ConfigEntry>,
}

/// One `[[blueprint]]` declaration.
#[derive(Debug, Deserialize, Clone)]
pub struct BlueprintEntry {
    pub class: String,
    #[serde(default)]
    pub bases: Vec<String>,
    pub doc: Option<String>,
    /// Schema title; falls back to the `Blueprint[...]` parameter.
    pub config: Option<String>,
    pub source_template: Option<String>,
    pub graph: Option<GraphSection>,
}

impl BlueprintEntry {
    /// Title of the schema this declaration binds to, if any.
    pub fn schema_title(&self) -> Option<&str> {
        self.config
            .as_deref()
            .or_else(|| self.bases.iter().find_map(|b| schema_parameter(b)))
    }
}

/// `[blueprint.graph]`: the graph `render` produces.
#[derive(Debug, Deserialize, Clone)]
pub struct GraphSection {
    pub dag_id: String,
    pub description: Option<String>,
    pub schedule: Option<toml::Value>,
    pub schedule_interval: Option<toml::Value>,
    pub start_date: Option<toml::Value>,
    pub catchup: Option<toml::Value>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub default_args: toml::Table,
    #[serde(default)]
    pub tasks: Vec<TaskEntry>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TaskEntry {
    pub task_id: String,
    /// Dotted path, e.g. `airflow.operators.bash.BashOperator`.
    pub operator: String,
    #[serde(default)]
    pub upstream: Vec<String>,
    #[serde(default)]
    pub params: toml::Table,
}

/// `[config.<Title>]`.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ConfigEntry {
    pub doc: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldEntry>,
}

/// One `[[config.<Title>.fields]]` entry.
#[derive(Debug, Deserialize, Clone)]
pub struct FieldEntry {
    pub name: String,
    #[serde(rename = "type", default = "any_type")]
    pub ty: String,
    pub description: Option<String>,
    pub default: Option<toml::Value>,
    /// Named factory, e.g. `empty_list`; exclusive with `default`.
    pub default_factory: Option<String>,
    pub pattern: Option<String>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    #[serde(rename = "enum")]
    pub enum_values: Option<Vec<toml::Value>>,
}

fn any_type() -> String {
    "any".into()
}

/// Header-only view used by the light listing scan.
#[derive(Debug, Deserialize, Default)]
pub(crate) struct ManifestHeaders {
    #[serde(default)]
    pub blueprint: Vec<DeclarationHeader>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DeclarationHeader {
    pub class: String,
    #[serde(default)]
    pub bases: Vec<String>,
    pub doc: Option<String>,
}

impl Manifest {
    /// Build the schema `entry` binds to.
    ///
    /// `Ok(None)` when the declaration names no schema or names one this
    /// manifest does not define; such a blueprint is listed but cannot be
    /// built.
    pub fn schema_for(&self, entry: &BlueprintEntry) -> Result<Option<ConfigSchema>, ManifestError> {
        let Some(title) = entry.schema_title() else {
            return Ok(None);
        };
        let Some(table) = self.config.get(title) else {
            debug!(class = %entry.class, schema = title, "no config table for schema");
            return Ok(None);
        };

        let fields = table
            .fields
            .iter()
            .map(|field| field.to_schema_field(title))
            .collect::<Result<Vec<_>, _>>()?;
        let schema = ConfigSchema::new(title, fields)?;
        Ok(Some(match &table.doc {
            Some(doc) => schema.with_description(doc.trim()),
            None => schema,
        }))
    }
}

impl FieldEntry {
    fn to_schema_field(&self, schema: &str) -> Result<SchemaField, ManifestError> {
        let invalid = |reason: String| ManifestError::Field {
            schema: schema.to_string(),
            field: self.name.clone(),
            reason,
        };

        let ty = FieldType::parse(&self.ty).ok_or_else(|| invalid(format!("unknown type '{}'", self.ty)))?;
        let mut field = SchemaField::new(&self.name, ty);
        field = match (&self.default, &self.default_factory) {
            (Some(_), Some(_)) => {
                return Err(invalid("set either 'default' or 'default_factory', not both".into()));
            }
            (Some(value), None) => field.with_default(to_json(value)),
            (None, Some(factory)) => field.with_factory(factory),
            (None, None) => field,
        };
        if let Some(description) = &self.description {
            field = field.describe(description);
        }

        field.constraints.pattern = self.pattern.clone();
        field.constraints.minimum = self.minimum;
        field.constraints.maximum = self.maximum;
        field.constraints.min_length = self.min_length;
        field.constraints.max_length = self.max_length;
        field.constraints.enum_values = self
            .enum_values
            .iter()
            .flatten()
            .map(to_json)
            .collect();
        Ok(field)
    }
}

/// TOML to JSON. Date-times become their TOML text form.
pub fn to_json(value: &toml::Value) -> Json {
    match value {
        toml::Value::String(s) => Json::String(s.clone()),
        toml::Value::Integer(i) => Json::from(*i),
        toml::Value::Float(x) => serde_json::Number::from_f64(*x).map_or(Json::Null, Json::Number),
        toml::Value::Boolean(b) => Json::Bool(*b),
        toml::Value::Datetime(dt) => Json::String(dt.to_string()),
        toml::Value::Array(items) => Json::Array(items.iter().map(to_json).collect()),
        toml::Value::Table(table) => Json::Object(
            table
                .iter()
                .map(|(k, v)| (k.clone(), to_json(v)))
                .collect(),
        ),
    }
}
