//! Configuration schemas.
//!
//! A blueprint declares its parameters through a [`SchemaValidator`]. The
//! stock implementation is [`ConfigSchema`]: an ordered list of typed fields
//! with defaults and constraints, producing an immutable [`ConfigInstance`]
//! on success and a [`ValidationError`] naming the offending field on
//! failure.

use std::fmt;

use chrono::Utc;
use regex::Regex;
use serde_json::{Map, Value as Json, json};

use crate::domain::{DomainError, ValidationError};

/// Keyword arguments supplied to a build call or read from a config file.
pub type Kwargs = Map<String, Json>;

/// Names accepted by [`FieldDefault::Factory`].
pub const DEFAULT_FACTORIES: &[&str] = &["empty_list", "empty_map", "empty_string", "now", "today"];

/// Type of a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldType {
    #[default]
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
    Any,
}

impl FieldType {
    /// Accepts JSON-Schema names and their Python spellings.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "string" | "str" => Some(Self::String),
            "integer" | "int" => Some(Self::Integer),
            "number" | "float" => Some(Self::Number),
            "boolean" | "bool" => Some(Self::Boolean),
            "array" | "list" => Some(Self::Array),
            "object" | "dict" | "map" => Some(Self::Object),
            "any" => Some(Self::Any),
            _ => None,
        }
    }

    /// JSON-Schema `type` keyword; `None` for [`FieldType::Any`].
    pub fn json_type(self) -> Option<&'static str> {
        match self {
            Self::String => Some("string"),
            Self::Integer => Some("integer"),
            Self::Number => Some("number"),
            Self::Boolean => Some("boolean"),
            Self::Array => Some("array"),
            Self::Object => Some("object"),
            Self::Any => None,
        }
    }

    /// Annotation used in synthesized build signatures.
    pub fn python_type(self) -> &'static str {
        match self {
            Self::String => "str",
            Self::Integer => "int",
            Self::Number => "float",
            Self::Boolean => "bool",
            Self::Array => "list",
            Self::Object => "dict",
            Self::Any => "Any",
        }
    }

    pub fn accepts(self, value: &Json) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
            Self::Any => true,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.json_type().unwrap_or("any"))
    }
}

/// How a field obtains its value when the caller omits it.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldDefault {
    Required,
    Value(Json),
    /// Named factory evaluated at validation time.
    Factory(String),
}

/// Value constraints checked after the type check.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Constraints {
    pub pattern: Option<String>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub enum_values: Vec<Json>,
}

/// One declared configuration field.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaField {
    pub name: String,
    pub ty: FieldType,
    pub default: FieldDefault,
    pub description: Option<String>,
    pub constraints: Constraints,
}

impl SchemaField {
    /// A required field of the given type.
    pub fn new(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            ty,
            default: FieldDefault::Required,
            description: None,
            constraints: Constraints::default(),
        }
    }

    pub fn with_default(mut self, value: Json) -> Self {
        self.default = FieldDefault::Value(value);
        self
    }

    pub fn with_factory(mut self, factory: impl Into<String>) -> Self {
        self.default = FieldDefault::Factory(factory.into());
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.constraints.pattern = Some(pattern.into());
        self
    }

    pub fn minimum(mut self, minimum: f64) -> Self {
        self.constraints.minimum = Some(minimum);
        self
    }

    pub fn maximum(mut self, maximum: f64) -> Self {
        self.constraints.maximum = Some(maximum);
        self
    }

    pub fn one_of(mut self, values: Vec<Json>) -> Self {
        self.constraints.enum_values = values;
        self
    }

    pub fn is_required(&self) -> bool {
        matches!(self.default, FieldDefault::Required)
    }

    /// Resolve the default. `Ok(None)` means the field is required;
    /// `Err` means the default exists but cannot be produced.
    pub fn resolve_default(&self) -> Result<Option<Json>, String> {
        match &self.default {
            FieldDefault::Required => Ok(None),
            FieldDefault::Value(value) => Ok(Some(value.clone())),
            FieldDefault::Factory(name) => match name.as_str() {
                "empty_list" => Ok(Some(json!([]))),
                "empty_map" => Ok(Some(json!({}))),
                "empty_string" => Ok(Some(json!(""))),
                "now" => Ok(Some(Json::String(Utc::now().to_rfc3339()))),
                "today" => Ok(Some(Json::String(
                    Utc::now().date_naive().format("%Y-%m-%d").to_string(),
                ))),
                other => Err(format!("unknown default factory '{other}'")),
            },
        }
    }
}

/// Capability a blueprint's configuration schema must provide.
pub trait SchemaValidator: Send + Sync + fmt::Debug {
    /// Schema name, e.g. `DailyETLConfig`.
    fn title(&self) -> &str;

    /// Declared fields in declaration order.
    fn fields(&self) -> &[SchemaField];

    /// Validate keyword arguments into a config instance.
    fn validate(&self, kwargs: &Kwargs) -> Result<ConfigInstance, ValidationError>;

    /// Draft-07 shaped JSON schema (`type`/`properties`/`required`).
    fn json_schema(&self) -> Json;
}

/// Declarative schema: ordered fields plus compiled patterns.
#[derive(Debug, Clone)]
pub struct ConfigSchema {
    title: String,
    description: Option<String>,
    fields: Vec<SchemaField>,
    patterns: Vec<Option<Regex>>,
}

impl ConfigSchema {
    /// Build a schema, rejecting duplicate field names and bad patterns.
    pub fn new(title: impl Into<String>, fields: Vec<SchemaField>) -> Result<Self, DomainError> {
        let title = title.into();
        let invalid = |reason: String| DomainError::InvalidSchema {
            schema: title.clone(),
            reason,
        };

        let mut patterns = Vec::with_capacity(fields.len());
        for (idx, field) in fields.iter().enumerate() {
            if field.name.trim().is_empty() {
                return Err(invalid(format!("field #{} has an empty name", idx + 1)));
            }
            if fields[..idx].iter().any(|f| f.name == field.name) {
                return Err(invalid(format!("field '{}' is declared twice", field.name)));
            }
            let compiled = match &field.constraints.pattern {
                Some(p) => Some(
                    Regex::new(p)
                        .map_err(|e| invalid(format!("field '{}' pattern: {e}", field.name)))?,
                ),
                None => None,
            };
            patterns.push(compiled);
        }

        Ok(Self {
            title,
            description: None,
            fields,
            patterns,
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn check_constraints(
        &self,
        idx: usize,
        field: &SchemaField,
        value: &Json,
    ) -> Result<(), ValidationError> {
        let c = &field.constraints;
        let fail = |message: String| {
            Err(ValidationError::new(message)
                .field(&field.name)
                .actual(describe_actual(value)))
        };

        if let (Some(re), Some(s)) = (&self.patterns[idx], value.as_str()) {
            if !re.is_match(s) {
                return fail(format!("String should match pattern '{}'", re.as_str()));
            }
        }
        if let Some(x) = value.as_f64() {
            if let Some(min) = c.minimum.filter(|min| x < *min) {
                return fail(format!("Input should be greater than or equal to {min}"));
            }
            if let Some(max) = c.maximum.filter(|max| x > *max) {
                return fail(format!("Input should be less than or equal to {max}"));
            }
        }
        let length = match value {
            Json::String(s) => Some(s.chars().count()),
            Json::Array(items) => Some(items.len()),
            _ => None,
        };
        if let Some(len) = length {
            if let Some(min) = c.min_length.filter(|min| len < *min) {
                return fail(format!("Should have at least {min} items or characters"));
            }
            if let Some(max) = c.max_length.filter(|max| len > *max) {
                return fail(format!("Should have at most {max} items or characters"));
            }
        }
        if !c.enum_values.is_empty() && !c.enum_values.contains(value) {
            let allowed: Vec<String> = c.enum_values.iter().map(describe_actual).collect();
            return fail(format!("Input should be one of: {}", allowed.join(", ")));
        }
        Ok(())
    }
}

impl SchemaValidator for ConfigSchema {
    fn title(&self) -> &str {
        &self.title
    }

    fn fields(&self) -> &[SchemaField] {
        &self.fields
    }

    fn validate(&self, kwargs: &Kwargs) -> Result<ConfigInstance, ValidationError> {
        for key in kwargs.keys() {
            if self.fields.iter().all(|f| &f.name != key) {
                let mut err = ValidationError::new("Extra inputs are not permitted").field(key);
                if let Some(close) = closest(key, self.fields.iter().map(|f| f.name.as_str())) {
                    err = err.suggest(format!("Did you mean '{close}'?"));
                }
                return Err(err);
            }
        }

        let mut values = Vec::with_capacity(self.fields.len());
        for (idx, field) in self.fields.iter().enumerate() {
            let value = match kwargs.get(&field.name) {
                Some(v) => v.clone(),
                None => match field.resolve_default() {
                    Ok(Some(v)) => v,
                    Ok(None) => {
                        return Err(ValidationError::new("Field required")
                            .field(&field.name)
                            .expected(field.ty.python_type())
                            .suggest(format!("Add '{}' to your configuration", field.name)));
                    }
                    Err(reason) => {
                        return Err(ValidationError::new(format!(
                            "no value supplied and the default cannot be resolved: {reason}"
                        ))
                        .field(&field.name)
                        .suggest(format!("Pass '{}' explicitly", field.name)));
                    }
                },
            };

            let null_default =
                value.is_null() && matches!(field.default, FieldDefault::Value(Json::Null));
            if !null_default {
                if !field.ty.accepts(&value) {
                    return Err(ValidationError::new(format!(
                        "Input should be a valid {}",
                        field.ty
                    ))
                    .field(&field.name)
                    .expected(field.ty.python_type())
                    .actual(describe_actual(&value)));
                }
                self.check_constraints(idx, field, &value)?;
            }

            values.push((field.name.clone(), value));
        }

        Ok(ConfigInstance::new(self.title.clone(), values))
    }

    fn json_schema(&self) -> Json {
        let mut properties = Map::new();
        for field in &self.fields {
            let mut prop = Map::new();
            if let Some(ty) = field.ty.json_type() {
                prop.insert("type".into(), json!(ty));
            }
            if let Some(desc) = &field.description {
                prop.insert("description".into(), json!(desc));
            }
            if let FieldDefault::Value(default) = &field.default {
                prop.insert("default".into(), default.clone());
            }
            let c = &field.constraints;
            if let Some(pattern) = &c.pattern {
                prop.insert("pattern".into(), json!(pattern));
            }
            if let Some(min) = c.minimum {
                prop.insert("minimum".into(), bound(field.ty, min));
            }
            if let Some(max) = c.maximum {
                prop.insert("maximum".into(), bound(field.ty, max));
            }
            if let Some(min) = c.min_length {
                prop.insert(length_key(field.ty, "min").into(), json!(min));
            }
            if let Some(max) = c.max_length {
                prop.insert(length_key(field.ty, "max").into(), json!(max));
            }
            if !c.enum_values.is_empty() {
                prop.insert("enum".into(), Json::Array(c.enum_values.clone()));
            }
            properties.insert(field.name.clone(), Json::Object(prop));
        }

        let required: Vec<&str> = self
            .fields
            .iter()
            .filter(|f| f.is_required())
            .map(|f| f.name.as_str())
            .collect();

        let mut schema = Map::new();
        schema.insert("title".into(), json!(self.title));
        if let Some(desc) = &self.description {
            schema.insert("description".into(), json!(desc));
        }
        schema.insert("type".into(), json!("object"));
        schema.insert("properties".into(), Json::Object(properties));
        schema.insert("required".into(), json!(required));
        Json::Object(schema)
    }
}

fn bound(ty: FieldType, x: f64) -> Json {
    if ty == FieldType::Integer && x.fract() == 0.0 {
        json!(x as i64)
    } else {
        json!(x)
    }
}

fn length_key(ty: FieldType, side: &str) -> String {
    match ty {
        FieldType::Array => format!("{side}Items"),
        _ => format!("{side}Length"),
    }
}

fn describe_actual(value: &Json) -> String {
    match value {
        Json::String(s) => format!("'{s}'"),
        other => other.to_string(),
    }
}

fn closest<'a>(needle: &str, candidates: impl Iterator<Item = &'a str>) -> Option<&'a str> {
    candidates
        .map(|c| (c, strsim::normalized_levenshtein(needle, c)))
        .filter(|(_, score)| *score >= 0.6)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(c, _)| c)
}

/// Validated, immutable configuration for one blueprint invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigInstance {
    schema: String,
    values: Vec<(String, Json)>,
}

impl ConfigInstance {
    /// Values must already be validated; fields appear in schema order.
    pub fn new(schema: impl Into<String>, values: Vec<(String, Json)>) -> Self {
        Self {
            schema: schema.into(),
            values,
        }
    }

    pub fn schema_title(&self) -> &str {
        &self.schema
    }

    pub fn get(&self, name: &str) -> Option<&Json> {
        self.values.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Json::as_str)
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Json::as_i64)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Json::as_bool)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Json)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn to_json(&self) -> Json {
        Json::Object(self.to_kwargs())
    }

    pub fn to_kwargs(&self) -> Kwargs {
        self.values.iter().cloned().collect()
    }
}
