//! Literal values carried by a workflow graph.
//!
//! Operator parameters and default-argument overlays are opaque key/value
//! maps; [`Value`] is the closed set of literal shapes the code writer knows
//! how to emit.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::Value as Json;

/// Reference to a callable used as an operator parameter.
///
/// `source` is the inline definition text supplied by the blueprint author.
/// When it is absent the code writer emits a no-op placeholder with the same
/// name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallableRef {
    pub name: String,
    pub source: Option<String>,
}

impl CallableRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// A point in time, either naive or timezone-qualified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timestamp {
    Naive(NaiveDateTime),
    Aware(DateTime<FixedOffset>),
}

impl Timestamp {
    /// Midnight UTC on the given date.
    pub fn utc(year: i32, month: u32, day: u32) -> Option<Self> {
        Utc.with_ymd_and_hms(year, month, day, 0, 0, 0)
            .single()
            .map(|dt| Self::Aware(dt.fixed_offset()))
    }

    /// Naive midnight on the given date.
    pub fn naive(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(Self::Naive)
    }

    /// Parse RFC 3339 (aware) or `YYYY-MM-DD[THH:MM:SS]` (naive).
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
            return Some(Self::Aware(dt));
        }
        for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
                return Some(Self::Naive(naive));
            }
        }
        NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(Self::Naive)
    }

    pub fn is_timezone_aware(&self) -> bool {
        matches!(self, Self::Aware(_))
    }

    /// Wall-clock fields, normalised to UTC for aware timestamps.
    pub fn wall_clock(&self) -> NaiveDateTime {
        match self {
            Self::Naive(naive) => *naive,
            Self::Aware(dt) => dt.naive_utc(),
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Naive(naive) => write!(f, "{}", naive.format("%Y-%m-%dT%H:%M:%S")),
            Self::Aware(dt) => write!(f, "{}", dt.to_rfc3339()),
        }
    }
}

/// A literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Duration(Duration),
    DateTime(Timestamp),
    List(Vec<Value>),
    /// Insertion-ordered mapping.
    Map(Vec<(String, Value)>),
    Callable(CallableRef),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "str",
            Self::Duration(_) => "timedelta",
            Self::DateTime(_) => "datetime",
            Self::List(_) => "list",
            Self::Map(_) => "dict",
            Self::Callable(_) => "callable",
        }
    }

    /// JSON projection. Durations become whole seconds and timestamps
    /// become ISO strings.
    pub fn to_json(&self) -> Json {
        match self {
            Self::None => Json::Null,
            Self::Bool(b) => Json::Bool(*b),
            Self::Int(i) => Json::from(*i),
            Self::Float(x) => serde_json::Number::from_f64(*x).map_or(Json::Null, Json::Number),
            Self::Str(s) => Json::String(s.clone()),
            Self::Duration(d) => Json::from(d.as_secs()),
            Self::DateTime(ts) => Json::String(ts.to_string()),
            Self::List(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Self::Map(entries) => Json::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Self::Callable(c) => Json::String(c.name.clone()),
        }
    }
}

impl From<&Json> for Value {
    fn from(json: &Json) -> Self {
        match json {
            Json::Null => Self::None,
            Json::Bool(b) => Self::Bool(*b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(s) => Self::Str(s.clone()),
            Json::Array(items) => Self::List(items.iter().map(Value::from).collect()),
            Json::Object(map) => Self::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<Json> for Value {
    fn from(json: Json) -> Self {
        Self::from(&json)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<Duration> for Value {
    fn from(d: Duration) -> Self {
        Self::Duration(d)
    }
}

impl From<Timestamp> for Value {
    fn from(ts: Timestamp) -> Self {
        Self::DateTime(ts)
    }
}

impl From<CallableRef> for Value {
    fn from(c: CallableRef) -> Self {
        Self::Callable(c)
    }
}

/// Display form used when a value is interpolated into a larger string.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Bool(true) => write!(f, "True"),
            Self::Bool(false) => write!(f, "False"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Str(s) => write!(f, "{s}"),
            Self::Duration(d) => {
                let secs = d.as_secs();
                write!(f, "{}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
            }
            Self::DateTime(ts) => write!(f, "{ts}"),
            Self::List(_) | Self::Map(_) => write!(f, "{}", self.to_json()),
            Self::Callable(c) => write!(f, "{}", c.name),
        }
    }
}
