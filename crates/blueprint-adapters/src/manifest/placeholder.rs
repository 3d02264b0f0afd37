//! `{{ field }}` placeholders and manifest literals.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use thiserror::Error;

use blueprint_core::domain::{CallableRef, ConfigInstance, Timestamp, Value};

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("placeholder pattern is valid")
});

const TIMEDELTA_UNITS: [(&str, f64); 4] = [
    ("days", 86_400.0),
    ("hours", 3_600.0),
    ("minutes", 60.0),
    ("seconds", 1.0),
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("placeholder '{0}' does not name a config field")]
    UnknownField(String),

    #[error("'{0}' is not a date-time")]
    Datetime(String),

    #[error("invalid timedelta: {0}")]
    Timedelta(String),

    #[error("invalid callable: {0}")]
    Callable(String),
}

/// Replace every placeholder in `text` with the display form of its value.
pub fn interpolate(text: &str, config: &ConfigInstance) -> Result<String, RenderError> {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in PLACEHOLDER.captures_iter(text) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        out.push_str(&text[last..whole.start()]);
        out.push_str(&lookup(config, name.as_str())?.to_string());
        last = whole.end();
    }
    out.push_str(&text[last..]);
    Ok(out)
}

/// Field name when `text` is nothing but one placeholder.
fn sole_placeholder(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    let caps = PLACEHOLDER.captures(trimmed)?;
    let whole = caps.get(0)?;
    (whole.start() == 0 && whole.end() == trimmed.len())
        .then(|| caps.get(1).map(|m| m.as_str()))
        .flatten()
}

fn lookup(config: &ConfigInstance, name: &str) -> Result<Value, RenderError> {
    config
        .get(name)
        .map(Value::from)
        .ok_or_else(|| RenderError::UnknownField(name.to_string()))
}

/// Turn a manifest value into a graph literal, resolving placeholders.
pub fn render_value(value: &toml::Value, config: &ConfigInstance) -> Result<Value, RenderError> {
    Ok(match value {
        toml::Value::String(s) => match sole_placeholder(s) {
            Some(name) => lookup(config, name)?,
            None => Value::Str(interpolate(s, config)?),
        },
        toml::Value::Integer(i) => Value::Int(*i),
        toml::Value::Float(x) => Value::Float(*x),
        toml::Value::Boolean(b) => Value::Bool(*b),
        toml::Value::Datetime(dt) => datetime(&dt.to_string())?,
        toml::Value::Array(items) => Value::List(
            items
                .iter()
                .map(|item| render_value(item, config))
                .collect::<Result<_, _>>()?,
        ),
        toml::Value::Table(table) => render_table(table, config)?,
    })
}

fn render_table(table: &toml::Table, config: &ConfigInstance) -> Result<Value, RenderError> {
    if table.len() == 1 {
        if let Some(spec) = table.get("timedelta") {
            return timedelta(spec, config);
        }
        if let Some(spec) = table.get("datetime") {
            return match render_value(spec, config)? {
                Value::Str(text) => datetime(&text),
                other @ Value::DateTime(_) => Ok(other),
                other => Err(RenderError::Datetime(other.to_string())),
            };
        }
    }
    if let Some(name) = table.get("callable") {
        return callable(name, table, config);
    }

    table
        .iter()
        .map(|(k, v)| Ok((k.clone(), render_value(v, config)?)))
        .collect::<Result<Vec<_>, _>>()
        .map(Value::Map)
}

fn datetime(text: &str) -> Result<Value, RenderError> {
    Timestamp::parse(text)
        .map(Value::DateTime)
        .ok_or_else(|| RenderError::Datetime(text.to_string()))
}

fn timedelta(spec: &toml::Value, config: &ConfigInstance) -> Result<Value, RenderError> {
    let toml::Value::Table(parts) = spec else {
        return Err(RenderError::Timedelta(
            "expected a table of days, hours, minutes or seconds".into(),
        ));
    };

    let mut seconds = 0.0;
    for (unit, amount) in parts {
        let scale = TIMEDELTA_UNITS
            .iter()
            .find_map(|(name, scale)| (*name == unit.as_str()).then_some(*scale))
            .ok_or_else(|| RenderError::Timedelta(format!("unknown unit '{unit}'")))?;
        let amount = match render_value(amount, config)? {
            Value::Int(i) => i as f64,
            Value::Float(x) => x,
            other => {
                return Err(RenderError::Timedelta(format!(
                    "'{unit}' must be a number, got {}",
                    other.type_name()
                )));
            }
        };
        seconds += amount * scale;
    }

    if !seconds.is_finite() || seconds < 0.0 {
        return Err(RenderError::Timedelta(format!("{seconds} seconds")));
    }
    Duration::try_from_secs_f64(seconds)
        .map(Value::Duration)
        .map_err(|e| RenderError::Timedelta(format!("{seconds} seconds: {e}")))
}

fn callable(
    name: &toml::Value,
    table: &toml::Table,
    config: &ConfigInstance,
) -> Result<Value, RenderError> {
    if let Some(extra) = table.keys().find(|k| *k != "callable" && *k != "source") {
        return Err(RenderError::Callable(format!("unexpected key '{extra}'")));
    }
    let name = match name {
        toml::Value::String(s) => interpolate(s, config)?,
        _ => return Err(RenderError::Callable("name must be a string".into())),
    };
    let mut callable = CallableRef::new(name);
    match table.get("source") {
        Some(toml::Value::String(source)) => callable = callable.with_source(source.as_str()),
        Some(_) => return Err(RenderError::Callable("source must be a string".into())),
        None => {}
    }
    Ok(Value::Callable(callable))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn config() -> ConfigInstance {
        ConfigInstance::new(
            "EtlConfig",
            vec![
                ("job_id".into(), json!("customer_etl")),
                ("retries".into(), json!(3)),
                ("enabled".into(), json!(true)),
                ("delay".into(), json!(10)),
            ],
        )
    }

    fn toml_value(text: &str) -> toml::Value {
        let table: toml::Table = toml::from_str(&format!("v = {text}")).unwrap();
        table.get("v").cloned().unwrap()
    }

    #[test]
    fn sole_placeholder_keeps_the_typed_value() {
        let rendered = render_value(&toml_value(r#""{{ retries }}""#), &config()).unwrap();
        assert_eq!(rendered, Value::Int(3));

        let rendered = render_value(&toml_value(r#"" {{enabled}} ""#), &config()).unwrap();
        assert_eq!(rendered, Value::Bool(true));
    }

    #[test]
    fn embedded_placeholders_interpolate_display_forms() {
        let rendered = render_value(
            &toml_value(r#""run {{ job_id }} with {{ retries }} retries, enabled={{ enabled }}""#),
            &config(),
        )
        .unwrap();
        assert_eq!(
            rendered,
            Value::Str("run customer_etl with 3 retries, enabled=True".into())
        );
    }

    #[test]
    fn unknown_placeholder_is_an_error() {
        assert_eq!(
            interpolate("{{ missing }}", &config()),
            Err(RenderError::UnknownField("missing".into()))
        );
    }

    #[test]
    fn timedelta_tables_sum_units() {
        let rendered =
            render_value(&toml_value("{ timedelta = { hours = 1, minutes = 30 } }"), &config())
                .unwrap();
        assert_eq!(rendered, Value::Duration(Duration::from_secs(5_400)));

        let rendered =
            render_value(&toml_value(r#"{ timedelta = { minutes = "{{ delay }}" } }"#), &config())
                .unwrap();
        assert_eq!(rendered, Value::Duration(Duration::from_secs(600)));

        assert!(matches!(
            render_value(&toml_value("{ timedelta = { weeks = 1 } }"), &config()),
            Err(RenderError::Timedelta(_))
        ));
    }

    #[test]
    fn timedelta_beyond_duration_range_is_an_error() {
        assert!(matches!(
            render_value(&toml_value("{ timedelta = { days = 1e300 } }"), &config()),
            Err(RenderError::Timedelta(_))
        ));

        let huge = ConfigInstance::new("EtlConfig", vec![("d".into(), json!(i64::MAX))]);
        assert!(matches!(
            render_value(&toml_value(r#"{ timedelta = { days = "{{ d }}" } }"#), &huge),
            Err(RenderError::Timedelta(_))
        ));
    }

    #[test]
    fn callable_and_datetime_tables() {
        let rendered = render_value(
            &toml_value(r#"{ callable = "load_rows", source = "def load_rows():\n    pass\n" }"#),
            &config(),
        )
        .unwrap();
        let Value::Callable(callable) = rendered else {
            panic!("expected a callable");
        };
        assert_eq!(callable.name, "load_rows");
        assert!(callable.source.unwrap().starts_with("def load_rows"));

        let rendered =
            render_value(&toml_value(r#"{ datetime = "2024-01-01T06:30:00Z" }"#), &config())
                .unwrap();
        assert!(matches!(rendered, Value::DateTime(ts) if ts.is_timezone_aware()));
    }

    #[test]
    fn plain_tables_become_ordered_maps() {
        let rendered =
            render_value(&toml_value(r#"{ zeta = 1, alpha = "{{ job_id }}" }"#), &config())
                .unwrap();
        assert_eq!(
            rendered,
            Value::Map(vec![
                ("zeta".into(), Value::Int(1)),
                ("alpha".into(), Value::Str("customer_etl".into())),
            ])
        );
    }
}
