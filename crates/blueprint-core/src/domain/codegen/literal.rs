//! Python literal formatting.

use std::time::Duration;

use chrono::{Datelike, Timelike};

use crate::domain::{Timestamp, Value, python_identifier};

/// Quote a string with minimal escaping.
///
/// Single quotes are used when the text contains a double quote and no
/// single quote; otherwise double quotes with inner double quotes escaped.
pub fn quote(text: &str) -> String {
    let escaped = text
        .replace('\\', "\\\\")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t");

    if escaped.contains('"') && !escaped.contains('\'') {
        format!("'{escaped}'")
    } else {
        format!("\"{}\"", escaped.replace('"', "\\\""))
    }
}

/// Largest whole unit that divides the duration: hours, minutes, seconds.
pub fn duration(d: Duration) -> String {
    if d.subsec_nanos() != 0 {
        return format!("timedelta(seconds={})", d.as_secs_f64());
    }
    let secs = d.as_secs();
    if secs % 3600 == 0 {
        format!("timedelta(hours={})", secs / 3600)
    } else if secs % 60 == 0 {
        format!("timedelta(minutes={})", secs / 60)
    } else {
        format!("timedelta(seconds={secs})")
    }
}

/// `datetime(Y, M, D[, h, m[, s]][, tzinfo=timezone.utc])`.
pub fn timestamp(ts: &Timestamp) -> String {
    let wall = ts.wall_clock();
    let date = wall.date();
    let mut out = format!("datetime({}, {}, {}", date.year(), date.month(), date.day());
    let (h, m, s) = (wall.hour(), wall.minute(), wall.second());
    if h != 0 || m != 0 || s != 0 {
        out.push_str(&format!(", {h}, {m}"));
        if s != 0 {
            out.push_str(&format!(", {s}"));
        }
    }
    if ts.is_timezone_aware() {
        out.push_str(", tzinfo=timezone.utc");
    }
    out.push(')');
    out
}

fn float(x: f64) -> String {
    if x.is_nan() {
        "float(\"nan\")".to_string()
    } else if x.is_infinite() {
        if x > 0.0 {
            "float(\"inf\")".to_string()
        } else {
            "float(\"-inf\")".to_string()
        }
    } else {
        format!("{x:?}")
    }
}

/// Format any value as a Python expression.
pub fn value(v: &Value) -> String {
    match v {
        Value::None => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(x) => float(*x),
        Value::Str(s) => quote(s),
        Value::Duration(d) => duration(*d),
        Value::DateTime(ts) => timestamp(ts),
        Value::List(items) => {
            let inner: Vec<String> = items.iter().map(value).collect();
            format!("[{}]", inner.join(", "))
        }
        Value::Map(entries) => {
            let inner: Vec<String> = entries
                .iter()
                .map(|(k, v)| format!("{}: {}", quote(k), value(v)))
                .collect();
            format!("{{{}}}", inner.join(", "))
        }
        Value::Callable(c) => python_identifier(&c.name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CallableRef;

    #[test]
    fn durations_use_largest_even_unit() {
        assert_eq!(duration(Duration::from_secs(3600)), "timedelta(hours=1)");
        assert_eq!(duration(Duration::from_secs(90)), "timedelta(seconds=90)");
        assert_eq!(duration(Duration::from_secs(120)), "timedelta(minutes=2)");
        assert_eq!(duration(Duration::from_secs(300)), "timedelta(minutes=5)");
        assert_eq!(duration(Duration::from_secs(7200)), "timedelta(hours=2)");
    }

    #[test]
    fn quoting_prefers_single_quotes_for_embedded_double_quotes() {
        assert_eq!(quote(r#"echo "hi""#), r#"'echo "hi"'"#);
        assert_eq!(quote("plain"), "\"plain\"");
        assert_eq!(quote(r#"it's "quoted""#), r#""it's \"quoted\"""#);
        assert_eq!(quote("a\nb"), "\"a\\nb\"");
    }

    #[test]
    fn timestamps() {
        assert_eq!(
            timestamp(&Timestamp::utc(2024, 1, 1).unwrap()),
            "datetime(2024, 1, 1, tzinfo=timezone.utc)"
        );
        assert_eq!(timestamp(&Timestamp::naive(2024, 3, 9).unwrap()), "datetime(2024, 3, 9)");
        assert_eq!(
            timestamp(&Timestamp::parse("2024-01-01T06:30:00").unwrap()),
            "datetime(2024, 1, 1, 6, 30)"
        );
    }

    #[test]
    fn nested_values_recurse() {
        let v = Value::Map(vec![
            ("owner".into(), Value::from("data-team")),
            ("retries".into(), Value::Int(2)),
            ("delay".into(), Value::Duration(Duration::from_secs(300))),
            ("flags".into(), Value::List(vec![Value::Bool(false), Value::None])),
        ]);
        assert_eq!(
            value(&v),
            r#"{"owner": "data-team", "retries": 2, "delay": timedelta(minutes=5), "flags": [False, None]}"#
        );
    }

    #[test]
    fn scalars() {
        assert_eq!(value(&Value::Float(1.0)), "1.0");
        assert_eq!(value(&Value::Float(f64::NAN)), "float(\"nan\")");
        assert_eq!(value(&Value::Callable(CallableRef::new("extract"))), "extract");
    }
}
