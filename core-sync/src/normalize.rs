//! # Field Normalizer
//!
//! Converts loosely typed vendor values into canonical scalars.
//!
//! Every function takes `Option<&Value>`: `None` is a field missing from the
//! record, and JSON `null` is treated the same way. None of them panic,
//! whatever shape the input has.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;
use serde_json::ser::Formatter;
use serde_json::Value;
use std::io;

/// Naive layouts tried after the offset-aware ones; taken as UTC.
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
];

fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    match present(value) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim()),
        _ => None,
    }
}

/// Truthiness as the vendor payloads use it: empty containers, `false`,
/// zero and `""` are falsy.
pub fn is_truthy(value: Option<&Value>) -> bool {
    match present(value) {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map_or(true, |f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::Object(map)) => !map.is_empty(),
    }
}

/// Tolerant timestamp parsing, normalized to UTC.
///
/// Accepts RFC 3339 (`Z` or `+05:30`), `%Y-%m-%dT%H:%M:%S%z`, naive
/// date-times with `T` or a space and optional fractional seconds,
/// `%m/%d/%Y %H:%M:%S`, and a bare date (midnight UTC).
pub fn parse_datetime(value: Option<&Value>) -> Option<DateTime<Utc>> {
    let s = non_empty_str(value)?;

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%z") {
        return Some(dt.with_timezone(&Utc));
    }
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Strict `%Y-%m-%d`.
pub fn parse_date(value: Option<&Value>) -> Option<NaiveDate> {
    match present(value) {
        Some(Value::String(s)) => NaiveDate::parse_from_str(s, "%Y-%m-%d").ok(),
        _ => None,
    }
}

pub fn parse_int(value: Option<&Value>) -> Option<i64> {
    match present(value)? {
        Value::Bool(b) => Some(i64::from(*b)),
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= i64::MIN as f64 && *f <= i64::MAX as f64)
                .map(|f| f.trunc() as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

pub fn parse_float(value: Option<&Value>) -> Option<f64> {
    match present(value)? {
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

/// `name` of a lookup object, a plain string as-is, or another truthy
/// value stringified.
pub fn name_from(value: Option<&Value>) -> Option<String> {
    match present(value)? {
        Value::Object(map) => scalar_text(map.get("name")),
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other if is_truthy(Some(other)) => Some(render(other)),
        _ => None,
    }
}

/// `email` of a lookup object; anything else is absent.
pub fn email_from(value: Option<&Value>) -> Option<String> {
    match present(value)? {
        Value::Object(map) => scalar_text(map.get("email")),
        _ => None,
    }
}

/// Canonical text form of any value.
///
/// Objects prefer `name`, then `id`, then their JSON text. Lists become
/// JSON text with `", "` and `": "` separators.
pub fn safe_str(value: Option<&Value>) -> Option<String> {
    match present(value)? {
        Value::String(s) if s.is_empty() => None,
        Value::Object(map) => {
            let preferred = [map.get("name"), map.get("id")]
                .into_iter()
                .find(|candidate| is_truthy(*candidate));
            match preferred {
                Some(candidate) => scalar_text(candidate),
                None => Some(python_json(&Value::Object(map.clone()))),
            }
        }
        other => Some(render(other)),
    }
}

/// Flag columns: a missing field is `false`, an explicit `null` is absent.
pub fn parse_bool(value: Option<&Value>) -> Option<bool> {
    match value {
        None => Some(false),
        Some(Value::Null) => None,
        Some(Value::Bool(b)) => Some(*b),
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0),
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Some(true),
            "false" | "0" | "" => Some(false),
            _ => None,
        },
        Some(_) => None,
    }
}

/// JSON text of a truthy value, otherwise absent.
pub fn json_text_or_none(value: Option<&Value>) -> Option<String> {
    if !is_truthy(value) {
        return None;
    }
    present(value).map(python_json)
}

/// `"MM:SS"` to seconds; a bare `"M"` counts as whole minutes.
pub fn duration_seconds(value: Option<&Value>) -> Option<i64> {
    if !is_truthy(value) {
        return None;
    }
    let text = render(present(value)?);
    let mut parts = text.split(':');
    let minutes: i64 = parts.next()?.trim().parse().ok()?;
    let seconds: i64 = match parts.next() {
        Some(part) => part.trim().parse().ok()?,
        None => 0,
    };
    minutes.checked_mul(60)?.checked_add(seconds)
}

/// Text of a nested value, without the object preference rules.
fn scalar_text(value: Option<&Value>) -> Option<String> {
    match present(value)? {
        Value::String(s) if s.is_empty() => None,
        other => Some(render(other)),
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Null => String::new(),
        composite => python_json(composite),
    }
}

// =============================================================================
// JSON text
// =============================================================================

/// JSON writer using `", "` between items and `": "` after keys.
struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }
}

/// Serialize with spaced separators, so `[1,2]` becomes `[1, 2]`.
///
/// Object keys keep their payload order.
pub fn python_json(value: &Value) -> String {
    let mut buf = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, SpacedFormatter);
    if value.serialize(&mut serializer).is_err() {
        return value.to_string();
    }
    String::from_utf8(buf).unwrap_or_else(|_| value.to_string())
}
