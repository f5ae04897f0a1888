//! Literal rendering for the filter grammar
//!
//! | Type     | Form                          |
//! |----------|-------------------------------|
//! | string   | `'O''Brien'`                  |
//! | binary   | `X'0aff'`                     |
//! | bool     | `true` / `false`              |
//! | int32    | `42`                          |
//! | int64    | `42L`                         |
//! | double   | `42.0`                        |
//! | guid     | `guid'…'`                     |
//! | datetime | `datetime'2024-05-01T10:00:00Z'` |
//!
//! `parse_literal` accepts exactly these forms, so rendering a parsed
//! literal reproduces the original text.

use std::fmt::Write;

use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

use super::errors::{QueryError, QueryResult};
use crate::value::Value;

/// Renders a literal value in filter-grammar syntax
pub fn serialize_literal(value: &Value) -> QueryResult<String> {
    match value {
        Value::String(s) => Ok(format!("'{}'", s.replace('\'', "''"))),
        Value::Binary(bytes) => {
            let mut out = String::with_capacity(bytes.len() * 2 + 3);
            out.push_str("X'");
            for b in bytes {
                let _ = write!(out, "{:02x}", b);
            }
            out.push('\'');
            Ok(out)
        }
        Value::Bool(b) => Ok(if *b { "true".into() } else { "false".into() }),
        Value::Int32(n) => Ok(n.to_string()),
        Value::Int64(n) => Ok(format!("{}L", n)),
        Value::Double(d) => {
            if !d.is_finite() {
                return Err(QueryError::UnsupportedLiteral(format!("non-finite double {}", d)));
            }
            let mut out = d.to_string();
            if !out.contains('.') {
                out.push_str(".0");
            }
            Ok(out)
        }
        Value::Guid(g) => Ok(format!("guid'{}'", g.hyphenated())),
        Value::DateTime(dt) => Ok(format!(
            "datetime'{}'",
            dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)
        )),
        other => Err(QueryError::UnsupportedLiteral(other.kind().to_string())),
    }
}

/// Parses filter-grammar literal text back into a value
pub fn parse_literal(text: &str) -> QueryResult<Value> {
    let malformed = || QueryError::MalformedLiteral(text.to_string());

    if let Some(body) = quoted(text, "'") {
        return unescape_quoted(body).map(Value::String).ok_or_else(malformed);
    }
    if let Some(hex) = quoted(text, "X'").or_else(|| quoted(text, "binary'")) {
        return decode_hex(hex).map(Value::Binary).ok_or_else(malformed);
    }
    if let Some(body) = quoted(text, "guid'") {
        return Uuid::parse_str(body).map(Value::Guid).map_err(|_| malformed());
    }
    if let Some(body) = quoted(text, "datetime'") {
        return DateTime::parse_from_rfc3339(body)
            .map(|dt| Value::DateTime(dt.with_timezone(&Utc)))
            .map_err(|_| malformed());
    }

    match text {
        "true" => return Ok(Value::Bool(true)),
        "false" => return Ok(Value::Bool(false)),
        _ => {}
    }

    if let Some(digits) = text.strip_suffix('L') {
        return digits.parse::<i64>().map(Value::Int64).map_err(|_| malformed());
    }
    if text.contains('.') {
        return text
            .parse::<f64>()
            .ok()
            .filter(|d| d.is_finite())
            .map(Value::Double)
            .ok_or_else(malformed);
    }
    text.parse::<i32>().map(Value::Int32).map_err(|_| malformed())
}

fn quoted<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    text.strip_prefix(prefix)?.strip_suffix('\'')
}

fn unescape_quoted(body: &str) -> Option<String> {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c == '\'' {
            // Inner quotes must be doubled
            if chars.next() != Some('\'') {
                return None;
            }
        }
        out.push(c);
    }
    Some(out)
}

fn decode_hex(hex: &str) -> Option<Vec<u8>> {
    if hex.len() % 2 != 0 {
        return None;
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| hex.get(i..i + 2).and_then(|pair| u8::from_str_radix(pair, 16).ok()))
        .collect()
}
