//! Rendering of row values as PostgreSQL text.
//!
//! Two renderings are supported:
//!
//! - [`SerializeMode::SqlLiteral`]: a literal usable inside `INSERT ... VALUES`
//! - [`SerializeMode::BulkField`]: a field of a `COPY ... (FORMAT csv)` line,
//!   with `\N` as the NULL marker
//!
//! Serialization is total. Values that cannot be represented become NULL and
//! are logged, never silently turned into different data.

use std::str::FromStr;

use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::core::{Column, SourceType, SqlValue, ValueKind};

/// NULL marker used in COPY blocks.
pub const BULK_NULL: &str = "\\N";

/// Target rendering for a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerializeMode {
    /// `INSERT` literal.
    SqlLiteral,
    /// CSV field in a `COPY FROM STDIN` block.
    BulkField,
}

impl SerializeMode {
    fn null(self) -> String {
        match self {
            SerializeMode::SqlLiteral => "NULL".to_string(),
            SerializeMode::BulkField => BULK_NULL.to_string(),
        }
    }
}

/// Serialize a value using the column's declared type as the hint.
///
/// Scaled integers count as numeric.
pub fn serialize_for_column(
    value: &SqlValue<'_>,
    column: Option<&Column>,
    mode: SerializeMode,
) -> String {
    let hint = column.and_then(|c| {
        if c.is_scaled_integer() {
            Some(SourceType::Numeric)
        } else {
            c.source_type()
        }
    });
    serialize(value, hint, mode)
}

/// Serialize one value.
pub fn serialize(value: &SqlValue<'_>, hint: Option<SourceType>, mode: SerializeMode) -> String {
    match value {
        SqlValue::Null => mode.null(),
        SqlValue::Bool(b) => match (mode, b) {
            (SerializeMode::SqlLiteral, true) => "TRUE".to_string(),
            (SerializeMode::SqlLiteral, false) => "FALSE".to_string(),
            (SerializeMode::BulkField, true) => "t".to_string(),
            (SerializeMode::BulkField, false) => "f".to_string(),
        },
        SqlValue::I64(v) => v.to_string(),
        SqlValue::Decimal(d) => d.to_string(),
        SqlValue::F64(f) => serialize_float(*f, hint, mode),
        SqlValue::Text(s) => serialize_text(s, mode),
        SqlValue::Bytes(b) => {
            let body = format!("\\x{}", hex::encode(b.as_ref()));
            match mode {
                SerializeMode::SqlLiteral => format!("'{}'", body),
                SerializeMode::BulkField => format!("\"{}\"", body),
            }
        }
        SqlValue::Date(_) | SqlValue::Time(_) | SqlValue::DateTime(_) | SqlValue::DateTimeTz(_) => {
            let text = format_temporal(value).unwrap_or_default();
            match mode {
                SerializeMode::SqlLiteral => format!("'{}'", text),
                SerializeMode::BulkField => text,
            }
        }
        SqlValue::Array(items) => serialize_array(items, mode),
        SqlValue::Other(raw) => serialize_other(raw, mode),
    }
}

fn serialize_float(f: f64, hint: Option<SourceType>, mode: SerializeMode) -> String {
    if f.is_nan() {
        return mode.null();
    }
    if f.is_infinite() {
        let word = if f > 0.0 { "infinity" } else { "-infinity" };
        return match mode {
            SerializeMode::SqlLiteral => format!("'{}'", word),
            SerializeMode::BulkField => word.to_string(),
        };
    }

    let shortest = f.to_string();
    if hint.is_some_and(|t| t.is_decimal()) {
        if let Ok(d) = Decimal::from_str(&shortest) {
            return d.to_string();
        }
    }
    shortest
}

fn serialize_text(s: &str, mode: SerializeMode) -> String {
    match mode {
        SerializeMode::SqlLiteral => sql_text_literal(s),
        SerializeMode::BulkField => csv_text_field(s),
    }
}

/// Quote text as a SQL literal, switching to `E'...'` when escapes are needed.
pub fn sql_text_literal(s: &str) -> String {
    if s.is_empty() {
        return "''".to_string();
    }

    let mut out = String::with_capacity(s.len() + 2);
    let mut needs_e = false;
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\0' => {}
            '\\' => {
                out.push_str("\\\\");
                needs_e = true;
            }
            '\'' => out.push_str("''"),
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push_str("\\n");
                needs_e = true;
            }
            '\n' => {
                out.push_str("\\n");
                needs_e = true;
            }
            '\t' => {
                out.push_str("\\t");
                needs_e = true;
            }
            c if c.is_control() => {
                out.push_str(&format!("\\u{:04x}", c as u32));
                needs_e = true;
            }
            c => out.push(c),
        }
    }

    if needs_e {
        format!("E'{}'", out)
    } else {
        format!("'{}'", out)
    }
}

fn csv_text_field(s: &str) -> String {
    if s.is_empty() {
        return "\"\"".to_string();
    }
    let cleaned = s.replace('\0', "").replace("\r\n", "\n").replace('\r', "\n");
    format!("\"{}\"", cleaned.replace('"', "\"\""))
}

fn format_temporal(value: &SqlValue<'_>) -> Option<String> {
    let text = match value {
        SqlValue::Date(d) => d.format("%Y-%m-%d").to_string(),
        SqlValue::Time(t) => {
            if t.format("%6f").to_string() == "000000" {
                t.format("%H:%M:%S").to_string()
            } else {
                t.format("%H:%M:%S%.6f").to_string()
            }
        }
        SqlValue::DateTime(dt) => {
            if dt.format("%6f").to_string() == "000000" {
                dt.format("%Y-%m-%d %H:%M:%S").to_string()
            } else {
                dt.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
            }
        }
        SqlValue::DateTimeTz(dt) => {
            if dt.format("%6f").to_string() == "000000" {
                dt.format("%Y-%m-%d %H:%M:%S%z").to_string()
            } else {
                dt.format("%Y-%m-%d %H:%M:%S%.6f%z").to_string()
            }
        }
        _ => return None,
    };
    Some(text)
}

/// True when every non-null element, recursively, shares one kind.
fn is_homogeneous(items: &[SqlValue<'_>]) -> bool {
    let mut kind: Option<ValueKind> = None;
    for item in items {
        if item.is_null() {
            continue;
        }
        if let SqlValue::Array(inner) = item {
            if !is_homogeneous(inner) {
                return false;
            }
        }
        match kind {
            None => kind = Some(item.kind()),
            Some(k) if k != item.kind() => return false,
            Some(_) => {}
        }
    }
    true
}

fn serialize_array(items: &[SqlValue<'_>], mode: SerializeMode) -> String {
    if !is_homogeneous(items) {
        warn!(
            "Array with mixed element types ({} elements) written as NULL",
            items.len()
        );
        return mode.null();
    }

    match mode {
        SerializeMode::SqlLiteral => {
            if items.is_empty() {
                return "'{}'".to_string();
            }
            let parts: Vec<String> = items
                .iter()
                .map(|v| serialize(v, None, SerializeMode::SqlLiteral))
                .collect();
            format!("ARRAY[{}]", parts.join(", "))
        }
        SerializeMode::BulkField => {
            let literal = array_literal(items);
            format!("\"{}\"", literal.replace('"', "\"\""))
        }
    }
}

/// PostgreSQL array input syntax, e.g. `{1,NULL,"a b"}`.
fn array_literal(items: &[SqlValue<'_>]) -> String {
    let parts: Vec<String> = items.iter().map(array_element).collect();
    format!("{{{}}}", parts.join(","))
}

fn array_element(value: &SqlValue<'_>) -> String {
    let quote = |s: &str| format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""));
    match value {
        SqlValue::Null => "NULL".to_string(),
        SqlValue::Bool(b) => if *b { "t" } else { "f" }.to_string(),
        SqlValue::I64(v) => v.to_string(),
        SqlValue::Decimal(d) => d.to_string(),
        SqlValue::F64(f) if f.is_nan() => "NULL".to_string(),
        SqlValue::F64(f) if f.is_infinite() => {
            if *f > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
        }
        SqlValue::F64(f) => f.to_string(),
        SqlValue::Text(s) => quote(&s.replace('\0', "")),
        SqlValue::Bytes(b) => quote(&format!("\\x{}", hex::encode(b.as_ref()))),
        SqlValue::Array(inner) => array_literal(inner),
        SqlValue::Other(raw) => quote(raw),
        temporal => quote(&format_temporal(temporal).unwrap_or_default()),
    }
}

fn looks_numeric(s: &str) -> bool {
    !s.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E')
        && s.parse::<f64>().map(f64::is_finite).unwrap_or(false)
}

fn serialize_other(raw: &str, mode: SerializeMode) -> String {
    let trimmed = raw.trim();
    debug!("Serializing untyped value {:?} through text fallback", raw);

    let lowered = trimmed.to_ascii_lowercase();
    if trimmed.is_empty() || lowered == "none" || lowered == "null" {
        return mode.null();
    }
    if looks_numeric(trimmed) {
        return trimmed.to_string();
    }
    serialize_text(raw, mode)
}
