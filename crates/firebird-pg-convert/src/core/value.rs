//! SQL value types for row data.
//!
//! Rows arrive from a provider as ordered name/value maps. Values are typed
//! enough to pick the right target literal without re-reading the schema.

use std::borrow::Cow;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde_json::Value as JsonValue;

use super::schema::{Column, SourceType};

/// SQL value enum for type-safe row handling.
///
/// Uses `Cow` for string and byte data so callers can borrow from a source
/// buffer; rows stored in a [`RowBatch`] are always `'static`.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue<'a> {
    /// NULL.
    Null,

    /// Boolean value.
    Bool(bool),

    /// Any integer type.
    I64(i64),

    /// Floating point (FLOAT, DOUBLE PRECISION, D_FLOAT).
    F64(f64),

    /// Exact decimal (NUMERIC/DECIMAL, scaled integers).
    Decimal(Decimal),

    /// Text/string data.
    Text(Cow<'a, str>),

    /// Binary data.
    Bytes(Cow<'a, [u8]>),

    /// Date without time component.
    Date(NaiveDate),

    /// Time without date component.
    Time(NaiveTime),

    /// Timestamp without timezone.
    DateTime(NaiveDateTime),

    /// Timestamp with timezone offset.
    DateTimeTz(DateTime<FixedOffset>),

    /// Array column value.
    Array(Vec<SqlValue<'a>>),

    /// A value the provider could not type, carried as its textual form.
    Other(String),
}

/// Coarse value kind, used to check array homogeneity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Null,
    Bool,
    Number,
    Text,
    Bytes,
    Temporal,
    Array,
    Other,
}

impl<'a> SqlValue<'a> {
    /// Convert to a fully owned value with `'static` lifetime.
    #[must_use]
    pub fn into_owned(self) -> SqlValue<'static> {
        match self {
            SqlValue::Null => SqlValue::Null,
            SqlValue::Bool(v) => SqlValue::Bool(v),
            SqlValue::I64(v) => SqlValue::I64(v),
            SqlValue::F64(v) => SqlValue::F64(v),
            SqlValue::Decimal(v) => SqlValue::Decimal(v),
            SqlValue::Text(v) => SqlValue::Text(Cow::Owned(v.into_owned())),
            SqlValue::Bytes(v) => SqlValue::Bytes(Cow::Owned(v.into_owned())),
            SqlValue::Date(v) => SqlValue::Date(v),
            SqlValue::Time(v) => SqlValue::Time(v),
            SqlValue::DateTime(v) => SqlValue::DateTime(v),
            SqlValue::DateTimeTz(v) => SqlValue::DateTimeTz(v),
            SqlValue::Array(items) => {
                SqlValue::Array(items.into_iter().map(SqlValue::into_owned).collect())
            }
            SqlValue::Other(v) => SqlValue::Other(v),
        }
    }

    /// Check if this value is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    #[must_use]
    pub fn kind(&self) -> ValueKind {
        match self {
            SqlValue::Null => ValueKind::Null,
            SqlValue::Bool(_) => ValueKind::Bool,
            SqlValue::I64(_) | SqlValue::F64(_) | SqlValue::Decimal(_) => ValueKind::Number,
            SqlValue::Text(_) => ValueKind::Text,
            SqlValue::Bytes(_) => ValueKind::Bytes,
            SqlValue::Date(_)
            | SqlValue::Time(_)
            | SqlValue::DateTime(_)
            | SqlValue::DateTimeTz(_) => ValueKind::Temporal,
            SqlValue::Array(_) => ValueKind::Array,
            SqlValue::Other(_) => ValueKind::Other,
        }
    }

    /// Short human-readable rendering for diagnostics.
    pub fn describe(&self) -> String {
        match self {
            SqlValue::Null => "NULL".to_string(),
            SqlValue::Bool(v) => v.to_string(),
            SqlValue::I64(v) => v.to_string(),
            SqlValue::F64(v) => v.to_string(),
            SqlValue::Decimal(v) => v.to_string(),
            SqlValue::Text(v) => v.to_string(),
            SqlValue::Bytes(v) => format!("<{} bytes>", v.len()),
            SqlValue::Date(v) => v.to_string(),
            SqlValue::Time(v) => v.to_string(),
            SqlValue::DateTime(v) => v.to_string(),
            SqlValue::DateTimeTz(v) => v.to_string(),
            SqlValue::Array(items) => format!("<array of {}>", items.len()),
            SqlValue::Other(v) => v.clone(),
        }
    }
}

impl SqlValue<'static> {
    /// Decode a JSON value using the column's declared type as a hint.
    pub fn from_json(value: &JsonValue, column: Option<&Column>) -> SqlValue<'static> {
        let ty = column.and_then(Column::source_type);
        let exact = column
            .map(|c| c.is_scaled_integer() || ty.is_some_and(SourceType::is_decimal))
            .unwrap_or(false);

        match value {
            JsonValue::Null => SqlValue::Null,
            JsonValue::Bool(b) => SqlValue::Bool(*b),
            JsonValue::Number(n) => {
                if exact {
                    if let Ok(d) = Decimal::from_str(&n.to_string()) {
                        return SqlValue::Decimal(d);
                    }
                }
                if let Some(i) = n.as_i64() {
                    SqlValue::I64(i)
                } else if let Some(f) = n.as_f64() {
                    SqlValue::F64(f)
                } else {
                    SqlValue::Other(n.to_string())
                }
            }
            JsonValue::String(s) => decode_text(s, ty, column, exact),
            JsonValue::Array(items) => {
                SqlValue::Array(items.iter().map(|v| SqlValue::from_json(v, None)).collect())
            }
            JsonValue::Object(_) => SqlValue::Other(value.to_string()),
        }
    }
}

fn decode_text(
    s: &str,
    ty: Option<SourceType>,
    column: Option<&Column>,
    exact: bool,
) -> SqlValue<'static> {
    let text = || SqlValue::Text(Cow::Owned(s.to_string()));

    if exact {
        return Decimal::from_str(s.trim())
            .map(SqlValue::Decimal)
            .unwrap_or_else(|_| text());
    }

    match ty {
        Some(SourceType::Date) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(SqlValue::Date)
            .unwrap_or_else(|_| text()),
        Some(SourceType::Time) => NaiveTime::parse_from_str(s, "%H:%M:%S%.f")
            .map(SqlValue::Time)
            .unwrap_or_else(|_| text()),
        Some(SourceType::Timestamp) => parse_timestamp(s).unwrap_or_else(text),
        Some(SourceType::BlobAlt) => parse_hex(s).unwrap_or_else(text),
        Some(SourceType::Blob) if column.and_then(|c| c.subtype) != Some(1) => {
            parse_hex(s).unwrap_or_else(text)
        }
        Some(t) if t.is_float() => parse_float(s).map(SqlValue::F64).unwrap_or_else(text),
        Some(SourceType::Boolean) => match s.to_ascii_lowercase().as_str() {
            "true" | "t" => SqlValue::Bool(true),
            "false" | "f" => SqlValue::Bool(false),
            _ => text(),
        },
        _ => text(),
    }
}

fn parse_timestamp(s: &str) -> Option<SqlValue<'static>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(SqlValue::DateTimeTz(dt));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"] {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(SqlValue::DateTimeTz(dt));
        }
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(SqlValue::DateTime(dt));
        }
    }
    None
}

fn parse_hex(s: &str) -> Option<SqlValue<'static>> {
    let digits = s
        .strip_prefix("\\x")
        .or_else(|| s.strip_prefix("0x"))
        .unwrap_or(s);
    hex::decode(digits)
        .ok()
        .map(|bytes| SqlValue::Bytes(Cow::Owned(bytes)))
}

fn parse_float(s: &str) -> Option<f64> {
    match s.trim().to_ascii_lowercase().as_str() {
        "nan" => Some(f64::NAN),
        "inf" | "infinity" | "+infinity" => Some(f64::INFINITY),
        "-inf" | "-infinity" => Some(f64::NEG_INFINITY),
        other => other.parse().ok(),
    }
}

impl From<bool> for SqlValue<'static> {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<i64> for SqlValue<'static> {
    fn from(v: i64) -> Self {
        SqlValue::I64(v)
    }
}

impl From<i32> for SqlValue<'static> {
    fn from(v: i32) -> Self {
        SqlValue::I64(v as i64)
    }
}

impl From<f64> for SqlValue<'static> {
    fn from(v: f64) -> Self {
        SqlValue::F64(v)
    }
}

impl From<String> for SqlValue<'static> {
    fn from(v: String) -> Self {
        SqlValue::Text(Cow::Owned(v))
    }
}

impl<'a> From<&'a str> for SqlValue<'a> {
    fn from(v: &'a str) -> Self {
        SqlValue::Text(Cow::Borrowed(v))
    }
}

impl From<Vec<u8>> for SqlValue<'static> {
    fn from(v: Vec<u8>) -> Self {
        SqlValue::Bytes(Cow::Owned(v))
    }
}

impl From<Decimal> for SqlValue<'static> {
    fn from(v: Decimal) -> Self {
        SqlValue::Decimal(v)
    }
}

impl From<NaiveDate> for SqlValue<'static> {
    fn from(v: NaiveDate) -> Self {
        SqlValue::Date(v)
    }
}

impl From<NaiveDateTime> for SqlValue<'static> {
    fn from(v: NaiveDateTime) -> Self {
        SqlValue::DateTime(v)
    }
}

impl<'a, T: Into<SqlValue<'a>>> From<Option<T>> for SqlValue<'a> {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

/// One row: column name to value, in provider order.
pub type Row = IndexMap<String, SqlValue<'static>>;

/// One page of rows from a provider.
pub type RowBatch = Vec<Row>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn col(type_code: i16, scale: i32, subtype: Option<i16>) -> Column {
        Column {
            name: "C".to_string(),
            type_code,
            length: 0,
            precision: 10,
            scale,
            subtype,
            nullable: true,
            default: None,
            position: 0,
            description: None,
        }
    }

    #[test]
    fn test_sql_value_into_owned() {
        let borrowed: SqlValue<'_> = SqlValue::Text(Cow::Borrowed("hello"));
        let owned: SqlValue<'static> = borrowed.into_owned();
        assert_eq!(owned, SqlValue::Text(Cow::Owned("hello".to_string())));
    }

    #[test]
    fn test_from_option() {
        let v: SqlValue<'static> = Option::<i64>::None.into();
        assert!(v.is_null());
        let v: SqlValue<'static> = Some(5i64).into();
        assert_eq!(v, SqlValue::I64(5));
    }

    #[test]
    fn test_from_json_scaled_integer_is_decimal() {
        let v = SqlValue::from_json(&json!(19.9), Some(&col(16, -2, None)));
        assert_eq!(v, SqlValue::Decimal(Decimal::from_str("19.9").unwrap()));
    }

    #[test]
    fn test_from_json_wide_numeric_keeps_digits() {
        let mut amount = col(16, -2, None);
        amount.precision = 18;
        let raw: JsonValue = serde_json::from_str("1234567890123456.78").unwrap();
        let v = SqlValue::from_json(&raw, Some(&amount));
        assert_eq!(
            v,
            SqlValue::Decimal(Decimal::from_str("1234567890123456.78").unwrap())
        );
    }

    #[test]
    fn test_from_json_plain_numbers() {
        assert_eq!(SqlValue::from_json(&json!(7), None), SqlValue::I64(7));
        assert_eq!(SqlValue::from_json(&json!(1.5), None), SqlValue::F64(1.5));
    }

    #[test]
    fn test_from_json_temporal() {
        let d = SqlValue::from_json(&json!("2024-02-29"), Some(&col(12, 0, None)));
        assert_eq!(d, SqlValue::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()));

        let ts = SqlValue::from_json(&json!("2024-01-02 03:04:05.250"), Some(&col(35, 0, None)));
        assert!(matches!(ts, SqlValue::DateTime(_)));

        let tz = SqlValue::from_json(&json!("2024-01-02T03:04:05+02:00"), Some(&col(35, 0, None)));
        assert!(matches!(tz, SqlValue::DateTimeTz(_)));

        let bad = SqlValue::from_json(&json!("yesterday"), Some(&col(12, 0, None)));
        assert_eq!(bad, SqlValue::from("yesterday".to_string()));
    }

    #[test]
    fn test_from_json_blob_subtypes() {
        let bin = SqlValue::from_json(&json!("deadbeef"), Some(&col(261, 0, Some(0))));
        assert_eq!(bin, SqlValue::from(vec![0xde, 0xad, 0xbe, 0xef]));

        let text = SqlValue::from_json(&json!("deadbeef"), Some(&col(261, 0, Some(1))));
        assert_eq!(text, SqlValue::from("deadbeef".to_string()));
    }

    #[test]
    fn test_from_json_float_specials() {
        let v = SqlValue::from_json(&json!("NaN"), Some(&col(27, 0, None)));
        assert!(matches!(v, SqlValue::F64(f) if f.is_nan()));
        let v = SqlValue::from_json(&json!("-Infinity"), Some(&col(10, 0, None)));
        assert_eq!(v, SqlValue::F64(f64::NEG_INFINITY));
    }

    #[test]
    fn test_from_json_object_is_other() {
        let v = SqlValue::from_json(&json!({"x": 1}), None);
        assert_eq!(v.kind(), ValueKind::Other);
    }

    #[test]
    fn test_from_json_array() {
        let v = SqlValue::from_json(&json!(["a", null, "b"]), Some(&col(80, 0, None)));
        match v {
            SqlValue::Array(items) => assert_eq!(items.len(), 3),
            other => panic!("expected array, got {:?}", other),
        }
    }
}
