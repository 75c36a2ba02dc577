//! Pre-render validation of row batches against the table schema.

use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::core::{Column, Row, SourceType, SqlValue, TableSchema};

/// Check a batch of rows and describe every problem found.
///
/// Row numbers in the messages are 1-based within the batch. Validation never
/// rejects rows; the messages are written as comments ahead of the data.
pub fn validate_batch(rows: &[Row], schema: &TableSchema) -> Vec<String> {
    let mut warnings = Vec::new();

    for (i, row) in rows.iter().enumerate() {
        let n = i + 1;
        for (name, value) in row {
            let Some(col) = schema.column(name) else {
                warnings.push(format!(
                    "Row {}: column {} not found in table {}",
                    n, name, schema.name
                ));
                continue;
            };

            if value.is_null() {
                if !col.nullable {
                    warnings.push(format!(
                        "Row {}: NULL value in NOT NULL column {}",
                        n, col.name
                    ));
                }
                continue;
            }

            if let Some(problem) = check_value(col, value) {
                warnings.push(format!("Row {}: {}", n, problem));
            }
        }
    }

    warnings
}

fn check_value(col: &Column, value: &SqlValue<'_>) -> Option<String> {
    match col.source_type()? {
        SourceType::SmallInt if !col.is_scaled_integer() => {
            check_integer(col, value, i16::MIN as i64, i16::MAX as i64, "SMALLINT")
        }
        SourceType::Integer if !col.is_scaled_integer() => {
            check_integer(col, value, i32::MIN as i64, i32::MAX as i64, "INTEGER")
        }
        SourceType::Char | SourceType::Varchar => check_length(col, value),
        SourceType::Numeric => check_numeric(col, value),
        _ => None,
    }
}

fn as_integer(value: &SqlValue<'_>) -> Option<i64> {
    match value {
        SqlValue::I64(v) => Some(*v),
        SqlValue::Bool(b) => Some(i64::from(*b)),
        SqlValue::F64(f) if f.is_finite() && f.fract() == 0.0 => Some(*f as i64),
        SqlValue::Decimal(d) if d.fract().is_zero() => d.to_i64(),
        SqlValue::Text(s) => s.trim().parse().ok(),
        SqlValue::Other(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn check_integer(
    col: &Column,
    value: &SqlValue<'_>,
    min: i64,
    max: i64,
    type_name: &str,
) -> Option<String> {
    match as_integer(value) {
        Some(v) if v < min || v > max => Some(format!(
            "value {} out of {} range for column {}",
            v, type_name, col.name
        )),
        Some(_) => None,
        None => Some(format!(
            "invalid {} value for column {}: {}",
            type_name,
            col.name,
            value.describe()
        )),
    }
}

fn check_length(col: &Column, value: &SqlValue<'_>) -> Option<String> {
    let SqlValue::Text(s) = value else {
        return None;
    };
    let len = s.chars().count();
    if col.length > 0 && len > col.length as usize {
        return Some(format!(
            "string too long for column {} ({} > {} characters)",
            col.name, len, col.length
        ));
    }
    None
}

fn check_numeric(col: &Column, value: &SqlValue<'_>) -> Option<String> {
    let ok = match value {
        SqlValue::I64(_) | SqlValue::F64(_) | SqlValue::Decimal(_) => true,
        SqlValue::Text(s) => Decimal::from_str(s.trim()).is_ok(),
        SqlValue::Other(s) => Decimal::from_str(s.trim()).is_ok(),
        _ => false,
    };
    if ok {
        None
    } else {
        Some(format!(
            "invalid NUMERIC value for column {}: {}",
            col.name,
            value.describe()
        ))
    }
}
