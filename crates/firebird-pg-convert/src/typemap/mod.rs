//! Type mapping between Firebird and PostgreSQL.

use tracing::debug;

use crate::core::{Column, SourceType, TypeMapper, TypeMapping};

/// Largest length PostgreSQL accepts for `char(n)` / `varchar(n)`.
const PG_MAX_CHAR_LENGTH: i32 = 10_485_760;

/// Fallback for unknown codes and failed rules.
const FALLBACK_TYPE: &str = "text";

/// Map a Firebird field type to a PostgreSQL type.
///
/// Total: unknown codes map to `text`, and a rule that cannot be evaluated
/// with the given parameters (a scaled integer without precision, an
/// out-of-range length) also degrades to `text`.
pub fn map_type(
    type_code: i16,
    length: i32,
    precision: i32,
    scale: i32,
    subtype: Option<i16>,
) -> String {
    match try_map(type_code, length, precision, scale, subtype) {
        Some(Ok(t)) => t,
        Some(Err(reason)) => {
            debug!(
                "Type rule for code {} failed ({}), falling back to {}",
                type_code, reason, FALLBACK_TYPE
            );
            FALLBACK_TYPE.to_string()
        }
        None => FALLBACK_TYPE.to_string(),
    }
}

/// `None` for unknown codes, `Some(Err)` when a parameterized rule fails.
fn try_map(
    type_code: i16,
    length: i32,
    precision: i32,
    scale: i32,
    subtype: Option<i16>,
) -> Option<Result<String, &'static str>> {
    let ty = SourceType::from_code(type_code)?;
    let mapped = match ty {
        SourceType::SmallInt => scaled_integer("smallint", precision, scale),
        SourceType::Integer => scaled_integer("integer", precision, scale),
        SourceType::Int64 => scaled_integer("bigint", precision, scale),
        SourceType::Quad => Ok("bigint".to_string()),
        SourceType::Float => Ok("real".to_string()),
        SourceType::DFloat | SourceType::Double => Ok("double precision".to_string()),

        SourceType::Numeric => {
            if precision > 0 {
                Ok(format!("numeric({},{})", precision, scale.abs()))
            } else {
                Ok("numeric".to_string())
            }
        }
        SourceType::DecimalFixed | SourceType::DecimalText => Ok("numeric".to_string()),

        SourceType::Char => sized("char", length, "char(1)"),
        SourceType::Varchar | SourceType::CString => sized("varchar", length, "text"),

        SourceType::Date => Ok("date".to_string()),
        SourceType::Time => Ok("time".to_string()),
        SourceType::Timestamp => Ok("timestamp".to_string()),
        SourceType::Boolean => Ok("boolean".to_string()),

        SourceType::Blob => Ok(blob_type(subtype).to_string()),
        SourceType::BlobAlt => Ok("bytea".to_string()),
        SourceType::Array => Ok("text[]".to_string()),
    };
    Some(mapped)
}

fn scaled_integer(plain: &str, precision: i32, scale: i32) -> Result<String, &'static str> {
    if scale == 0 {
        return Ok(plain.to_string());
    }
    if precision <= 0 {
        return Err("scaled integer without precision");
    }
    Ok(format!("numeric({},{})", precision, scale.abs()))
}

fn sized(name: &str, length: i32, when_unsized: &str) -> Result<String, &'static str> {
    match length {
        l if l <= 0 => Ok(when_unsized.to_string()),
        l if l > PG_MAX_CHAR_LENGTH => Err("length exceeds PostgreSQL limit"),
        l => Ok(format!("{}({})", name, l)),
    }
}

/// BLOB SUB_TYPE 1 is text; 0 (binary), unknown and user subtypes are bytes.
fn blob_type(subtype: Option<i16>) -> &'static str {
    match subtype {
        Some(1) => "text",
        _ => "bytea",
    }
}

/// The Firebird to PostgreSQL [`TypeMapper`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FirebirdToPostgres;

impl TypeMapper for FirebirdToPostgres {
    fn map_column(&self, column: &Column) -> TypeMapping {
        match try_map(
            column.type_code,
            column.length,
            column.precision,
            column.scale,
            column.subtype,
        ) {
            None => TypeMapping::lossy(
                FALLBACK_TYPE,
                format!(
                    "Column {}: unknown Firebird type code {}, mapped to text",
                    column.name, column.type_code
                ),
            ),
            Some(Err(reason)) => TypeMapping::lossy(
                FALLBACK_TYPE,
                format!("Column {}: {}, mapped to text", column.name, reason),
            ),
            Some(Ok(target)) if column.source_type() == Some(SourceType::Array) => {
                TypeMapping::lossy(
                    target,
                    format!(
                        "Column {}: Firebird array element type is not tracked, mapped to text[]",
                        column.name
                    ),
                )
            }
            Some(Ok(target)) => TypeMapping::lossless(target),
        }
    }
}
