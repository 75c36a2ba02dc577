//! Schema and metadata types for Firebird tables, columns, indexes, and constraints.
//!
//! These mirror what the Firebird system tables (`RDB$RELATION_FIELDS`,
//! `RDB$INDICES`, `RDB$REF_CONSTRAINTS`, ...) expose, and are immutable once
//! read from a provider.

use serde::{Deserialize, Serialize};

/// Firebird internal field type (`RDB$FIELD_TYPE`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceType {
    SmallInt,
    Integer,
    Quad,
    Float,
    DFloat,
    Date,
    Time,
    Char,
    Int64,
    DecimalFixed,
    DecimalText,
    Boolean,
    Double,
    Timestamp,
    Varchar,
    CString,
    BlobAlt,
    Numeric,
    Array,
    Blob,
}

impl SourceType {
    /// Resolve a raw type code. Unknown codes return `None`.
    pub fn from_code(code: i16) -> Option<Self> {
        let ty = match code {
            7 => SourceType::SmallInt,
            8 => SourceType::Integer,
            9 => SourceType::Quad,
            10 => SourceType::Float,
            11 => SourceType::DFloat,
            12 => SourceType::Date,
            13 => SourceType::Time,
            14 => SourceType::Char,
            16 => SourceType::Int64,
            17 => SourceType::DecimalFixed,
            18 => SourceType::DecimalText,
            23 => SourceType::Boolean,
            27 => SourceType::Double,
            35 => SourceType::Timestamp,
            37 => SourceType::Varchar,
            40 => SourceType::CString,
            45 => SourceType::BlobAlt,
            64 => SourceType::Numeric,
            80 => SourceType::Array,
            261 => SourceType::Blob,
            _ => return None,
        };
        Some(ty)
    }

    /// The raw type code.
    pub fn code(self) -> i16 {
        match self {
            SourceType::SmallInt => 7,
            SourceType::Integer => 8,
            SourceType::Quad => 9,
            SourceType::Float => 10,
            SourceType::DFloat => 11,
            SourceType::Date => 12,
            SourceType::Time => 13,
            SourceType::Char => 14,
            SourceType::Int64 => 16,
            SourceType::DecimalFixed => 17,
            SourceType::DecimalText => 18,
            SourceType::Boolean => 23,
            SourceType::Double => 27,
            SourceType::Timestamp => 35,
            SourceType::Varchar => 37,
            SourceType::CString => 40,
            SourceType::BlobAlt => 45,
            SourceType::Numeric => 64,
            SourceType::Array => 80,
            SourceType::Blob => 261,
        }
    }

    /// Exact-decimal storage (NUMERIC/DECIMAL families).
    pub fn is_decimal(self) -> bool {
        matches!(
            self,
            SourceType::Numeric | SourceType::DecimalFixed | SourceType::DecimalText
        )
    }

    pub fn is_float(self) -> bool {
        matches!(
            self,
            SourceType::Float | SourceType::DFloat | SourceType::Double
        )
    }
}

/// Column metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Column name.
    pub name: String,

    /// Firebird type code (`RDB$FIELD_TYPE`).
    #[serde(rename = "type")]
    pub type_code: i16,

    /// Declared length for character types.
    #[serde(default)]
    pub length: i32,

    /// Numeric precision.
    #[serde(default)]
    pub precision: i32,

    /// Numeric scale (Firebird stores it negative).
    #[serde(default)]
    pub scale: i32,

    /// Sub-type discriminator; distinguishes text from binary BLOBs.
    #[serde(default)]
    pub subtype: Option<i16>,

    /// Whether the column allows NULL.
    #[serde(default = "default_true")]
    pub nullable: bool,

    /// Raw default source, e.g. `DEFAULT 'NOW'`.
    #[serde(default)]
    pub default: Option<String>,

    /// Ordinal position (0-based, as Firebird stores it).
    #[serde(default)]
    pub position: i32,

    /// Column description (`RDB$DESCRIPTION`).
    #[serde(default)]
    pub description: Option<String>,
}

impl Column {
    pub fn source_type(&self) -> Option<SourceType> {
        SourceType::from_code(self.type_code)
    }

    /// Integer types stored with a scale hold fixed-point values.
    pub fn is_scaled_integer(&self) -> bool {
        self.scale != 0
            && matches!(
                self.source_type(),
                Some(SourceType::SmallInt | SourceType::Integer | SourceType::Int64)
            )
    }
}

/// Table metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Table name.
    pub name: String,

    /// Column definitions, in ordinal order.
    pub columns: Vec<Column>,

    /// Primary key column names.
    #[serde(default)]
    pub primary_key: Vec<String>,

    /// Indexes (primary and foreign key backing indexes excluded).
    #[serde(default)]
    pub indexes: Vec<Index>,

    /// Foreign key constraints.
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,

    /// Check constraints.
    #[serde(default)]
    pub check_constraints: Vec<CheckConstraint>,

    /// Row count at snapshot time.
    #[serde(default)]
    pub row_count: u64,
}

impl TableSchema {
    /// Check if the table has a primary key.
    pub fn has_pk(&self) -> bool {
        !self.primary_key.is_empty()
    }

    /// Look up a column by name (case-insensitive).
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Columns sorted by ordinal position.
    pub fn ordered_columns(&self) -> Vec<&Column> {
        let mut cols: Vec<&Column> = self.columns.iter().collect();
        cols.sort_by_key(|c| c.position);
        cols
    }

    /// Names of tables this table references, excluding itself.
    pub fn referenced_tables(&self) -> Vec<&str> {
        self.foreign_keys
            .iter()
            .map(|fk| fk.ref_table.as_str())
            .filter(|t| !t.is_empty() && !t.eq_ignore_ascii_case(&self.name))
            .collect()
    }
}

/// Index metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Index {
    /// Index name.
    pub name: String,

    /// Indexed column names, in segment order.
    pub columns: Vec<String>,

    /// Whether the index is unique.
    #[serde(default)]
    pub unique: bool,
}

/// Foreign key metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKey {
    /// Constraint name.
    pub name: String,

    /// Source column names.
    pub columns: Vec<String>,

    /// Referenced table name.
    pub ref_table: String,

    /// Referenced column names.
    pub ref_columns: Vec<String>,

    /// ON DELETE action.
    #[serde(default = "default_rule")]
    pub on_delete: String,

    /// ON UPDATE action.
    #[serde(default = "default_rule")]
    pub on_update: String,
}

/// Check constraint metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckConstraint {
    /// Constraint name.
    pub name: String,

    /// Condition text as stored in the check trigger source.
    #[serde(default)]
    pub condition: String,
}

/// A Firebird generator (sequence).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Generator {
    pub name: String,
    #[serde(default)]
    pub current_value: i64,
}

/// A view and its defining query text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewDef {
    pub name: String,
    #[serde(default)]
    pub source: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_rule() -> String {
    "NO ACTION".to_string()
}
