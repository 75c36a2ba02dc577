//! Core data model and abstractions.
//!
//! - [`schema`]: table, column, and constraint metadata
//! - [`value`]: runtime row values
//! - [`identifier`]: identifier validation and quoting
//! - [`traits`]: the provider and type-mapper seams

pub mod identifier;
pub mod schema;
pub mod traits;
pub mod value;

pub use identifier::{quote_ident, quote_list, validate_identifier};
pub use schema::{
    CheckConstraint, Column, ForeignKey, Generator, Index, SourceType, TableSchema, ViewDef,
};
pub use traits::{ConnectionInfo, SchemaProvider, TypeMapper, TypeMapping};
pub use value::{Row, RowBatch, SqlValue, ValueKind};
