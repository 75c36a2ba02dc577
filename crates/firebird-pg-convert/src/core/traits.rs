//! Core traits for reading a source database.
//!
//! - [`SchemaProvider`]: enumerates objects and serves schema and paged rows
//! - [`TypeMapper`]: maps source column types to target types
//!
//! The engine is synchronous and pull-based. A provider call may block on I/O;
//! the provider owns its own timeout and retry policy.

use serde::{Deserialize, Serialize};

use crate::error::Result;

use super::schema::{Column, Generator, TableSchema};
use super::value::RowBatch;

/// What a provider reports after a successful connect.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    /// Database file or alias.
    pub database: String,
    /// Engine version string, e.g. `3.0.10`.
    pub server_version: String,
    /// Connection character set.
    pub charset: String,
    pub table_count: usize,
    pub view_count: usize,
    pub generator_count: usize,
}

/// Read schema and data from a source database.
pub trait SchemaProvider {
    /// Establish the connection. A failure here aborts the whole run.
    fn connect(&mut self) -> Result<ConnectionInfo>;

    /// User tables, system relations excluded.
    fn list_tables(&self) -> Result<Vec<String>>;

    /// User views.
    fn list_views(&self) -> Result<Vec<String>>;

    /// Generators with their current values.
    fn list_generators(&self) -> Result<Vec<Generator>>;

    /// Full schema for one table.
    fn table_schema(&self, table: &str) -> Result<TableSchema>;

    /// Total rows in a table.
    fn row_count(&self, table: &str) -> Result<u64>;

    /// One page of rows. `offset` may be zero; an empty batch means exhausted.
    fn fetch_rows(&self, table: &str, offset: u64, limit: usize) -> Result<RowBatch>;

    /// Raw defining query of a view, if the source kept it.
    fn view_source(&self, view: &str) -> Result<Option<String>>;

    /// Release the connection.
    fn close(&mut self) {}
}

/// Result of mapping one column type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeMapping {
    /// Target type, e.g. `numeric(10,2)`.
    pub target_type: String,
    /// True when the mapping may lose information.
    pub is_lossy: bool,
    /// Explanation when lossy.
    pub warning: Option<String>,
}

impl TypeMapping {
    pub fn lossless(target_type: impl Into<String>) -> Self {
        Self {
            target_type: target_type.into(),
            is_lossy: false,
            warning: None,
        }
    }

    pub fn lossy(target_type: impl Into<String>, warning: impl Into<String>) -> Self {
        Self {
            target_type: target_type.into(),
            is_lossy: true,
            warning: Some(warning.into()),
        }
    }
}

/// Maps source column types to target types.
pub trait TypeMapper {
    /// Map a column. Never fails; unknown types fall back to a generic type.
    fn map_column(&self, column: &Column) -> TypeMapping;
}
