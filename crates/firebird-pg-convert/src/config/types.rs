//! Configuration type definitions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Where schema and rows are read from.
    #[serde(default)]
    pub source: SourceConfig,

    /// Translation behavior.
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Where the generated script goes.
    #[serde(default)]
    pub output: OutputConfig,
}

/// Source database snapshot configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Path to a JSON snapshot of the Firebird database.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<PathBuf>,

    /// Name shown in the script header (default: the snapshot path).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl SourceConfig {
    /// Label for the script header.
    pub fn display_label(&self) -> String {
        match (&self.label, &self.snapshot) {
            (Some(label), _) => label.clone(),
            (None, Some(path)) => path.display().to_string(),
            (None, None) => "unknown".to_string(),
        }
    }
}

/// Output configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Script path. Stdout when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Translation behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationConfig {
    /// Rows per provider page (default: 1000).
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Emit data statements (default: true).
    #[serde(default = "default_true")]
    pub include_data: bool,

    /// Data statement format (default: insert).
    #[serde(default)]
    pub data_format: DataFormat,

    /// Wrap each table's data in BEGIN/COMMIT (default: false).
    #[serde(default)]
    pub wrap_transactions: bool,

    /// Check rows against column constraints before rendering (default: true).
    #[serde(default = "default_true")]
    pub validate_data: bool,

    /// Rows per INSERT statement. Derived from batch_size if not set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insert_chunk_size: Option<usize>,

    /// Validation warnings written per batch before summarizing (default: 5).
    #[serde(default = "default_max_batch_warnings")]
    pub max_batch_warnings: usize,

    /// Create indexes (default: true).
    #[serde(default = "default_true")]
    pub create_indexes: bool,

    /// Create foreign keys (default: true).
    #[serde(default = "default_true")]
    pub create_foreign_keys: bool,

    /// Create check constraints (default: true).
    #[serde(default = "default_true")]
    pub create_check_constraints: bool,

    /// Tables to include (glob patterns, case-insensitive).
    #[serde(default)]
    pub include_tables: Vec<String>,

    /// Tables to exclude (glob patterns, case-insensitive).
    #[serde(default)]
    pub exclude_tables: Vec<String>,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            include_data: true,
            data_format: DataFormat::default(),
            wrap_transactions: false,
            validate_data: true,
            insert_chunk_size: None,
            max_batch_warnings: default_max_batch_warnings(),
            create_indexes: true,
            create_foreign_keys: true,
            create_check_constraints: true,
            include_tables: Vec::new(),
            exclude_tables: Vec::new(),
        }
    }
}

impl TranslationConfig {
    /// Effective rows per INSERT statement: min(500, batch_size / 4), at least 1.
    pub fn get_insert_chunk_size(&self) -> usize {
        self.insert_chunk_size
            .unwrap_or_else(|| (self.batch_size / 4).min(500))
            .max(1)
    }
}

/// Data statement format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataFormat {
    /// Multi-row INSERT statements.
    #[default]
    Insert,

    /// COPY ... FROM STDIN blocks in CSV format.
    Copy,
}

impl std::fmt::Display for DataFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataFormat::Insert => write!(f, "insert"),
            DataFormat::Copy => write!(f, "copy"),
        }
    }
}

fn default_batch_size() -> usize {
    1000
}

fn default_max_batch_warnings() -> usize {
    5
}

fn default_true() -> bool {
    true
}
