//! JSON snapshot of a Firebird database.
//!
//! A snapshot carries the catalog (tables, views, generators) plus row data
//! for each table. Row values are JSON; they are decoded against the declared
//! column type when a page is fetched, so dates, decimals, hex-encoded BLOBs
//! and float specials come back as typed values.

use std::path::PathBuf;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use tracing::{debug, info};

use crate::core::{
    validate_identifier, CheckConstraint, Column, ConnectionInfo, ForeignKey, Generator, Index,
    Row, RowBatch, SchemaProvider, SqlValue, TableSchema, ViewDef,
};
use crate::error::{ConvertError, Result};

/// One table in a snapshot: its schema plus raw JSON rows.
///
/// On disk the schema fields and `rows` share one object.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "TableEntry", into = "TableEntry")]
pub struct SnapshotTable {
    pub schema: TableSchema,
    pub rows: Vec<Map<String, JsonValue>>,
}

/// Wire shape of [`SnapshotTable`]. No `#[serde(flatten)]` here: buffered
/// content does not carry exact-precision numbers.
#[derive(Serialize, Deserialize)]
struct TableEntry {
    name: String,
    columns: Vec<Column>,
    #[serde(default)]
    primary_key: Vec<String>,
    #[serde(default)]
    indexes: Vec<Index>,
    #[serde(default)]
    foreign_keys: Vec<ForeignKey>,
    #[serde(default)]
    check_constraints: Vec<CheckConstraint>,
    #[serde(default)]
    row_count: u64,
    #[serde(default)]
    rows: Vec<Map<String, JsonValue>>,
}

impl From<TableEntry> for SnapshotTable {
    fn from(entry: TableEntry) -> Self {
        Self {
            schema: TableSchema {
                name: entry.name,
                columns: entry.columns,
                primary_key: entry.primary_key,
                indexes: entry.indexes,
                foreign_keys: entry.foreign_keys,
                check_constraints: entry.check_constraints,
                row_count: entry.row_count,
            },
            rows: entry.rows,
        }
    }
}

impl From<SnapshotTable> for TableEntry {
    fn from(table: SnapshotTable) -> Self {
        let schema = table.schema;
        Self {
            name: schema.name,
            columns: schema.columns,
            primary_key: schema.primary_key,
            indexes: schema.indexes,
            foreign_keys: schema.foreign_keys,
            check_constraints: schema.check_constraints,
            row_count: schema.row_count,
            rows: table.rows,
        }
    }
}

/// On-disk snapshot document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub database: String,

    #[serde(default)]
    pub server_version: String,

    #[serde(default)]
    pub charset: String,

    #[serde(default)]
    pub tables: Vec<SnapshotTable>,

    #[serde(default)]
    pub views: Vec<ViewDef>,

    #[serde(default)]
    pub generators: Vec<Generator>,
}

impl Snapshot {
    /// Parse a snapshot document.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reject names the emitter could not quote.
    fn validate(&self) -> Result<()> {
        for table in &self.tables {
            validate_identifier(&table.schema.name)?;
            for column in &table.schema.columns {
                validate_identifier(&column.name)?;
            }
        }
        for view in &self.views {
            validate_identifier(&view.name)?;
        }
        for generator in &self.generators {
            validate_identifier(&generator.name)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
enum SnapshotSource {
    File(PathBuf),
    Inline(String),
}

/// Loaded snapshot, keyed by lower-cased name.
#[derive(Debug)]
struct Loaded {
    info: ConnectionInfo,
    tables: IndexMap<String, SnapshotTable>,
    views: IndexMap<String, ViewDef>,
    generators: Vec<Generator>,
}

/// [`SchemaProvider`] backed by a JSON snapshot.
#[derive(Debug)]
pub struct SnapshotProvider {
    source: SnapshotSource,
    loaded: Option<Loaded>,
}

impl SnapshotProvider {
    /// Provider for a snapshot file. The file is read on [`SchemaProvider::connect`].
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            source: SnapshotSource::File(path.into()),
            loaded: None,
        }
    }

    /// Provider for an in-memory snapshot document.
    pub fn from_json(json: impl Into<String>) -> Self {
        Self {
            source: SnapshotSource::Inline(json.into()),
            loaded: None,
        }
    }

    fn label(&self) -> String {
        match &self.source {
            SnapshotSource::File(path) => path.display().to_string(),
            SnapshotSource::Inline(_) => "<inline snapshot>".to_string(),
        }
    }

    fn read(&self) -> Result<Snapshot> {
        let json = match &self.source {
            SnapshotSource::File(path) => std::fs::read_to_string(path).map_err(|e| {
                ConvertError::Connection(format!("Cannot read snapshot {}: {}", path.display(), e))
            })?,
            SnapshotSource::Inline(json) => json.clone(),
        };
        let snapshot = Snapshot::from_json(&json).map_err(|e| {
            ConvertError::Connection(format!("Snapshot {} is not readable: {}", self.label(), e))
        })?;
        snapshot.validate().map_err(|e| {
            ConvertError::Connection(format!("Snapshot {} is invalid: {}", self.label(), e))
        })?;
        Ok(snapshot)
    }

    fn loaded(&self) -> Result<&Loaded> {
        self.loaded.as_ref().ok_or_else(|| {
            ConvertError::provider("Snapshot not loaded", "connect() must be called first")
        })
    }

    fn table(&self, name: &str) -> Result<&SnapshotTable> {
        self.loaded()?
            .tables
            .get(&name.to_lowercase())
            .ok_or_else(|| ConvertError::provider(format!("Table {} not found", name), self.label()))
    }
}

impl SchemaProvider for SnapshotProvider {
    fn connect(&mut self) -> Result<ConnectionInfo> {
        let snapshot = self.read()?;

        let mut tables = IndexMap::with_capacity(snapshot.tables.len());
        for mut table in snapshot.tables {
            table.schema.row_count = table.rows.len() as u64;
            tables.insert(table.schema.name.to_lowercase(), table);
        }
        let views: IndexMap<String, ViewDef> = snapshot
            .views
            .into_iter()
            .map(|v| (v.name.to_lowercase(), v))
            .collect();

        let info = ConnectionInfo {
            database: snapshot.database,
            server_version: snapshot.server_version,
            charset: snapshot.charset,
            table_count: tables.len(),
            view_count: views.len(),
            generator_count: snapshot.generators.len(),
        };
        info!(
            "Loaded snapshot {}: {} tables, {} views, {} generators",
            self.label(),
            info.table_count,
            info.view_count,
            info.generator_count
        );

        self.loaded = Some(Loaded {
            info: info.clone(),
            tables,
            views,
            generators: snapshot.generators,
        });
        Ok(info)
    }

    fn list_tables(&self) -> Result<Vec<String>> {
        Ok(self
            .loaded()?
            .tables
            .values()
            .map(|t| t.schema.name.clone())
            .collect())
    }

    fn list_views(&self) -> Result<Vec<String>> {
        Ok(self.loaded()?.views.values().map(|v| v.name.clone()).collect())
    }

    fn list_generators(&self) -> Result<Vec<Generator>> {
        Ok(self.loaded()?.generators.clone())
    }

    fn table_schema(&self, table: &str) -> Result<TableSchema> {
        Ok(self.table(table)?.schema.clone())
    }

    fn row_count(&self, table: &str) -> Result<u64> {
        Ok(self.table(table)?.rows.len() as u64)
    }

    fn fetch_rows(&self, table: &str, offset: u64, limit: usize) -> Result<RowBatch> {
        let entry = self.table(table)?;
        let start = usize::try_from(offset).unwrap_or(usize::MAX);
        let batch: RowBatch = entry
            .rows
            .iter()
            .skip(start)
            .take(limit)
            .map(|raw| decode_row(raw, &entry.schema))
            .collect();
        debug!(
            "Fetched {} rows of {} at offset {}",
            batch.len(),
            entry.schema.name,
            offset
        );
        Ok(batch)
    }

    fn view_source(&self, view: &str) -> Result<Option<String>> {
        let loaded = self.loaded()?;
        loaded
            .views
            .get(&view.to_lowercase())
            .map(|v| v.source.clone())
            .ok_or_else(|| ConvertError::provider(format!("View {} not found", view), self.label()))
    }

    fn close(&mut self) {
        if let Some(loaded) = self.loaded.take() {
            debug!("Closed snapshot {}", loaded.info.database);
        }
    }
}

fn decode_row(raw: &Map<String, JsonValue>, schema: &TableSchema) -> Row {
    raw.iter()
        .map(|(name, value)| (name.clone(), SqlValue::from_json(value, schema.column(name))))
        .collect()
}
