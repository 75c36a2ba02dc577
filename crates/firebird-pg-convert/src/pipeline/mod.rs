//! Paged data rendering.
//!
//! - [`BatchPipeline`]: pulls rows from a provider page by page and writes
//!   INSERT or COPY text into an output buffer
//! - [`PipelineConfig`]: immutable settings for one run
//! - [`validate_batch`]: schema checks reported as comments before each page
//!
//! The pipeline is synchronous and pull-based. A page is rendered and then
//! dropped before the next one is fetched, so memory stays bounded by the
//! page size.

mod render;
mod validate;

use std::fmt::Write as _;

use tracing::{debug, info, warn};

use crate::config::{DataFormat, TranslationConfig};
use crate::core::{SchemaProvider, TableSchema};
use crate::error::{ConvertError, Result};

pub use render::{page_columns, render_copy, render_inserts};
pub use validate::validate_batch;

/// Settings for [`BatchPipeline`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Rows per provider page.
    pub batch_size: usize,

    /// INSERT or COPY.
    pub format: DataFormat,

    /// Wrap each table in BEGIN/COMMIT.
    pub wrap_transactions: bool,

    /// Run [`validate_batch`] on every page.
    pub validate: bool,

    /// Rows per INSERT statement.
    pub insert_chunk_size: usize,

    /// Validation warnings written per page before summarizing.
    pub max_batch_warnings: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from_config(&TranslationConfig::default())
    }
}

impl PipelineConfig {
    pub fn from_config(config: &TranslationConfig) -> Self {
        Self {
            batch_size: config.batch_size.max(1),
            format: config.data_format,
            wrap_transactions: config.wrap_transactions,
            validate: config.validate_data,
            insert_chunk_size: config.get_insert_chunk_size(),
            max_batch_warnings: config.max_batch_warnings,
        }
    }

    /// Set the page size. The INSERT chunk size is re-derived from it.
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self.insert_chunk_size = (self.batch_size / 4).min(500).max(1);
        self
    }

    pub fn with_format(mut self, format: DataFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_wrap_transactions(mut self, enabled: bool) -> Self {
        self.wrap_transactions = enabled;
        self
    }

    pub fn with_validation(mut self, enabled: bool) -> Self {
        self.validate = enabled;
        self
    }
}

/// What happened while rendering one table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableOutcome {
    pub table: String,
    pub rows_written: u64,
    pub batches: usize,
    /// Validation problems found, including those not written out.
    pub validation_warnings: usize,
}

/// Renders table data page by page.
#[derive(Debug, Clone, Default)]
pub struct BatchPipeline {
    config: PipelineConfig,
}

impl BatchPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Render every row of `schema.name` into `out`.
    ///
    /// On a provider failure the text written so far stays in `out`, followed
    /// by `ROLLBACK;` (when wrapping) and an error comment.
    pub fn render_table<P>(
        &self,
        provider: &P,
        schema: &TableSchema,
        out: &mut String,
    ) -> Result<TableOutcome>
    where
        P: SchemaProvider + ?Sized,
    {
        let table = schema.name.as_str();
        let mut outcome = TableOutcome {
            table: table.to_string(),
            ..TableOutcome::default()
        };

        let total = match provider.row_count(table) {
            Ok(n) => n,
            Err(e) => {
                let _ = writeln!(out, "-- ERROR: Could not count rows of {}: {}", table, e);
                return Err(ConvertError::batch(table, 0, 0, e.to_string()));
            }
        };

        if total == 0 {
            let _ = writeln!(out, "-- Table {} is empty\n", table);
            debug!("Table {} is empty", table);
            return Ok(outcome);
        }

        let _ = writeln!(out, "-- Data for table {} ({} rows)", table, total);
        if self.config.wrap_transactions {
            out.push_str("BEGIN;\n");
        }
        out.push('\n');

        let page = self.config.batch_size as u64;
        let mut offset: u64 = 0;

        while offset < total {
            let last_expected = (offset + page).min(total);
            let rows = match provider.fetch_rows(table, offset, self.config.batch_size) {
                Ok(rows) => rows,
                Err(e) => {
                    if self.config.wrap_transactions {
                        out.push_str("ROLLBACK;\n");
                    }
                    let _ = writeln!(
                        out,
                        "-- ERROR: Failed to fetch rows {} to {} of {}: {}\n",
                        offset + 1,
                        last_expected,
                        table,
                        e
                    );
                    warn!(
                        "Batch failed for {} at rows {}-{}: {}",
                        table,
                        offset + 1,
                        last_expected,
                        e
                    );
                    return Err(ConvertError::batch(
                        table,
                        offset + 1,
                        last_expected,
                        e.to_string(),
                    ));
                }
            };

            if rows.is_empty() {
                debug!("{}: provider exhausted at offset {}", table, offset);
                break;
            }

            outcome.batches += 1;
            let first = offset + 1;
            let last = offset + rows.len() as u64;

            if self.config.validate {
                let warnings = validate_batch(&rows, schema);
                outcome.validation_warnings += warnings.len();
                self.write_warnings(out, &warnings);
            }

            let _ = writeln!(out, "-- Batch {}: rows {} to {}", outcome.batches, first, last);
            let body = match self.config.format {
                DataFormat::Insert => render_inserts(&rows, schema, self.config.insert_chunk_size),
                DataFormat::Copy => render_copy(&rows, schema),
            };
            out.push_str(&body);
            out.push_str("\n\n");

            outcome.rows_written += rows.len() as u64;
            offset += page;
        }

        if self.config.wrap_transactions {
            out.push_str("COMMIT;\n");
        }
        let _ = writeln!(
            out,
            "-- Table {} done: {} rows\n",
            table, outcome.rows_written
        );

        info!(
            "Rendered {} rows of {} in {} batches",
            outcome.rows_written, table, outcome.batches
        );
        Ok(outcome)
    }

    fn write_warnings(&self, out: &mut String, warnings: &[String]) {
        let shown = warnings.len().min(self.config.max_batch_warnings);
        for w in &warnings[..shown] {
            let _ = writeln!(out, "-- WARNING: {}", w);
        }
        if warnings.len() > shown {
            let _ = writeln!(out, "-- ... and {} more warnings", warnings.len() - shown);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Column, ConnectionInfo, Generator, Row, RowBatch, SqlValue};
    use std::cell::Cell;

    struct CountingProvider {
        schema: TableSchema,
        rows: Vec<Row>,
        calls: Cell<usize>,
        fail_at_offset: Option<u64>,
    }

    impl CountingProvider {
        fn new(n: usize) -> Self {
            let rows = (0..n)
                .map(|i| {
                    let mut r = Row::new();
                    r.insert("ID".to_string(), SqlValue::I64(i as i64 + 1));
                    r.insert("NAME".to_string(), SqlValue::from(format!("n{}", i)));
                    r
                })
                .collect();
            Self {
                schema: schema(),
                rows,
                calls: Cell::new(0),
                fail_at_offset: None,
            }
        }
    }

    impl SchemaProvider for CountingProvider {
        fn connect(&mut self) -> Result<ConnectionInfo> {
            Ok(ConnectionInfo::default())
        }
        fn list_tables(&self) -> Result<Vec<String>> {
            Ok(vec![self.schema.name.clone()])
        }
        fn list_views(&self) -> Result<Vec<String>> {
            Ok(vec![])
        }
        fn list_generators(&self) -> Result<Vec<Generator>> {
            Ok(vec![])
        }
        fn table_schema(&self, _table: &str) -> Result<TableSchema> {
            Ok(self.schema.clone())
        }
        fn row_count(&self, _table: &str) -> Result<u64> {
            Ok(self.rows.len() as u64)
        }
        fn fetch_rows(&self, _table: &str, offset: u64, limit: usize) -> Result<RowBatch> {
            self.calls.set(self.calls.get() + 1);
            if self.fail_at_offset == Some(offset) {
                return Err(ConvertError::provider("connection reset", "fetch_rows"));
            }
            let start = (offset as usize).min(self.rows.len());
            let end = (start + limit).min(self.rows.len());
            Ok(self.rows[start..end].to_vec())
        }
        fn view_source(&self, _view: &str) -> Result<Option<String>> {
            Ok(None)
        }
    }

    fn schema() -> TableSchema {
        let col = |name: &str, type_code: i16, position: i32| Column {
            name: name.to_string(),
            type_code,
            length: 2,
            precision: 0,
            scale: 0,
            subtype: None,
            nullable: false,
            default: None,
            position,
            description: None,
        };
        TableSchema {
            name: "ITEMS".to_string(),
            columns: vec![col("ID", 8, 0), col("NAME", 37, 1)],
            primary_key: vec!["ID".to_string()],
            indexes: vec![],
            foreign_keys: vec![],
            check_constraints: vec![],
            row_count: 0,
        }
    }

    fn pipeline(batch_size: usize) -> BatchPipeline {
        BatchPipeline::new(
            PipelineConfig::default()
                .with_batch_size(batch_size)
                .with_validation(false),
        )
    }

    #[test]
    fn test_call_count_is_ceiling_of_rows_over_page() {
        for (n, p) in [(10, 3), (9, 3), (1, 1000), (1000, 1000), (1001, 1000)] {
            let provider = CountingProvider::new(n);
            let mut out = String::new();
            let outcome = pipeline(p)
                .render_table(&provider, &provider.schema, &mut out)
                .unwrap();
            assert_eq!(provider.calls.get(), n.div_ceil(p), "n={} p={}", n, p);
            assert_eq!(outcome.rows_written, n as u64);
            assert_eq!(out.matches("  (").count(), n);
        }
    }

    #[test]
    fn test_empty_table() {
        let provider = CountingProvider::new(0);
        let mut out = String::new();
        let outcome = pipeline(10)
            .render_table(&provider, &provider.schema, &mut out)
            .unwrap();
        assert_eq!(outcome.rows_written, 0);
        assert_eq!(provider.calls.get(), 0);
        assert!(out.contains("-- Table ITEMS is empty"));
    }

    #[test]
    fn test_comment_structure() {
        let provider = CountingProvider::new(4);
        let mut out = String::new();
        pipeline(2)
            .render_table(&provider, &provider.schema, &mut out)
            .unwrap();
        assert!(out.starts_with("-- Data for table ITEMS (4 rows)\n"));
        assert!(out.contains("-- Batch 1: rows 1 to 2\n"));
        assert!(out.contains("-- Batch 2: rows 3 to 4\n"));
        assert!(out.contains("-- Table ITEMS done: 4 rows"));
    }

    #[test]
    fn test_wrapped_transactions() {
        let provider = CountingProvider::new(3);
        let mut out = String::new();
        BatchPipeline::new(PipelineConfig::default().with_wrap_transactions(true))
            .render_table(&provider, &provider.schema, &mut out)
            .unwrap();
        assert!(out.contains("BEGIN;\n"));
        assert!(out.contains("COMMIT;\n"));
    }

    #[test]
    fn test_copy_format() {
        let provider = CountingProvider::new(2);
        let mut out = String::new();
        BatchPipeline::new(
            PipelineConfig::default()
                .with_format(DataFormat::Copy)
                .with_validation(false),
        )
        .render_table(&provider, &provider.schema, &mut out)
        .unwrap();
        assert!(out.contains("COPY \"items\" (\"id\", \"name\") FROM STDIN"));
        assert!(out.contains("1,\"n0\"\n2,\"n1\"\n\\."));
    }

    #[test]
    fn test_validation_warnings_are_capped() {
        let mut provider = CountingProvider::new(8);
        for row in &mut provider.rows {
            row.insert("NAME".to_string(), SqlValue::Null);
        }
        let mut config = PipelineConfig::default();
        config.max_batch_warnings = 2;

        let mut out = String::new();
        let outcome = BatchPipeline::new(config)
            .render_table(&provider, &provider.schema, &mut out)
            .unwrap();
        assert_eq!(outcome.validation_warnings, 8);
        assert_eq!(out.matches("-- WARNING:").count(), 2);
        assert!(out.contains("-- ... and 6 more warnings"));
    }

    #[test]
    fn test_provider_failure_keeps_partial_output() {
        let mut provider = CountingProvider::new(6);
        provider.fail_at_offset = Some(2);
        let mut out = String::new();
        let err = BatchPipeline::new(
            PipelineConfig::default()
                .with_batch_size(2)
                .with_wrap_transactions(true),
        )
        .render_table(&provider, &provider.schema, &mut out)
        .unwrap_err();

        match err {
            ConvertError::Batch {
                table,
                first_row,
                last_row,
                ..
            } => {
                assert_eq!(table, "ITEMS");
                assert_eq!(first_row, 3);
                assert_eq!(last_row, 4);
            }
            other => panic!("expected batch error, got {:?}", other),
        }
        assert!(out.contains("-- Batch 1: rows 1 to 2"));
        assert!(out.contains("ROLLBACK;\n-- ERROR: Failed to fetch rows 3 to 4 of ITEMS"));
        assert!(!out.contains("COMMIT;"));
    }
}
