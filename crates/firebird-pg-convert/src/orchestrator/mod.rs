//! Translation orchestrator - main workflow coordinator.
//!
//! Runs the phases against a [`SchemaProvider`] and assembles one script:
//! sequences, tables, views, data (parents first), then constraints and
//! indexes. Constraints come last so that data loads without FK checks.

mod stats;

pub use stats::{RunStatus, StageStats, TranslationResult, TranslationStats};

use std::collections::HashMap;
use std::fmt::Write as _;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::{Config, TableFilter};
use crate::core::{Generator, SchemaProvider, TableSchema, TypeMapper};
use crate::emit::{
    emit_column_comments, emit_constraints, emit_sequences, emit_table_with, emit_view,
    EmitOptions, REPLICATION_ROLE_DEFAULT, REPLICATION_ROLE_REPLICA, SESSION_SETTINGS,
};
use crate::error::Result;
use crate::order::order_tables;
use crate::pipeline::{BatchPipeline, PipelineConfig};
use crate::typemap::FirebirdToPostgres;

/// Translation orchestrator.
pub struct Orchestrator<P: SchemaProvider> {
    config: Config,
    provider: P,
    mapper: Box<dyn TypeMapper + Send + Sync>,
    filter: TableFilter,
}

/// Objects listed from the provider after filtering.
#[derive(Debug, Default)]
struct Catalog {
    tables: Vec<String>,
    views: Vec<String>,
    generators: Vec<Generator>,
}

impl<P: SchemaProvider> Orchestrator<P> {
    /// Create an orchestrator. The configuration is validated here.
    pub fn new(config: Config, provider: P) -> Result<Self> {
        config.validate()?;
        let filter = TableFilter::from_config(&config.translation)?;
        Ok(Self {
            config,
            provider,
            mapper: Box::new(FirebirdToPostgres),
            filter,
        })
    }

    /// Replace the column type mapper.
    pub fn with_type_mapper(mut self, mapper: Box<dyn TypeMapper + Send + Sync>) -> Self {
        self.mapper = mapper;
        self
    }

    /// Run the translation.
    ///
    /// Never fails outright: connection problems, per-object failures and
    /// cancellation are all recorded in the returned statistics.
    pub fn run(mut self, cancel: Option<CancellationToken>) -> TranslationResult {
        let cancel = cancel.unwrap_or_default();
        let mut stats = TranslationStats::new();
        let label = self.config.source.display_label();
        info!("Starting translation run: {}", stats.run_id);

        info!("Phase 1: Connecting to source {}", label);
        let conn = match self.provider.connect() {
            Ok(info) => info,
            Err(e) => {
                let msg = format!("Failed to connect to source {}: {}", label, e);
                error!("{}", msg);
                stats.errors.push(msg);
                stats.finish(Some(RunStatus::ConnectionFailed));
                return TranslationResult {
                    sql: String::new(),
                    stats,
                };
            }
        };
        info!(
            "Connected to Firebird {} (charset {})",
            if conn.server_version.is_empty() { "unknown" } else { conn.server_version.as_str() },
            if conn.charset.is_empty() { "unknown" } else { conn.charset.as_str() }
        );

        let mut body = String::new();
        let mut cancelled = false;

        'phases: {
            info!("Phase 2: Listing source objects");
            let catalog = self.list_objects(&mut stats);
            if check_cancel(&cancel, &mut cancelled) {
                break 'phases;
            }

            info!("Phase 3: Sequences");
            let stage = self.sequences(&catalog.generators, &mut body);
            stats.absorb(stage);
            if check_cancel(&cancel, &mut cancelled) {
                break 'phases;
            }

            info!("Phase 4: Tables");
            let (schemas, stage) = self.tables(&catalog.tables, &mut body, &cancel);
            stats.absorb(stage);
            if check_cancel(&cancel, &mut cancelled) {
                break 'phases;
            }

            info!("Phase 5: Views");
            let stage = self.views(&catalog.views, &mut body);
            stats.absorb(stage);
            if check_cancel(&cancel, &mut cancelled) {
                break 'phases;
            }

            if self.config.translation.include_data {
                if stats.errors.is_empty() {
                    info!("Phase 6: Data");
                    let stage = self.data(&schemas, &mut body, &cancel);
                    stats.absorb(stage);
                    if check_cancel(&cancel, &mut cancelled) {
                        break 'phases;
                    }
                } else {
                    let msg = "Data generation skipped because of earlier errors".to_string();
                    warn!("{}", msg);
                    stats.warnings.push(msg);
                }
            }

            info!("Phase 7: Constraints and indexes");
            let stage = self.constraints(&schemas, &mut body);
            stats.absorb(stage);
        }

        self.provider.close();

        let status = if cancelled {
            warn!("Translation cancelled");
            stats.errors.push("Translation cancelled".to_string());
            Some(RunStatus::Cancelled)
        } else {
            None
        };
        stats.finish(status);

        let sql = self.assemble(&label, &body, &stats);
        info!(
            "Translation {}: {}/{} tables, {} rows in {:.1}s",
            stats.status,
            stats.processed_tables_schema,
            stats.total_tables,
            stats.processed_rows,
            stats.duration_seconds
        );
        TranslationResult { sql, stats }
    }

    fn list_objects(&self, stats: &mut TranslationStats) -> Catalog {
        let mut catalog = Catalog::default();

        match self.provider.list_tables() {
            Ok(tables) => {
                catalog.tables = tables
                    .into_iter()
                    .filter(|t| self.filter.matches(t))
                    .collect();
            }
            Err(e) => stats.errors.push(format!("Failed to list tables: {}", e)),
        }
        match self.provider.list_views() {
            Ok(views) => catalog.views = views,
            Err(e) => stats.errors.push(format!("Failed to list views: {}", e)),
        }
        match self.provider.list_generators() {
            Ok(generators) => catalog.generators = generators,
            Err(e) => stats.errors.push(format!("Failed to list generators: {}", e)),
        }

        stats.total_tables = catalog.tables.len();
        stats.total_views = catalog.views.len();
        stats.total_sequences = catalog.generators.len();

        for table in &catalog.tables {
            match self.provider.row_count(table) {
                Ok(count) => {
                    info!("Table {}: {} rows", table, count);
                    stats.total_rows += count;
                }
                Err(e) => warn!("Could not count rows of {}: {}", table, e),
            }
        }

        info!(
            "Found {} tables, {} views, {} generators",
            catalog.tables.len(),
            catalog.views.len(),
            catalog.generators.len()
        );
        catalog
    }

    fn sequences(&self, generators: &[Generator], out: &mut String) -> StageStats {
        let mut stage = StageStats::default();
        if generators.is_empty() {
            return stage;
        }
        out.push_str("-- SEQUENCES (converted from Firebird generators)\n\n");
        for statement in emit_sequences(generators) {
            out.push_str(&statement);
            out.push('\n');
        }
        out.push('\n');
        stage.processed_sequences = generators.len();
        info!("Processed {} sequences", generators.len());
        stage
    }

    fn tables(
        &self,
        tables: &[String],
        out: &mut String,
        cancel: &CancellationToken,
    ) -> (Vec<TableSchema>, StageStats) {
        let mut stage = StageStats::default();
        let mut schemas = Vec::with_capacity(tables.len());
        out.push_str("-- TABLES\n\n");

        for table in tables {
            if cancel.is_cancelled() {
                break;
            }
            let schema = match self.provider.table_schema(table) {
                Ok(schema) => schema,
                Err(e) => {
                    let msg = format!("Failed to read schema of table {}: {}", table, e);
                    error!("{}", msg);
                    stage.errors.push(msg);
                    continue;
                }
            };

            let ddl = emit_table_with(&schema, self.mapper.as_ref());
            let _ = writeln!(out, "-- Table: {} ({} rows)", schema.name, schema.row_count);
            out.push_str(&ddl.sql);
            out.push('\n');
            for comment in emit_column_comments(&schema) {
                out.push_str(&comment);
                out.push('\n');
            }
            out.push('\n');

            for w in &ddl.warnings {
                warn!("{}", w);
            }
            stage.warnings.extend(ddl.warnings);
            stage.processed_tables_schema += 1;
            schemas.push(schema);
        }

        (schemas, stage)
    }

    fn views(&self, views: &[String], out: &mut String) -> StageStats {
        let mut stage = StageStats::default();
        if views.is_empty() {
            return stage;
        }
        out.push_str("-- VIEWS\n\n");

        for view in views {
            match self.provider.view_source(view) {
                Ok(Some(source)) if !source.trim().is_empty() => {
                    let _ = writeln!(out, "-- View: {}", view);
                    out.push_str(&emit_view(view, &source));
                    out.push_str("\n\n");
                    stage.processed_views += 1;
                    stage
                        .warnings
                        .push(format!("View {} converted; review its syntax", view));
                }
                Ok(_) => {
                    stage
                        .warnings
                        .push(format!("Could not read the definition of view {}", view));
                }
                Err(e) => {
                    let msg = format!("Failed to convert view {}: {}", view, e);
                    error!("{}", msg);
                    stage.errors.push(msg);
                }
            }
        }
        stage
    }

    fn data(
        &self,
        schemas: &[TableSchema],
        out: &mut String,
        cancel: &CancellationToken,
    ) -> StageStats {
        let mut stage = StageStats::default();
        let by_name: HashMap<String, &TableSchema> = schemas
            .iter()
            .map(|s| (s.name.to_lowercase(), s))
            .collect();
        let names: Vec<String> = schemas.iter().map(|s| s.name.clone()).collect();

        let ordered = order_tables(&names, |table| {
            by_name
                .get(&table.to_lowercase())
                .map(|s| {
                    s.referenced_tables()
                        .into_iter()
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default()
        });
        stage.warnings.extend(ordered.warnings);

        let pipeline = BatchPipeline::new(PipelineConfig::from_config(&self.config.translation));
        out.push_str("-- DATA\n\n");

        for table in &ordered.order {
            if cancel.is_cancelled() {
                break;
            }
            let Some(schema) = by_name.get(&table.to_lowercase()) else {
                continue;
            };
            match pipeline.render_table(&self.provider, schema, out) {
                Ok(outcome) => {
                    stage.processed_rows += outcome.rows_written;
                    if outcome.rows_written > 0 {
                        stage.processed_tables_data += 1;
                    }
                    if outcome.validation_warnings > 0 {
                        stage.warnings.push(format!(
                            "Table {}: {} data validation warnings",
                            table, outcome.validation_warnings
                        ));
                    }
                }
                Err(e) => {
                    let msg = format!("Data of table {} failed: {}", table, e);
                    error!("{}", msg);
                    stage.errors.push(msg);
                }
            }
        }
        stage
    }

    fn constraints(&self, schemas: &[TableSchema], out: &mut String) -> StageStats {
        let mut stage = StageStats::default();
        let options = EmitOptions::from_config(&self.config.translation);
        let mut header_written = false;

        for schema in schemas {
            let statements = emit_constraints(schema, options);
            if statements.is_empty() {
                continue;
            }
            if !header_written {
                out.push_str("-- CONSTRAINTS AND INDEXES\n\n");
                header_written = true;
            }
            let _ = writeln!(out, "-- Constraints and indexes for table: {}", schema.name);
            for statement in &statements {
                out.push_str(statement);
                out.push('\n');
            }
            out.push('\n');
            stage.processed_constraints += statements.len();
        }
        stage
    }

    fn assemble(&self, label: &str, body: &str, stats: &TranslationStats) -> String {
        let t = &self.config.translation;
        let mut sql = String::with_capacity(body.len() + 2048);

        sql.push_str("-- PostgreSQL Database Schema and Data\n");
        let _ = writeln!(sql, "-- Converted from Firebird database: {}", label);
        let _ = writeln!(
            sql,
            "-- Generated at: {}",
            Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
        );
        let _ = writeln!(sql, "-- Include data: {}", t.include_data);
        let _ = writeln!(sql, "-- Batch size: {}", t.batch_size);
        let _ = writeln!(sql, "-- Data format: {}", t.data_format);
        let _ = writeln!(sql, "-- Config hash: {}", self.config.hash());
        sql.push_str("--\n");
        sql.push_str("-- Review all triggers and stored procedures manually before production use.\n");
        sql.push_str("--\n\n");

        for setting in SESSION_SETTINGS {
            sql.push_str(setting);
            sql.push('\n');
        }
        sql.push_str("\n-- Disable triggers and foreign key checks while loading\n");
        sql.push_str(REPLICATION_ROLE_REPLICA);
        sql.push_str("\n\n");

        sql.push_str(body);

        sql.push_str("-- Re-enable triggers and foreign key checks\n");
        sql.push_str(REPLICATION_ROLE_DEFAULT);
        sql.push_str("\n\n");
        sql.push_str("-- Translation statistics:\n");
        let _ = writeln!(
            sql,
            "-- Tables processed: {}/{}",
            stats.processed_tables_schema, stats.total_tables
        );
        let _ = writeln!(
            sql,
            "-- Data rows written: {}/{}",
            stats.processed_rows, stats.total_rows
        );
        let _ = writeln!(
            sql,
            "-- Sequences created: {}/{}",
            stats.processed_sequences, stats.total_sequences
        );
        let _ = writeln!(
            sql,
            "-- Views created: {}/{}",
            stats.processed_views, stats.total_views
        );
        let _ = writeln!(sql, "-- Constraints created: {}", stats.processed_constraints);
        let _ = writeln!(sql, "-- Errors: {}", stats.errors.len());
        let _ = writeln!(sql, "-- Warnings: {}", stats.warnings.len());
        sql.push_str("\n-- End of script\n");
        sql
    }
}

fn check_cancel(cancel: &CancellationToken, cancelled: &mut bool) -> bool {
    if cancel.is_cancelled() {
        *cancelled = true;
    }
    *cancelled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DataFormat;
    use crate::core::{ConnectionInfo, RowBatch};
    use crate::error::ConvertError;
    use crate::provider::SnapshotProvider;

    const SNAPSHOT: &str = r#"{
        "database": "SHOP.FDB",
        "server_version": "3.0.10",
        "charset": "UTF8",
        "tables": [
            {
                "name": "ORDERS",
                "columns": [
                    {"name": "ID", "type": 8, "nullable": false, "position": 0},
                    {"name": "CUSTOMER_ID", "type": 8, "position": 1}
                ],
                "primary_key": ["ID"],
                "foreign_keys": [
                    {"name": "FK_ORDERS_CUSTOMER", "columns": ["CUSTOMER_ID"],
                     "ref_table": "CUSTOMERS", "ref_columns": ["ID"], "on_delete": "CASCADE"}
                ],
                "rows": [{"ID": 10, "CUSTOMER_ID": 1}]
            },
            {
                "name": "CUSTOMERS",
                "columns": [
                    {"name": "ID", "type": 8, "nullable": false, "position": 0},
                    {"name": "NAME", "type": 37, "length": 50, "position": 1,
                     "description": "Display name"},
                    {"name": "PRICE", "type": 16, "precision": 10, "scale": -2, "position": 2}
                ],
                "primary_key": ["ID"],
                "rows": [
                    {"ID": 1, "NAME": "O'Neil", "PRICE": "12.50"},
                    {"ID": 2, "NAME": null, "PRICE": null}
                ]
            },
            {
                "name": "AUDIT_LOG",
                "columns": [{"name": "ID", "type": 8, "position": 0}],
                "rows": []
            }
        ],
        "views": [
            {"name": "V_BIG_ORDERS", "source": "SELECT ID FROM ORDERS WHERE ID > 5"},
            {"name": "V_EMPTY", "source": null}
        ],
        "generators": [{"name": "GEN_ORDERS", "current_value": 10}]
    }"#;

    fn run_with(config: Config) -> TranslationResult {
        Orchestrator::new(config, SnapshotProvider::from_json(SNAPSHOT))
            .unwrap()
            .run(None)
    }

    #[test]
    fn test_full_run() {
        let result = run_with(Config::default());
        let sql = &result.sql;
        let stats = &result.stats;

        assert_eq!(stats.status, RunStatus::Completed, "{:?}", stats.errors);
        assert_eq!(stats.total_tables, 3);
        assert_eq!(stats.processed_tables_schema, 3);
        assert_eq!(stats.total_rows, 3);
        assert_eq!(stats.processed_rows, 3);
        assert_eq!(stats.processed_tables_data, 2);
        assert_eq!(stats.processed_sequences, 1);
        assert_eq!(stats.processed_views, 1);
        assert!(stats
            .warnings
            .contains(&"Could not read the definition of view V_EMPTY".to_string()));

        assert!(sql.contains("    \"id\" integer NOT NULL"));
        assert!(sql.contains("    \"name\" varchar(50)"));
        assert!(sql.contains("    \"price\" numeric(10,2)"));
        assert!(sql.contains("COMMENT ON COLUMN \"customers\".\"name\" IS 'Display name';"));
        assert!(sql.contains("(1, 'O''Neil', 12.50)"));
        assert!(sql.contains("(2, NULL, NULL)"));
        assert!(sql.contains("CREATE SEQUENCE \"gen_orders\";"));
        assert!(sql.contains("CREATE OR REPLACE VIEW \"v_big_orders\" AS"));
        assert!(sql.contains("-- Table AUDIT_LOG is empty"));

        // parents load before children; constraints follow the data
        let customers = sql.find("-- Data for table CUSTOMERS").unwrap();
        let orders = sql.find("-- Data for table ORDERS").unwrap();
        let fk = sql.find("FOREIGN KEY").unwrap();
        assert!(customers < orders);
        assert!(orders < fk);
        assert!(sql.contains("ON DELETE CASCADE"));

        assert!(sql.contains("SET session_replication_role = replica;"));
        assert!(sql.contains("SET session_replication_role = DEFAULT;"));
        assert!(sql.contains("-- Tables processed: 3/3"));
        assert!(sql.ends_with("-- End of script\n"));
    }

    #[test]
    fn test_output_deterministic_apart_from_timestamp() {
        let strip = |sql: String| -> String {
            sql.lines()
                .filter(|l| !l.starts_with("-- Generated at:"))
                .collect::<Vec<_>>()
                .join("\n")
        };
        assert_eq!(
            strip(run_with(Config::default()).sql),
            strip(run_with(Config::default()).sql)
        );
    }

    #[test]
    fn test_copy_format_and_no_constraints() {
        let mut config = Config::default();
        config.translation.data_format = DataFormat::Copy;
        config.translation.create_foreign_keys = false;
        let result = run_with(config);
        assert!(result.sql.contains("COPY \"customers\" (\"id\", \"name\", \"price\") FROM STDIN"));
        assert!(result.sql.contains("2,\\N,\\N"));
        assert!(!result.sql.contains("FOREIGN KEY"));
    }

    #[test]
    fn test_schema_only() {
        let mut config = Config::default();
        config.translation.include_data = false;
        let result = run_with(config);
        assert!(result.is_success());
        assert_eq!(result.stats.processed_rows, 0);
        assert!(!result.sql.contains("INSERT INTO"));
    }

    #[test]
    fn test_table_filter() {
        let mut config = Config::default();
        config.translation.exclude_tables = vec!["audit_*".to_string()];
        let result = run_with(config);
        assert_eq!(result.stats.total_tables, 2);
        assert!(!result.sql.contains("audit_log"));
    }

    #[test]
    fn test_connection_failure() {
        let result = Orchestrator::new(Config::default(), SnapshotProvider::new("/missing.json"))
            .unwrap()
            .run(None);
        assert_eq!(result.sql, "");
        assert_eq!(result.stats.status, RunStatus::ConnectionFailed);
        assert_eq!(result.stats.errors.len(), 1);
        assert_eq!(result.stats.status.exit_code(), 2);
    }

    #[test]
    fn test_cancelled_run() {
        let token = CancellationToken::new();
        token.cancel();
        let result = Orchestrator::new(Config::default(), SnapshotProvider::from_json(SNAPSHOT))
            .unwrap()
            .run(Some(token));
        assert_eq!(result.stats.status, RunStatus::Cancelled);
        assert_eq!(result.stats.errors, vec!["Translation cancelled".to_string()]);
        assert!(result.sql.contains("SET session_replication_role = replica;"));
        assert!(!result.sql.contains("CREATE TABLE"));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = Config::default();
        config.translation.batch_size = 0;
        assert!(Orchestrator::new(config, SnapshotProvider::from_json(SNAPSHOT)).is_err());
    }

    /// Serves one table whose rows cannot be fetched.
    struct BrokenRows;

    impl SchemaProvider for BrokenRows {
        fn connect(&mut self) -> Result<ConnectionInfo> {
            Ok(ConnectionInfo::default())
        }
        fn list_tables(&self) -> Result<Vec<String>> {
            Ok(vec!["T".to_string()])
        }
        fn list_views(&self) -> Result<Vec<String>> {
            Ok(vec![])
        }
        fn list_generators(&self) -> Result<Vec<Generator>> {
            Ok(vec![])
        }
        fn table_schema(&self, table: &str) -> Result<TableSchema> {
            Ok(TableSchema {
                name: table.to_string(),
                columns: vec![],
                primary_key: vec![],
                indexes: vec![],
                foreign_keys: vec![],
                check_constraints: vec![],
                row_count: 5,
            })
        }
        fn row_count(&self, _table: &str) -> Result<u64> {
            Ok(5)
        }
        fn fetch_rows(&self, _table: &str, _offset: u64, _limit: usize) -> Result<RowBatch> {
            Err(ConvertError::provider("read timeout", "fetch_rows"))
        }
        fn view_source(&self, _view: &str) -> Result<Option<String>> {
            Ok(None)
        }
    }

    #[test]
    fn test_batch_failure_recorded_per_table() {
        let result = Orchestrator::new(Config::default(), BrokenRows)
            .unwrap()
            .run(None);
        assert_eq!(result.stats.status, RunStatus::CompletedWithErrors);
        assert_eq!(result.stats.errors.len(), 1);
        assert!(result.stats.errors[0].contains("Data of table T failed"));
        assert!(result.sql.contains("-- ERROR: Failed to fetch rows 1 to 5 of T"));
    }
}
