//! # firebird-pg-convert
//!
//! Firebird to PostgreSQL translation library.
//!
//! This library turns a Firebird database, or a Firebird SQL script, into a
//! PostgreSQL script with support for:
//!
//! - **Schema translation** of columns, defaults, keys, indexes and checks
//! - **Data export** as multi-row INSERT or `COPY ... FROM STDIN` blocks
//! - **Dependency ordering** so parent tables load before their children
//! - **Script transpiling** of DDL, triggers and procedures to PL/pgSQL
//! - **Snapshots** as a JSON stand-in for a live Firebird connection
//!
//! ## Example
//!
//! ```rust,no_run
//! use firebird_pg_convert::{provider, Config, Orchestrator};
//!
//! fn main() -> firebird_pg_convert::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let source = provider::from_source_config(&config.source)?;
//!     let result = Orchestrator::new(config, source)?.run(None);
//!     println!("{}", result.sql);
//!     eprintln!("{}", result.report());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod defaults;
pub mod emit;
pub mod error;
pub mod orchestrator;
pub mod order;
pub mod pipeline;
pub mod provider;
pub mod serialize;
pub mod transpile;
pub mod typemap;

// Re-exports for convenient access
pub use config::{Config, DataFormat, SourceConfig, TableFilter, TranslationConfig};
pub use crate::core::{Column, SchemaProvider, SqlValue, TableSchema, TypeMapper, TypeMapping};
pub use error::{ConvertError, Result};
pub use orchestrator::{Orchestrator, RunStatus, TranslationResult, TranslationStats};
pub use pipeline::{BatchPipeline, PipelineConfig};
pub use provider::SnapshotProvider;
pub use transpile::{DialectTranspiler, TranspileOutput, TranspileStats};
pub use typemap::FirebirdToPostgres;
