//! Run statistics and the translation result.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{
    Result, EXIT_CANCELLED, EXIT_CONNECTION_ERROR, EXIT_TRANSLATION_ERROR,
};

/// Entries listed per section in [`TranslationResult::report`].
const REPORT_LIMIT: usize = 10;

/// Final state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Still running, or never started.
    #[default]
    Running,
    /// Finished without errors.
    Completed,
    /// Finished, but some objects failed.
    CompletedWithErrors,
    /// Stopped by the cancellation token.
    Cancelled,
    /// The provider could not be reached; nothing was generated.
    ConnectionFailed,
}

impl RunStatus {
    /// Process exit code for this status.
    pub fn exit_code(self) -> u8 {
        match self {
            RunStatus::Running | RunStatus::Completed => 0,
            RunStatus::CompletedWithErrors => EXIT_TRANSLATION_ERROR,
            RunStatus::Cancelled => EXIT_CANCELLED,
            RunStatus::ConnectionFailed => EXIT_CONNECTION_ERROR,
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::CompletedWithErrors => "completed_with_errors",
            RunStatus::Cancelled => "cancelled",
            RunStatus::ConnectionFailed => "connection_failed",
        };
        f.write_str(s)
    }
}

/// Counts and messages from one phase, folded into [`TranslationStats`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageStats {
    pub processed_sequences: usize,
    pub processed_tables_schema: usize,
    pub processed_views: usize,
    pub processed_tables_data: usize,
    pub processed_rows: u64,
    pub processed_constraints: usize,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

/// Statistics for one translation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationStats {
    /// Unique run identifier.
    pub run_id: String,

    pub status: RunStatus,

    pub started_at: DateTime<Utc>,

    pub completed_at: Option<DateTime<Utc>>,

    /// Total duration in seconds.
    pub duration_seconds: f64,

    pub total_tables: usize,
    pub total_views: usize,
    pub total_sequences: usize,
    pub total_rows: u64,

    pub processed_tables_schema: usize,
    pub processed_tables_data: usize,
    pub processed_rows: u64,
    pub processed_sequences: usize,
    pub processed_views: usize,
    pub processed_constraints: usize,

    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl TranslationStats {
    /// Fresh statistics for a run starting now.
    pub fn new() -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            status: RunStatus::Running,
            started_at: Utc::now(),
            completed_at: None,
            duration_seconds: 0.0,
            total_tables: 0,
            total_views: 0,
            total_sequences: 0,
            total_rows: 0,
            processed_tables_schema: 0,
            processed_tables_data: 0,
            processed_rows: 0,
            processed_sequences: 0,
            processed_views: 0,
            processed_constraints: 0,
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Fold a phase's counts and messages in. Counts only ever grow.
    pub fn absorb(&mut self, stage: StageStats) {
        self.processed_sequences += stage.processed_sequences;
        self.processed_tables_schema += stage.processed_tables_schema;
        self.processed_views += stage.processed_views;
        self.processed_tables_data += stage.processed_tables_data;
        self.processed_rows += stage.processed_rows;
        self.processed_constraints += stage.processed_constraints;
        self.warnings.extend(stage.warnings);
        self.errors.extend(stage.errors);
    }

    /// Stamp the completion time and settle the status.
    pub fn finish(&mut self, status: Option<RunStatus>) {
        let completed_at = Utc::now();
        self.duration_seconds =
            (completed_at - self.started_at).num_milliseconds() as f64 / 1000.0;
        self.completed_at = Some(completed_at);
        self.status = status.unwrap_or(if self.errors.is_empty() {
            RunStatus::Completed
        } else {
            RunStatus::CompletedWithErrors
        });
    }
}

impl Default for TranslationStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Generated script plus run statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationResult {
    pub sql: String,
    pub stats: TranslationStats,
}

impl TranslationResult {
    /// True when the run finished with no errors.
    pub fn is_success(&self) -> bool {
        self.stats.status == RunStatus::Completed
    }

    /// Statistics as pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.stats)?)
    }

    /// Plain-text run report.
    pub fn report(&self) -> String {
        let s = &self.stats;
        let mut out = String::new();
        let _ = writeln!(out, "Firebird to PostgreSQL translation report");
        let _ = writeln!(out, "=========================================");
        let _ = writeln!(out, "Run: {}", s.run_id);
        let _ = writeln!(out, "Started: {}", s.started_at.format("%Y-%m-%d %H:%M:%S UTC"));
        let _ = writeln!(out, "Duration: {:.2}s", s.duration_seconds);
        let _ = writeln!(out, "Status: {}", s.status);
        let _ = writeln!(out);
        let _ = writeln!(out, "Objects:");
        let _ = writeln!(
            out,
            "- Tables: {}/{}",
            s.processed_tables_schema, s.total_tables
        );
        let _ = writeln!(out, "- Tables with data: {}", s.processed_tables_data);
        let _ = writeln!(out, "- Rows: {}/{}", s.processed_rows, s.total_rows);
        let _ = writeln!(
            out,
            "- Sequences: {}/{}",
            s.processed_sequences, s.total_sequences
        );
        let _ = writeln!(out, "- Views: {}/{}", s.processed_views, s.total_views);
        let _ = writeln!(out, "- Constraints and indexes: {}", s.processed_constraints);
        let _ = writeln!(out);
        let _ = writeln!(out, "Errors: {}", s.errors.len());
        let _ = writeln!(out, "Warnings: {}", s.warnings.len());

        write_list(&mut out, "Errors", "errors", &s.errors);
        write_list(&mut out, "Warnings", "warnings", &s.warnings);
        out
    }
}

fn write_list(out: &mut String, title: &str, noun: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    let _ = writeln!(out, "\n{}:", title);
    for (i, item) in items.iter().take(REPORT_LIMIT).enumerate() {
        let _ = writeln!(out, "{}. {}", i + 1, item);
    }
    if items.len() > REPORT_LIMIT {
        let _ = writeln!(out, "... and {} more {}", items.len() - REPORT_LIMIT, noun);
    }
}
