//! Firebird script to PostgreSQL script rewriting.
//!
//! The transpiler works purely on text. It never parses the script into a
//! tree; instead every stage operates on a masked copy in which comments are
//! gone and quoted regions are placeholders, so string literals and quoted
//! identifiers come out byte-for-byte as they went in.
//!
//! Stages, in order:
//!
//! 1. line ending normalization, region scanning and whitespace collapsing
//! 2. domain inlining ([`domains`])
//! 3. the named rewrite rule table ([`rules::RULES`])
//! 4. identifier normalization ([`identifiers`])
//! 5. trigger, procedure, external function, view and index blocks ([`blocks`])
//! 6. leftover type fixups ([`rules::TYPE_FIXUPS`])
//! 7. terminator cleanup, unmasking and the script header
//!
//! Faults never abort a run. Anything the transpiler cannot handle is left as
//! it was and reported in [`TranspileStats::warnings`].

pub mod blocks;
pub mod domains;
pub mod identifiers;
pub mod rules;
pub mod scanner;

use std::path::Path;

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::emit::SESSION_SETTINGS;
use crate::error::Result;

static BLANKS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+").expect("valid blank regex"));
static LINE_EDGES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r" ?\n ?").expect("valid line edge regex"));
static NEWLINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n+").expect("valid newline regex"));
static BLANK_LINES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n\s*\n\s*\n+").expect("valid blank line regex"));
static TERMINATED_CARET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r";\s*\^").expect("valid caret regex"));
static CARET: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]*\^[ \t]*").expect("valid caret regex"));
static CREATE_TABLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bCREATE\s+TABLE\b").expect("valid create table regex"));
static CREATE_SEQUENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bCREATE\s+SEQUENCE\b").expect("valid create sequence regex"));

/// Per-kind counts of objects the transpiler handled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConvertedObjects {
    pub tables: usize,
    pub sequences: usize,
    pub views: usize,
    pub triggers: usize,
    pub procedures: usize,
    pub functions: usize,
    pub indexes: usize,
    pub domains: usize,
}

/// Statistics for one transpiler run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TranspileStats {
    /// Line count of the input script.
    pub total_lines: usize,
    /// Names of the rewrite rules that fired, in the order they ran.
    pub rules_applied: Vec<String>,
    pub converted_objects: ConvertedObjects,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

/// Transpiled script and what happened while producing it.
#[derive(Debug, Clone, Serialize)]
pub struct TranspileOutput {
    pub sql: String,
    pub stats: TranspileStats,
}

/// Rewrites Firebird SQL scripts into PostgreSQL scripts.
#[derive(Debug, Clone)]
pub struct DialectTranspiler {
    include_header: bool,
}

impl Default for DialectTranspiler {
    fn default() -> Self {
        Self {
            include_header: true,
        }
    }
}

impl DialectTranspiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Omit the generated header and session settings.
    pub fn without_header(mut self) -> Self {
        self.include_header = false;
        self
    }

    /// Read and transpile a script file.
    pub fn transpile_file<P: AsRef<Path>>(&self, path: P) -> Result<TranspileOutput> {
        let script = std::fs::read_to_string(path.as_ref())?;
        Ok(self.transpile(&script))
    }

    /// Transpile a script.
    pub fn transpile(&self, script: &str) -> TranspileOutput {
        let mut stats = TranspileStats {
            total_lines: script.matches('\n').count() + 1,
            ..Default::default()
        };
        info!("Transpiling script ({} lines)", stats.total_lines);

        let normalized = script.replace("\r\n", "\n").replace('\r', "\n");
        let masked = scanner::mask(&normalized);
        if masked.unterminated_quote {
            stats.errors.push(
                "Script ends inside a quoted string; the remainder was passed through unchanged"
                    .to_string(),
            );
        }
        if masked.unterminated_comment {
            stats
                .warnings
                .push("Script ends inside a block comment; the comment was dropped".to_string());
        }
        debug!("Masked {} quoted regions", masked.literals.len());

        let text = collapse_whitespace(&masked.text);

        let domain_outcome = domains::inline_domains(&text);
        stats.converted_objects.domains = domain_outcome.inlined;
        stats.warnings.extend(domain_outcome.warnings);

        let (text, fired) = rules::apply_rules(&domain_outcome.text, &rules::RULES);
        stats.rules_applied.extend(fired.iter().map(|n| n.to_string()));

        let text = identifiers::normalize_identifiers(&text);
        let text = blocks::transform_blocks(&text, &mut stats);

        let (text, fired) = rules::apply_rules(&text, &rules::TYPE_FIXUPS);
        stats.rules_applied.extend(fired.iter().map(|n| n.to_string()));

        let text = BLANK_LINES.replace_all(&text, "\n\n");
        let text = TERMINATED_CARET.replace_all(&text, ";");
        let text = CARET.replace_all(&text, ";");
        stats.converted_objects.tables = CREATE_TABLE.find_iter(&text).count();
        stats.converted_objects.sequences = CREATE_SEQUENCE.find_iter(&text).count();

        let body = scanner::unmask(text.trim(), &masked.literals);
        let sql = if self.include_header {
            format!("{}{}\n", script_header(), body)
        } else {
            format!("{}\n", body)
        };

        for warning in &stats.warnings {
            warn!("{}", warning);
        }
        info!(
            "Transpiled {} rules, {} triggers, {} procedures, {} warnings",
            stats.rules_applied.len(),
            stats.converted_objects.triggers,
            stats.converted_objects.procedures,
            stats.warnings.len()
        );

        TranspileOutput { sql, stats }
    }
}

fn collapse_whitespace(text: &str) -> String {
    let text = BLANKS.replace_all(text, " ");
    let text = LINE_EDGES.replace_all(&text, "\n");
    let text = NEWLINES.replace_all(&text, "\n");
    text.trim().to_string()
}

fn script_header() -> String {
    let mut header = String::from("-- Firebird script converted to PostgreSQL\n");
    header.push_str(&format!(
        "-- Generated at: {}\n",
        Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    ));
    header.push_str("--\n-- Review all triggers, procedures and external functions before running this script\n\n");
    for setting in SESSION_SETTINGS {
        header.push_str(setting);
        header.push('\n');
    }
    header.push('\n');
    header
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn transpile(script: &str) -> TranspileOutput {
        DialectTranspiler::new().without_header().transpile(script)
    }

    #[test]
    fn test_comments_stripped_strings_preserved() {
        let out = transpile("-- comment\nSELECT 'it''s -- not a comment' FROM t;");
        assert_eq!(out.sql, "SELECT 'it''s -- not a comment' FROM t;\n");
    }

    #[test]
    fn test_gen_id_rewritten() {
        let out = transpile("UPDATE INVOICES SET ID = GEN_ID(INVOICE_SEQ, 1);");
        assert_eq!(out.sql, "UPDATE INVOICES SET ID = nextval('invoice_seq');\n");
        assert_eq!(out.stats.rules_applied, vec!["gen_id".to_string()]);
    }

    #[test]
    fn test_literals_untouched_by_rules() {
        let out = transpile("INSERT INTO T VALUES ('BLOB SUB_TYPE 1', \"MixedCase\");");
        assert_eq!(out.sql, "INSERT INTO T VALUES ('BLOB SUB_TYPE 1', \"MixedCase\");\n");
        assert!(out.stats.rules_applied.is_empty());
    }

    #[test]
    fn test_table_script() {
        let script = "SET SQL DIALECT 3;\r\nSET NAMES UTF8;\r\n\r\nCREATE DOMAIN D_NAME AS VARCHAR(60) CHARACTER SET UTF8;\r\n\r\nCREATE GENERATOR GEN_CUSTOMERS;\r\nSET GENERATOR GEN_CUSTOMERS TO 42;\r\n\r\nCREATE TABLE CUSTOMERS (\r\n    ID      INTEGER NOT NULL,\r\n    NAME    D_NAME,\r\n    NOTES   BLOB SUB_TYPE TEXT SEGMENT SIZE 80,\r\n    ORDER   INTEGER,\r\n    PRICE   NUMERIC(10)\r\n);\r\n";
        let out = transpile(script);
        let expected = "CREATE SEQUENCE \"gen_customers\";\n\
SELECT setval('\"gen_customers\"', 42);\n\
CREATE TABLE CUSTOMERS (\n\
ID INTEGER NOT NULL,\n\
NAME VARCHAR(60),\n\
NOTES TEXT,\n\
\"order\" INTEGER,\n\
PRICE NUMERIC(10,0)\n\
);\n";
        assert_eq!(out.sql, expected);
        assert_eq!(out.stats.total_lines, 16);
        assert_eq!(out.stats.converted_objects.tables, 1);
        assert_eq!(out.stats.converted_objects.sequences, 1);
        assert_eq!(out.stats.converted_objects.domains, 1);
        assert!(out.stats.rules_applied.contains(&"set_sql_dialect".to_string()));
    }

    #[test]
    fn test_trigger_script() {
        let script = "SET TERM ^ ;\nCREATE TRIGGER CUSTOMERS_BI FOR CUSTOMERS\nACTIVE BEFORE INSERT POSITION 0\nAS\nBEGIN\n  IF (NEW.ID IS NULL) THEN\n    NEW.ID = GEN_ID(GEN_CUSTOMERS, 1);\nEND^\nSET TERM ; ^\n";
        let out = transpile(script);
        assert!(out
            .sql
            .contains("CREATE OR REPLACE FUNCTION customers_bi_func() RETURNS TRIGGER AS $$"));
        assert!(out.sql.contains("NEW.ID = nextval('gen_customers');"));
        assert!(out
            .sql
            .contains("FOR EACH ROW EXECUTE FUNCTION customers_bi_func();"));
        assert!(!out.sql.contains('^'));
        assert_eq!(out.stats.converted_objects.triggers, 1);
    }

    #[test]
    fn test_unmatched_block_keeps_terminator() {
        let script = "SET TERM ^ ;\nCREATE TRIGGER BAD FOR PAY SOMETHING WEIRD AS BEGIN END^\nSET TERM ; ^\nSELECT 1 FROM PAY;\n";
        let out = transpile(script);
        assert!(
            out.sql.contains("CREATE TRIGGER BAD FOR PAY SOMETHING WEIRD AS BEGIN END;"),
            "{}",
            out.sql
        );
        assert!(out.sql.trim_end().ends_with("SELECT 1 FROM PAY;"));
        assert!(!out.sql.contains('^'));
        assert!(!out.sql.contains(";;"));
        assert_eq!(out.stats.converted_objects.triggers, 0);
    }

    #[test]
    fn test_unterminated_string_reported() {
        let out = transpile("SELECT 'open FROM t");
        assert_eq!(out.sql, "SELECT 'open FROM t\n");
        assert_eq!(out.stats.errors.len(), 1);
    }

    #[test]
    fn test_header_included_by_default() {
        let out = DialectTranspiler::new().transpile("SELECT 1;");
        assert!(out.sql.starts_with("-- Firebird script converted to PostgreSQL\n-- Generated at: "));
        assert!(out.sql.contains("SET row_security = off;\n\nSELECT 1;\n"));
    }

    #[test]
    fn test_transpile_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.sql");
        std::fs::write(&path, "CREATE TABLE T (X FLOAT);").unwrap();
        let out = DialectTranspiler::new()
            .without_header()
            .transpile_file(&path)
            .unwrap();
        assert_eq!(out.sql, "CREATE TABLE T (X DOUBLE PRECISION);\n");

        assert!(DialectTranspiler::new()
            .transpile_file(dir.path().join("missing.sql"))
            .is_err());
    }
}
