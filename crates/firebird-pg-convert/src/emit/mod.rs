//! PostgreSQL DDL generation from source metadata.
//!
//! Every identifier goes through [`quote_ident`], so names are lower-cased
//! and quoted consistently across tables, constraints, sequences and views.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::TranslationConfig;
use crate::core::{quote_ident, quote_list, Generator, TableSchema, TypeMapper};
use crate::defaults::translate_default;
use crate::serialize::sql_text_literal;
use crate::typemap::FirebirdToPostgres;

static NEW_COLUMN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bNEW\.(\w+)").expect("valid NEW.col regex"));

static LEADING_CHECK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^CHECK\b\s*").expect("valid CHECK regex"));

static FIRST_SELECT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bSELECT\b").expect("valid SELECT regex"));

static VIEW_GEN_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bGEN_ID\s*\(\s*(\w+)\s*,\s*-?\d+\s*\)").expect("valid GEN_ID regex")
});

/// Which constraint groups to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmitOptions {
    pub indexes: bool,
    pub foreign_keys: bool,
    pub check_constraints: bool,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self {
            indexes: true,
            foreign_keys: true,
            check_constraints: true,
        }
    }
}

impl EmitOptions {
    pub fn from_config(config: &TranslationConfig) -> Self {
        Self {
            indexes: config.create_indexes,
            foreign_keys: config.create_foreign_keys,
            check_constraints: config.create_check_constraints,
        }
    }
}

/// `CREATE TABLE` statement plus any lossy-mapping warnings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDdl {
    pub sql: String,
    pub warnings: Vec<String>,
}

/// Generate `CREATE TABLE` for a schema with the default type mapper.
pub fn emit_table(schema: &TableSchema) -> String {
    emit_table_with(schema, &FirebirdToPostgres).sql
}

/// Generate `CREATE TABLE`, collecting warnings for lossy column mappings.
pub fn emit_table_with(schema: &TableSchema, mapper: &dyn TypeMapper) -> TableDdl {
    let mut warnings = Vec::new();
    let mut notes = Vec::new();
    let mut defs = Vec::with_capacity(schema.columns.len() + 1);

    for col in schema.ordered_columns() {
        let mapping = mapper.map_column(col);
        if let Some(w) = mapping.warning {
            warnings.push(format!("Table {}: {}", schema.name, w));
        }

        let mut def = format!("    {} {}", quote_ident(&col.name), mapping.target_type);
        if !col.nullable {
            def.push_str(" NOT NULL");
        }
        if let Some(raw) = col.default.as_deref() {
            let expr = translate_default(raw);
            if expr.starts_with("--") {
                // Line comments cannot sit inside the column list
                warnings.push(format!(
                    "Table {}: Column {} default left out: {}",
                    schema.name,
                    col.name,
                    expr.trim_start_matches('-').trim()
                ));
                notes.push(format!("{} (column {})", expr, quote_ident(&col.name)));
            } else if !expr.is_empty() && expr != "NULL" {
                def.push_str(" DEFAULT ");
                def.push_str(&expr);
            }
        }
        defs.push(def);
    }

    if schema.has_pk() {
        defs.push(format!("    PRIMARY KEY ({})", quote_list(&schema.primary_key)));
    }

    let mut sql = String::new();
    for note in &notes {
        sql.push_str(note);
        sql.push('\n');
    }
    sql.push_str(&format!(
        "CREATE TABLE {} (\n{}\n);",
        quote_ident(&schema.name),
        defs.join(",\n")
    ));
    TableDdl { sql, warnings }
}

/// `COMMENT ON COLUMN` statements for described columns.
pub fn emit_column_comments(schema: &TableSchema) -> Vec<String> {
    let table = quote_ident(&schema.name);
    schema
        .ordered_columns()
        .into_iter()
        .filter_map(|col| {
            let desc = col.description.as_deref()?.trim();
            if desc.is_empty() {
                return None;
            }
            Some(format!(
                "COMMENT ON COLUMN {}.{} IS {};",
                table,
                quote_ident(&col.name),
                sql_text_literal(desc)
            ))
        })
        .collect()
}

fn same_column_set(a: &[String], b: &[String]) -> bool {
    let lower = |v: &[String]| -> HashSet<String> {
        v.iter().map(|s| s.trim().to_lowercase()).collect()
    };
    !a.is_empty() && lower(a) == lower(b)
}

/// Normalize a referential action; unknown actions become `NO ACTION`.
pub fn referential_action(rule: &str) -> &'static str {
    let normalized = rule.split_whitespace().collect::<Vec<_>>().join(" ");
    match normalized.to_uppercase().as_str() {
        "CASCADE" => "CASCADE",
        "SET NULL" => "SET NULL",
        "SET DEFAULT" => "SET DEFAULT",
        "RESTRICT" => "RESTRICT",
        _ => "NO ACTION",
    }
}

/// Remove one pair of parentheses that wraps the whole text.
fn strip_outer_parens(s: &str) -> &str {
    let t = s.trim();
    if !(t.starts_with('(') && t.ends_with(')')) {
        return t;
    }
    let mut depth = 0i32;
    for (i, c) in t.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 && i != t.len() - 1 {
                    return t;
                }
            }
            _ => {}
        }
    }
    t[1..t.len() - 1].trim()
}

/// Turn a stored Firebird check source into a PostgreSQL condition.
pub fn convert_check_condition(condition: &str) -> String {
    let without_keyword = LEADING_CHECK.replace(condition.trim(), "");
    let inner = strip_outer_parens(&without_keyword);
    NEW_COLUMN
        .replace_all(inner, |caps: &regex::Captures| quote_ident(&caps[1]))
        .into_owned()
}

/// Indexes, foreign keys and check constraints, in that order.
pub fn emit_constraints(schema: &TableSchema, options: EmitOptions) -> Vec<String> {
    let table = quote_ident(&schema.name);
    let mut out = Vec::new();

    if options.indexes {
        for idx in schema.indexes.iter().filter(|i| i.unique) {
            if idx.name.is_empty() || same_column_set(&idx.columns, &schema.primary_key) {
                continue;
            }
            out.push(format!(
                "CREATE UNIQUE INDEX {} ON {} ({});",
                quote_ident(&idx.name),
                table,
                quote_list(&idx.columns)
            ));
        }
        for idx in schema.indexes.iter().filter(|i| !i.unique) {
            if idx.name.is_empty() {
                continue;
            }
            out.push(format!(
                "CREATE INDEX {} ON {} ({});",
                quote_ident(&idx.name),
                table,
                quote_list(&idx.columns)
            ));
        }
    }

    if options.foreign_keys {
        for fk in &schema.foreign_keys {
            let mut sql = format!(
                "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
                table,
                quote_ident(&fk.name),
                quote_list(&fk.columns),
                quote_ident(&fk.ref_table),
                quote_list(&fk.ref_columns)
            );
            let on_delete = referential_action(&fk.on_delete);
            let on_update = referential_action(&fk.on_update);
            if on_delete != "NO ACTION" {
                sql.push_str(" ON DELETE ");
                sql.push_str(on_delete);
            }
            if on_update != "NO ACTION" {
                sql.push_str(" ON UPDATE ");
                sql.push_str(on_update);
            }
            sql.push(';');
            out.push(sql);
        }
    }

    if options.check_constraints {
        for check in &schema.check_constraints {
            if check.condition.trim().is_empty() {
                continue;
            }
            out.push(format!(
                "ALTER TABLE {} ADD CONSTRAINT {} CHECK ({});",
                table,
                quote_ident(&check.name),
                convert_check_condition(&check.condition)
            ));
        }
    }

    out
}

/// `CREATE SEQUENCE` plus `setval` for generators that have advanced.
pub fn emit_sequences(generators: &[Generator]) -> Vec<String> {
    let mut out = Vec::with_capacity(generators.len() * 2);
    for generator in generators {
        let name = quote_ident(&generator.name);
        out.push(format!("CREATE SEQUENCE {};", name));
        if generator.current_value > 0 {
            out.push(format!(
                "SELECT setval('{}', {});",
                name.replace('\'', "''"),
                generator.current_value
            ));
        }
    }
    out
}

/// `CREATE OR REPLACE VIEW` from a stored view source.
pub fn emit_view(name: &str, definition: &str) -> String {
    let trimmed = definition.trim();
    let body = match FIRST_SELECT.find(trimmed) {
        Some(m) => &trimmed[m.start()..],
        None => trimmed,
    };
    let body = body.trim_end().trim_end_matches(';').trim_end();
    let body = VIEW_GEN_ID.replace_all(body, |caps: &regex::Captures| {
        format!("nextval('{}')", caps[1].to_lowercase())
    });
    format!("CREATE OR REPLACE VIEW {} AS\n{};", quote_ident(name), body)
}

/// Session settings written at the top of every generated script.
pub const SESSION_SETTINGS: &[&str] = &[
    "SET statement_timeout = 0;",
    "SET lock_timeout = 0;",
    "SET idle_in_transaction_session_timeout = 0;",
    "SET client_encoding = 'UTF8';",
    "SET standard_conforming_strings = on;",
    "SET check_function_bodies = false;",
    "SET xmloption = content;",
    "SET client_min_messages = warning;",
    "SET row_security = off;",
];

/// Disables triggers and FK checks while data loads.
pub const REPLICATION_ROLE_REPLICA: &str = "SET session_replication_role = replica;";

/// Restores normal trigger and FK behavior.
pub const REPLICATION_ROLE_DEFAULT: &str = "SET session_replication_role = DEFAULT;";
