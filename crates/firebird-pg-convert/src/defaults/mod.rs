//! Translation of Firebird column default expressions.
//!
//! Firebird keeps the raw `DEFAULT ...` clause text in `RDB$DEFAULT_SOURCE`.
//! [`translate_default`] turns that text into a PostgreSQL expression that can
//! follow `DEFAULT` in a column definition. It never fails: anything it cannot
//! classify is emitted as a quoted string literal.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

static GEN_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^GEN_ID\s*\(\s*(\w+)\s*,\s*(\d+)\s*\)").expect("valid GEN_ID regex")
});

static DATEADD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^DATEADD\s*\(\s*(\w+)\s*,\s*([^,]+?)\s*,\s*([^)]+?)\s*\)")
        .expect("valid DATEADD regex")
});

static NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?$").expect("valid number regex")
});

static ARITHMETIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\d\s+\-*/().]+$").expect("valid arithmetic regex"));

/// Context-variable and keyword substitutions, matched case-insensitively.
fn keyword_substitution(upper: &str) -> Option<&'static str> {
    let out = match upper {
        "CURRENT_TIMESTAMP" => "CURRENT_TIMESTAMP",
        "CURRENT_DATE" => "CURRENT_DATE",
        "CURRENT_TIME" => "CURRENT_TIME",
        "NOW" | "'NOW'" => "NOW()",
        "TODAY" | "'TODAY'" => "CURRENT_DATE",
        "YESTERDAY" | "'YESTERDAY'" => "CURRENT_DATE - INTERVAL '1 day'",
        "TOMORROW" | "'TOMORROW'" => "CURRENT_DATE + INTERVAL '1 day'",
        "NULL" => "NULL",
        "USER" | "CURRENT_USER" => "CURRENT_USER",
        "CURRENT_ROLE" => "CURRENT_ROLE",
        "CURRENT_CONNECTION" => "inet_client_addr()",
        "CURRENT_TRANSACTION" => "txid_current()",
        _ => return None,
    };
    Some(out)
}

fn interval_unit(unit: &str) -> String {
    match unit.to_uppercase().as_str() {
        "DAY" => "day".to_string(),
        "MONTH" => "month".to_string(),
        "YEAR" => "year".to_string(),
        "HOUR" => "hour".to_string(),
        "MINUTE" => "minute".to_string(),
        "SECOND" => "second".to_string(),
        other => other.to_lowercase(),
    }
}

/// Strip a leading `DEFAULT` keyword, but not a word that merely starts with it.
fn strip_default_keyword(s: &str) -> &str {
    match (s.get(..7), s.get(7..)) {
        (Some(head), Some(rest))
            if head.eq_ignore_ascii_case("DEFAULT")
                && (rest.is_empty() || rest.starts_with(|c: char| c.is_whitespace() || c == '\'')) =>
        {
            rest.trim()
        }
        _ => s,
    }
}

/// Translate a Firebird default expression to PostgreSQL.
///
/// Returns an empty string for empty input.
pub fn translate_default(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let value = strip_default_keyword(trimmed);
    if value.is_empty() {
        return String::new();
    }
    let upper = value.to_uppercase();

    if let Some(out) = keyword_substitution(&upper) {
        return out.to_string();
    }

    if let Some(caps) = GEN_ID.captures(value) {
        return format!("nextval('{}')", caps[1].to_lowercase());
    }

    if upper.contains("DATEADD(") {
        if let Some(caps) = DATEADD.captures(value) {
            return format!(
                "({} + INTERVAL '{} {}')",
                &caps[3],
                &caps[2],
                interval_unit(&caps[1])
            );
        }
        debug!("Default needs manual conversion: {}", value);
        return format!("-- MANUAL CONVERSION NEEDED: {}", value);
    }

    if value.len() >= 2 && value.starts_with('\'') && value.ends_with('\'') {
        let content = &value[1..value.len() - 1];
        if content.contains(['\\', '\n', '\r', '\t']) {
            return format!("E'{}'", content.replace('\\', "\\\\").replace('\'', "''"));
        }
        return value.to_string();
    }

    if NUMBER.is_match(value) || ARITHMETIC.is_match(value) {
        return value.to_string();
    }

    if value.contains(['(', ')', '+', '-', '*', '/']) {
        return value.to_string();
    }

    format!("'{}'", value.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        assert_eq!(translate_default(""), "");
        assert_eq!(translate_default("   "), "");
        assert_eq!(translate_default("DEFAULT"), "");
    }

    #[test]
    fn test_strips_default_keyword() {
        assert_eq!(translate_default("DEFAULT 0"), "0");
        assert_eq!(translate_default("default CURRENT_TIMESTAMP"), "CURRENT_TIMESTAMP");
        assert_eq!(translate_default("DEFAULT'A'"), "'A'");
    }

    #[test]
    fn test_keyword_substitutions() {
        assert_eq!(translate_default("now"), "NOW()");
        assert_eq!(translate_default("TODAY"), "CURRENT_DATE");
        assert_eq!(translate_default("Yesterday"), "CURRENT_DATE - INTERVAL '1 day'");
        assert_eq!(translate_default("TOMORROW"), "CURRENT_DATE + INTERVAL '1 day'");
        assert_eq!(translate_default("USER"), "CURRENT_USER");
        assert_eq!(translate_default("CURRENT_CONNECTION"), "inet_client_addr()");
        assert_eq!(translate_default("CURRENT_TRANSACTION"), "txid_current()");
        assert_eq!(translate_default("null"), "NULL");
    }

    #[test]
    fn test_quoted_date_keywords() {
        assert_eq!(translate_default("DEFAULT 'NOW'"), "NOW()");
        assert_eq!(translate_default("'today'"), "CURRENT_DATE");
    }

    #[test]
    fn test_gen_id() {
        assert_eq!(
            translate_default("GEN_ID(INVOICE_SEQ, 1)"),
            "nextval('invoice_seq')"
        );
        assert_eq!(translate_default("gen_id( Gen_X ,10 )"), "nextval('gen_x')");
    }

    #[test]
    fn test_dateadd() {
        assert_eq!(
            translate_default("DATEADD(DAY, 7, CURRENT_DATE)"),
            "(CURRENT_DATE + INTERVAL '7 day')"
        );
        assert_eq!(
            translate_default("DATEADD(WEEK, 1, CURRENT_DATE)"),
            "(CURRENT_DATE + INTERVAL '1 week')"
        );
        assert_eq!(
            translate_default("DATEADD(1 DAY TO CURRENT_DATE)"),
            "-- MANUAL CONVERSION NEEDED: DATEADD(1 DAY TO CURRENT_DATE)"
        );
    }

    #[test]
    fn test_quoted_literals() {
        assert_eq!(translate_default("'ACTIVE'"), "'ACTIVE'");
        assert_eq!(translate_default("'C:\\temp'"), "E'C:\\\\temp'");
        assert_eq!(translate_default("'a\tb'"), "E'a\tb'");
    }

    #[test]
    fn test_numbers_and_arithmetic() {
        assert_eq!(translate_default("0"), "0");
        assert_eq!(translate_default("-1.5"), "-1.5");
        assert_eq!(translate_default("1e3"), "1e3");
        assert_eq!(translate_default("(2 * 3) + 1"), "(2 * 3) + 1");
    }

    #[test]
    fn test_expressions_pass_through() {
        assert_eq!(translate_default("UPPER(X)"), "UPPER(X)");
    }

    #[test]
    fn test_bare_word_is_quoted() {
        assert_eq!(translate_default("ACTIVE"), "'ACTIVE'");
        assert_eq!(translate_default("O'NEIL"), "'O''NEIL'");
    }
}
