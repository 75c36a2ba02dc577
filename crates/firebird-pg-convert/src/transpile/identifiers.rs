//! Identifier normalization outside quoted regions.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static MIXED_CASE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b([A-Z][A-Z0-9_]*[a-z][A-Za-z0-9_]*)\b").expect("valid mixed-case regex")
});

static LOWER_UPPER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([a-z0-9])([A-Z])").expect("valid boundary regex"));

static ACRONYM_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Z])([A-Z][a-z])").expect("valid acronym regex"));

static NON_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9_]+").expect("valid separator regex"));

static UNDERSCORES: Lazy<Regex> = Lazy::new(|| Regex::new(r"_+").expect("valid underscore regex"));

static COLUMN_DEFINITION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?im)(^|[(,]\s*)(\w+)(\s+)((?:INTEGER|INT|SMALLINT|BIGINT|VARCHAR|CHAR|CHARACTER|NUMERIC|DECIMAL|DOUBLE|FLOAT|REAL|DATE|TIMESTAMP|TIME|BOOLEAN|TEXT|BYTEA|BLOB|CSTRING)\b)",
    )
    .expect("valid column definition regex")
});

/// PostgreSQL keywords that cannot be used as bare column names.
const RESERVED: &[&str] = &[
    "user", "order", "group", "limit", "offset", "select", "from", "where", "join", "inner",
    "outer", "left", "right", "full", "cross", "union", "intersect", "except", "all", "distinct",
    "case", "when", "then", "else", "end", "if", "exists", "in", "like", "between", "null", "true",
    "false", "and", "or", "not", "is", "as", "table", "column", "constraint", "primary", "foreign",
    "key", "references", "check", "unique", "index", "create", "drop", "alter", "insert", "update",
    "delete", "grant", "revoke", "commit", "rollback", "transaction", "schema", "view", "function",
    "procedure", "trigger", "sequence",
];

pub fn is_reserved(word: &str) -> bool {
    let lower = word.to_lowercase();
    RESERVED.contains(&lower.as_str())
}

/// Convert a name to snake_case.
///
/// All-caps names of up to five characters are treated as acronyms and only
/// lower-cased.
pub fn to_snake_case(name: &str) -> String {
    let all_caps =
        name.chars().any(char::is_alphabetic) && !name.chars().any(char::is_lowercase);
    if all_caps && name.chars().count() <= 5 {
        return name.to_lowercase();
    }

    let split = LOWER_UPPER.replace_all(name, "${1}_${2}");
    let split = ACRONYM_WORD.replace_all(&split, "${1}_${2}");
    let lower = split.to_lowercase();
    let cleaned = NON_WORD.replace_all(&lower, "_");
    let collapsed = UNDERSCORES.replace_all(&cleaned, "_");
    collapsed.trim_matches('_').to_string()
}

/// Snake-case mixed-case identifiers and quote reserved column names.
pub fn normalize_identifiers(text: &str) -> String {
    let snaked = MIXED_CASE.replace_all(text, |caps: &Captures| to_snake_case(&caps[1]));
    COLUMN_DEFINITION
        .replace_all(&snaked, |caps: &Captures| {
            let name = &caps[2];
            if is_reserved(name) {
                format!("{}\"{}\"{}{}", &caps[1], name.to_lowercase(), &caps[3], &caps[4])
            } else {
                caps[0].to_string()
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_snake_case() {
        assert_eq!(to_snake_case("CustomerName"), "customer_name");
        assert_eq!(to_snake_case("HTTPServer"), "http_server");
        assert_eq!(to_snake_case("orderID2"), "order_id2");
        assert_eq!(to_snake_case("NFE"), "nfe");
        assert_eq!(to_snake_case("Name With Space"), "name_with_space");
        assert_eq!(to_snake_case("__Odd__Name__"), "odd_name");
    }

    #[test]
    fn test_only_mixed_case_rewritten() {
        assert_eq!(
            normalize_identifiers("SELECT CustomerName, TOTAL FROM Orders"),
            "SELECT customer_name, TOTAL FROM orders"
        );
    }

    #[test]
    fn test_reserved_column_names_quoted() {
        assert_eq!(
            normalize_identifiers("CREATE TABLE T (ID INTEGER, USER VARCHAR(10), ORDER INTEGER)"),
            "CREATE TABLE T (ID INTEGER, \"user\" VARCHAR(10), \"order\" INTEGER)"
        );
    }

    #[test]
    fn test_reserved_word_outside_definition_untouched() {
        let sql = "SELECT * FROM T ORDER BY ID";
        assert_eq!(normalize_identifiers(sql), sql);
    }

    #[test]
    fn test_placeholders_untouched() {
        let sql = "INSERT INTO T VALUES (\u{1}0\u{2})";
        assert_eq!(normalize_identifiers(sql), sql);
    }
}
