//! The ordered rewrite rule table.
//!
//! Each rule is a named, case-insensitive pattern with a replacement and a
//! one-line rationale. Rules run in table order over masked text; later rules
//! see the output of earlier ones.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// How a rule rewrites a match.
#[derive(Clone, Copy)]
pub enum Replacement {
    /// A `regex` replacement template (`$1`, `${name}`).
    Template(&'static str),
    /// Computed from the captures.
    Expand(fn(&Captures) -> String),
}

impl std::fmt::Debug for Replacement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Replacement::Template(t) => write!(f, "Template({:?})", t),
            Replacement::Expand(_) => write!(f, "Expand(..)"),
        }
    }
}

/// One entry of a rule table.
#[derive(Debug)]
pub struct RewriteRule {
    pub name: &'static str,
    pub pattern: Regex,
    pub replacement: Replacement,
    pub rationale: &'static str,
}

impl RewriteRule {
    fn new(
        name: &'static str,
        pattern: &str,
        replacement: Replacement,
        rationale: &'static str,
    ) -> Self {
        let pattern = Regex::new(&format!("(?i){}", pattern))
            .unwrap_or_else(|e| panic!("rule {} has an invalid pattern: {}", name, e));
        Self {
            name,
            pattern,
            replacement,
            rationale,
        }
    }

    /// Apply the rule. Returns `None` when the pattern does not occur.
    pub fn apply(&self, text: &str) -> Option<String> {
        if !self.pattern.is_match(text) {
            return None;
        }
        let out = match self.replacement {
            Replacement::Template(t) => self.pattern.replace_all(text, t),
            Replacement::Expand(f) => self.pattern.replace_all(text, |c: &Captures| f(c)),
        };
        Some(out.into_owned())
    }
}

fn sequence_name(caps: &Captures) -> String {
    caps[1].to_lowercase()
}

fn create_sequence(caps: &Captures) -> String {
    format!("CREATE SEQUENCE \"{}\";", sequence_name(caps))
}

fn set_sequence(caps: &Captures) -> String {
    let name = sequence_name(caps);
    match caps[2].parse::<i64>() {
        Ok(v) if v >= 1 => format!("SELECT setval('\"{}\"', {});", name, v),
        _ => format!("SELECT setval('\"{}\"', 1, false);", name),
    }
}

fn next_value(caps: &Captures) -> String {
    format!("nextval('{}')", sequence_name(caps))
}

fn fixed_point_without_scale(caps: &Captures) -> String {
    format!("{}({},0)", caps[1].to_uppercase(), &caps[2])
}

/// Source-to-target rewrites, applied in order.
pub static RULES: Lazy<Vec<RewriteRule>> = Lazy::new(|| {
    use Replacement::{Expand, Template};
    vec![
        RewriteRule::new(
            "blob_segment_size",
            r"\s+SEGMENT\s+SIZE\s+\d+",
            Template(""),
            "PostgreSQL has no BLOB segment size",
        ),
        RewriteRule::new(
            "blob_text",
            r"\bBLOB\s+SUB_TYPE\s+(?:TEXT|1)\b",
            Template("TEXT"),
            "text BLOBs hold character data",
        ),
        RewriteRule::new(
            "blob_binary",
            r"\bBLOB\s+SUB_TYPE\s+(?:BINARY|0)\b",
            Template("BYTEA"),
            "binary BLOBs hold raw bytes",
        ),
        RewriteRule::new(
            "blob_other_subtype",
            r"\bBLOB\s+SUB_TYPE\s+-?\w+",
            Template("BYTEA"),
            "user-defined BLOB subtypes are opaque bytes",
        ),
        RewriteRule::new(
            "blob_bare",
            r"\bBLOB\b",
            Template("BYTEA"),
            "a BLOB without subtype is binary",
        ),
        RewriteRule::new(
            "float",
            r"\bFLOAT\b",
            Template("DOUBLE PRECISION"),
            "Firebird FLOAT columns are commonly used for double values",
        ),
        RewriteRule::new(
            "numeric_no_scale",
            r"\b(NUMERIC)\s*\(\s*(\d+)\s*\)",
            Expand(fixed_point_without_scale),
            "make the implicit zero scale explicit",
        ),
        RewriteRule::new(
            "decimal_no_scale",
            r"\b(DECIMAL)\s*\(\s*(\d+)\s*\)",
            Expand(fixed_point_without_scale),
            "make the implicit zero scale explicit",
        ),
        RewriteRule::new(
            "cstring",
            r"\bCSTRING\s*\(\s*(\d+)\s*\)",
            Template("VARCHAR($1)"),
            "CSTRING is a null-terminated VARCHAR",
        ),
        RewriteRule::new(
            "create_generator",
            r"\bCREATE\s+GENERATOR\s+(\w+)\s*;",
            Expand(create_sequence),
            "generators are sequences",
        ),
        RewriteRule::new(
            "set_generator",
            r"\bSET\s+GENERATOR\s+(\w+)\s+TO\s+(-?\d+)\s*;",
            Expand(set_sequence),
            "generator positioning is setval",
        ),
        RewriteRule::new(
            "gen_id",
            r"\bGEN_ID\s*\(\s*(\w+)\s*,\s*-?\d+\s*\)",
            Expand(next_value),
            "generator increment is nextval",
        ),
        RewriteRule::new(
            "next_value_for",
            r"\bNEXT\s+VALUE\s+FOR\s+(\w+)",
            Expand(next_value),
            "NEXT VALUE FOR is nextval",
        ),
        RewriteRule::new(
            "computed_index",
            r"\bON\s+(\w+)\s+COMPUTED\s+(?:BY\s*)?(\((?:[^()]|\([^()]*\))*\))",
            Template("ON $1 ($2)"),
            "expression indexes wrap the expression in parentheses",
        ),
        RewriteRule::new(
            "character_set",
            r"\s*\bCHARACTER\s+SET\s+\w+",
            Template(""),
            "column character sets follow the database encoding",
        ),
        RewriteRule::new(
            "collate",
            r"\s*\bCOLLATE\s+\w+",
            Template(""),
            "Firebird collation names do not exist in PostgreSQL",
        ),
        RewriteRule::new(
            "computed_by",
            r"\s*\bCOMPUTED\s+(?:BY\s*)?\((?:[^()]|\([^()]*\))*\)",
            Template(""),
            "computed columns need a manual generated-column rewrite",
        ),
        RewriteRule::new(
            "set_term",
            r"\bSET\s+TERM\s+(?:[^\s;]+\s*;|;\s*[^\s;]+)",
            Template(""),
            "isql terminator switching has no PostgreSQL meaning",
        ),
        RewriteRule::new(
            "commit_work",
            r"\bCOMMIT\s+WORK\s*;",
            Template(""),
            "isql transaction control",
        ),
        RewriteRule::new(
            "set_autoddl",
            r"\bSET\s+AUTODDL\s+(?:ON|OFF)\s*;",
            Template(""),
            "isql session setting",
        ),
        RewriteRule::new(
            "set_names",
            r"\bSET\s+NAMES\s+\w+\s*;",
            Template(""),
            "client encoding is set in the script header",
        ),
        RewriteRule::new(
            "set_sql_dialect",
            r"\bSET\s+SQL\s+DIALECT\s+\d+\s*;",
            Template(""),
            "isql dialect selection",
        ),
        RewriteRule::new(
            "suspend",
            r"\bSUSPEND\s*;",
            Template("RETURN NEXT;"),
            "selectable procedures emit rows with RETURN NEXT",
        ),
        RewriteRule::new(
            "exit",
            r"\bEXIT\s*;",
            Template("RETURN;"),
            "EXIT leaves the routine",
        ),
        RewriteRule::new(
            "with_check_option",
            r"\s*\bWITH\s+CHECK\s+OPTION\b",
            Template(""),
            "updatable view checks are rewritten by hand",
        ),
    ]
});

/// Type names left over after block transforms.
pub static TYPE_FIXUPS: Lazy<Vec<RewriteRule>> = Lazy::new(|| {
    use Replacement::Template;
    vec![
        RewriteRule::new(
            "d_float",
            r"\bD_FLOAT\b",
            Template("DOUBLE PRECISION"),
            "VAX double",
        ),
        RewriteRule::new("quad", r"\bQUAD\b", Template("BIGINT"), "64-bit integer"),
        RewriteRule::new("int64", r"\bINT64\b", Template("BIGINT"), "64-bit integer"),
        RewriteRule::new(
            "cstring_bare",
            r"\bCSTRING\b",
            Template("VARCHAR"),
            "null-terminated string",
        ),
    ]
});

/// Apply a rule table, returning the new text and the names of rules that fired.
pub fn apply_rules(text: &str, rules: &[RewriteRule]) -> (String, Vec<&'static str>) {
    let mut current = text.to_string();
    let mut fired = Vec::new();
    for rule in rules {
        if let Some(next) = rule.apply(&current) {
            tracing::debug!("Rule {} applied ({})", rule.name, rule.rationale);
            current = next;
            fired.push(rule.name);
        }
    }
    (current, fired)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(text: &str) -> String {
        apply_rules(text, &RULES).0
    }

    fn rule(name: &str) -> &'static RewriteRule {
        RULES.iter().find(|r| r.name == name).unwrap()
    }

    #[test]
    fn test_rule_names_unique() {
        let mut names: Vec<&str> = RULES.iter().chain(TYPE_FIXUPS.iter()).map(|r| r.name).collect();
        let total = names.len();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), total);
    }

    #[test]
    fn test_blob_rules() {
        assert_eq!(run("NOTES BLOB SUB_TYPE TEXT SEGMENT SIZE 80,"), "NOTES TEXT,");
        assert_eq!(run("NOTES blob sub_type 1,"), "NOTES TEXT,");
        assert_eq!(run("IMG BLOB SUB_TYPE 0,"), "IMG BYTEA,");
        assert_eq!(run("IMG BLOB SUB_TYPE BINARY,"), "IMG BYTEA,");
        assert_eq!(run("X BLOB SUB_TYPE -5,"), "X BYTEA,");
        assert_eq!(run("DATA BLOB,"), "DATA BYTEA,");
        assert_eq!(run("MY_BLOB INTEGER"), "MY_BLOB INTEGER");
    }

    #[test]
    fn test_numeric_rules() {
        assert_eq!(run("A NUMERIC(10), B decimal( 5 )"), "A NUMERIC(10,0), B DECIMAL(5,0)");
        assert_eq!(run("A NUMERIC(10,2)"), "A NUMERIC(10,2)");
        assert_eq!(run("R FLOAT, D D_FLOAT"), "R DOUBLE PRECISION, D D_FLOAT");
        assert_eq!(run("S CSTRING(20)"), "S VARCHAR(20)");
    }

    #[test]
    fn test_generator_rules() {
        assert_eq!(run("CREATE GENERATOR GEN_CUSTOMER;"), "CREATE SEQUENCE \"gen_customer\";");
        assert_eq!(
            run("SET GENERATOR GEN_CUSTOMER TO 150;"),
            "SELECT setval('\"gen_customer\"', 150);"
        );
        assert_eq!(
            run("SET GENERATOR GEN_CUSTOMER TO 0;"),
            "SELECT setval('\"gen_customer\"', 1, false);"
        );
        assert_eq!(
            run("NEW.ID = GEN_ID(GEN_CUSTOMER, 1);"),
            "NEW.ID = nextval('gen_customer');"
        );
        assert_eq!(
            run("NEW.ID = NEXT VALUE FOR GEN_CUSTOMER;"),
            "NEW.ID = nextval('gen_customer');"
        );
    }

    #[test]
    fn test_removal_rules() {
        assert_eq!(run("NAME VARCHAR(10) CHARACTER SET WIN1252 COLLATE PXW_INTL,"), "NAME VARCHAR(10),");
        assert_eq!(run("FULL_NAME COMPUTED BY (FIRST || (LAST)),"), "FULL_NAME,");
        assert_eq!(run("SET TERM ^ ;\nX\nSET TERM ; ^"), "\nX\n");
        assert_eq!(run("COMMIT WORK;"), "");
        assert_eq!(run("SET AUTODDL ON;"), "");
        assert_eq!(run("SET NAMES UTF8;"), "");
        assert_eq!(run("SET SQL DIALECT 3;"), "");
        assert_eq!(run("SELECT * FROM T WITH CHECK OPTION;"), "SELECT * FROM T;");
    }

    #[test]
    fn test_procedural_rules() {
        assert_eq!(run("SUSPEND;"), "RETURN NEXT;");
        assert_eq!(run("IF (X) THEN EXIT;"), "IF (X) THEN RETURN;");
    }

    #[test]
    fn test_computed_index_kept_as_expression() {
        assert_eq!(
            run("CREATE INDEX IDX_UP ON T COMPUTED BY (UPPER(NAME));"),
            "CREATE INDEX IDX_UP ON T ((UPPER(NAME)));"
        );
    }

    #[test]
    fn test_fired_rules_recorded() {
        let (_, fired) = apply_rules("CREATE GENERATOR G; X BLOB", &RULES);
        assert_eq!(fired, vec!["blob_bare", "create_generator"]);
    }

    #[test]
    fn test_rule_apply_none_when_absent() {
        assert!(rule("float").apply("INTEGER").is_none());
    }

    #[test]
    fn test_type_fixups() {
        let (out, fired) = apply_rules("A QUAD, B INT64, C D_FLOAT, D CSTRING", &TYPE_FIXUPS);
        assert_eq!(out, "A BIGINT, B BIGINT, C DOUBLE PRECISION, D VARCHAR");
        assert_eq!(fired.len(), 4);
    }
}
