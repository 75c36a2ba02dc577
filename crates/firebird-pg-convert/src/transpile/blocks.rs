//! Block-level transforms for triggers, procedures, external functions,
//! views and indexes.
//!
//! Headers are parsed with fixed-shape patterns. Bodies run from the first
//! `BEGIN` after the header to its balancing `END`, counting `BEGIN` and
//! `CASE` as openers. Procedural statements inside a body are not translated
//! beyond a handful of mechanical rewrites, so every converted routine carries
//! a review marker.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::TranspileStats;
use crate::core::quote_ident;

static TRIGGER_START: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bCREATE\s+(?:OR\s+ALTER\s+)?TRIGGER\b").expect("valid trigger start regex")
});

static TRIGGER_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?is)^CREATE\s+(?:OR\s+ALTER\s+)?TRIGGER\s+(\w+)(?:\s+FOR\s+(\w+))?(?:\s+(?:ACTIVE|INACTIVE))?\s+(BEFORE|AFTER)\s+((?:INSERT|UPDATE|DELETE)(?:\s+OR\s+(?:INSERT|UPDATE|DELETE))*)(?:\s+POSITION\s+\d+)?(?:\s+ON\s+(\w+))?\s+AS\b",
    )
    .expect("valid trigger header regex")
});

static PROCEDURE_START: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bCREATE\s+(?:OR\s+ALTER\s+)?PROCEDURE\b").expect("valid procedure start regex")
});

static PROCEDURE_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^CREATE\s+(?:OR\s+ALTER\s+)?PROCEDURE\s+(\w+)\s*")
        .expect("valid procedure name regex")
});

static RETURNS_KEYWORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^RETURNS\s*").expect("valid returns regex"));

static AS_KEYWORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^\s*AS\b").expect("valid as regex"));

static EXTERNAL_FUNCTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)\bDECLARE\s+EXTERNAL\s+FUNCTION\s+(\w+).*?;")
        .expect("valid external function regex")
});

static VIEW_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:CREATE\s+OR\s+ALTER|RECREATE|CREATE\s+OR\s+REPLACE|CREATE)\s+VIEW\b")
        .expect("valid view regex")
});

static INDEX_START: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bCREATE\s+(?:UNIQUE\s+)?(?:(?:ASC|ASCENDING|DESC|DESCENDING)\s+)?INDEX\b")
        .expect("valid index start regex")
});

static INDEX_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?is)^CREATE\s+(UNIQUE\s+)?(?:(ASC|ASCENDING|DESC|DESCENDING)\s+)?INDEX\s+(\w+)\s+ON\s+(\w+)\s*",
    )
    .expect("valid index header regex")
});

static BEGIN_KEYWORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bBEGIN\b").expect("valid begin regex"));

static BLOCK_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(BEGIN|CASE|END)\b").expect("valid block token regex"));

static TERMINATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*[\^;]").expect("valid terminator regex"));

static DECLARE_VARIABLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)\bDECLARE\s+(?:VARIABLE\s+)?(\w+)\s+([^;]+);")
        .expect("valid declare regex")
});

static RAISE_EXCEPTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new("(?i)\\bEXCEPTION\\s+(\\w+)(\\s+\u{1}\\d+\u{2})?\\s*;")
        .expect("valid exception regex")
});

static BARE_RETURN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bRETURN\s*;").expect("valid return regex"));

static COLON_VARIABLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([\s(,=<>+\-*/]):(\w+)").expect("valid colon variable regex"));

/// Replace each occurrence of `start` for which `convert` yields a rewrite.
///
/// `convert` sees the text from the match onwards and returns how many bytes
/// it consumed plus the replacement. When it returns `None` the match is kept.
fn rewrite_each<F>(text: &str, start: &Regex, mut convert: F) -> String
where
    F: FnMut(&str) -> Option<(usize, String)>,
{
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    while let Some(m) = start.find_at(text, cursor) {
        out.push_str(&text[cursor..m.start()]);
        match convert(&text[m.start()..]) {
            Some((consumed, replacement)) => {
                out.push_str(&replacement);
                cursor = m.start() + consumed.max(m.len());
            }
            None => {
                out.push_str(m.as_str());
                cursor = m.end();
            }
        }
    }
    out.push_str(&text[cursor..]);
    out
}

/// Byte offset just past the parenthesis that closes the one `s` starts with.
fn balanced_parens(s: &str) -> Option<usize> {
    if !s.starts_with('(') {
        return None;
    }
    let mut depth = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// A routine body located after its header.
struct Body<'a> {
    declarations: &'a str,
    /// `BEGIN` up to, not including, the balancing `END`.
    inner: &'a str,
    /// Bytes consumed from the header end, including any terminator.
    consumed: usize,
}

/// Locate declarations and the balanced body in `rest` (the text after `AS`).
fn locate_body(rest: &str) -> Option<Body<'_>> {
    let begin = BEGIN_KEYWORD.find(rest)?;
    let mut depth = 0usize;
    for token in BLOCK_TOKEN.find_iter(&rest[begin.start()..]) {
        if token.as_str().eq_ignore_ascii_case("END") {
            depth = depth.checked_sub(1)?;
            if depth == 0 {
                let end_start = begin.start() + token.start();
                let mut consumed = begin.start() + token.end();
                if let Some(term) = TERMINATOR.find(&rest[consumed..]) {
                    consumed += term.end();
                }
                return Some(Body {
                    declarations: &rest[..begin.start()],
                    inner: &rest[begin.start()..end_start],
                    consumed,
                });
            }
        } else {
            depth += 1;
        }
    }
    None
}

fn declare_section(declarations: &str, routine: &str, stats: &mut TranspileStats) -> String {
    let lines: Vec<String> = DECLARE_VARIABLE
        .captures_iter(declarations)
        .map(|c| format!("  {} {};", c[1].to_lowercase(), c[2].trim()))
        .collect();
    let leftover = DECLARE_VARIABLE.replace_all(declarations, "");
    if !leftover.trim().is_empty() {
        stats.warnings.push(format!(
            "{}: declarations not recognized and dropped: {}",
            routine,
            leftover.trim()
        ));
    }
    if lines.is_empty() {
        String::new()
    } else {
        format!("DECLARE\n{}\n", lines.join("\n"))
    }
}

/// Mechanical statement rewrites shared by trigger and procedure bodies.
fn rewrite_body(inner: &str, bare_return: Option<&str>) -> String {
    let raised = RAISE_EXCEPTION.replace_all(inner, |c: &Captures| match c.get(2) {
        Some(message) => format!("RAISE EXCEPTION '%', {};", message.as_str().trim()),
        None => format!("RAISE EXCEPTION '{}';", c[1].to_lowercase()),
    });
    let unprefixed = COLON_VARIABLE.replace_all(&raised, "${1}${2}");
    match bare_return {
        Some(value) => BARE_RETURN
            .replace_all(&unprefixed, |_: &Captures| format!("RETURN {};", value))
            .into_owned(),
        None => unprefixed.into_owned(),
    }
}

fn convert_trigger(block: &str, stats: &mut TranspileStats) -> Option<(usize, String)> {
    let Some(header) = TRIGGER_HEADER.captures(block) else {
        let preview: String = block.chars().take(60).collect();
        stats.warnings.push(format!(
            "Trigger header not recognized, left unchanged: {}",
            preview.replace('\n', " ")
        ));
        return None;
    };
    let header_end = header.get(0).map(|m| m.end()).unwrap_or(0);
    let name = header[1].to_lowercase();
    let Some(body) = locate_body(&block[header_end..]) else {
        stats.warnings.push(format!(
            "Trigger {}: body has no balanced BEGIN/END, left unchanged",
            name
        ));
        return None;
    };

    let timing = header[3].to_uppercase();
    let events: Vec<String> = header[4]
        .split_whitespace()
        .filter(|w| !w.eq_ignore_ascii_case("OR"))
        .map(str::to_uppercase)
        .collect();
    let table = header
        .get(2)
        .or_else(|| header.get(5))
        .map(|m| m.as_str().to_string());

    let returned = if timing == "AFTER" {
        "NULL"
    } else if events.iter().all(|e| e == "DELETE") {
        "OLD"
    } else {
        "NEW"
    };

    let declare = declare_section(body.declarations, &format!("Trigger {}", name), stats);
    let inner = rewrite_body(body.inner, Some(returned));

    let mut out = format!("-- Trigger {}: requires manual review\n", name);
    out.push_str(&format!(
        "CREATE OR REPLACE FUNCTION {}_func() RETURNS TRIGGER AS $$\n",
        name
    ));
    out.push_str(&declare);
    out.push_str(inner.trim_end());
    out.push_str(&format!("\n  RETURN {};\nEND;\n$$ LANGUAGE plpgsql;\n\n", returned));

    let events = events.join(" OR ");
    match table {
        Some(table) => out.push_str(&format!(
            "CREATE TRIGGER {}\n{} {} ON {}\nFOR EACH ROW EXECUTE FUNCTION {}_func();\n",
            name,
            timing,
            events,
            quote_ident(&table),
            name
        )),
        None => out.push_str(&format!(
            "-- CREATE TRIGGER {}\n-- {} {} ON <table>\n-- FOR EACH ROW EXECUTE FUNCTION {}_func();\n",
            name, timing, events, name
        )),
    }

    stats.converted_objects.triggers += 1;
    stats.warnings.push(format!(
        "Trigger {} converted to a PL/pgSQL function; its body requires manual review",
        name
    ));
    Some((header_end + body.consumed, out))
}

fn convert_procedure(block: &str, stats: &mut TranspileStats) -> Option<(usize, String)> {
    let malformed = |stats: &mut TranspileStats, what: &str| {
        let preview: String = block.chars().take(60).collect();
        stats.warnings.push(format!(
            "Procedure {}, left unchanged: {}",
            what,
            preview.replace('\n', " ")
        ));
    };

    let Some(head) = PROCEDURE_NAME.captures(block) else {
        malformed(stats, "header not recognized");
        return None;
    };
    let name = head[1].to_lowercase();
    let mut pos = head.get(0).map(|m| m.end()).unwrap_or(0);

    let mut params = "";
    if let Some(len) = balanced_parens(&block[pos..]) {
        params = &block[pos + 1..pos + len - 1];
        pos += len;
    }
    pos += block[pos..].len() - block[pos..].trim_start().len();

    let mut outputs = None;
    if let Some(kw) = RETURNS_KEYWORD.find(&block[pos..]) {
        pos += kw.end();
        let Some(len) = balanced_parens(&block[pos..]) else {
            malformed(stats, "RETURNS clause not recognized");
            return None;
        };
        outputs = Some(&block[pos + 1..pos + len - 1]);
        pos += len;
    }

    let Some(as_kw) = AS_KEYWORD.find(&block[pos..]) else {
        malformed(stats, "header not recognized");
        return None;
    };
    pos += as_kw.end();

    let Some(body) = locate_body(&block[pos..]) else {
        stats.warnings.push(format!(
            "Procedure {}: body has no balanced BEGIN/END, left unchanged",
            name
        ));
        return None;
    };

    let declare = declare_section(body.declarations, &format!("Procedure {}", name), stats);
    let inner = rewrite_body(body.inner, None);
    let returns = match outputs {
        Some(cols) => format!("TABLE({})", cols.trim()),
        None => "VOID".to_string(),
    };

    let mut out = format!("-- Procedure {}: requires manual review\n", name);
    out.push_str(&format!(
        "CREATE OR REPLACE FUNCTION {}({}) RETURNS {} AS $$\n",
        name,
        params.trim(),
        returns
    ));
    out.push_str(&declare);
    out.push_str(inner.trim_end());
    out.push_str("\nEND;\n$$ LANGUAGE plpgsql;\n");

    stats.converted_objects.procedures += 1;
    stats.warnings.push(format!(
        "Procedure {} converted to a PL/pgSQL function; its body requires manual review",
        name
    ));
    Some((pos + body.consumed, out))
}

fn convert_index(block: &str, stats: &mut TranspileStats) -> Option<(usize, String)> {
    let header = INDEX_HEADER.captures(block)?;
    let header_end = header.get(0).map(|m| m.end()).unwrap_or(0);
    let Some(len) = balanced_parens(&block[header_end..]) else {
        stats.warnings.push(format!(
            "Index {}: column list not recognized, left unchanged",
            &header[3]
        ));
        return None;
    };
    let mut consumed = header_end + len;
    if let Some(term) = TERMINATOR.find(&block[consumed..]) {
        consumed += term.end();
    }

    let columns = &block[header_end + 1..header_end + len - 1];
    let descending = header
        .get(2)
        .is_some_and(|d| d.as_str().to_uppercase().starts_with("DESC"));
    let columns = if descending && !columns.contains('(') {
        columns
            .split(',')
            .map(|c| format!("{} DESC", c.trim()))
            .collect::<Vec<_>>()
            .join(", ")
    } else {
        columns.trim().to_string()
    };

    let unique = if header.get(1).is_some() { "UNIQUE " } else { "" };
    stats.converted_objects.indexes += 1;
    Some((
        consumed,
        format!(
            "CREATE {}INDEX {} ON {} ({});",
            unique,
            quote_ident(&header[3]),
            quote_ident(&header[4]),
            columns
        ),
    ))
}

/// Run every block transform over masked text.
pub fn transform_blocks(text: &str, stats: &mut TranspileStats) -> String {
    let without_udfs = EXTERNAL_FUNCTION.replace_all(text, |c: &Captures| {
        stats.converted_objects.functions += 1;
        stats.warnings.push(format!(
            "External function {} removed; reimplement it in PostgreSQL",
            &c[1]
        ));
        format!(
            "-- External function {} removed: reimplement it in PostgreSQL",
            c[1].to_lowercase()
        )
    });

    let with_triggers = rewrite_each(&without_udfs, &TRIGGER_START, |block| {
        convert_trigger(block, stats)
    });
    let with_procedures = rewrite_each(&with_triggers, &PROCEDURE_START, |block| {
        convert_procedure(block, stats)
    });

    let views = VIEW_HEADER.replace_all(&with_procedures, |_: &Captures| {
        stats.converted_objects.views += 1;
        "CREATE OR REPLACE VIEW".to_string()
    });

    rewrite_each(&views, &INDEX_START, |block| convert_index(block, stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(text: &str) -> (String, TranspileStats) {
        let mut stats = TranspileStats::default();
        let out = transform_blocks(text, &mut stats);
        (out, stats)
    }

    #[test]
    fn test_balanced_parens() {
        assert_eq!(balanced_parens("(a, (b)) rest"), Some(8));
        assert_eq!(balanced_parens("(a"), None);
        assert_eq!(balanced_parens("a)"), None);
    }

    #[test]
    fn test_before_insert_trigger() {
        let script = "CREATE TRIGGER CUSTOMERS_BI FOR CUSTOMERS\nACTIVE BEFORE INSERT POSITION 0\nAS\nBEGIN\nIF (NEW.ID IS NULL) THEN\nNEW.ID = nextval('gen_customers');\nEND^\n";
        let (out, stats) = run(script);
        let expected = "-- Trigger customers_bi: requires manual review\n\
CREATE OR REPLACE FUNCTION customers_bi_func() RETURNS TRIGGER AS $$\n\
BEGIN\nIF (NEW.ID IS NULL) THEN\nNEW.ID = nextval('gen_customers');\n  RETURN NEW;\nEND;\n$$ LANGUAGE plpgsql;\n\n\
CREATE TRIGGER customers_bi\nBEFORE INSERT ON \"customers\"\nFOR EACH ROW EXECUTE FUNCTION customers_bi_func();\n\n";
        assert_eq!(out, expected);
        assert_eq!(stats.converted_objects.triggers, 1);
        assert!(stats.warnings[0].contains("manual review"));
    }

    #[test]
    fn test_trigger_return_values() {
        let (out, _) = run("CREATE TRIGGER T_AD FOR T AFTER DELETE AS BEGIN EXIT_FLAG = 1; END;");
        assert!(out.contains("RETURN NULL;\nEND;"));

        let (out, _) = run("CREATE TRIGGER T_BD FOR T BEFORE DELETE AS BEGIN IF (OLD.X = 1) THEN RETURN; END;");
        assert!(out.contains("THEN RETURN OLD;"));
        assert!(out.contains("RETURN OLD;\nEND;"));

        let (out, _) = run("CREATE TRIGGER T_BU FOR T BEFORE INSERT OR UPDATE AS BEGIN END");
        assert!(out.contains("BEFORE INSERT OR UPDATE ON \"t\""));
        assert!(out.contains("RETURN NEW;"));
    }

    #[test]
    fn test_trigger_without_table_gets_template() {
        let (out, _) = run("CREATE TRIGGER DB_CONNECT ACTIVE AFTER INSERT AS BEGIN END;");
        assert!(out.contains("-- CREATE TRIGGER db_connect\n-- AFTER INSERT ON <table>"));
    }

    #[test]
    fn test_trigger_declarations_and_exceptions() {
        let script = "CREATE OR ALTER TRIGGER ORDERS_BU FOR ORDERS BEFORE UPDATE AS\nDECLARE VARIABLE CNT INTEGER;\nDECLARE TOTAL NUMERIC(15,2) = 0;\nBEGIN\nSELECT COUNT(*) FROM ITEMS INTO :CNT;\nIF (CNT = 0) THEN EXCEPTION E_NO_ITEMS;\nEND^";
        let (out, stats) = run(script);
        assert!(out.contains("DECLARE\n  cnt INTEGER;\n  total NUMERIC(15,2) = 0;\nBEGIN"));
        assert!(out.contains("INTO CNT;"));
        assert!(out.contains("RAISE EXCEPTION 'e_no_items';"));
        assert_eq!(stats.converted_objects.triggers, 1);
    }

    #[test]
    fn test_nested_blocks_balance() {
        let script = "CREATE TRIGGER T_BI FOR T BEFORE INSERT AS BEGIN IF (1=1) THEN BEGIN X = CASE WHEN A THEN 1 ELSE 2 END; END END^ SELECT 1;";
        let (out, _) = run(script);
        assert!(out.ends_with(" SELECT 1;"));
        assert!(out.contains("END; END\n  RETURN NEW;\nEND;"));
    }

    #[test]
    fn test_malformed_trigger_left_unchanged() {
        let script = "CREATE TRIGGER BROKEN FOR T WHENEVER AS BEGIN END";
        let (out, stats) = run(script);
        assert_eq!(out, script);
        assert_eq!(stats.converted_objects.triggers, 0);
        assert!(stats.warnings[0].contains("not recognized"));

        let script = "CREATE TRIGGER OPEN_T FOR T BEFORE INSERT AS BEGIN X = 1;";
        let (out, stats) = run(script);
        assert_eq!(out, script);
        assert!(stats.warnings[0].contains("no balanced BEGIN/END"));
    }

    #[test]
    fn test_selectable_procedure() {
        let script = "CREATE PROCEDURE GET_ITEMS (MIN_QTY INTEGER)\nRETURNS (ID INTEGER, NAME VARCHAR(60))\nAS\nBEGIN\nFOR SELECT ID, NAME FROM ITEMS WHERE QTY >= :MIN_QTY INTO :ID, :NAME DO\nRETURN NEXT;\nEND^";
        let (out, stats) = run(script);
        let expected = "-- Procedure get_items: requires manual review\n\
CREATE OR REPLACE FUNCTION get_items(MIN_QTY INTEGER) RETURNS TABLE(ID INTEGER, NAME VARCHAR(60)) AS $$\n\
BEGIN\nFOR SELECT ID, NAME FROM ITEMS WHERE QTY >= MIN_QTY INTO ID, NAME DO\nRETURN NEXT;\nEND;\n$$ LANGUAGE plpgsql;\n";
        assert_eq!(out, expected);
        assert_eq!(stats.converted_objects.procedures, 1);
    }

    #[test]
    fn test_procedure_without_outputs_returns_void() {
        let (out, _) = run("CREATE OR ALTER PROCEDURE CLEANUP AS BEGIN DELETE FROM LOG; END;");
        assert!(out.contains("CREATE OR REPLACE FUNCTION cleanup() RETURNS VOID AS $$"));
    }

    #[test]
    fn test_external_function_removed() {
        let (out, stats) = run(
            "DECLARE EXTERNAL FUNCTION RTRIM CSTRING(255) RETURNS CSTRING(255) ENTRY_POINT \u{1}0\u{2} MODULE_NAME \u{1}1\u{2};\nSELECT 1;",
        );
        assert_eq!(
            out,
            "-- External function rtrim removed: reimplement it in PostgreSQL\nSELECT 1;"
        );
        assert_eq!(stats.converted_objects.functions, 1);
        assert_eq!(stats.warnings.len(), 1);
    }

    #[test]
    fn test_views_counted_and_normalized() {
        let (out, stats) = run("CREATE OR ALTER VIEW V1 AS SELECT 1;\nCREATE VIEW V2 AS SELECT 2;");
        assert_eq!(
            out,
            "CREATE OR REPLACE VIEW V1 AS SELECT 1;\nCREATE OR REPLACE VIEW V2 AS SELECT 2;"
        );
        assert_eq!(stats.converted_objects.views, 2);
    }

    #[test]
    fn test_index_rewrite() {
        let (out, stats) = run("CREATE UNIQUE ASC INDEX IDX_NAME ON CUSTOMERS (NAME, CITY);\nCREATE DESCENDING INDEX IDX_DT ON ORDERS (CREATED);");
        assert_eq!(
            out,
            "CREATE UNIQUE INDEX \"idx_name\" ON \"customers\" (NAME, CITY);\nCREATE INDEX \"idx_dt\" ON \"orders\" (CREATED DESC);"
        );
        assert_eq!(stats.converted_objects.indexes, 2);
    }

    #[test]
    fn test_expression_index_kept() {
        let (out, _) = run("CREATE INDEX IDX_UP ON T ((UPPER(NAME)));");
        assert_eq!(out, "CREATE INDEX \"idx_up\" ON \"t\" ((UPPER(NAME)));");
    }
}
