//! Domain inlining.
//!
//! `CREATE DOMAIN` statements are removed and every later use of the domain
//! name is replaced by its base type. Domain constraints and defaults are not
//! carried over; each inlined domain produces a warning.

use once_cell::sync::Lazy;
use regex::{NoExpand, Regex};

static CREATE_DOMAIN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)\bCREATE\s+DOMAIN\s+(\w+)\s+(?:AS\s+)?([^;]*);?")
        .expect("valid domain regex")
});

static BASE_TYPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?ix)^\s*(
            BLOB(?:\s+SUB_TYPE\s+-?\w+)?(?:\s+SEGMENT\s+SIZE\s+\d+)?
            | (?:VARCHAR|CHAR|CHARACTER\s+VARYING|CHARACTER|CSTRING)\s*\(\s*\d+\s*\)
            | (?:NUMERIC|DECIMAL)\s*\(\s*\d+\s*(?:,\s*\d+\s*)?\)
            | DOUBLE\s+PRECISION
            | TIMESTAMP | TIME | DATE
            | BIGINT | SMALLINT | INTEGER | INT
            | FLOAT | REAL | BOOLEAN | CHAR
        )",
    )
    .expect("valid base type regex")
});

/// Result of the domain stage.
#[derive(Debug, Default)]
pub struct DomainOutcome {
    pub text: String,
    pub inlined: usize,
    pub warnings: Vec<String>,
}

/// Remove domain definitions and substitute their base types.
pub fn inline_domains(text: &str) -> DomainOutcome {
    let mut outcome = DomainOutcome::default();
    let mut domains: Vec<(String, String)> = Vec::new();

    let stripped = CREATE_DOMAIN.replace_all(text, |caps: &regex::Captures| {
        let name = caps[1].to_string();
        match BASE_TYPE.captures(&caps[2]) {
            Some(base) => {
                let base_type = collapse_whitespace(&base[1]);
                outcome.warnings.push(format!(
                    "Domain {} inlined as {}; its constraints and default must be added by hand",
                    name, base_type
                ));
                domains.push((name, base_type));
                String::new()
            }
            None => {
                outcome.warnings.push(format!(
                    "Domain {} has no recognizable base type and was left unchanged",
                    name
                ));
                caps[0].to_string()
            }
        }
    });

    let mut current = stripped.into_owned();
    for (name, base_type) in &domains {
        let Ok(usage) = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(name))) else {
            continue;
        };
        current = usage
            .replace_all(&current, NoExpand(base_type))
            .into_owned();
    }

    outcome.inlined = domains.len();
    outcome.text = current;
    outcome
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
