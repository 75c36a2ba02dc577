//! Identifier validation and quoting.
//!
//! Every identifier written to the output script is lower-cased and wrapped in
//! double quotes, whether or not it collides with a PostgreSQL keyword. Firebird
//! stores unquoted names upper-case; folding them keeps the generated schema
//! usable with unquoted lower-case names on the PostgreSQL side.

use crate::error::{ConvertError, Result};

/// Maximum identifier length accepted from a provider.
const MAX_IDENTIFIER_LENGTH: usize = 128;

/// Validate an identifier received from a provider.
///
/// Rejects empty names, names containing NUL bytes, and names longer than
/// [`MAX_IDENTIFIER_LENGTH`] bytes.
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(ConvertError::Config(
            "Identifier cannot be empty".to_string(),
        ));
    }

    if name.contains('\0') {
        return Err(ConvertError::Config(format!(
            "Identifier contains null byte: {:?}",
            name
        )));
    }

    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(ConvertError::Config(format!(
            "Identifier exceeds maximum length of {} bytes (got {} bytes): {:?}",
            MAX_IDENTIFIER_LENGTH,
            name.len(),
            name
        )));
    }

    Ok(())
}

/// Lower-case and double-quote a PostgreSQL identifier.
///
/// ```ignore
/// assert_eq!(quote_ident("CUSTOMER"), "\"customer\"");
/// assert_eq!(quote_ident("A\"B"), "\"a\"\"b\"");
/// ```
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.trim().to_lowercase().replace('"', "\"\""))
}

/// Quote and comma-join a column list.
pub fn quote_list<S: AsRef<str>>(names: &[S]) -> String {
    names
        .iter()
        .map(|n| quote_ident(n.as_ref()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Escape text for use inside a single-quoted SQL string.
pub fn escape_single_quotes(s: &str) -> String {
    s.replace('\'', "''")
}
