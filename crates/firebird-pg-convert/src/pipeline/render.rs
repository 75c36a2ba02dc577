//! INSERT and COPY rendering for one page of rows.

use crate::core::{quote_ident, quote_list, Row, SqlValue, TableSchema};
use crate::serialize::{serialize_for_column, SerializeMode, BULK_NULL};

/// Column list for a page: every key present in any row, in schema order.
///
/// Keys the schema does not know follow in first-seen order. A row that lacks
/// one of the listed keys renders NULL for it.
pub fn page_columns(rows: &[Row], schema: &TableSchema) -> Vec<String> {
    let present = |name: &str| {
        rows.iter()
            .any(|r| r.keys().any(|k| k.eq_ignore_ascii_case(name)))
    };
    let mut columns: Vec<String> = schema
        .ordered_columns()
        .into_iter()
        .filter(|c| present(&c.name))
        .map(|c| c.name.clone())
        .collect();

    for row in rows {
        for key in row.keys() {
            if !columns.iter().any(|c| c.eq_ignore_ascii_case(key)) {
                columns.push(key.clone());
            }
        }
    }
    columns
}

fn lookup<'r>(row: &'r Row, name: &str) -> Option<&'r SqlValue<'static>> {
    row.get(name).or_else(|| {
        row.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    })
}

fn row_values(
    row: &Row,
    columns: &[String],
    schema: &TableSchema,
    mode: SerializeMode,
) -> Vec<String> {
    columns
        .iter()
        .map(|name| match lookup(row, name) {
            Some(value) => serialize_for_column(value, schema.column(name), mode),
            None => match mode {
                SerializeMode::SqlLiteral => "NULL".to_string(),
                SerializeMode::BulkField => BULK_NULL.to_string(),
            },
        })
        .collect()
}

/// Multi-row INSERT statements, `chunk_size` rows each, separated by a blank line.
pub fn render_inserts(rows: &[Row], schema: &TableSchema, chunk_size: usize) -> String {
    if rows.is_empty() {
        return String::new();
    }
    let columns = page_columns(rows, schema);
    let head = format!(
        "INSERT INTO {} ({}) \nVALUES \n",
        quote_ident(&schema.name),
        quote_list(&columns)
    );

    rows.chunks(chunk_size.max(1))
        .map(|chunk| {
            let tuples: Vec<String> = chunk
                .iter()
                .map(|row| {
                    format!(
                        "  ({})",
                        row_values(row, &columns, schema, SerializeMode::SqlLiteral).join(", ")
                    )
                })
                .collect();
            format!("{}{};", head, tuples.join(",\n"))
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// A `COPY ... FROM STDIN` block in CSV format, terminated by `\.`.
pub fn render_copy(rows: &[Row], schema: &TableSchema) -> String {
    if rows.is_empty() {
        return String::new();
    }
    let columns = page_columns(rows, schema);
    let mut out = format!(
        "COPY {} ({}) FROM STDIN WITH (FORMAT csv, DELIMITER ',', QUOTE '\"', ESCAPE '\"', NULL '\\N', ENCODING 'UTF8');\n",
        quote_ident(&schema.name),
        quote_list(&columns)
    );
    for row in rows {
        out.push_str(&row_values(row, &columns, schema, SerializeMode::BulkField).join(","));
        out.push('\n');
    }
    out.push_str("\\.");
    out
}
