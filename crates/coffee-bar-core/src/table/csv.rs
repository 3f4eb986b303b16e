use super::{TableColumn, TableRow};

pub const CSV_DELIMITER: char = ',';

/// Quotes a field when it contains the delimiter, a quote, or a line break.
pub fn escape_field(value: &str) -> String {
    let needs_quotes = value
        .chars()
        .any(|ch| ch == CSV_DELIMITER || ch == '"' || ch == '\n' || ch == '\r');
    if needs_quotes {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_owned()
    }
}

pub(super) fn render<R: TableRow>(rows: &[&R]) -> Option<String> {
    if rows.is_empty() {
        return None;
    }

    let delimiter = CSV_DELIMITER.to_string();
    let header = R::COLUMNS
        .iter()
        .map(|column| escape_field(column.header()))
        .collect::<Vec<_>>()
        .join(&delimiter);

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(header);
    for row in rows {
        lines.push(
            R::COLUMNS
                .iter()
                .map(|column| escape_field(&row.cell(*column)))
                .collect::<Vec<_>>()
                .join(&delimiter),
        );
    }
    Some(lines.join("\n"))
}
