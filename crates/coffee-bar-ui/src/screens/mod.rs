pub mod domains;
pub mod preferences;
pub mod users;

use coffee_bar_core::{CoreError, TableColumn, TableRow};

pub use domains::DomainsScreen;
pub use preferences::PreferencesScreen;
pub use users::UsersScreen;

const COLUMN_GAP: &str = "  ";

/// Plain-text table with a header row and padded columns.
pub fn render_rows<R: TableRow>(rows: &[&R]) -> Vec<String> {
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| R::COLUMNS.iter().map(|column| row.cell(*column)).collect())
        .collect();
    let widths: Vec<usize> = R::COLUMNS
        .iter()
        .enumerate()
        .map(|(index, column)| {
            cells
                .iter()
                .map(|row| row[index].chars().count())
                .chain(std::iter::once(column.header().chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let format_line = |values: Vec<&str>| -> String {
        values
            .iter()
            .zip(&widths)
            .map(|(value, width)| format!("{value:<width$}"))
            .collect::<Vec<_>>()
            .join(COLUMN_GAP)
            .trim_end()
            .to_owned()
    };

    let mut lines = vec![format_line(
        R::COLUMNS.iter().map(|column| column.header()).collect(),
    )];
    lines.extend(
        cells
            .iter()
            .map(|row| format_line(row.iter().map(String::as_str).collect())),
    );
    lines
}

/// Inline banner for a failed fetch, naming the next action.
pub fn fetch_error_line(error: &CoreError) -> String {
    format!("Failed to load: {error} ({})", error.next_action())
}
