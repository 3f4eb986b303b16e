//! Client-side views over an already-fetched page of entities.
//!
//! An [`EntityTable`] owns the fetched rows in server order and derives the
//! visible view from a case-insensitive text filter and an optional single
//! column sort. Sorting is stable, so rows that compare equal keep their
//! server order in both directions.

mod csv;
pub mod domains;
pub mod users;

use chrono::{DateTime, NaiveDate, Utc};

pub use csv::{escape_field, CSV_DELIMITER};

pub trait TableColumn: Copy + Eq + std::fmt::Debug + 'static {
    fn header(self) -> &'static str;
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SortKey {
    Text(String),
    Timestamp(i64),
}

impl SortKey {
    pub fn text(value: &str) -> Self {
        Self::Text(value.to_lowercase())
    }

    pub fn timestamp(value: Option<&str>) -> Self {
        Self::Timestamp(value.map(timestamp_millis).unwrap_or(0))
    }
}

pub trait TableRow {
    type Column: TableColumn;

    /// Columns in display and export order.
    const COLUMNS: &'static [Self::Column];

    fn filter_fields(&self) -> Vec<String>;
    fn sort_key(&self, column: Self::Column) -> SortKey;
    fn cell(&self, column: Self::Column) -> String;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EntityTable<R: TableRow> {
    rows: Vec<R>,
    filter: String,
    sort: Option<(R::Column, SortDirection)>,
}

impl<R: TableRow> EntityTable<R> {
    pub fn new(rows: Vec<R>) -> Self {
        Self {
            rows,
            filter: String::new(),
            sort: None,
        }
    }

    /// Replaces the rows after a refetch; filter and sort are kept.
    pub fn replace_rows(&mut self, rows: Vec<R>) {
        self.rows = rows;
    }

    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn set_filter(&mut self, filter: impl Into<String>) {
        self.filter = filter.into();
    }

    pub fn sort(&self) -> Option<(R::Column, SortDirection)> {
        self.sort
    }

    pub fn sort_by(&mut self, column: R::Column, direction: SortDirection) {
        self.sort = Some((column, direction));
    }

    /// Selecting the active column flips its direction; a new column starts ascending.
    pub fn toggle_sort(&mut self, column: R::Column) {
        self.sort = match self.sort {
            Some((current, direction)) if current == column => Some((column, direction.toggled())),
            _ => Some((column, SortDirection::Ascending)),
        };
    }

    pub fn view(&self) -> Vec<&R> {
        self.view_where(|_| true)
    }

    /// Like [`Self::view`], with an extra predicate applied before sorting.
    pub fn view_where(&self, predicate: impl Fn(&R) -> bool) -> Vec<&R> {
        let needle = self.filter.trim().to_lowercase();
        let mut visible: Vec<&R> = self
            .rows
            .iter()
            .filter(|row| predicate(row))
            .filter(|row| {
                needle.is_empty()
                    || row
                        .filter_fields()
                        .iter()
                        .any(|field| field.to_lowercase().contains(&needle))
            })
            .collect();

        if let Some((column, direction)) = self.sort {
            visible.sort_by(|left, right| {
                let ordering = left.sort_key(column).cmp(&right.sort_key(column));
                match direction {
                    SortDirection::Ascending => ordering,
                    SortDirection::Descending => ordering.reverse(),
                }
            });
        }
        visible
    }

    pub fn can_export(&self) -> bool {
        !self.view().is_empty()
    }

    /// CSV of the current view with a header row. `None` when the view is empty.
    pub fn export_csv(&self) -> Option<String> {
        csv::render(&self.view())
    }
}

/// Milliseconds since the epoch for RFC 3339 timestamps, bare dates, or
/// numeric epoch milliseconds. Unparseable input sorts as 0.
pub fn timestamp_millis(raw: &str) -> i64 {
    parse_timestamp(raw)
        .map(|timestamp| timestamp.timestamp_millis())
        .unwrap_or(0)
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(millis) = raw.parse::<i64>() {
        return DateTime::from_timestamp_millis(millis);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Calendar date for display; unparseable input is shown as received.
pub fn display_date(raw: &str) -> String {
    parse_timestamp(raw)
        .map(|timestamp| timestamp.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| raw.to_owned())
}
