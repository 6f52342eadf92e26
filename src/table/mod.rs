// src/table/mod.rs

pub mod concat;

use std::borrow::Cow;

use chrono::NaiveDateTime;

/// Column injected by the scanner: source file's base name, no extension.
/// This is the join key of the whole pipeline.
pub const FILE_ID_COLUMN: &str = "file_id";

/// Column injected by the scanner: name of the directory immediately
/// containing the source file. Informational only.
pub const SOURCE_SUBFOLDER_COLUMN: &str = "source_subfolder";

/// A single spreadsheet value.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    DateTime(NaiveDateTime),
}

impl Cell {
    /// Text view of the value, used for comparisons, splitting and join keys.
    /// `Empty` coerces to the empty string; numbers and datetimes format
    /// plainly (`12.5`, `2025-01-31 00:00:00`).
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Cell::Empty => Cow::Borrowed(""),
            Cell::Bool(b) => Cow::Owned(b.to_string()),
            Cell::Int(i) => Cow::Owned(i.to_string()),
            Cell::Float(f) => Cow::Owned(f.to_string()),
            Cell::Text(s) => Cow::Borrowed(s),
            Cell::DateTime(dt) => Cow::Owned(dt.format("%Y-%m-%d %H:%M:%S").to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_owned())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Int(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Float(value)
    }
}

/// An in-memory tab: ordered column names plus rows of cells.
/// Every row is exactly `headers.len()` wide; `push_row` pads or truncates
/// to keep that invariant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(headers: Vec<String>) -> Self {
        Table {
            headers,
            rows: Vec::new(),
        }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Index of the first column named `name`, if any.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Cell at (`row`, column `name`), for lookups and assertions.
    pub fn cell(&self, row: usize, name: &str) -> Option<&Cell> {
        let col = self.column_index(name)?;
        self.rows.get(row).map(|r| &r[col])
    }

    /// Append a row, padded with `Cell::Empty` (or truncated) to the header
    /// width.
    pub fn push_row(&mut self, mut row: Vec<Cell>) {
        row.resize(self.headers.len(), Cell::Empty);
        self.rows.push(row);
    }

    /// Set every row's `name` cell to a copy of `value`, appending the column
    /// if it does not exist yet. This is the scanner's tagging operation.
    pub fn set_column(&mut self, name: &str, value: Cell) {
        match self.column_index(name) {
            Some(col) => {
                for row in &mut self.rows {
                    row[col] = value.clone();
                }
            }
            None => {
                self.headers.push(name.to_owned());
                for row in &mut self.rows {
                    row.push(value.clone());
                }
            }
        }
    }

    /// Append a whole column. `cells` is padded with `Cell::Empty` (or
    /// truncated) to the current row count.
    pub fn push_column(&mut self, name: impl Into<String>, mut cells: Vec<Cell>) {
        cells.resize(self.rows.len(), Cell::Empty);
        self.headers.push(name.into());
        for (row, cell) in self.rows.iter_mut().zip(cells) {
            row.push(cell);
        }
    }

    /// Rename columns by `(from, to)` pairs; columns without a pair keep
    /// their name.
    pub fn rename_columns(&mut self, renames: &[(String, String)]) {
        for header in &mut self.headers {
            if let Some((_, to)) = renames.iter().find(|(from, _)| from == header.as_str()) {
                *header = to.clone();
            }
        }
    }

    /// Drop every listed column that exists; missing names are ignored.
    pub fn drop_columns(&mut self, names: &[String]) {
        let keep: Vec<bool> = self
            .headers
            .iter()
            .map(|h| !names.contains(h))
            .collect();
        if keep.iter().all(|k| *k) {
            return;
        }
        let mut keep_flags = keep.iter();
        self.headers.retain(|_| *keep_flags.next().unwrap_or(&true));
        for row in &mut self.rows {
            let mut cells = keep.iter();
            row.retain(|_| *cells.next().unwrap_or(&true));
        }
    }

    /// Keep only rows for which `predicate` returns true, preserving order.
    pub fn retain_rows<F>(&mut self, mut predicate: F)
    where
        F: FnMut(&[Cell]) -> bool,
    {
        self.rows.retain(|row| predicate(row));
    }
}
