use tracing::{info, warn};

use crate::table::{Cell, Table};

/// Knobs for the FILTROS reshape. `Default` carries the literals the report
/// format bakes in; tests override them to probe edge cases.
#[derive(Debug, Clone)]
pub struct FiltrosConfig {
    /// Column holding the filter category.
    pub category_column: String,
    /// Category value that marks current-period rows.
    pub category_value: String,
    /// Composite date-range column to split.
    pub selection_column: String,
    /// Name for the first split segment.
    pub start_column: String,
    /// Name for the second split segment.
    pub end_column: String,
    pub delimiter: char,
}

impl Default for FiltrosConfig {
    fn default() -> Self {
        FiltrosConfig {
            category_column: "FILTRO".to_owned(),
            category_value: "PERÍODO ATUAL".to_owned(),
            selection_column: "SELEÇÃO".to_owned(),
            start_column: "DTA INI".to_owned(),
            end_column: "DTA FIM".to_owned(),
            delimiter: '-',
        }
    }
}

/// Keep only current-period rows and split the selection range into start and
/// end columns.
///
/// The split takes the first two `delimiter` segments of the selection text,
/// untrimmed; the composite column is then dropped. When no row splits into
/// at least two segments the composite column is kept as-is, and when the
/// category or selection column is missing the table passes through with a
/// warning. `None` in, `None` out.
pub fn transform_filtros(input: Option<Table>, config: &FiltrosConfig) -> Option<Table> {
    let Some(mut table) = input else {
        info!("no FILTROS table, skipping filter transform");
        return None;
    };

    let Some(category) = table.column_index(&config.category_column) else {
        warn!(column = %config.category_column, "FILTROS table has no category column, passing through");
        return Some(table);
    };
    table.retain_rows(|row| row[category].as_text() == config.category_value);
    info!(rows = table.row_count(), value = %config.category_value, "kept current-period rows");

    let Some(selection) = table.column_index(&config.selection_column) else {
        warn!(column = %config.selection_column, "FILTROS table has no selection column, skipping date split");
        return Some(table);
    };

    // First two delimiter segments of every selection value. A value without
    // the delimiter yields its whole text and an empty second segment.
    let split: Vec<(String, Option<String>)> = table
        .rows()
        .iter()
        .map(|row| {
            let text = row[selection].as_text().into_owned();
            let mut parts = text.split(config.delimiter);
            let first = parts.next().unwrap_or_default().to_owned();
            let second = parts.next().map(str::to_owned);
            (first, second)
        })
        .collect();

    if !split.iter().any(|(_, second)| second.is_some()) {
        warn!(
            column = %config.selection_column,
            "no selection value splits into two segments, keeping the composite column"
        );
        return Some(table);
    }

    let (starts, ends): (Vec<Cell>, Vec<Cell>) = split
        .into_iter()
        .map(|(first, second)| {
            (
                Cell::Text(first),
                second.map_or(Cell::Empty, Cell::Text),
            )
        })
        .unzip();

    table.drop_columns(&[config.selection_column.clone()]);
    table.push_column(config.start_column.clone(), starts);
    table.push_column(config.end_column.clone(), ends);
    Some(table)
}
