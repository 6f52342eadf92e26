use tracing::info;

use super::{Cell, Table};

/// Stack per-file fragments of one tab into a single table.
///
/// Columns are the union of all fragment columns, ordered by first
/// appearance across the fragment list; rows keep fragment order and a
/// fragment without some column contributes `Cell::Empty` there. Returns
/// `None` when no fragment was collected at all.
pub fn concat_fragments(fragments: Vec<Table>, tab: &str) -> Option<Table> {
    if fragments.is_empty() {
        info!(tab, "no fragments collected for tab");
        return None;
    }

    let mut headers: Vec<String> = Vec::new();
    for fragment in &fragments {
        for header in fragment.headers() {
            if !headers.contains(header) {
                headers.push(header.clone());
            }
        }
    }

    let mut out = Table::new(headers);
    for fragment in fragments {
        // Position of each output column inside this fragment, if present.
        let positions: Vec<Option<usize>> = out
            .headers()
            .iter()
            .map(|h| fragment.column_index(h))
            .collect();
        for row in fragment.rows() {
            let cells = positions
                .iter()
                .map(|p| p.map_or(Cell::Empty, |i| row[i].clone()))
                .collect();
            out.push_row(cells);
        }
    }

    info!(tab, rows = out.row_count(), columns = out.headers().len(), "concatenated fragments");
    Some(out)
}
