// src/merge/mod.rs

use std::collections::HashMap;

use anyhow::{bail, Result};
use tracing::{info, warn};

use crate::table::{Table, FILE_ID_COLUMN};

/// The two join results of a run; either side can be absent.
#[derive(Debug, Default)]
pub struct MergedOutputs {
    pub pdv: Option<Table>,
    pub consultor: Option<Table>,
}

/// Inner equi-join on the text of `key`, left-major ordering.
///
/// Every left row pairs with every matching right row, in right-table order,
/// so keys repeated on both sides fan out multiplicatively. The key column
/// appears once, at its left-table position; any other column name present
/// on both sides is suffixed `_x` (left) and `_y` (right). A side without
/// the key column is an error.
pub fn inner_join(left: &Table, right: &Table, key: &str) -> Result<Table> {
    let Some(left_key) = left.column_index(key) else {
        bail!("left table has no {key} column");
    };
    let Some(right_key) = right.column_index(key) else {
        bail!("right table has no {key} column");
    };

    let shared: Vec<&String> = left
        .headers()
        .iter()
        .filter(|h| *h != key && right.column_index(h).is_some())
        .collect();

    let mut headers: Vec<String> = Vec::with_capacity(left.headers().len() + right.headers().len() - 1);
    for header in left.headers() {
        if header != key && shared.iter().any(|s| *s == header) {
            headers.push(format!("{header}_x"));
        } else {
            headers.push(header.clone());
        }
    }
    for header in right.headers() {
        if header == key {
            continue;
        }
        if shared.iter().any(|s| *s == header) {
            headers.push(format!("{header}_y"));
        } else {
            headers.push(header.clone());
        }
    }

    let mut by_key: HashMap<String, Vec<usize>> = HashMap::new();
    for (i, row) in right.rows().iter().enumerate() {
        by_key
            .entry(row[right_key].as_text().into_owned())
            .or_default()
            .push(i);
    }

    let mut out = Table::new(headers);
    for left_row in left.rows() {
        let Some(matches) = by_key.get(left_row[left_key].as_text().as_ref()) else {
            continue;
        };
        for &ri in matches {
            let right_row = &right.rows()[ri];
            let mut cells = Vec::with_capacity(left_row.len() + right_row.len() - 1);
            cells.extend(left_row.iter().cloned());
            for (ci, cell) in right_row.iter().enumerate() {
                if ci != right_key {
                    cells.push(cell.clone());
                }
            }
            out.push_row(cells);
        }
    }
    Ok(out)
}

/// Join the transformed FILTROS base against the PDV and CONSULTOR tables on
/// [`FILE_ID_COLUMN`]. A missing side, or a side the join rejects, yields an
/// absent output rather than an error, so one broken tab never blocks the
/// other.
pub fn merge_outputs(
    base: Option<&Table>,
    pdv: Option<&Table>,
    consultor: Option<&Table>,
) -> MergedOutputs {
    let Some(base) = base else {
        warn!("no FILTROS base table, skipping both merges");
        return MergedOutputs::default();
    };
    MergedOutputs {
        pdv: join_side(base, pdv, "PDV"),
        consultor: join_side(base, consultor, "CONSULTOR"),
    }
}

fn join_side(base: &Table, side: Option<&Table>, label: &str) -> Option<Table> {
    let Some(right) = side else {
        info!(side = label, "no table to merge");
        return None;
    };
    match inner_join(base, right, FILE_ID_COLUMN) {
        Ok(joined) => {
            info!(side = label, rows = joined.row_count(), "merge complete");
            Some(joined)
        }
        Err(e) => {
            warn!(side = label, error = %e, "merge skipped");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Cell;

    fn keyed(headers: &[&str], rows: &[&[&str]]) -> Table {
        let mut t = Table::new(headers.iter().map(|h| (*h).to_owned()).collect());
        for row in rows {
            t.push_row(row.iter().map(|c| Cell::from(*c)).collect());
        }
        t
    }

    #[test]
    fn joins_on_key_and_keeps_left_order() {
        let left = keyed(
            &["FILTRO", FILE_ID_COLUMN],
            &[&["atual", "b"], &["atual", "a"]],
        );
        let right = keyed(
            &[FILE_ID_COLUMN, "PDV"],
            &[&["a", "001"], &["b", "002"]],
        );
        let out = inner_join(&left, &right, FILE_ID_COLUMN).unwrap();

        assert_eq!(out.headers(), ["FILTRO", FILE_ID_COLUMN, "PDV"]);
        assert_eq!(out.row_count(), 2);
        // Left order wins: "b" first.
        assert_eq!(out.cell(0, FILE_ID_COLUMN), Some(&Cell::from("b")));
        assert_eq!(out.cell(0, "PDV"), Some(&Cell::from("002")));
        assert_eq!(out.cell(1, "PDV"), Some(&Cell::from("001")));
    }

    #[test]
    fn unmatched_keys_drop_from_both_sides() {
        let left = keyed(&[FILE_ID_COLUMN], &[&["only-left"], &["both"]]);
        let right = keyed(
            &[FILE_ID_COLUMN, "V"],
            &[&["both", "v"], &["only-right", "w"]],
        );
        let out = inner_join(&left, &right, FILE_ID_COLUMN).unwrap();
        assert_eq!(out.row_count(), 1);
        assert_eq!(out.cell(0, FILE_ID_COLUMN), Some(&Cell::from("both")));
    }

    #[test]
    fn join_fans_out_per_matching_key() {
        // 2 left rows x 3 right rows under one key = 6 output rows.
        let left = keyed(
            &[FILE_ID_COLUMN, "L"],
            &[&["k", "l1"], &["k", "l2"]],
        );
        let right = keyed(
            &[FILE_ID_COLUMN, "R"],
            &[&["k", "r1"], &["k", "r2"], &["k", "r3"]],
        );
        let out = inner_join(&left, &right, FILE_ID_COLUMN).unwrap();

        assert_eq!(out.row_count(), 6);
        assert_eq!(out.headers(), [FILE_ID_COLUMN, "L", "R"]);
        let pairs: Vec<(String, String)> = out
            .rows()
            .iter()
            .map(|r| (r[1].as_text().into_owned(), r[2].as_text().into_owned()))
            .collect();
        let expected: Vec<(String, String)> = [
            ("l1", "r1"),
            ("l1", "r2"),
            ("l1", "r3"),
            ("l2", "r1"),
            ("l2", "r2"),
            ("l2", "r3"),
        ]
        .iter()
        .map(|(l, r)| ((*l).to_string(), (*r).to_string()))
        .collect();
        assert_eq!(pairs, expected);
    }

    #[test]
    fn colliding_columns_get_side_suffixes() {
        let left = keyed(
            &[FILE_ID_COLUMN, "source_subfolder"],
            &[&["a", "01"]],
        );
        let right = keyed(
            &[FILE_ID_COLUMN, "source_subfolder", "CONSULTOR"],
            &[&["a", "01", "Maria"]],
        );
        let out = inner_join(&left, &right, FILE_ID_COLUMN).unwrap();
        assert_eq!(
            out.headers(),
            [
                FILE_ID_COLUMN,
                "source_subfolder_x",
                "source_subfolder_y",
                "CONSULTOR"
            ]
        );
    }

    #[test]
    fn missing_key_column_is_an_error() {
        let left = keyed(&["A"], &[&["x"]]);
        let right = keyed(&[FILE_ID_COLUMN], &[&["x"]]);
        assert!(inner_join(&left, &right, FILE_ID_COLUMN).is_err());
        assert!(inner_join(&right, &left, FILE_ID_COLUMN).is_err());
    }

    #[test]
    fn merge_outputs_isolates_each_side() {
        let base = keyed(&[FILE_ID_COLUMN, "FILTRO"], &[&["a", "atual"]]);
        let pdv = keyed(&[FILE_ID_COLUMN, "PDV"], &[&["a", "001"]]);
        // CONSULTOR lost its key column somewhere upstream.
        let consultor = keyed(&["CONSULTOR"], &[&["Maria"]]);

        let merged = merge_outputs(Some(&base), Some(&pdv), Some(&consultor));
        assert_eq!(merged.pdv.map(|t| t.row_count()), Some(1));
        assert!(merged.consultor.is_none());
    }

    #[test]
    fn absent_side_skips_only_that_merge() {
        let base = keyed(&[FILE_ID_COLUMN, "FILTRO"], &[&["a", "atual"]]);
        let consultor = keyed(&[FILE_ID_COLUMN, "CONSULTOR"], &[&["a", "Maria"]]);

        let merged = merge_outputs(Some(&base), None, Some(&consultor));
        assert!(merged.pdv.is_none());
        let joined = merged.consultor.unwrap();
        assert_eq!(joined.row_count(), 1);
        assert_eq!(joined.cell(0, "CONSULTOR"), Some(&Cell::from("Maria")));
    }

    #[test]
    fn absent_base_yields_no_outputs() {
        let pdv = keyed(&[FILE_ID_COLUMN], &[&["a"]]);
        let merged = merge_outputs(None, Some(&pdv), None);
        assert!(merged.pdv.is_none());
        assert!(merged.consultor.is_none());
    }
}
