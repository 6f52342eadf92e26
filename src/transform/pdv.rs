// src/transform/pdv.rs
//
// The PDV tab arrives with merged two-column headers: synthesized
// `Unnamed: N` placeholders carry the "current period" half of each
// indicator and the labelled column its "previous period" half. This module
// renames both halves to explicit names, drops the spacer columns and
// removes the repeated in-band header and subtotal rows.

use tracing::{info, warn};

use crate::table::{Table, SOURCE_SUBFOLDER_COLUMN};

const COLUMN_RENAMES: [(&str, &str); 17] = [
    ("Unnamed: 0", "PDV"),
    ("RECEITA (R$)", "RECEITA PERÍODO ANTERIOR"),
    ("Unnamed: 2", "RECEITA PERÍODO ATUAL"),
    ("RECEITA MOBSHOP (R$)", "RECEITA MOBSHOP PERÍODO ANTERIOR"),
    ("Unnamed: 5", "RECEITA MOBSHOP PERÍODO ATUAL"),
    // The source header really does carry a trailing space.
    ("BOLETO MÉDIO ", "BOLETO MÉDIO PERÍODO ANTERIOR"),
    ("Unnamed: 8", "BOLETO MÉDIO PERÍODO ATUAL"),
    ("BOLETO MÉDIO MOBSHOP", "BOLETO MÉDIO MOBSHOP PERÍODO ANTERIOR"),
    ("Unnamed: 11", "BOLETO MÉDIO MOBSHOP PERÍODO ATUAL"),
    ("ITENS POR BOLETO", "ITENS POR BOLETO PERÍODO ANTERIOR"),
    ("Unnamed: 14", "ITENS POR BOLETO PERÍODO ATUAL"),
    ("QUANTIDADE DE BOLETOS", "QUANTIDADE DE BOLETOS PERÍODO ANTERIOR"),
    ("Unnamed: 17", "QUANTIDADE DE BOLETOS PERÍODO ATUAL"),
    ("PREÇO MÉDIO", "PREÇO MÉDIO PERÍODO ANTERIOR"),
    ("Unnamed: 20", "PREÇO MÉDIO PERÍODO ATUAL"),
    ("QUANTIDADE DE ITENS", "QUANTIDADE DE ITENS PERÍODO ANTERIOR"),
    ("Unnamed: 23", "QUANTIDADE DE ITENS PERÍODO ATUAL"),
];

/// Spacer columns between indicator pairs, plus the scan tag the merged
/// output does not need.
const DROPPED_COLUMNS: [&str; 8] = [
    "Unnamed: 3",
    "Unnamed: 6",
    "Unnamed: 9",
    "Unnamed: 12",
    "Unnamed: 15",
    "Unnamed: 18",
    "Unnamed: 21",
    "Unnamed: 24",
];

/// Rename map, drop list and marker rows for the PDV cleanup.
#[derive(Debug, Clone)]
pub struct PdvConfig {
    pub renames: Vec<(String, String)>,
    pub drop_columns: Vec<String>,
    /// Column whose text decides whether a row is data or noise.
    pub key_column: String,
    /// Key values of the in-band header echo and subtotal rows.
    pub excluded_markers: Vec<String>,
}

impl Default for PdvConfig {
    fn default() -> Self {
        PdvConfig {
            renames: COLUMN_RENAMES
                .iter()
                .map(|(from, to)| ((*from).to_owned(), (*to).to_owned()))
                .collect(),
            drop_columns: DROPPED_COLUMNS
                .iter()
                .map(|c| (*c).to_owned())
                .chain([SOURCE_SUBFOLDER_COLUMN.to_owned()])
                .collect(),
            key_column: "PDV".to_owned(),
            excluded_markers: vec!["PDV".to_owned(), "TOTAL".to_owned()],
        }
    }
}

/// Clean the concatenated PDV table: rename indicator columns, drop spacer
/// columns and remove header-echo and subtotal rows. Missing columns are
/// tolerated; `None` in, `None` out.
pub fn transform_pdv(input: Option<Table>, config: &PdvConfig) -> Option<Table> {
    let Some(mut table) = input else {
        info!("no PDV table, skipping PDV transform");
        return None;
    };

    table.rename_columns(&config.renames);
    table.drop_columns(&config.drop_columns);

    let Some(key) = table.column_index(&config.key_column) else {
        warn!(column = %config.key_column, "PDV table has no key column, keeping all rows");
        return Some(table);
    };
    let before = table.row_count();
    table.retain_rows(|row| {
        let value = row[key].as_text();
        !config.excluded_markers.iter().any(|m| *m == value)
    });
    info!(
        rows = table.row_count(),
        removed = before - table.row_count(),
        "cleaned PDV table"
    );
    Some(table)
}
