// src/pipeline/mod.rs

use std::path::PathBuf;

use anyhow::Result;
use serde::Serialize;
use tracing::{error, info};

use crate::export::export_table;
use crate::merge::merge_outputs;
use crate::scan::{scan_reports, ScannedTabs, TAB_CONSULTOR, TAB_FILTROS, TAB_PDV};
use crate::table::concat::concat_fragments;
use crate::table::Table;
use crate::transform::{transform_filtros, transform_pdv, FiltrosConfig, PdvConfig};

/// Where to read the archive, where to write the merged workbooks, and the
/// transform literals to apply.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub root: PathBuf,
    pub pdv_output: PathBuf,
    pub consultor_output: PathBuf,
    pub filtros_config: FiltrosConfig,
    pub pdv_config: PdvConfig,
}

impl RunOptions {
    /// The paths the tool uses when invoked with no arguments.
    pub fn with_default_paths() -> Self {
        RunOptions {
            root: PathBuf::from("relatorios"),
            pdv_output: PathBuf::from("output_pdv.xlsx"),
            consultor_output: PathBuf::from("output_consultor.xlsx"),
            ..RunOptions::default()
        }
    }
}

/// Row tallies and written outputs of one consolidation run.
#[derive(Debug, Default, Serialize)]
pub struct RunSummary {
    pub files_scanned: usize,
    /// FILTROS rows after the current-period filter.
    pub base_rows: Option<usize>,
    /// PDV rows after cleanup.
    pub pdv_rows: Option<usize>,
    /// CONSULTOR rows as concatenated.
    pub consultor_rows: Option<usize>,
    pub merged_pdv_rows: Option<usize>,
    pub merged_consultor_rows: Option<usize>,
    pub written: Vec<PathBuf>,
}

/// Run the whole consolidation: scan, concatenate, transform, merge, export.
///
/// Only an unusable archive root is fatal. Everything downstream degrades
/// per tab and per file: a missing or broken side simply leaves its output
/// unwritten, reported through the summary.
#[tracing::instrument(level = "info", skip(options), fields(root = %options.root.display()))]
pub fn run(options: &RunOptions) -> Result<RunSummary> {
    // 1) pull every report tab out of the archive
    let ScannedTabs {
        filtros,
        pdv,
        consultor,
        files_visited,
    } = scan_reports(&options.root)?;

    // 2) stack per-file fragments into one table per tab
    let filtros = concat_fragments(filtros, TAB_FILTROS);
    let pdv = concat_fragments(pdv, TAB_PDV);
    let consultor = concat_fragments(consultor, TAB_CONSULTOR);

    // 3) reshape FILTROS into the join base, clean up PDV
    let base = transform_filtros(filtros, &options.filtros_config);
    let pdv = transform_pdv(pdv, &options.pdv_config);

    // 4) join both sides against the base
    let merged = merge_outputs(base.as_ref(), pdv.as_ref(), consultor.as_ref());

    // 5) write whatever survived
    let mut written = Vec::new();
    for (table, path, tab) in [
        (merged.pdv.as_ref(), &options.pdv_output, TAB_PDV),
        (merged.consultor.as_ref(), &options.consultor_output, TAB_CONSULTOR),
    ] {
        match export_table(table, path, tab) {
            Ok(true) => written.push(path.clone()),
            Ok(false) => {}
            Err(e) => error!(output = %path.display(), error = ?e, "export failed"),
        }
    }

    let summary = RunSummary {
        files_scanned: files_visited,
        base_rows: base.as_ref().map(Table::row_count),
        pdv_rows: pdv.as_ref().map(Table::row_count),
        consultor_rows: consultor.as_ref().map(Table::row_count),
        merged_pdv_rows: merged.pdv.as_ref().map(Table::row_count),
        merged_consultor_rows: merged.consultor.as_ref().map(Table::row_count),
        written,
    };
    info!(
        files = summary.files_scanned,
        merged_pdv = summary.merged_pdv_rows,
        merged_consultor = summary.merged_consultor_rows,
        written = summary.written.len(),
        "consolidation finished"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{open_workbook_auto, Data, Reader};
    use rust_xlsxwriter::Workbook;
    use std::fs;
    use std::path::Path;

    use crate::table::{FILE_ID_COLUMN, SOURCE_SUBFOLDER_COLUMN};

    fn init_test_logging() {
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter("info")
            .with_test_writer()
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    /// Report with all three tabs, one store row in PDV.
    fn write_full_report(path: &Path) {
        let mut wb = Workbook::new();

        let filtros = wb.add_worksheet();
        filtros.set_name("FILTROS").unwrap();
        filtros.write_string(0, 0, "FILTRO").unwrap();
        filtros.write_string(0, 1, "SELEÇÃO").unwrap();
        filtros.write_string(1, 0, "PERÍODO ATUAL").unwrap();
        filtros.write_string(1, 1, "01/01/2025 - 31/01/2025").unwrap();
        filtros.write_string(2, 0, "PERÍODO ANTERIOR").unwrap();
        filtros.write_string(2, 1, "01/12/2024 - 31/12/2024").unwrap();

        let pdv = wb.add_worksheet();
        pdv.set_name("PDV").unwrap();
        // Header row: only the indicator's first column is labelled, the
        // rest of the pair reads back as Unnamed placeholders.
        pdv.write_string(0, 1, "RECEITA (R$)").unwrap();
        // In-band header echo and subtotal around one real store row.
        pdv.write_string(1, 0, "PDV").unwrap();
        pdv.write_string(1, 1, "ANTERIOR").unwrap();
        pdv.write_string(1, 2, "ATUAL").unwrap();
        pdv.write_string(2, 0, "001 - CENTRO").unwrap();
        pdv.write_number(2, 1, 1000.5).unwrap();
        pdv.write_number(2, 2, 1100.5).unwrap();
        pdv.write_string(3, 0, "TOTAL").unwrap();
        pdv.write_number(3, 1, 1000.5).unwrap();
        pdv.write_number(3, 2, 1100.5).unwrap();

        let consultor = wb.add_worksheet();
        consultor.set_name("CONSULTOR").unwrap();
        consultor.write_string(0, 0, "CONSULTOR").unwrap();
        consultor.write_string(0, 1, "RECEITA").unwrap();
        consultor.write_string(1, 0, "Maria").unwrap();
        consultor.write_number(1, 1, 555.0).unwrap();

        wb.save(path).unwrap();
    }

    /// Report without a PDV tab.
    fn write_pdvless_report(path: &Path) {
        let mut wb = Workbook::new();

        let filtros = wb.add_worksheet();
        filtros.set_name("FILTROS").unwrap();
        filtros.write_string(0, 0, "FILTRO").unwrap();
        filtros.write_string(0, 1, "SELEÇÃO").unwrap();
        filtros.write_string(1, 0, "PERÍODO ATUAL").unwrap();
        filtros.write_string(1, 1, "01/02/2025 - 28/02/2025").unwrap();

        let consultor = wb.add_worksheet();
        consultor.set_name("CONSULTOR").unwrap();
        consultor.write_string(0, 0, "CONSULTOR").unwrap();
        consultor.write_string(0, 1, "RECEITA").unwrap();
        consultor.write_string(1, 0, "João").unwrap();
        consultor.write_number(1, 1, 777.0).unwrap();

        wb.save(path).unwrap();
    }

    fn read_rows(path: &Path, tab: &str) -> Vec<Vec<Data>> {
        let mut sheets = open_workbook_auto(path).unwrap();
        let range = sheets.worksheet_range(tab).unwrap();
        range.rows().map(|r| r.to_vec()).collect()
    }

    fn header_texts(rows: &[Vec<Data>]) -> Vec<String> {
        rows[0].iter().map(|d| d.to_string()).collect()
    }

    #[test]
    fn consolidates_an_archive_end_to_end() {
        init_test_logging();
        let dir = tempfile::tempdir().unwrap();
        let jan = dir.path().join("2025").join("01");
        let feb = dir.path().join("2025").join("02");
        fs::create_dir_all(&jan).unwrap();
        fs::create_dir_all(&feb).unwrap();
        write_full_report(&jan.join("A.xlsx"));
        write_pdvless_report(&feb.join("B.xlsx"));

        let options = RunOptions {
            root: dir.path().to_path_buf(),
            pdv_output: dir.path().join("output_pdv.xlsx"),
            consultor_output: dir.path().join("output_consultor.xlsx"),
            ..RunOptions::default()
        };
        let summary = run(&options).unwrap();

        assert_eq!(summary.files_scanned, 2);
        assert_eq!(summary.base_rows, Some(2));
        assert_eq!(summary.pdv_rows, Some(1));
        assert_eq!(summary.merged_pdv_rows, Some(1));
        assert_eq!(summary.merged_consultor_rows, Some(2));
        assert_eq!(summary.written.len(), 2);

        // PDV output: only file A has a PDV tab.
        let rows = read_rows(&options.pdv_output, "PDV");
        assert_eq!(
            header_texts(&rows),
            [
                "FILTRO",
                FILE_ID_COLUMN,
                SOURCE_SUBFOLDER_COLUMN,
                "DTA INI",
                "DTA FIM",
                "PDV",
                "RECEITA PERÍODO ANTERIOR",
                "RECEITA PERÍODO ATUAL",
            ]
        );
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][0], Data::String("PERÍODO ATUAL".into()));
        assert_eq!(rows[1][1], Data::String("A".into()));
        assert_eq!(rows[1][2], Data::String("01".into()));
        assert_eq!(rows[1][3], Data::String("01/01/2025 ".into()));
        assert_eq!(rows[1][4], Data::String(" 31/01/2025".into()));
        assert_eq!(rows[1][5], Data::String("001 - CENTRO".into()));
        assert_eq!(rows[1][6], Data::Float(1000.5));
        assert_eq!(rows[1][7], Data::Float(1100.5));

        // CONSULTOR output: both files contribute, left order preserved,
        // and the tag column collides into _x/_y.
        let rows = read_rows(&options.consultor_output, "CONSULTOR");
        assert_eq!(
            header_texts(&rows),
            [
                "FILTRO",
                FILE_ID_COLUMN,
                "source_subfolder_x",
                "DTA INI",
                "DTA FIM",
                "CONSULTOR",
                "RECEITA",
                "source_subfolder_y",
            ]
        );
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1][1], Data::String("A".into()));
        assert_eq!(rows[1][5], Data::String("Maria".into()));
        assert_eq!(rows[2][1], Data::String("B".into()));
        assert_eq!(rows[2][5], Data::String("João".into()));
        assert_eq!(rows[2][6], Data::Float(777.0));
    }

    #[test]
    fn unwritable_output_does_not_abort_the_other_export() {
        init_test_logging();
        let dir = tempfile::tempdir().unwrap();
        let jan = dir.path().join("2025").join("01");
        fs::create_dir_all(&jan).unwrap();
        write_full_report(&jan.join("A.xlsx"));

        let options = RunOptions {
            root: dir.path().to_path_buf(),
            // The parent directory does not exist, so this save fails.
            pdv_output: dir.path().join("missing").join("output_pdv.xlsx"),
            consultor_output: dir.path().join("output_consultor.xlsx"),
            ..RunOptions::default()
        };
        let summary = run(&options).unwrap();

        // The merge itself succeeded; only the one write was lost.
        assert_eq!(summary.merged_pdv_rows, Some(1));
        assert_eq!(summary.written, [options.consultor_output.clone()]);
        assert!(!options.pdv_output.exists());
        assert!(options.consultor_output.exists());
    }

    #[test]
    fn empty_archive_produces_no_outputs() {
        init_test_logging();
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("relatorios");
        fs::create_dir(&root).unwrap();

        let options = RunOptions {
            root,
            pdv_output: dir.path().join("output_pdv.xlsx"),
            consultor_output: dir.path().join("output_consultor.xlsx"),
            ..RunOptions::default()
        };
        let summary = run(&options).unwrap();

        assert_eq!(summary.files_scanned, 0);
        assert_eq!(summary.base_rows, None);
        assert_eq!(summary.merged_pdv_rows, None);
        assert!(summary.written.is_empty());
        assert!(!options.pdv_output.exists());
        assert!(!options.consultor_output.exists());
    }

    #[test]
    fn missing_root_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let options = RunOptions {
            root: dir.path().join("nope"),
            pdv_output: dir.path().join("p.xlsx"),
            consultor_output: dir.path().join("c.xlsx"),
            ..RunOptions::default()
        };
        assert!(run(&options).is_err());
    }
}
