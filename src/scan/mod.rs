// src/scan/mod.rs
//
// Walks the report archive, opens every spreadsheet and pulls out the three
// report tabs as tagged `Table` fragments.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use calamine::{open_workbook_auto, Data, Range, Reader, Sheets};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::table::{Cell, Table, FILE_ID_COLUMN, SOURCE_SUBFOLDER_COLUMN};

pub const TAB_FILTROS: &str = "FILTROS";
pub const TAB_PDV: &str = "PDV";
pub const TAB_CONSULTOR: &str = "CONSULTOR";

/// The tabs extracted from every report workbook.
pub const REPORT_TABS: [&str; 3] = [TAB_FILTROS, TAB_PDV, TAB_CONSULTOR];

/// Extension match is case-sensitive: the report exporter always writes
/// lowercase names, anything else is not a report.
const SPREADSHEET_EXTENSIONS: [&str; 2] = [".xlsx", ".xls"];

/// Per-tab fragment lists collected by a scan, in file-visit order.
#[derive(Debug, Default)]
pub struct ScannedTabs {
    pub filtros: Vec<Table>,
    pub pdv: Vec<Table>,
    pub consultor: Vec<Table>,
    /// Spreadsheet files visited, readable or not.
    pub files_visited: usize,
}

/// One open report workbook. `Ok(Some)` is a tab's contents, `Ok(None)` a
/// tab that does not exist in this workbook, `Err` a tab that exists but
/// cannot be read.
pub trait SheetReader {
    fn read_tab(&mut self, name: &str) -> Result<Option<Table>>;
}

/// Calamine-backed workbook handle; the format (`.xlsx` / `.xls`) is
/// autodetected from the file itself.
pub struct XlsxWorkbook {
    sheets: Sheets<BufReader<File>>,
}

impl XlsxWorkbook {
    pub fn open(path: &Path) -> Result<Self> {
        let sheets = open_workbook_auto(path)
            .with_context(|| format!("opening workbook {}", path.display()))?;
        Ok(XlsxWorkbook { sheets })
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.sheet_names().to_vec()
    }
}

impl SheetReader for XlsxWorkbook {
    fn read_tab(&mut self, name: &str) -> Result<Option<Table>> {
        if !self.sheets.sheet_names().iter().any(|s| s == name) {
            return Ok(None);
        }
        let range = self
            .sheets
            .worksheet_range(name)
            .with_context(|| format!("reading tab {name}"))?;
        Ok(Some(range_to_table(&range)))
    }
}

/// Scan `root` recursively and collect every report tab found, tagging each
/// fragment with [`FILE_ID_COLUMN`] and [`SOURCE_SUBFOLDER_COLUMN`].
///
/// Unreadable workbooks and unreadable tabs are logged and skipped; they
/// never abort the scan. A missing `root` is an error.
#[tracing::instrument(level = "info", skip(root), fields(root = %root.display()))]
pub fn scan_reports(root: &Path) -> Result<ScannedTabs> {
    scan_reports_with(root, XlsxWorkbook::open)
}

/// The generic scan behind [`scan_reports`], over any workbook opener.
pub fn scan_reports_with<R, F>(root: &Path, mut open: F) -> Result<ScannedTabs>
where
    R: SheetReader,
    F: FnMut(&Path) -> Result<R>,
{
    if !root.is_dir() {
        bail!("report root {} does not exist or is not a directory", root.display());
    }

    let mut out = ScannedTabs::default();
    for path in spreadsheet_files(root) {
        out.files_visited += 1;

        let Some(file_id) = path.file_stem().and_then(|s| s.to_str()) else {
            warn!(file = %path.display(), "file name is not valid UTF-8, skipping");
            continue;
        };
        let subfolder = path
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|s| s.to_str())
            .unwrap_or_default();

        debug!(file = %path.display(), "reading report workbook");
        let mut workbook = match open(&path) {
            Ok(w) => w,
            Err(e) => {
                warn!(file = %path.display(), error = ?e, "skipping unreadable workbook");
                continue;
            }
        };

        for (tab, fragments) in [
            (TAB_FILTROS, &mut out.filtros),
            (TAB_PDV, &mut out.pdv),
            (TAB_CONSULTOR, &mut out.consultor),
        ] {
            match workbook.read_tab(tab) {
                Ok(Some(mut fragment)) => {
                    fragment.set_column(FILE_ID_COLUMN, Cell::from(file_id));
                    fragment.set_column(SOURCE_SUBFOLDER_COLUMN, Cell::from(subfolder));
                    debug!(file = %path.display(), tab, rows = fragment.row_count(), "read tab");
                    fragments.push(fragment);
                }
                Ok(None) => {
                    warn!(file = %path.display(), tab, "tab not present in workbook");
                }
                Err(e) => {
                    warn!(file = %path.display(), tab, error = ?e, "failed to read tab");
                }
            }
        }
    }

    info!(
        files = out.files_visited,
        filtros = out.filtros.len(),
        pdv = out.pdv.len(),
        consultor = out.consultor.len(),
        "archive scan complete"
    );
    Ok(out)
}

/// Every spreadsheet file under `root`, depth-first with each directory's
/// entries in file-name order, so repeated runs visit files identically.
pub fn spreadsheet_files(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        match entry {
            Ok(entry) if entry.file_type().is_file() => {
                let name = entry.file_name().to_string_lossy();
                if SPREADSHEET_EXTENSIONS.iter().any(|ext| name.ends_with(ext)) {
                    files.push(entry.into_path());
                }
            }
            Ok(_) => {}
            Err(e) => warn!(error = ?e, "cannot visit archive entry"),
        }
    }
    files
}

/// First row of the used range becomes the column names: empty cells turn
/// into `Unnamed: {position}` and repeats pick up a `.1`, `.2`, … suffix.
/// Names are taken verbatim otherwise, trailing spaces included.
fn header_names(cells: &[Data]) -> Vec<String> {
    let mut names: Vec<String> = Vec::with_capacity(cells.len());
    for (i, cell) in cells.iter().enumerate() {
        let base = match cell {
            Data::Empty => format!("Unnamed: {i}"),
            Data::String(s) if s.is_empty() => format!("Unnamed: {i}"),
            other => other.to_string(),
        };
        let mut name = base.clone();
        let mut n = 1;
        while names.contains(&name) {
            name = format!("{base}.{n}");
            n += 1;
        }
        names.push(name);
    }
    names
}

fn range_to_table(range: &Range<Data>) -> Table {
    let mut rows = range.rows();
    let Some(first) = rows.next() else {
        return Table::default();
    };
    let mut table = Table::new(header_names(first));
    for row in rows {
        table.push_row(row.iter().map(cell_from_data).collect());
    }
    table
}

fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Float(f) => Cell::Float(*f),
        Data::Int(i) => Cell::Int(*i),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(naive) => Cell::DateTime(naive),
            None => Cell::Float(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(e) => Cell::Text(e.to_string()),
    }
}
