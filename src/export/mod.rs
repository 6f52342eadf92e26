use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Format, Workbook};
use tracing::info;

use crate::table::{Cell, Table};

const DATETIME_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";

/// Write `table` as a single-tab workbook at `path`, bold header row first,
/// replacing any existing file. An absent or zero-row table writes nothing
/// and returns `Ok(false)`.
pub fn export_table(table: Option<&Table>, path: &Path, sheet_name: &str) -> Result<bool> {
    let table = match table {
        Some(t) if t.row_count() > 0 => t,
        _ => {
            info!(output = %path.display(), "nothing to export");
            return Ok(false);
        }
    };

    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let datetime_format = Format::new().set_num_format(DATETIME_FORMAT);

    let sheet = workbook.add_worksheet();
    sheet
        .set_name(sheet_name)
        .with_context(|| format!("naming output tab {sheet_name}"))?;

    for (c, name) in table.headers().iter().enumerate() {
        sheet.write_string_with_format(0, c as u16, name, &header_format)?;
    }
    for (r, row) in table.rows().iter().enumerate() {
        let out_row = (r + 1) as u32;
        for (c, cell) in row.iter().enumerate() {
            let col = c as u16;
            match cell {
                Cell::Empty => {}
                Cell::Bool(b) => {
                    sheet.write_boolean(out_row, col, *b)?;
                }
                Cell::Int(i) => {
                    sheet.write_number(out_row, col, *i as f64)?;
                }
                Cell::Float(f) => {
                    sheet.write_number(out_row, col, *f)?;
                }
                Cell::Text(s) => {
                    sheet.write_string(out_row, col, s)?;
                }
                Cell::DateTime(dt) => {
                    sheet.write_datetime_with_format(out_row, col, dt, &datetime_format)?;
                }
            }
        }
    }

    workbook
        .save(path)
        .with_context(|| format!("writing workbook {}", path.display()))?;
    info!(
        output = %path.display(),
        tab = sheet_name,
        rows = table.row_count(),
        "export complete"
    );
    Ok(true)
}
