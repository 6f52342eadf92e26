// src/bin/archive_index.rs
//
// Inventories the report archive without transforming anything: one JSON
// record per spreadsheet file, listing which report tabs it carries and how
// many data rows each has. Handy for spotting broken exports before a run.

use anyhow::Result;
use pdvmerge::scan::{spreadsheet_files, SheetReader, XlsxWorkbook, REPORT_TABS};
use serde::Serialize;
use std::{env, fs::File, io::Write, path::PathBuf};
use tracing::warn;

#[derive(Debug, Serialize)]
struct TabRecord {
    tab: String,
    rows: usize,
}

#[derive(Debug, Serialize)]
struct FileRecord {
    path: String,
    file_id: String,
    subfolder: String,
    tabs: Vec<TabRecord>,
    missing_tabs: Vec<String>,
    /// Tabs the workbook carries beyond the report set.
    other_tabs: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    // usage: archive_index [ROOT [OUT_JSON]]
    let mut args = env::args().skip(1);
    let root = PathBuf::from(args.next().unwrap_or_else(|| "relatorios".to_string()));
    let out_path =
        PathBuf::from(args.next().unwrap_or_else(|| "archive_index.json".to_string()));
    if !root.is_dir() {
        anyhow::bail!("archive root not found: {}", root.display());
    }

    let mut records = Vec::new();
    for path in spreadsheet_files(&root) {
        let file_id = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let subfolder = path
            .parent()
            .and_then(|p| p.file_name())
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut record = FileRecord {
            path: path.display().to_string(),
            file_id,
            subfolder,
            tabs: Vec::new(),
            missing_tabs: Vec::new(),
            other_tabs: Vec::new(),
            error: None,
        };

        match XlsxWorkbook::open(&path) {
            Ok(mut workbook) => {
                record.other_tabs = workbook
                    .sheet_names()
                    .into_iter()
                    .filter(|n| !REPORT_TABS.contains(&n.as_str()))
                    .collect();
                for tab in REPORT_TABS {
                    match workbook.read_tab(tab) {
                        Ok(Some(table)) => record.tabs.push(TabRecord {
                            tab: tab.to_owned(),
                            rows: table.row_count(),
                        }),
                        Ok(None) => record.missing_tabs.push(tab.to_owned()),
                        Err(e) => {
                            warn!(file = %path.display(), tab, error = ?e, "tab unreadable");
                            record.error = Some(e.to_string());
                        }
                    }
                }
            }
            Err(e) => {
                warn!(file = %path.display(), error = ?e, "workbook unreadable");
                record.error = Some(e.to_string());
            }
        }
        records.push(record);
    }

    let json = serde_json::to_string_pretty(&records)?;
    let mut file = File::create(&out_path)?;
    file.write_all(json.as_bytes())?;
    println!("Wrote {} records to {}", records.len(), out_path.display());

    Ok(())
}
