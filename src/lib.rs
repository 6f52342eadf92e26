//! Consolidates an archive of per-store indicator report workbooks into two
//! merged spreadsheets: one row per store (PDV) and one per consultant,
//! each carrying the report's current-period date range.

pub mod export;
pub mod merge;
pub mod pipeline;
pub mod scan;
pub mod table;
pub mod transform;

pub use pipeline::{run, RunOptions, RunSummary};
pub use table::{Cell, Table};
