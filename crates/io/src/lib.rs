// File I/O operations: spreadsheet files in, merged tables out.

pub mod csv;
pub mod xlsx;

use std::path::{Path, PathBuf};

use bommap_recon::config::HeaderConfig;
use bommap_recon::header::{detect_header_row, HeaderDetection};
use bommap_recon::model::{CellValue, MergedTable, Table};

/// File formats recognized by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// Anything calamine opens: xlsx, xlsm, xls, xlsb, ods.
    Excel,
    Csv,
    Tsv,
}

impl FileFormat {
    pub fn from_path(path: &Path) -> Result<Self, String> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => Ok(Self::Excel),
            "csv" => Ok(Self::Csv),
            "tsv" | "tab" => Ok(Self::Tsv),
            "" => Err(format!("{}: missing file extension", path.display())),
            other => Err(format!(
                "{}: unsupported file type '.{}' (expected xlsx, xlsm, xls, xlsb, ods, csv or tsv)",
                path.display(),
                other
            )),
        }
    }
}

/// How to read one input file.
#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    /// Sheet name for workbook formats; first sheet when `None`.
    pub sheet: Option<String>,
    /// Carry formulas alongside cached values (workbook formats only).
    pub formulas: bool,
    /// 0-based header row; detected from the grid when `None`.
    pub header_row: Option<usize>,
}

/// A table plus how its header row was found.
#[derive(Debug, Clone)]
pub struct LoadedTable {
    pub table: Table,
    pub header: HeaderDetection,
}

/// Read the raw cell grid of a file.
pub fn load_grid(path: &Path, options: &ReadOptions) -> Result<Vec<Vec<CellValue>>, String> {
    match FileFormat::from_path(path)? {
        FileFormat::Excel => xlsx::import(path, options.sheet.as_deref(), options.formulas),
        FileFormat::Csv => {
            warn_sheet_ignored(path, options);
            csv::import(path, None)
        }
        FileFormat::Tsv => {
            warn_sheet_ignored(path, options);
            csv::import(path, Some(b'\t'))
        }
    }
}

fn warn_sheet_ignored(path: &Path, options: &ReadOptions) {
    if let Some(sheet) = &options.sheet {
        log::warn!("{}: --sheet '{}' ignored for delimited files", path.display(), sheet);
    }
}

/// Read a file and split it into preamble, header and data rows.
pub fn load_table(path: &Path, options: &ReadOptions, header: &HeaderConfig) -> Result<LoadedTable, String> {
    let grid = load_grid(path, options)?;
    if grid.is_empty() {
        return Err(format!("{}: no data found", path.display()));
    }

    let detection = match options.header_row {
        Some(row) if row >= grid.len() => {
            return Err(format!(
                "{}: header row {} is past the end of the sheet ({} rows)",
                path.display(),
                row + 1,
                grid.len()
            ));
        }
        Some(row) => HeaderDetection::pinned(row),
        None => detect_header_row(&grid, header),
    };

    let table = Table::from_grid(grid, detection.row);
    log::debug!(
        "{}: header at row {}, {} columns, {} data rows",
        path.display(),
        detection.row + 1,
        table.width(),
        table.len()
    );
    Ok(LoadedTable { table, header: detection })
}

/// Write the merged table in the format the path's extension names.
/// Workbook output is always xlsx.
pub fn save(table: &MergedTable, path: &Path, options: &xlsx::ExportOptions) -> Result<(), String> {
    match FileFormat::from_path(path)? {
        FileFormat::Csv => csv::export(table, path),
        FileFormat::Tsv => csv::export_tsv(table, path),
        FileFormat::Excel => {
            let is_xlsx = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("xlsx"));
            if !is_xlsx {
                return Err(format!(
                    "{}: only .xlsx, .csv and .tsv output is supported",
                    path.display()
                ));
            }
            xlsx::export(table, path, options)
        }
    }
}

/// `<stem>_MAPPED.xlsx` next to the input file.
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    input.with_file_name(format!("{}_MAPPED.xlsx", stem))
}
