// Excel file import (xlsx, xlsm, xls, xlsb, ods) and export (xlsx only)
//
// Import: one sheet as a raw cell grid, formulas optionally overlaid on their
//         cached values.
// Export: the merged table written back at its original header row.

use std::path::Path;

use bommap_recon::model::{CellValue, ColumnOrigin, MergedTable};
use calamine::{open_workbook_auto, Data, Reader, Sheets};
use chrono::{Duration, NaiveDate};
use rust_xlsxwriter::{Color, Format, Formula, Workbook as XlsxWorkbook, Worksheet};

/// Fill for header cells of the inserted transfer block.
const TRANSFER_HEADER_FILL: u32 = 0xFFFF99;

/// Excel's integer precision limit; larger integers are written as text.
const EXCEL_MAX_SAFE_INT: f64 = 1e15;

/// Sheet names in workbook order.
pub fn sheet_names(path: &Path) -> Result<Vec<String>, String> {
    let workbook: Sheets<_> = open_workbook_auto(path)
        .map_err(|e| format!("Failed to open Excel file: {}", e))?;
    Ok(workbook.sheet_names().to_vec())
}

/// Read one sheet (the named one, else the first) into a dense grid.
///
/// With `formulas`, every cell that carries a formula becomes
/// `CellValue::Formula` wrapping the cached value calamine read for it.
pub fn import(path: &Path, sheet: Option<&str>, formulas: bool) -> Result<Vec<Vec<CellValue>>, String> {
    let mut workbook: Sheets<_> = open_workbook_auto(path)
        .map_err(|e| format!("Failed to open Excel file: {}", e))?;

    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    let sheet_name = match sheet {
        Some(name) => sheet_names
            .iter()
            .find(|s| s.as_str() == name)
            .cloned()
            .ok_or_else(|| {
                format!(
                    "Sheet '{}' not found (available: {})",
                    name,
                    sheet_names.join(", ")
                )
            })?,
        None => sheet_names
            .first()
            .cloned()
            .ok_or_else(|| "Excel file contains no sheets".to_string())?,
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| format!("Failed to read sheet '{}': {}", sheet_name, e))?;

    let mut grid: Vec<Vec<CellValue>> = Vec::new();

    // Range start offset (data may not begin at A1)
    let (start_row, start_col) = range.start().unwrap_or((0, 0));
    for (row_idx, row) in range.rows().enumerate() {
        let target_row = start_row as usize + row_idx;
        for (col_idx, cell) in row.iter().enumerate() {
            let value = convert_cell(cell);
            if value == CellValue::Empty {
                continue;
            }
            set_cell(&mut grid, target_row, start_col as usize + col_idx, value);
        }
    }

    if formulas {
        match workbook.worksheet_formula(&sheet_name) {
            Ok(formula_range) => {
                // Formula range may start at a different offset than data range
                let (f_row, f_col) = formula_range.start().unwrap_or((0, 0));
                let mut count = 0usize;
                for (row_idx, row) in formula_range.rows().enumerate() {
                    for (col_idx, formula) in row.iter().enumerate() {
                        if formula.is_empty() {
                            continue;
                        }
                        let r = f_row as usize + row_idx;
                        let c = f_col as usize + col_idx;
                        let cached = get_cell(&grid, r, c);
                        set_cell(
                            &mut grid,
                            r,
                            c,
                            CellValue::Formula {
                                formula: normalize_formula(formula),
                                cached: Box::new(cached),
                            },
                        );
                        count += 1;
                    }
                }
                log::debug!("sheet '{}': {} formulas read", sheet_name, count);
            }
            Err(e) => log::debug!("sheet '{}': no formulas read ({})", sheet_name, e),
        }
    }

    log::debug!("sheet '{}': {} rows read from {}", sheet_name, grid.len(), path.display());
    Ok(grid)
}

fn convert_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::from(s.as_str()),
        Data::Float(n) => CellValue::Number(*n),
        Data::Int(n) => CellValue::Number(*n as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::Error(e) => CellValue::Text(e.to_string()),
        Data::DateTime(dt) => serial_to_text(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::from(s.as_str()),
    }
}

/// Render an Excel date serial (1900 system) as ISO text.
fn serial_to_text(serial: f64) -> CellValue {
    let Some(epoch) = NaiveDate::from_ymd_opt(1899, 12, 30) else {
        return CellValue::Number(serial);
    };
    let days = serial.floor();
    let seconds = ((serial - days) * 86_400.0).round() as i64;
    let Some(date) = epoch.checked_add_signed(Duration::days(days as i64)) else {
        return CellValue::Number(serial);
    };
    if seconds == 0 {
        return CellValue::Text(date.format("%Y-%m-%d").to_string());
    }
    let datetime = date.and_hms_opt(0, 0, 0).map(|dt| dt + Duration::seconds(seconds));
    match datetime {
        Some(dt) if days > 0.0 => CellValue::Text(dt.format("%Y-%m-%d %H:%M:%S").to_string()),
        Some(dt) => CellValue::Text(dt.format("%H:%M:%S").to_string()),
        None => CellValue::Number(serial),
    }
}

fn get_cell(grid: &[Vec<CellValue>], row: usize, col: usize) -> CellValue {
    grid.get(row).and_then(|r| r.get(col)).cloned().unwrap_or_default()
}

fn set_cell(grid: &mut Vec<Vec<CellValue>>, row: usize, col: usize, value: CellValue) {
    if grid.len() <= row {
        grid.resize_with(row + 1, Vec::new);
    }
    let cells = &mut grid[row];
    if cells.len() <= col {
        cells.resize(col + 1, CellValue::Empty);
    }
    cells[col] = value;
}

/// Prepend `=` and rewrite ODS OpenFormula syntax (`of:` prefixes, `;`
/// separators) to the Excel form.
fn normalize_formula(formula: &str) -> String {
    let body = formula.strip_prefix('=').unwrap_or(formula);
    let lower = body.to_ascii_lowercase();
    if !lower.starts_with("of:") {
        return format!("={}", body);
    }

    let mut result = String::with_capacity(body.len() + 1);
    result.push('=');
    let chars: Vec<char> = body.chars().collect();
    let mut i = 0;
    let mut in_string = false;

    while i < chars.len() {
        let ch = chars[i];
        if ch == '"' {
            in_string = !in_string;
            result.push(ch);
            i += 1;
            continue;
        }
        if in_string {
            result.push(ch);
            i += 1;
            continue;
        }

        if i + 2 < chars.len()
            && chars[i].eq_ignore_ascii_case(&'o')
            && chars[i + 1].eq_ignore_ascii_case(&'f')
            && chars[i + 2] == ':'
        {
            i += 3;
        } else if ch == ';' {
            result.push(',');
            i += 1;
        } else {
            result.push(ch);
            i += 1;
        }
    }
    result
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// Export options for the merged table.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub sheet_name: String,
    /// Highlight header cells of inserted transfer columns.
    pub highlight_transfer: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            sheet_name: "Sheet1".to_string(),
            highlight_transfer: true,
        }
    }
}

/// Write the merged table: preamble rows first, the header at the table's
/// original header row, then the data rows.
pub fn export(table: &MergedTable, path: &Path, options: &ExportOptions) -> Result<(), String> {
    let mut xlsx_workbook = XlsxWorkbook::new();
    let worksheet = xlsx_workbook.add_worksheet();
    worksheet
        .set_name(&options.sheet_name)
        .map_err(|e| format!("Failed to create sheet '{}': {}", options.sheet_name, e))?;

    let plain = Format::new();
    for (row, cells) in table.preamble.iter().enumerate() {
        for (col, cell) in cells.iter().enumerate() {
            write_cell(worksheet, row, col, cell, &plain)?;
        }
    }

    let header_row = table.header_row;
    let header_format = Format::new().set_bold();
    let transfer_format = Format::new()
        .set_bold()
        .set_background_color(Color::RGB(TRANSFER_HEADER_FILL));
    for (col, column) in table.columns.iter().enumerate() {
        let format = match column.origin {
            ColumnOrigin::Transfer(_) if options.highlight_transfer => &transfer_format,
            _ => &header_format,
        };
        worksheet
            .write_string_with_format(header_row as u32, col as u16, &column.label, format)
            .map_err(|e| format!("Failed to write header ({}, {}): {}", header_row, col, e))?;
    }

    for (idx, row) in table.rows.iter().enumerate() {
        let target_row = header_row + 1 + idx;
        for (col, cell) in row.cells.iter().enumerate() {
            write_cell(worksheet, target_row, col, cell, &plain)?;
        }
    }

    xlsx_workbook
        .save(path)
        .map_err(|e| format!("Failed to save XLSX file: {}", e))?;
    log::debug!("wrote {} rows to {}", table.rows.len(), path.display());
    Ok(())
}

fn write_cell(
    worksheet: &mut Worksheet,
    row: usize,
    col: usize,
    cell: &CellValue,
    format: &Format,
) -> Result<(), String> {
    let row32 = row as u32;
    let col16 = col as u16;
    let written = match cell {
        CellValue::Empty => return Ok(()),
        CellValue::Text(s) => worksheet.write_string_with_format(row32, col16, s, format),
        CellValue::Number(n) if n.is_finite() && n.trunc().abs() >= EXCEL_MAX_SAFE_INT => {
            // Export as text to preserve exact value
            worksheet.write_string_with_format(row32, col16, cell.display_text(), format)
        }
        CellValue::Number(n) => worksheet.write_number_with_format(row32, col16, *n, format),
        CellValue::Bool(b) => worksheet.write_boolean_with_format(row32, col16, *b, format),
        CellValue::Formula { formula, cached } => {
            let source = formula.strip_prefix('=').unwrap_or(formula);
            let formula = Formula::new(source).set_result(cached.display_text());
            worksheet.write_formula_with_format(row32, col16, formula, format)
        }
    };
    written
        .map(|_| ())
        .map_err(|e| format!("Failed to write cell ({}, {}): {}", row, col, e))
}
