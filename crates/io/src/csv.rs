// CSV/TSV import/export

use std::io::Read;
use std::path::Path;

use bommap_recon::model::{CellValue, MergedTable};

/// Read a delimited file into a raw grid. The delimiter is sniffed unless
/// one is given. Every non-empty field becomes text; nothing is re-typed so
/// part numbers such as `00123` keep their leading zeros.
pub fn import(path: &Path, delimiter: Option<u8>) -> Result<Vec<Vec<CellValue>>, String> {
    let content = read_file_as_utf8(path)?;
    let delimiter = delimiter.unwrap_or_else(|| sniff_delimiter(&content));
    import_from_string(&content, delimiter)
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per line. The delimiter
/// that produces the most consistent field count (>1 field) wins.
pub fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content.lines().take(10).collect();

    if sample_lines.is_empty() {
        return b',';
    }

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        // Title rows above the header often have a single field, so judge
        // viability on the widest sampled line rather than the first.
        let widest = counts.iter().copied().max().unwrap_or(0);
        if widest <= 1 {
            continue;
        }

        let consistent = counts.iter().filter(|&&c| c == widest).count() as u64;
        let score = consistent * widest as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// Read file and convert to UTF-8 if needed (handles Windows-1252, Latin-1, etc.)
pub fn read_file_as_utf8(path: &Path) -> Result<String, String> {
    let mut file = std::fs::File::open(path).map_err(|e| format!("{}: {}", path.display(), e))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)
        .map_err(|e| format!("{}: {}", path.display(), e))?;

    // Try UTF-8 first; on failure, recover the buffer from the error
    let mut content = match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            let bytes = e.into_bytes();
            // Fall back to Windows-1252 (common for Excel-exported CSVs)
            log::debug!("{}: not UTF-8, decoding as Windows-1252", path.display());
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            decoded.into_owned()
        }
    };
    if content.starts_with('\u{feff}') {
        content.remove(0);
    }
    Ok(content)
}

fn import_from_string(content: &str, delimiter: u8) -> Result<Vec<Vec<CellValue>>, String> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut grid = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| e.to_string())?;
        let mut row: Vec<CellValue> = record.iter().map(CellValue::from).collect();
        while row.last().is_some_and(|c| *c == CellValue::Empty) {
            row.pop();
        }
        grid.push(row);
    }
    Ok(grid)
}

pub fn export(table: &MergedTable, path: &Path) -> Result<(), String> {
    export_with_delimiter(table, path, b',')
}

pub fn export_tsv(table: &MergedTable, path: &Path) -> Result<(), String> {
    export_with_delimiter(table, path, b'\t')
}

/// Preamble rows, header, then data rows. Formulas are written as their
/// cached values; CSV has no way to carry them.
fn export_with_delimiter(table: &MergedTable, path: &Path, delimiter: u8) -> Result<(), String> {
    // Preamble rows are usually narrower than the table, so rows vary in width.
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_path(path)
        .map_err(|e| format!("{}: {}", path.display(), e))?;

    for row in &table.preamble {
        let mut record: Vec<String> = row.iter().map(CellValue::display_text).collect();
        while record.last().is_some_and(|s| s.is_empty()) {
            record.pop();
        }
        // The csv writer rejects empty records; a lone empty field keeps the blank line.
        if record.is_empty() {
            record.push(String::new());
        }
        writer.write_record(&record).map_err(|e| e.to_string())?;
    }

    writer
        .write_record(table.columns.iter().map(|c| c.label.as_str()))
        .map_err(|e| e.to_string())?;

    for row in &table.rows {
        writer
            .write_record(row.cells.iter().map(CellValue::display_text))
            .map_err(|e| e.to_string())?;
    }

    writer.flush().map_err(|e| e.to_string())?;
    Ok(())
}
