use std::fmt;

use serde::{Serialize, Serializer};

use crate::error::Side;

// ---------------------------------------------------------------------------
// Cells
// ---------------------------------------------------------------------------

/// A single spreadsheet cell as the engine sees it.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    /// Formula source plus the value it last evaluated to (if the file had one).
    Formula { formula: String, cached: Box<CellValue> },
}

impl CellValue {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// True for empty cells and whitespace-only text. Formulas are never blank.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Text rendering used for labels, keys and previews.
    /// Integral numbers drop the fractional part; formulas render their cached value.
    pub fn display_text(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Text(s) => s.clone(),
            Self::Number(n) => format_number(*n),
            Self::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            Self::Formula { cached, .. } => cached.display_text(),
        }
    }
}

impl Default for CellValue {
    fn default() -> Self {
        Self::Empty
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            Self::Empty
        } else {
            Self::Text(s.to_string())
        }
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_text())
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Empty => serializer.serialize_none(),
            Self::Text(s) => serializer.serialize_str(s),
            Self::Number(n) => serializer.serialize_f64(*n),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Formula { cached, .. } => cached.serialize(serializer),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

// ---------------------------------------------------------------------------
// Input tables
// ---------------------------------------------------------------------------

/// A header row plus data rows, all rows exactly `columns.len()` wide.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
    /// 0-based grid row the header was read from.
    pub header_row: usize,
    /// Raw rows above the header (titles, notes), kept for write-back.
    pub preamble: Vec<Vec<CellValue>>,
    /// 0-based grid row each data row was read from. Blank rows leave gaps.
    pub source_rows: Vec<usize>,
}

impl Table {
    /// Build a table from labels and rows; labels are cleaned the same way as
    /// [`Table::from_grid`] and short rows are padded to the table width.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let header: Vec<CellValue> = columns.into_iter().map(CellValue::Text).collect();
        let mut grid = Vec::with_capacity(rows.len() + 1);
        grid.push(header);
        grid.extend(rows);
        Self::from_grid(grid, 0)
    }

    /// Split a raw cell grid at `header_row`.
    ///
    /// Everything above the header becomes the preamble. The table is as wide
    /// as its widest row, header or data. Blank labels become `Unnamed: <col>`,
    /// repeated labels get `.1`, `.2`, ... suffixes, and fully blank data rows
    /// are dropped.
    pub fn from_grid(mut grid: Vec<Vec<CellValue>>, header_row: usize) -> Self {
        if header_row >= grid.len() {
            return Self {
                columns: Vec::new(),
                rows: Vec::new(),
                header_row,
                preamble: grid,
                source_rows: Vec::new(),
            };
        }

        let data = grid.split_off(header_row + 1);
        let header = grid.pop().unwrap_or_default();
        let preamble = grid;

        let width = std::iter::once(&header)
            .chain(data.iter())
            .map(|row| occupied_width(row))
            .max()
            .unwrap_or(0);

        let mut columns: Vec<String> = Vec::with_capacity(width);
        for idx in 0..width {
            let raw = header
                .get(idx)
                .map(|cell| cell.display_text().trim().to_string())
                .unwrap_or_default();
            let base = if raw.is_empty() { format!("Unnamed: {idx}") } else { raw };
            columns.push(unique_label(&columns, base));
        }

        let mut rows = Vec::with_capacity(data.len());
        let mut source_rows = Vec::with_capacity(data.len());
        for (offset, mut row) in data.into_iter().enumerate() {
            if occupied_width(&row) == 0 {
                continue;
            }
            row.resize(width, CellValue::Empty);
            rows.push(row);
            source_rows.push(header_row + 1 + offset);
        }

        Self { columns, rows, header_row, preamble, source_rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Exact label lookup.
    pub fn column_index(&self, label: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == label)
    }

    pub fn cell(&self, row: usize, col: usize) -> &CellValue {
        static EMPTY: CellValue = CellValue::Empty;
        self.rows.get(row).and_then(|r| r.get(col)).unwrap_or(&EMPTY)
    }
}

/// One past the last non-blank cell.
fn occupied_width(row: &[CellValue]) -> usize {
    row.iter().rposition(|c| !c.is_blank()).map(|i| i + 1).unwrap_or(0)
}

fn unique_label(existing: &[String], base: String) -> String {
    if !existing.contains(&base) {
        return base;
    }
    let mut n = 1;
    loop {
        let candidate = format!("{base}.{n}");
        if !existing.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

// ---------------------------------------------------------------------------
// Merged output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "index", rename_all = "snake_case")]
pub enum ColumnOrigin {
    /// Copied from the target table column at this index.
    Target(usize),
    /// Transferable field at this index of the configured field list.
    Transfer(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputColumn {
    pub label: String,
    pub origin: ColumnOrigin,
}

#[derive(Debug, Clone, Serialize)]
pub struct MergedRow {
    /// Whether the row's key was found in the reference mapping.
    pub matched: bool,
    pub cells: Vec<CellValue>,
}

#[derive(Debug, Clone)]
pub struct MergedTable {
    pub columns: Vec<OutputColumn>,
    pub rows: Vec<MergedRow>,
    pub header_row: usize,
    pub preamble: Vec<Vec<CellValue>>,
}

impl MergedTable {
    pub fn labels(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.label.as_str()).collect()
    }

    pub fn column_index(&self, label: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.label == label)
    }

    /// Cell by output column label.
    pub fn value(&self, row: usize, label: &str) -> Option<&CellValue> {
        let col = self.column_index(label)?;
        self.rows.get(row).and_then(|r| r.cells.get(col))
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// How a logical name was matched to an actual column label.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum ResolveMethod {
    Exact,
    Alias,
    Fuzzy { score: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolved {
    pub label: String,
    pub index: usize,
    #[serde(flatten)]
    pub method: ResolveMethod,
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldResolution {
    pub logical: String,
    pub actual: Option<Resolved>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolvedColumns {
    pub reference_key: Resolved,
    pub target_key: Resolved,
    pub reference_alternate: Option<Resolved>,
    pub target_anchor: Option<Resolved>,
    pub target_remarks: Option<Resolved>,
}

// ---------------------------------------------------------------------------
// Warnings, summary, report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MapWarning {
    /// Transferable fields with no resolvable column in the reference table.
    MissingTransferColumn { fields: Vec<String> },
    /// Reference keys seen more than once; the first row won.
    DuplicateKeys { count: usize, samples: Vec<String> },
    /// No header indicator found; row 1 was used as the header.
    AmbiguousHeaderRow { side: Side },
    /// Target formulas pointing at dropped rows or columns, written as their
    /// cached values instead.
    FormulasFlattened { count: usize },
}

impl fmt::Display for MapWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingTransferColumn { fields } => {
                write!(f, "no column found in reference table for: {}", fields.join(", "))
            }
            Self::DuplicateKeys { count, samples } => {
                write!(f, "{count} duplicate reference key(s) ignored (first row kept)")?;
                if !samples.is_empty() {
                    write!(f, ": {}", samples.join(", "))?;
                    if *count > samples.len() {
                        write!(f, ", ...")?;
                    }
                }
                Ok(())
            }
            Self::AmbiguousHeaderRow { side } => {
                write!(f, "{side} sheet: no header row detected, using row 1")
            }
            Self::FormulasFlattened { count } => write!(
                f,
                "{count} target formula(s) referenced dropped rows or columns and were replaced by their values"
            ),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MapSummary {
    pub reference_rows: usize,
    pub target_rows: usize,
    pub mapped_keys: usize,
    pub matched: usize,
    pub unmatched: usize,
    pub duplicate_keys: usize,
    pub unresolved_fields: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct MapMeta {
    pub config_name: String,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MapReport {
    pub meta: MapMeta,
    pub columns: ResolvedColumns,
    pub fields: Vec<FieldResolution>,
    pub summary: MapSummary,
    pub warnings: Vec<MapWarning>,
}

#[derive(Debug, Clone)]
pub struct MapResult {
    pub table: MergedTable,
    pub report: MapReport,
}
