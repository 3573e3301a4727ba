//! Rewrite same-sheet A1 references in target formulas to the merged layout.
//!
//! The merged table inserts the transfer block, drops some target columns and
//! drops blank data rows, so a formula such as `=B3*C3` must be rewritten
//! before it is written back. References that land on a dropped row or column
//! have no new address; such formulas fall back to their cached value.

use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::model::{CellValue, ColumnOrigin, OutputColumn, Table};

/// Where each target cell ends up in the merged sheet (all indices 0-based).
#[derive(Debug, Clone)]
pub struct CellMap {
    /// Output column for each target column; `None` when dropped.
    columns: Vec<Option<usize>>,
    output_width: usize,
    header_row: usize,
    source_rows: Vec<usize>,
}

impl CellMap {
    pub fn new(target: &Table, output: &[OutputColumn]) -> Self {
        let mut columns = vec![None; target.width()];
        for (out_idx, column) in output.iter().enumerate() {
            if let ColumnOrigin::Target(idx) = column.origin {
                if let Some(slot) = columns.get_mut(idx) {
                    *slot = Some(out_idx);
                }
            }
        }
        Self {
            columns,
            output_width: output.len(),
            header_row: target.header_row,
            source_rows: target.source_rows.clone(),
        }
    }

    /// Output column of a target column. Columns past the table shift with it.
    pub fn column(&self, col: usize) -> Option<usize> {
        match self.columns.get(col) {
            Some(mapped) => *mapped,
            None => Some(col - self.columns.len() + self.output_width),
        }
    }

    /// Output row of a grid row. Preamble and header rows stay put, data rows
    /// close up over dropped blank rows, rows below the data shift with them.
    pub fn row(&self, row: usize) -> Option<usize> {
        if row <= self.header_row {
            return Some(row);
        }
        let first_data = self.header_row + 1;
        match self.source_rows.binary_search(&row) {
            Ok(idx) => Some(first_data + idx),
            Err(idx) if idx < self.source_rows.len() => None,
            Err(idx) => {
                let last = self.source_rows.last().copied().unwrap_or(self.header_row);
                Some(first_data + idx + (row - last - 1))
            }
        }
    }

    /// Output address of a single cell. Preamble cells are written in place.
    fn cell(&self, row: usize, col: usize) -> Option<(usize, usize)> {
        if row < self.header_row {
            return Some((row, col));
        }
        Some((self.row(row)?, self.column(col)?))
    }
}

// ---------------------------------------------------------------------------
// Formula rewriting
// ---------------------------------------------------------------------------

/// Tokens that are copied through untouched come first so that their
/// contents are never mistaken for references.
const TOKEN_PATTERN: &str = concat!(
    r#"(?P<text>"(?:[^"]|"")*")"#,
    r#"|(?P<other>(?:'(?:[^']|'')*'|[A-Za-z_][A-Za-z0-9_.]*)!\$?[A-Za-z]*\$?[0-9]*(?::\$?[A-Za-z]*\$?[0-9]*)?)"#,
    r"|(?P<cols>\$?[A-Za-z]{1,3}:\$?[A-Za-z]{1,3})\b",
    r"|(?P<rows>\$?[0-9]+:\$?[0-9]+)",
    r"|(?P<num>[0-9]+(?:\.[0-9]*)?(?:[eE][+-]?[0-9]+)?|\.[0-9]+(?:[eE][+-]?[0-9]+)?)",
    r"|(?P<range>\$?[A-Za-z]{1,3}\$?[0-9]+:\$?[A-Za-z]{1,3}\$?[0-9]+)\b",
    r"|(?P<cell>\$?[A-Za-z]{1,3}\$?[0-9]+)\b",
    r"|(?P<name>[A-Za-z_\\][A-Za-z0-9_.]*)",
);

fn token_regex() -> Option<&'static Regex> {
    static TOKEN_RE: OnceLock<Option<Regex>> = OnceLock::new();
    TOKEN_RE.get_or_init(|| Regex::new(TOKEN_PATTERN).ok()).as_ref()
}

/// Rewrite every same-sheet reference in `formula`. `None` when a reference
/// points at a row or column that is not in the output.
pub fn relocate_formula(formula: &str, map: &CellMap) -> Option<String> {
    let re = token_regex()?;
    let mut out = String::with_capacity(formula.len() + 8);
    let mut last = 0;

    for caps in re.captures_iter(formula) {
        let Some(whole) = caps.get(0) else { continue };
        out.push_str(&formula[last..whole.start()]);
        last = whole.end();

        // LOG10( and friends look like cell references
        let is_call = formula[whole.end()..].starts_with('(');
        let rewritten = if is_call {
            None
        } else {
            rewrite_token(&caps, map)
        };
        match rewritten {
            Some(Ok(text)) => out.push_str(&text),
            Some(Err(Unmapped)) => return None,
            None => out.push_str(whole.as_str()),
        }
    }
    out.push_str(&formula[last..]);
    Some(out)
}

struct Unmapped;

/// `None` for tokens that are copied verbatim.
fn rewrite_token(caps: &Captures<'_>, map: &CellMap) -> Option<Result<String, Unmapped>> {
    if let Some(m) = caps.name("cell") {
        let cell = CellRef::parse(m.as_str())?;
        return Some(cell.relocate(map).map(|c| c.to_string()).ok_or(Unmapped));
    }
    if let Some(m) = caps.name("range") {
        let (start, end) = m.as_str().split_once(':')?;
        let (start, end) = (CellRef::parse(start)?, CellRef::parse(end)?);
        // A range reaching from the preamble into the data only survives
        // when its columns did not move.
        let spans_header = start.row.min(end.row) < map.header_row && start.row.max(end.row) >= map.header_row;
        if spans_header && (map.column(start.col) != Some(start.col) || map.column(end.col) != Some(end.col)) {
            return Some(Err(Unmapped));
        }
        let moved = start.relocate(map).zip(end.relocate(map));
        return Some(moved.map(|(s, e)| format!("{s}:{e}")).ok_or(Unmapped));
    }
    if let Some(m) = caps.name("cols") {
        let (start, end) = m.as_str().split_once(':')?;
        let moved = relocate_part(start, |c| map.column(letters_to_column(c)?).map(column_letters));
        let moved_end = relocate_part(end, |c| map.column(letters_to_column(c)?).map(column_letters));
        return Some(moved.zip(moved_end).map(|(s, e)| format!("{s}:{e}")).ok_or(Unmapped));
    }
    if let Some(m) = caps.name("rows") {
        let (start, end) = m.as_str().split_once(':')?;
        let row = |r: &str| map.row(r.parse::<usize>().ok()?.checked_sub(1)?).map(|n| (n + 1).to_string());
        let moved = relocate_part(start, row).zip(relocate_part(end, row));
        return Some(moved.map(|(s, e)| format!("{s}:{e}")).ok_or(Unmapped));
    }
    None
}

/// Apply `f` to the part after an optional `$`, keeping the anchor.
fn relocate_part(part: &str, f: impl Fn(&str) -> Option<String>) -> Option<String> {
    match part.strip_prefix('$') {
        Some(rest) => f(rest).map(|s| format!("${s}")),
        None => f(part),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CellRef {
    col: usize,
    row: usize,
    col_abs: bool,
    row_abs: bool,
}

impl CellRef {
    fn parse(s: &str) -> Option<Self> {
        let (col_abs, rest) = match s.strip_prefix('$') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let split = rest.find(|c: char| !c.is_ascii_alphabetic())?;
        let (letters, rest) = rest.split_at(split);
        let (row_abs, digits) = match rest.strip_prefix('$') {
            Some(digits) => (true, digits),
            None => (false, rest),
        };
        let row = digits.parse::<usize>().ok()?.checked_sub(1)?;
        Some(Self { col: letters_to_column(letters)?, row, col_abs, row_abs })
    }

    /// `$` anchors are kept; the address moves regardless, as it does when
    /// columns are inserted in a spreadsheet.
    fn relocate(self, map: &CellMap) -> Option<Self> {
        let (row, col) = map.cell(self.row, self.col)?;
        Some(Self { row, col, ..self })
    }
}

impl std::fmt::Display for CellRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}{}{}{}",
            if self.col_abs { "$" } else { "" },
            column_letters(self.col),
            if self.row_abs { "$" } else { "" },
            self.row + 1
        )
    }
}

fn letters_to_column(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }
    let n = letters.chars().try_fold(0usize, |acc, c| {
        c.is_ascii_alphabetic()
            .then(|| acc * 26 + (c.to_ascii_uppercase() as usize - 'A' as usize + 1))
    })?;
    Some(n - 1)
}

/// 0 -> A, 25 -> Z, 26 -> AA
fn column_letters(mut col: usize) -> String {
    let mut result = String::new();
    loop {
        result.insert(0, (b'A' + (col % 26) as u8) as char);
        if col < 26 {
            break;
        }
        col = col / 26 - 1;
    }
    result
}

// ---------------------------------------------------------------------------
// Cells
// ---------------------------------------------------------------------------

/// Relocate one cell in place. Returns true when the formula had to be
/// replaced by its cached value.
pub fn relocate_cell(cell: &mut CellValue, map: &CellMap) -> bool {
    let CellValue::Formula { formula, cached } = cell else {
        return false;
    };
    match relocate_formula(formula, map) {
        Some(rewritten) => {
            *formula = rewritten;
            false
        }
        None => {
            log::debug!("formula '{formula}' references a dropped cell, keeping its value");
            let value = std::mem::take(cached.as_mut());
            *cell = value;
            true
        }
    }
}

/// Relocate every formula in `rows`; returns how many were flattened.
pub fn relocate_rows<'a>(rows: impl IntoIterator<Item = &'a mut Vec<CellValue>>, map: &CellMap) -> usize {
    rows.into_iter()
        .flat_map(|row| row.iter_mut())
        .filter(|cell| matches!(cell, CellValue::Formula { .. }))
        .map(|cell| relocate_cell(cell, map))
        .filter(|flattened| *flattened)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> CellValue {
        CellValue::from(s)
    }

    fn out(labels: &[(&str, ColumnOrigin)]) -> Vec<OutputColumn> {
        labels
            .iter()
            .map(|(label, origin)| OutputColumn { label: label.to_string(), origin: *origin })
            .collect()
    }

    /// Target `MPN,Qty,Price,Total` with a blank grid row 2; output inserts
    /// two transfer columns after the key.
    fn shifted() -> CellMap {
        let grid = vec![
            vec![t("MPN"), t("Qty"), t("Price"), t("Total")],
            vec![],
            vec![t("A1"), CellValue::Number(2.0), CellValue::Number(3.0)],
            vec![t("B2"), CellValue::Number(1.0), CellValue::Number(5.0)],
        ];
        let target = Table::from_grid(grid, 0);
        let columns = out(&[
            ("MPN", ColumnOrigin::Target(0)),
            ("Supplier", ColumnOrigin::Transfer(0)),
            ("Remarks", ColumnOrigin::Transfer(1)),
            ("Qty", ColumnOrigin::Target(1)),
            ("Price", ColumnOrigin::Target(2)),
            ("Total", ColumnOrigin::Target(3)),
        ]);
        CellMap::new(&target, &columns)
    }

    fn relocated(formula: &str) -> Option<String> {
        relocate_formula(formula, &shifted())
    }

    #[test]
    fn cell_map_rows_and_columns() {
        let map = shifted();
        assert_eq!(map.column(0), Some(0));
        assert_eq!(map.column(1), Some(3));
        assert_eq!(map.column(6), Some(8), "past the table shifts by the block");
        assert_eq!(map.row(0), Some(0));
        assert_eq!(map.row(1), None, "blank row dropped");
        assert_eq!(map.row(2), Some(1));
        assert_eq!(map.row(3), Some(2));
        assert_eq!(map.row(9), Some(8));
    }

    #[test]
    fn references_follow_moved_cells() {
        assert_eq!(relocated("=B3*C3").as_deref(), Some("=D2*E2"));
        assert_eq!(relocated("=$B$3*C$3").as_deref(), Some("=$D$2*E$2"));
        assert_eq!(relocated("=b4+1").as_deref(), Some("=D3+1"));
    }

    #[test]
    fn ranges_follow_moved_cells() {
        assert_eq!(relocated("=SUM(B3:C4)").as_deref(), Some("=SUM(D2:E3)"));
        assert_eq!(relocated("=SUM(D3:D100)").as_deref(), Some("=SUM(F2:F99)"));
        assert_eq!(relocated("=SUM(C:C)").as_deref(), Some("=SUM(E:E)"));
        assert_eq!(relocated("=SUM($3:4)").as_deref(), Some("=SUM($2:3)"));
    }

    #[test]
    fn non_references_are_untouched() {
        assert_eq!(relocated(r#"="B3"&B3"#).as_deref(), Some(r#"="B3"&D2"#));
        assert_eq!(relocated("=LOG10(B3)").as_deref(), Some("=LOG10(D2)"));
        assert_eq!(relocated("=Rates!B3*B3").as_deref(), Some("=Rates!B3*D2"));
        assert_eq!(relocated("='Rate sheet'!$B$1*B3").as_deref(), Some("='Rate sheet'!$B$1*D2"));
        assert_eq!(relocated("=1E5+B3+0.5").as_deref(), Some("=1E5+D2+0.5"));
        assert_eq!(relocated("=IF(TRUE,B3,#REF!)").as_deref(), Some("=IF(TRUE,D2,#REF!)"));
    }

    #[test]
    fn dropped_targets_are_unmapped() {
        assert_eq!(relocated("=B2*2"), None, "blank row");
        assert_eq!(relocated("=SUM(B2:B3)"), None);

        let target = Table::new(
            vec!["MPN".into(), "Remarks".into(), "Note".into()],
            vec![vec![t("A1"), t("x"), t("y")]],
        );
        let columns = out(&[
            ("MPN", ColumnOrigin::Target(0)),
            ("Remarks", ColumnOrigin::Transfer(0)),
            ("Note", ColumnOrigin::Target(2)),
        ]);
        let map = CellMap::new(&target, &columns);
        assert_eq!(relocate_formula("=B2", &map), None);
        assert_eq!(relocate_formula("=C2", &map).as_deref(), Some("=C2"));
    }

    #[test]
    fn preamble_cells_stay_in_place() {
        let grid = vec![
            vec![t("Rate"), CellValue::Number(83.0)],
            vec![t("MPN"), t("Price")],
            vec![t("A1"), CellValue::Number(2.0)],
        ];
        let target = Table::from_grid(grid, 1);
        let columns = out(&[
            ("MPN", ColumnOrigin::Target(0)),
            ("Supplier", ColumnOrigin::Transfer(0)),
            ("Price", ColumnOrigin::Target(1)),
        ]);
        let map = CellMap::new(&target, &columns);
        assert_eq!(relocate_formula("=B3*$B$1", &map).as_deref(), Some("=C3*$B$1"));
        assert_eq!(relocate_formula("=SUM(B1:B3)", &map), None, "range crosses the header");
        assert_eq!(relocate_formula("=SUM(A1:A3)", &map).as_deref(), Some("=SUM(A1:A3)"));
    }

    #[test]
    fn unmappable_formula_keeps_cached_value() {
        let mut rows = vec![vec![
            CellValue::Formula { formula: "=B2*2".into(), cached: Box::new(CellValue::Number(4.0)) },
            CellValue::Formula { formula: "=B3*2".into(), cached: Box::new(CellValue::Number(4.0)) },
            t("plain"),
        ]];
        let flattened = relocate_rows(rows.iter_mut(), &shifted());
        assert_eq!(flattened, 1);
        assert_eq!(rows[0][0], CellValue::Number(4.0));
        assert_eq!(
            rows[0][1],
            CellValue::Formula { formula: "=D2*2".into(), cached: Box::new(CellValue::Number(4.0)) }
        );
        assert_eq!(rows[0][2], t("plain"));
    }

    #[test]
    fn column_letter_round_trip() {
        for col in [0, 25, 26, 701, 702, 16383] {
            assert_eq!(letters_to_column(&column_letters(col)), Some(col));
        }
    }
}
