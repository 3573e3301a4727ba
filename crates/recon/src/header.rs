//! Header-row detection for raw cell grids.
//!
//! Spreadsheets exported from ERP systems often carry title rows above the
//! real header. Detection is a heuristic: callers must tolerate a wrong guess,
//! and can pin the row explicitly instead.

use serde::Serialize;

use crate::config::HeaderConfig;
use crate::error::Side;
use crate::model::{CellValue, MapWarning};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HeaderDetection {
    /// 0-based grid row to read labels from.
    pub row: usize,
    /// False when no indicator was found and row 0 was assumed.
    pub detected: bool,
}

impl HeaderDetection {
    /// A pinned header row, which is never reported as ambiguous.
    pub fn pinned(row: usize) -> Self {
        Self { row, detected: true }
    }

    pub fn warning(&self, side: Side) -> Option<MapWarning> {
        (!self.detected).then_some(MapWarning::AmbiguousHeaderRow { side })
    }
}

/// Find the first row (within `max_rows` x `max_cols`) with a cell whose
/// trimmed, lowercased text contains any indicator substring.
pub fn detect_header_row(grid: &[Vec<CellValue>], config: &HeaderConfig) -> HeaderDetection {
    let indicators: Vec<String> = config
        .indicators
        .iter()
        .map(|i| i.trim().to_lowercase())
        .filter(|i| !i.is_empty())
        .collect();

    for (row_idx, row) in grid.iter().take(config.max_rows).enumerate() {
        let hit = row.iter().take(config.max_cols).any(|cell| {
            let text = cell.display_text().trim().to_lowercase();
            !text.is_empty() && indicators.iter().any(|ind| text.contains(ind.as_str()))
        });
        if hit {
            log::debug!("header row detected at grid row {}", row_idx + 1);
            return HeaderDetection { row: row_idx, detected: true };
        }
    }

    HeaderDetection { row: 0, detected: false }
}
