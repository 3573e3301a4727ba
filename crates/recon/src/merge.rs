use crate::mapping::Mapping;
use crate::model::{CellValue, ColumnOrigin, MergedRow, OutputColumn, Table};

/// Per-run inputs for merging target rows.
#[derive(Debug, Clone)]
pub struct MergeContext<'a> {
    /// Key column in the target table.
    pub key: usize,
    /// Target column holding the row's own remarks, if any.
    pub target_remarks: Option<usize>,
    /// Index of the remarks field within the transferable fields.
    pub remarks_field: usize,
    pub field_count: usize,
    pub fallback: &'a str,
}

/// Values for the transfer block of one target row.
///
/// Matched rows copy the mapped values as-is, blanks included. Unmatched rows
/// are empty except the remarks field, which keeps a non-blank original value
/// or otherwise receives the fallback marker.
pub fn transfer_values(mapped: Option<&[CellValue]>, original_remarks: &CellValue, ctx: &MergeContext<'_>) -> Vec<CellValue> {
    match mapped {
        Some(values) => values.to_vec(),
        None => {
            let mut values = vec![CellValue::Empty; ctx.field_count];
            if let Some(slot) = values.get_mut(ctx.remarks_field) {
                *slot = if original_remarks.is_blank() {
                    CellValue::Text(ctx.fallback.to_string())
                } else {
                    original_remarks.clone()
                };
            }
            values
        }
    }
}

/// Produce one merged row per target row, laid out per `columns`.
pub fn merge_rows(
    target: &Table,
    columns: &[OutputColumn],
    mapping: &Mapping,
    ctx: &MergeContext<'_>,
) -> Vec<MergedRow> {
    (0..target.len())
        .map(|row| {
            let mapped = mapping.get(target.cell(row, ctx.key));
            let original_remarks = match ctx.target_remarks {
                Some(col) => target.cell(row, col),
                None => &CellValue::Empty,
            };
            let transfer = transfer_values(mapped, original_remarks, ctx);

            let cells = columns
                .iter()
                .map(|col| match col.origin {
                    ColumnOrigin::Target(idx) => target.cell(row, idx).clone(),
                    ColumnOrigin::Transfer(idx) => transfer.get(idx).cloned().unwrap_or_default(),
                })
                .collect();

            MergedRow { matched: mapped.is_some(), cells }
        })
        .collect()
}
