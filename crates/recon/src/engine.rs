use crate::config::MapConfig;
use crate::error::{ReconError, Side};
use crate::mapping::{Mapping, MappingColumns};
use crate::merge::{merge_rows, MergeContext};
use crate::model::{
    FieldResolution, MapMeta, MapReport, MapResult, MapSummary, MapWarning, MergedRow, MergedTable,
    Resolved, ResolvedColumns, Table,
};
use crate::order::{output_columns, Placement};
use crate::relocate::{relocate_rows, CellMap};
use crate::resolve::{resolve_column, resolve_fields, resolve_key_column};

/// Map reference (OLD) values onto target (NEW) rows per config.
///
/// Fails only when a table has no header or a key column cannot be resolved;
/// everything else degrades to empty/fallback values and is reported as a
/// warning.
pub fn run(config: &MapConfig, reference: &Table, target: &Table) -> Result<MapResult, ReconError> {
    check_header(reference, Side::Reference)?;
    check_header(target, Side::Target)?;

    let reference_key = require_key(config, reference, Side::Reference)?;
    let target_key = require_key(config, target, Side::Target)?;
    log::info!(
        "key columns: reference '{}', target '{}'",
        reference_key.label,
        target_key.label
    );

    let threshold = config.column_threshold;
    let fields = resolve_fields(&config.fields, &reference.columns, threshold);
    let reference_alternate = config
        .alternate_key
        .as_ref()
        .and_then(|spec| resolve_column(spec, &reference.columns, threshold))
        .filter(|alt| alt.index != reference_key.index);
    let target_anchor = config
        .placement
        .anchor
        .as_ref()
        .and_then(|spec| resolve_column(spec, &target.columns, threshold))
        .filter(|anchor| anchor.index != target_key.index);

    let remarks_field = config.remarks_index().ok_or_else(|| {
        ReconError::ConfigValidation(format!(
            "remarks field '{}' is not one of the transferable fields",
            config.remarks.field
        ))
    })?;
    let target_remarks = resolve_column(&config.fields[remarks_field], &target.columns, threshold)
        .filter(|remarks| remarks.index != target_key.index);

    for field in &fields {
        match &field.actual {
            Some(resolved) => log::debug!(
                "field '{}' -> '{}' ({:?})",
                field.logical,
                resolved.label,
                resolved.method
            ),
            None => log::debug!("field '{}' unresolved", field.logical),
        }
    }

    let mapping = Mapping::build(
        reference,
        &MappingColumns {
            key: reference_key.index,
            alternate: reference_alternate.as_ref().map(|r| r.index),
            fields: fields.iter().map(|f| f.actual.as_ref().map(|r| r.index)).collect(),
        },
    );

    let placement = Placement {
        key: target_key.index,
        anchor: target_anchor.as_ref().map(|r| r.index),
        drop: target_remarks.iter().map(|r| r.index).collect(),
    };
    let columns = output_columns(&target.columns, &config.fields, &placement);

    let ctx = MergeContext {
        key: target_key.index,
        target_remarks: target_remarks.as_ref().map(|r| r.index),
        remarks_field,
        field_count: config.fields.len(),
        fallback: &config.remarks.fallback,
    };
    let mut rows = merge_rows(target, &columns, &mapping, &ctx);

    let cell_map = CellMap::new(target, &columns);
    let mut preamble = target.preamble.clone();
    let flattened = relocate_rows(
        rows.iter_mut().map(|row| &mut row.cells).chain(preamble.iter_mut()),
        &cell_map,
    );

    let warnings = collect_warnings(&fields, &mapping, flattened);
    let summary = compute_summary(reference, &mapping, &rows, &fields);
    log::info!(
        "mapped {} of {} target rows ({} new)",
        summary.matched,
        summary.target_rows,
        summary.unmatched
    );
    for warning in &warnings {
        log::warn!("{warning}");
    }

    Ok(MapResult {
        table: MergedTable {
            columns,
            rows,
            header_row: target.header_row,
            preamble,
        },
        report: MapReport {
            meta: MapMeta {
                config_name: config.name.clone(),
                engine_version: env!("CARGO_PKG_VERSION").to_string(),
                run_at: chrono::Utc::now().to_rfc3339(),
            },
            columns: ResolvedColumns {
                reference_key,
                target_key,
                reference_alternate,
                target_anchor,
                target_remarks,
            },
            fields,
            summary,
            warnings,
        },
    })
}

fn check_header(table: &Table, side: Side) -> Result<(), ReconError> {
    if table.columns.is_empty() {
        return Err(ReconError::EmptyTable { side });
    }
    Ok(())
}

fn require_key(config: &MapConfig, table: &Table, side: Side) -> Result<Resolved, ReconError> {
    resolve_key_column(&config.key, &table.columns).ok_or_else(|| ReconError::MissingKeyColumn {
        side,
        available: table.columns.clone(),
    })
}

fn collect_warnings(fields: &[FieldResolution], mapping: &Mapping, flattened: usize) -> Vec<MapWarning> {
    let mut warnings = Vec::new();

    let missing: Vec<String> = fields
        .iter()
        .filter(|f| f.actual.is_none())
        .map(|f| f.logical.clone())
        .collect();
    if !missing.is_empty() {
        warnings.push(MapWarning::MissingTransferColumn { fields: missing });
    }

    if mapping.duplicates() > 0 {
        warnings.push(MapWarning::DuplicateKeys {
            count: mapping.duplicates(),
            samples: mapping.duplicate_samples().to_vec(),
        });
    }

    if flattened > 0 {
        warnings.push(MapWarning::FormulasFlattened { count: flattened });
    }

    warnings
}

/// Compute summary counts for a finished run.
pub fn compute_summary(
    reference: &Table,
    mapping: &Mapping,
    rows: &[MergedRow],
    fields: &[FieldResolution],
) -> MapSummary {
    let matched = rows.iter().filter(|r| r.matched).count();
    MapSummary {
        reference_rows: reference.len(),
        target_rows: rows.len(),
        mapped_keys: mapping.len(),
        matched,
        unmatched: rows.len() - matched,
        duplicate_keys: mapping.duplicates(),
        unresolved_fields: fields.iter().filter(|f| f.actual.is_none()).count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FieldSpec;
    use crate::model::{CellValue, ColumnOrigin};

    fn t(s: &str) -> CellValue {
        CellValue::from(s)
    }

    fn small_config() -> MapConfig {
        MapConfig {
            fields: vec![FieldSpec::new("Supplier"), FieldSpec::new("Remarks")],
            ..MapConfig::default()
        }
    }

    #[test]
    fn header_less_table_is_rejected() {
        let empty = Table::default();
        let target = Table::new(vec!["MPN".into()], vec![]);
        let err = run(&small_config(), &empty, &target).unwrap_err();
        assert!(matches!(err, ReconError::EmptyTable { side: Side::Reference }));
    }

    #[test]
    fn missing_target_key_lists_labels() {
        let reference = Table::new(vec!["MPN".into()], vec![]);
        let target = Table::new(vec!["Description".into(), "Qty".into()], vec![]);
        match run(&small_config(), &reference, &target).unwrap_err() {
            ReconError::MissingKeyColumn { side, available } => {
                assert_eq!(side, Side::Target);
                assert_eq!(available, vec!["Description", "Qty"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn header_only_tables_produce_empty_output() {
        let reference = Table::new(vec!["MPN".into(), "Supplier".into()], vec![]);
        let target = Table::new(vec!["MPN".into(), "Qty".into()], vec![]);
        let result = run(&small_config(), &reference, &target).unwrap();
        assert!(result.table.rows.is_empty());
        assert_eq!(result.table.labels(), vec!["MPN", "Supplier", "Remarks", "Qty"]);
        assert_eq!(result.report.summary.target_rows, 0);
    }

    #[test]
    fn target_remarks_column_is_folded_into_block() {
        let reference = Table::new(
            vec!["MPN".into(), "Supplier".into(), "Remarks".into()],
            vec![vec![t("A1"), t("Acme"), t("")]],
        );
        let target = Table::new(
            vec!["MPN".into(), "Remark".into(), "Qty".into()],
            vec![
                vec![t("A1"), t("old"), CellValue::Number(1.0)],
                vec![t("B2"), t("Obsolete"), CellValue::Number(2.0)],
                vec![t("C3"), t(""), CellValue::Number(3.0)],
            ],
        );
        let result = run(&small_config(), &reference, &target).unwrap();
        let table = &result.table;

        assert_eq!(table.labels(), vec!["MPN", "Supplier", "Remarks", "Qty"]);
        assert_eq!(table.value(0, "Remarks"), Some(&CellValue::Empty));
        assert_eq!(table.value(1, "Remarks"), Some(&t("Obsolete")));
        assert_eq!(table.value(2, "Remarks"), Some(&t("New Part")));
        assert_eq!(
            result.report.columns.target_remarks.as_ref().map(|r| r.label.as_str()),
            Some("Remark")
        );
    }

    #[test]
    fn summary_counts_rows() {
        let reference = Table::new(
            vec!["MPN".into(), "Supplier".into()],
            vec![
                vec![t("A1"), t("Acme")],
                vec![t("a1"), t("Dup")],
                vec![t("B2"), t("Bolt")],
            ],
        );
        let target = Table::new(
            vec!["MPN".into()],
            vec![vec![t("A1")], vec![t("B2")], vec![t("Z9")]],
        );
        let result = run(&small_config(), &reference, &target).unwrap();
        let s = &result.report.summary;
        assert_eq!(s.reference_rows, 3);
        assert_eq!(s.target_rows, 3);
        assert_eq!(s.mapped_keys, 2);
        assert_eq!(s.matched, 2);
        assert_eq!(s.unmatched, 1);
        assert_eq!(s.duplicate_keys, 1);
        // "Remarks" is not in the reference table
        assert_eq!(s.unresolved_fields, 1);
        assert_eq!(
            result.report.warnings,
            vec![
                MapWarning::MissingTransferColumn { fields: vec!["Remarks".into()] },
                MapWarning::DuplicateKeys { count: 1, samples: vec!["a1".into()] },
            ]
        );
        assert_eq!(result.table.columns[1].origin, ColumnOrigin::Transfer(0));
    }

    #[test]
    fn report_serializes() {
        let reference = Table::new(vec!["MPN".into(), "Supplier".into()], vec![]);
        let target = Table::new(vec!["MPN".into()], vec![]);
        let result = run(&small_config(), &reference, &target).unwrap();
        let json = serde_json::to_value(&result.report).unwrap();
        assert_eq!(json["columns"]["reference_key"]["label"], "MPN");
        assert_eq!(json["columns"]["reference_key"]["method"], "exact");
        assert!(json["fields"][1]["actual"].is_null());
        assert_eq!(json["meta"]["config_name"], "BOM supplier mapping");
    }
}
