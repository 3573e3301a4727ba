use bommap_recon::config::{FieldSpec, MapConfig};
use bommap_recon::model::{CellValue, ColumnOrigin, ResolveMethod, Table};
use bommap_recon::{detect_header_row, run, MapWarning};

fn t(s: &str) -> CellValue {
    CellValue::from(s)
}

fn labels(v: &[&str]) -> Vec<String> {
    v.iter().map(|s| s.to_string()).collect()
}

/// Reference sheet shaped like a purchasing export: key, alternate, a few
/// supplier columns with slightly different labels.
fn reference() -> Table {
    Table::new(
        labels(&["MPN", "Alternate", "Supplier", "PO number", "Unit Price", "Remarks", "ETA"]),
        vec![
            vec![t("ABC123"), t(""), t("Acme"), t("PO-1"), CellValue::Number(1.25), t(""), t("wk 12")],
            vec![t("DEF456"), t("DEF456-T"), t("Bolt Co"), t("PO-2"), CellValue::Number(0.5), t("EOL soon"), t("")],
        ],
    )
}

fn target(rows: Vec<Vec<CellValue>>) -> Table {
    Table::new(labels(&["Sl No", "MPN", "Remarks", "Manufacturer", "Qty"]), rows)
}

// -------------------------------------------------------------------------
// Scenarios
// -------------------------------------------------------------------------

#[test]
fn scenario_a_matched_row_takes_reference_values() {
    let target = target(vec![vec![t("1"), t("ABC123"), t(""), t("TI"), CellValue::Number(4.0)]]);
    let result = run(&MapConfig::default(), &reference(), &target).unwrap();
    let table = &result.table;

    assert!(table.rows[0].matched);
    assert_eq!(table.value(0, "Supplier"), Some(&t("Acme")));
    assert_eq!(table.value(0, "PO number"), Some(&t("PO-1")));
    assert_eq!(table.value(0, "Remarks"), Some(&CellValue::Empty), "no fallback when matched");
    assert_eq!(table.value(0, "Qty"), Some(&CellValue::Number(4.0)));
}

#[test]
fn scenario_b_unmatched_row_gets_new_part() {
    let target = target(vec![vec![t("1"), t("XYZ999"), t(""), t("TI"), t("")]]);
    let result = run(&MapConfig::default(), &reference(), &target).unwrap();
    let table = &result.table;

    assert!(!table.rows[0].matched);
    assert_eq!(table.value(0, "Remarks"), Some(&t("New Part")));
    for field in MapConfig::default().field_names() {
        if field != "Remarks" {
            assert_eq!(table.value(0, field), Some(&CellValue::Empty), "{field}");
        }
    }
}

#[test]
fn scenario_c_unmatched_row_keeps_its_remarks() {
    let target = target(vec![vec![t("1"), t("XYZ999"), t("Obsolete"), t("TI"), t("")]]);
    let result = run(&MapConfig::default(), &reference(), &target).unwrap();
    assert_eq!(result.table.value(0, "Remarks"), Some(&t("Obsolete")));
    assert_eq!(result.table.value(0, "Supplier"), Some(&CellValue::Empty));
}

#[test]
fn scenario_d_alias_selected_without_fuzzy() {
    let reference = Table::new(
        labels(&["MPN", "Vendor", "Remarks"]),
        vec![vec![t("ABC123"), t("Acme"), t("")]],
    );
    let config = MapConfig {
        fields: vec![
            FieldSpec::with_aliases("Supplier", &["Vendor"]),
            FieldSpec::new("Remarks"),
        ],
        ..MapConfig::default()
    };
    let target = Table::new(labels(&["MPN"]), vec![vec![t("abc123")]]);
    let result = run(&config, &reference, &target).unwrap();

    let supplier = result.report.fields[0].actual.as_ref().unwrap();
    assert_eq!(supplier.label, "Vendor");
    assert_eq!(supplier.method, ResolveMethod::Alias);
    assert_eq!(result.table.value(0, "Supplier"), Some(&t("Acme")));
}

// -------------------------------------------------------------------------
// Layout
// -------------------------------------------------------------------------

#[test]
fn transfer_block_sits_before_manufacturer() {
    let target = target(vec![vec![t("1"), t("ABC123"), t(""), t("TI"), t("")]]);
    let result = run(&MapConfig::default(), &reference(), &target).unwrap();
    let out = result.table.labels();

    let default_config = MapConfig::default();
    let mut expected = vec!["Sl No", "MPN"];
    expected.extend(default_config.field_names());
    expected.extend(["Manufacturer", "Qty"]);
    assert_eq!(out, expected);
    assert_eq!(result.report.columns.target_anchor.as_ref().unwrap().label, "Manufacturer");
}

#[test]
fn transfer_block_follows_key_without_anchor() {
    let target = Table::new(labels(&["MPN", "Qty"]), vec![vec![t("ABC123"), t("2")]]);
    let result = run(&MapConfig::default(), &reference(), &target).unwrap();
    let out = result.table.labels();
    assert_eq!(out[0], "MPN");
    assert_eq!(out[1], "Supplier");
    assert_eq!(*out.last().unwrap(), "Qty");
    assert!(result.report.columns.target_anchor.is_none());
}

#[test]
fn target_formulas_follow_moved_columns_and_rows() {
    // Blank grid row 2 is dropped and the transfer block lands after MPN,
    // so Qty/Cost move from B/C to Q/R and row 3 becomes row 2.
    let grid = vec![
        vec![t("MPN"), t("Qty"), t("Cost"), t("Total")],
        vec![t(""), t(""), t(""), t("")],
        vec![
            t("ABC123"),
            CellValue::Number(2.0),
            CellValue::Number(3.0),
            CellValue::Formula { formula: "=B3*C3".into(), cached: Box::new(CellValue::Number(6.0)) },
        ],
    ];
    let target = Table::from_grid(grid, 0);
    let result = run(&MapConfig::default(), &reference(), &target).unwrap();
    let table = &result.table;

    assert_eq!(table.column_index("Qty"), Some(16));
    assert_eq!(table.column_index("Cost"), Some(17));
    assert_eq!(
        table.value(0, "Total"),
        Some(&CellValue::Formula { formula: "=Q2*R2".into(), cached: Box::new(CellValue::Number(6.0)) })
    );
    assert!(!result.report.warnings.iter().any(|w| matches!(w, MapWarning::FormulasFlattened { .. })));
}

#[test]
fn formula_on_dropped_remarks_keeps_cached_value() {
    // Target Remarks (column C) is replaced by the transfer block's Remarks.
    let formula = CellValue::Formula {
        formula: "=C2".into(),
        cached: Box::new(t("check stock")),
    };
    let target = target(vec![vec![t("1"), t("ABC123"), t("check stock"), t("TI"), formula]]);
    let result = run(&MapConfig::default(), &reference(), &target).unwrap();

    assert_eq!(result.table.value(0, "Qty"), Some(&t("check stock")));
    assert!(result
        .report
        .warnings
        .contains(&MapWarning::FormulasFlattened { count: 1 }));
}

// -------------------------------------------------------------------------
// Keys
// -------------------------------------------------------------------------

#[test]
fn alternate_key_and_case_folding_match() {
    let target = target(vec![
        vec![t("1"), t(" def456-t "), t(""), t(""), t("")],
        vec![t("2"), t("abc123"), t(""), t(""), t("")],
    ]);
    let result = run(&MapConfig::default(), &reference(), &target).unwrap();
    assert_eq!(result.table.value(0, "Supplier"), Some(&t("Bolt Co")));
    assert_eq!(result.table.value(0, "Remarks"), Some(&t("EOL soon")));
    assert_eq!(result.table.value(1, "Supplier"), Some(&t("Acme")));
    assert_eq!(result.report.summary.matched, 2);
}

#[test]
fn key_found_through_candidates() {
    let reference = Table::new(
        labels(&["Mfr Part Number", "Supplier", "Remarks"]),
        vec![vec![t("ABC123"), t("Acme"), t("")]],
    );
    let target = Table::new(labels(&["Coreel P/N", "Qty"]), vec![vec![t("ABC123"), t("1")]]);
    let result = run(&MapConfig::default(), &reference, &target).unwrap();
    assert_eq!(result.report.columns.reference_key.label, "Mfr Part Number");
    assert_eq!(result.report.columns.target_key.label, "Coreel P/N");
    assert_eq!(result.table.value(0, "Supplier"), Some(&t("Acme")));
}

#[test]
fn numeric_keys_match_text_keys() {
    let reference = Table::new(
        labels(&["MPN", "Supplier", "Remarks"]),
        vec![vec![CellValue::Number(100234.0), t("Acme"), t("")]],
    );
    let target = Table::new(labels(&["MPN"]), vec![vec![t("100234")]]);
    let result = run(&MapConfig::default(), &reference, &target).unwrap();
    assert!(result.table.rows[0].matched);
}

// -------------------------------------------------------------------------
// Warnings
// -------------------------------------------------------------------------

#[test]
fn unresolved_fields_are_reported_and_empty() {
    let target = target(vec![vec![t("1"), t("ABC123"), t(""), t(""), t("")]]);
    let result = run(&MapConfig::default(), &reference(), &target).unwrap();

    let missing = result
        .report
        .warnings
        .iter()
        .find_map(|w| match w {
            MapWarning::MissingTransferColumn { fields } => Some(fields.clone()),
            _ => None,
        })
        .unwrap();
    assert!(missing.contains(&"Currency".to_string()));
    assert!(!missing.contains(&"Supplier".to_string()));
    assert_eq!(result.table.value(0, "Currency"), Some(&CellValue::Empty));
}

#[test]
fn header_detection_feeds_table() {
    let grid = vec![
        vec![t("ERPU2 Costed BOM")],
        vec![],
        vec![t("Sl No"), t("MPN"), t("Qty")],
        vec![t("1"), t("ABC123"), CellValue::Number(3.0)],
    ];
    let found = detect_header_row(&grid, &MapConfig::default().header);
    assert!(found.detected);
    let table = Table::from_grid(grid, found.row);

    let result = run(&MapConfig::default(), &reference(), &table).unwrap();
    assert_eq!(result.table.header_row, 2);
    assert_eq!(result.table.preamble.len(), 2);
    assert!(result.table.rows[0].matched);
    assert!(matches!(result.table.columns[0].origin, ColumnOrigin::Target(0)));
}
