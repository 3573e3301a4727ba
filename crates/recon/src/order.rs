use std::collections::HashSet;

use crate::config::FieldSpec;
use crate::matcher::normalize_label;
use crate::model::{ColumnOrigin, OutputColumn};

/// Where the transfer block lands and which target columns are dropped.
#[derive(Debug, Clone)]
pub struct Placement {
    pub key: usize,
    pub anchor: Option<usize>,
    /// Extra target columns to drop (e.g. the target's own remarks column,
    /// whose value is folded into the transferred remarks field).
    pub drop: Vec<usize>,
}

/// Final column sequence: target columns before the insertion point, the
/// transfer block in configured order, then the remaining target columns.
///
/// The insertion point is the anchor column when present, otherwise directly
/// after the key. Target columns whose label collides with a transferable
/// field name are dropped so labels never repeat; the key is always kept.
pub fn output_columns(target_columns: &[String], fields: &[FieldSpec], placement: &Placement) -> Vec<OutputColumn> {
    let field_names: HashSet<String> = fields.iter().map(|f| normalize_label(&f.name)).collect();

    let mut skip: HashSet<usize> = target_columns
        .iter()
        .enumerate()
        .filter(|(_, label)| field_names.contains(&normalize_label(label)))
        .map(|(idx, _)| idx)
        .collect();
    skip.extend(placement.drop.iter().copied());
    skip.remove(&placement.key);

    let insert_at = match placement.anchor {
        Some(anchor) if !skip.contains(&anchor) => anchor,
        _ => placement.key + 1,
    };

    let target_col = |idx: usize| OutputColumn {
        label: target_columns[idx].clone(),
        origin: ColumnOrigin::Target(idx),
    };

    let mut out = Vec::with_capacity(target_columns.len() + fields.len());
    out.extend((0..insert_at.min(target_columns.len())).filter(|i| !skip.contains(i)).map(target_col));
    out.extend(fields.iter().enumerate().map(|(idx, f)| OutputColumn {
        label: f.name.clone(),
        origin: ColumnOrigin::Transfer(idx),
    }));
    out.extend((insert_at..target_columns.len()).filter(|i| !skip.contains(i)).map(target_col));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(cols: &[OutputColumn]) -> Vec<&str> {
        cols.iter().map(|c| c.label.as_str()).collect()
    }

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    fn fields() -> Vec<FieldSpec> {
        vec![FieldSpec::new("Supplier"), FieldSpec::new("Remarks")]
    }

    #[test]
    fn block_follows_key_without_anchor() {
        let target = strings(&["Sl", "MPN", "Qty", "Desc"]);
        let p = Placement { key: 1, anchor: None, drop: vec![] };
        let out = output_columns(&target, &fields(), &p);
        assert_eq!(labels(&out), vec!["Sl", "MPN", "Supplier", "Remarks", "Qty", "Desc"]);
        assert_eq!(out[2].origin, ColumnOrigin::Transfer(0));
        assert_eq!(out[4].origin, ColumnOrigin::Target(2));
    }

    #[test]
    fn block_goes_before_anchor() {
        let target = strings(&["MPN", "Qty", "Manufacturer", "Desc"]);
        let p = Placement { key: 0, anchor: Some(2), drop: vec![] };
        let out = output_columns(&target, &fields(), &p);
        assert_eq!(labels(&out), vec!["MPN", "Qty", "Supplier", "Remarks", "Manufacturer", "Desc"]);
    }

    #[test]
    fn colliding_target_columns_are_not_repeated() {
        let target = strings(&["MPN", "supplier ", "Manufacturer", "Remarks", "Notes"]);
        let p = Placement { key: 0, anchor: Some(2), drop: vec![] };
        let out = output_columns(&target, &fields(), &p);
        assert_eq!(labels(&out), vec!["MPN", "Supplier", "Remarks", "Manufacturer", "Notes"]);
    }

    #[test]
    fn dropped_anchor_falls_back_to_key() {
        let target = strings(&["MPN", "Remark", "Qty"]);
        let p = Placement { key: 0, anchor: Some(1), drop: vec![1] };
        let out = output_columns(&target, &fields(), &p);
        assert_eq!(labels(&out), vec!["MPN", "Supplier", "Remarks", "Qty"]);
    }

    #[test]
    fn key_as_last_column() {
        let target = strings(&["Qty", "MPN"]);
        let p = Placement { key: 1, anchor: None, drop: vec![] };
        let out = output_columns(&target, &fields(), &p);
        assert_eq!(labels(&out), vec!["Qty", "MPN", "Supplier", "Remarks"]);
    }
}
