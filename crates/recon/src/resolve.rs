//! Logical field name → actual column label.
//!
//! Precedence: exact (trim + case-fold), then configured aliases in order,
//! then the best fuzzy match at or above the threshold.

use crate::config::{FieldSpec, KeyConfig};
use crate::matcher::{best_match, normalize_label};
use crate::model::{FieldResolution, ResolveMethod, Resolved};

/// Resolve one logical field against a table's column labels.
pub fn resolve_column(field: &FieldSpec, columns: &[String], threshold: f64) -> Option<Resolved> {
    resolve_with(&field.name, &field.aliases, &field.name, columns, threshold)
}

/// Resolve the join key column. Key candidates play the role of aliases and
/// the fuzzy step compares `fuzzy_query` (e.g. "mpn") at the key threshold.
pub fn resolve_key_column(key: &KeyConfig, columns: &[String]) -> Option<Resolved> {
    resolve_with(&key.name, &key.candidates, &key.fuzzy_query, columns, key.threshold)
}

/// Resolve every transferable field; unresolved fields carry `actual: None`.
pub fn resolve_fields(fields: &[FieldSpec], columns: &[String], threshold: f64) -> Vec<FieldResolution> {
    fields
        .iter()
        .map(|field| FieldResolution {
            logical: field.name.clone(),
            actual: resolve_column(field, columns, threshold),
        })
        .collect()
}

fn resolve_with(
    name: &str,
    aliases: &[String],
    fuzzy_query: &str,
    columns: &[String],
    threshold: f64,
) -> Option<Resolved> {
    let normalized: Vec<String> = columns.iter().map(|c| normalize_label(c)).collect();
    let found = |idx: usize, method: ResolveMethod| Resolved {
        label: columns[idx].clone(),
        index: idx,
        method,
    };

    let wanted = normalize_label(name);
    if !wanted.is_empty() {
        if let Some(idx) = normalized.iter().position(|c| *c == wanted) {
            return Some(found(idx, ResolveMethod::Exact));
        }
    }

    for alias in aliases {
        let alias = normalize_label(alias);
        if alias.is_empty() {
            continue;
        }
        if let Some(idx) = normalized.iter().position(|c| *c == alias) {
            return Some(found(idx, ResolveMethod::Alias));
        }
    }

    best_match(fuzzy_query, &normalized, threshold)
        .map(|(idx, score)| found(idx, ResolveMethod::Fuzzy { score }))
}
