use std::collections::HashMap;

use crate::model::{CellValue, Table};

/// Maximum number of duplicate keys kept as samples for reporting.
const MAX_DUPLICATE_SAMPLES: usize = 20;

/// Key normalization used for both building and lookup: trim + case-fold.
pub fn normalize_key(cell: &CellValue) -> String {
    cell.display_text().trim().to_lowercase()
}

/// Columns of the reference table that feed the mapping.
#[derive(Debug, Clone)]
pub struct MappingColumns {
    pub key: usize,
    pub alternate: Option<usize>,
    /// One entry per transferable field; `None` means the field is always empty.
    pub fields: Vec<Option<usize>>,
}

/// Normalized key → transferable-field values, first-seen row wins.
#[derive(Debug, Clone, Default)]
pub struct Mapping {
    entries: HashMap<String, usize>,
    values: Vec<Vec<CellValue>>,
    duplicate_count: usize,
    duplicate_samples: Vec<String>,
}

impl Mapping {
    pub fn build(reference: &Table, columns: &MappingColumns) -> Self {
        let mut mapping = Mapping::default();

        for row in 0..reference.len() {
            let key = reference.cell(row, columns.key);
            if key.is_blank() {
                continue;
            }

            let values: Vec<CellValue> = columns
                .fields
                .iter()
                .map(|col| match col {
                    Some(c) => reference.cell(row, *c).clone(),
                    None => CellValue::Empty,
                })
                .collect();
            let slot = mapping.values.len();
            mapping.values.push(values);

            mapping.insert(normalize_key(key), slot);

            if let Some(alt_col) = columns.alternate {
                let alt = reference.cell(row, alt_col);
                if !alt.is_blank() {
                    mapping.insert(normalize_key(alt), slot);
                }
            }
        }

        log::debug!(
            "mapping built: {} keys from {} reference rows ({} duplicates)",
            mapping.entries.len(),
            reference.len(),
            mapping.duplicate_count
        );
        mapping
    }

    fn insert(&mut self, key: String, slot: usize) {
        if self.entries.contains_key(&key) {
            self.duplicate_count += 1;
            if self.duplicate_samples.len() < MAX_DUPLICATE_SAMPLES
                && !self.duplicate_samples.contains(&key)
            {
                self.duplicate_samples.push(key);
            }
            return;
        }
        self.entries.insert(key, slot);
    }

    /// Look up a raw key cell (normalized here).
    pub fn get(&self, key: &CellValue) -> Option<&[CellValue]> {
        self.get_normalized(&normalize_key(key))
    }

    pub fn get_normalized(&self, key: &str) -> Option<&[CellValue]> {
        self.entries.get(key).map(|&slot| self.values[slot].as_slice())
    }

    /// Number of distinct keys (primary and alternate).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insertions rejected because the key was already present.
    pub fn duplicates(&self) -> usize {
        self.duplicate_count
    }

    pub fn duplicate_samples(&self) -> &[String] {
        &self.duplicate_samples
    }
}
