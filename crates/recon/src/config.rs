use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Immutable mapping profile. `MapConfig::default()` is the built-in BOM
/// supplier profile; a TOML profile may override any section.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct MapConfig {
    pub name: String,
    /// Minimum similarity for fuzzy column-name matches.
    pub column_threshold: f64,
    pub key: KeyConfig,
    /// Optional second key column in the reference table (alternate MPN).
    pub alternate_key: Option<FieldSpec>,
    /// Fields copied from reference to target, in output order.
    pub fields: Vec<FieldSpec>,
    pub remarks: RemarksConfig,
    pub placement: PlacementConfig,
    pub header: HeaderConfig,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            name: "BOM supplier mapping".into(),
            column_threshold: 0.7,
            key: KeyConfig::default(),
            alternate_key: Some(FieldSpec::with_aliases(
                "Alternate",
                &["Alternate MPN", "Alt MPN"],
            )),
            fields: DEFAULT_FIELDS.iter().map(|name| FieldSpec::new(name)).collect(),
            remarks: RemarksConfig::default(),
            placement: PlacementConfig::default(),
            header: HeaderConfig::default(),
        }
    }
}

const DEFAULT_FIELDS: &[&str] = &[
    "Supplier",
    "PO number",
    "PO qty",
    "Supplier part number",
    "Price",
    "Extended price",
    "Remarks",
    "ETA",
    "Currency",
    "Lead time",
    "Availability",
    "BCD",
    "unit price with BCD",
    "unit price in INR",
    "Extended price in INR",
];

// ---------------------------------------------------------------------------
// Fields
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FieldSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
}

impl FieldSpec {
    pub fn new(name: &str) -> Self {
        Self { name: name.into(), aliases: Vec::new() }
    }

    pub fn with_aliases(name: &str, aliases: &[&str]) -> Self {
        Self {
            name: name.into(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Key
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct KeyConfig {
    /// Logical name, used in messages.
    pub name: String,
    /// Labels tried in order (trimmed, case-insensitive) before fuzzy matching.
    pub candidates: Vec<String>,
    /// String compared against every label in the fuzzy step.
    pub fuzzy_query: String,
    /// Key columns tolerate looser matching than transferable fields.
    pub threshold: f64,
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self {
            name: "MPN".into(),
            candidates: [
                "mpn",
                "manufacturer part number",
                "part number",
                "mfr p/n",
                "mfr part number",
                "coreel p/n",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            fuzzy_query: "mpn".into(),
            threshold: 0.6,
        }
    }
}

// ---------------------------------------------------------------------------
// Remarks + placement
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct RemarksConfig {
    /// Name of the transferable field that gets the fallback treatment.
    pub field: String,
    /// Written when a target row has no reference record and no remarks of its own.
    pub fallback: String,
}

impl Default for RemarksConfig {
    fn default() -> Self {
        Self {
            field: "Remarks".into(),
            fallback: "New Part".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PlacementConfig {
    /// Target column the transfer block is inserted in front of. When absent
    /// or not found, the block goes directly after the key column.
    #[serde(default)]
    pub anchor: Option<FieldSpec>,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            anchor: Some(FieldSpec::new("Manufacturer")),
        }
    }
}

// ---------------------------------------------------------------------------
// Header detection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct HeaderConfig {
    /// Substrings (lowercase) that mark a row as the header row.
    pub indicators: Vec<String>,
    pub max_rows: usize,
    pub max_cols: usize,
}

impl Default for HeaderConfig {
    fn default() -> Self {
        Self {
            indicators: ["mpn", "manufacturer", "coreel", "part number"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            max_rows: 30,
            max_cols: 300,
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl MapConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: MapConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ReconError> {
        toml::to_string_pretty(self).map_err(|e| ReconError::ConfigParse(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        check_threshold("column_threshold", self.column_threshold)?;
        check_threshold("key.threshold", self.key.threshold)?;

        if self.fields.is_empty() {
            return Err(ReconError::ConfigValidation(
                "at least one transferable field is required".into(),
            ));
        }

        let mut seen = HashSet::new();
        for field in &self.fields {
            let norm = field.name.trim().to_lowercase();
            if norm.is_empty() {
                return Err(ReconError::ConfigValidation("field names must not be empty".into()));
            }
            if !seen.insert(norm) {
                return Err(ReconError::ConfigValidation(format!(
                    "duplicate field '{}'",
                    field.name
                )));
            }
        }

        if seen.contains(&self.key.name.trim().to_lowercase()) {
            return Err(ReconError::ConfigValidation(format!(
                "key '{}' cannot also be a transferable field",
                self.key.name
            )));
        }

        if self.remarks_index().is_none() {
            return Err(ReconError::ConfigValidation(format!(
                "remarks field '{}' is not one of the transferable fields",
                self.remarks.field
            )));
        }

        if self.key.candidates.is_empty() && self.key.fuzzy_query.trim().is_empty() {
            return Err(ReconError::ConfigValidation(
                "key needs at least one candidate or a fuzzy_query".into(),
            ));
        }

        if self.header.max_rows == 0 || self.header.max_cols == 0 {
            return Err(ReconError::ConfigValidation(
                "header.max_rows and header.max_cols must be positive".into(),
            ));
        }

        Ok(())
    }

    /// Position of the remarks field within `fields`.
    pub fn remarks_index(&self) -> Option<usize> {
        let target = self.remarks.field.trim().to_lowercase();
        self.fields
            .iter()
            .position(|f| f.name.trim().to_lowercase() == target)
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }
}

fn check_threshold(name: &str, value: f64) -> Result<(), ReconError> {
    if !(value > 0.0 && value <= 1.0) {
        return Err(ReconError::ConfigValidation(format!(
            "{name} must be in (0, 1], got {value}"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
