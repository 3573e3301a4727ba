use std::fmt;

use serde::Serialize;

/// Which input a problem was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// The OLD bill of materials that values are copied from.
    Reference,
    /// The NEW bill of materials that receives the values.
    Target,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reference => write!(f, "reference"),
            Self::Target => write!(f, "target"),
        }
    }
}

#[derive(Debug)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (bad threshold, missing remarks field, etc.).
    ConfigValidation(String),
    /// The join key column could not be resolved in one of the tables.
    MissingKeyColumn { side: Side, available: Vec<String> },
    /// The input had no rows at all, so there is no header to read.
    EmptyTable { side: Side },
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::MissingKeyColumn { side, available } => {
                write!(f, "{side} table: key column not found (available columns: ")?;
                if available.is_empty() {
                    write!(f, "none")?;
                } else {
                    let quoted: Vec<String> = available.iter().map(|c| format!("'{c}'")).collect();
                    write!(f, "{}", quoted.join(", "))?;
                }
                write!(f, ")")
            }
            Self::EmptyTable { side } => write!(f, "{side} table is empty (no header row)"),
        }
    }
}

impl std::error::Error for ReconError {}
