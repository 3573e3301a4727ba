//! `bommap-recon` - Key-based BOM reconciliation engine.
//!
//! Pure engine crate: receives pre-loaded tables, returns the merged table
//! plus a run report. No CLI or IO dependencies.

pub mod config;
pub mod engine;
pub mod error;
pub mod header;
pub mod mapping;
pub mod matcher;
pub mod merge;
pub mod model;
pub mod order;
pub mod relocate;
pub mod resolve;

pub use config::MapConfig;
pub use engine::run;
pub use error::{ReconError, Side};
pub use header::{detect_header_row, HeaderDetection};
pub use model::{CellValue, MapReport, MapResult, MapWarning, MergedTable, Table};
