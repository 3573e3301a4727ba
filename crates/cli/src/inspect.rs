//! `bommap inspect` - show how a BOM file would be read and resolved.

use std::path::PathBuf;

use bommap_io::{FileFormat, ReadOptions};
use bommap_recon::config::FieldSpec;
use bommap_recon::model::{FieldResolution, ResolveMethod, Resolved};
use bommap_recon::resolve::{resolve_column, resolve_fields, resolve_key_column};
use clap::Args;
use serde::Serialize;

use crate::exit_codes::{EXIT_ERROR, EXIT_IO, EXIT_MISSING_KEY, EXIT_USAGE};
use crate::profile::load_config;
use crate::util::{col_to_letter, display_width, pad_right};
use crate::CliError;

#[derive(Args)]
pub struct InspectArgs {
    /// BOM file to inspect
    pub file: PathBuf,

    /// Sheet to read (default: first sheet)
    #[arg(long)]
    pub sheet: Option<String>,

    /// Header row, 1-based (default: detected)
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pub header_row: Option<u32>,

    /// Mapping profile (TOML) overriding the built-in defaults
    #[arg(long, env = "BOMMAP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output JSON to stdout instead of a human summary
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct InspectOutput {
    file: String,
    /// 1-based, as a spreadsheet shows it.
    header_row: usize,
    header_detected: bool,
    data_rows: usize,
    columns: Vec<String>,
    key: Option<Resolved>,
    alternate_key: Option<Resolved>,
    anchor: Option<Resolved>,
    fields: Vec<FieldResolution>,
}

pub fn cmd_inspect(args: InspectArgs) -> Result<(), CliError> {
    FileFormat::from_path(&args.file).map_err(|e| CliError::new(EXIT_USAGE, e))?;
    let config = load_config(args.config.as_deref())?;

    let options = ReadOptions {
        sheet: args.sheet.clone(),
        formulas: false,
        header_row: args.header_row.map(|n| n as usize - 1),
    };
    let loaded = bommap_io::load_table(&args.file, &options, &config.header)
        .map_err(|e| CliError::new(EXIT_IO, format!("cannot read {}: {e}", args.file.display())))?;
    let table = &loaded.table;

    let threshold = config.column_threshold;
    let resolve_opt = |spec: Option<&FieldSpec>| {
        spec.and_then(|s| resolve_column(s, &table.columns, threshold))
    };

    let output = InspectOutput {
        file: args.file.display().to_string(),
        header_row: loaded.header.row + 1,
        header_detected: loaded.header.detected,
        data_rows: table.len(),
        columns: table.columns.clone(),
        key: resolve_key_column(&config.key, &table.columns),
        alternate_key: resolve_opt(config.alternate_key.as_ref()),
        anchor: resolve_opt(config.placement.anchor.as_ref()),
        fields: resolve_fields(&config.fields, &table.columns, threshold),
    };

    if args.json {
        let json_str = serde_json::to_string_pretty(&output)
            .map_err(|e| CliError::new(EXIT_ERROR, format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
    } else {
        print!("{}", render(&output));
    }

    if output.key.is_none() {
        return Err(CliError::new(
            EXIT_MISSING_KEY,
            format!("{}: key column not found", output.file),
        )
        .with_hint("pin the header row with --header-row, or add the key label to [key] candidates in a profile"));
    }
    Ok(())
}

fn describe(resolved: Option<&Resolved>) -> String {
    match resolved {
        None => "-".to_string(),
        Some(r) => {
            let how = match r.method {
                ResolveMethod::Exact => "exact".to_string(),
                ResolveMethod::Alias => "alias".to_string(),
                ResolveMethod::Fuzzy { score } => format!("fuzzy {:.2}", score),
            };
            format!("{} '{}' ({})", col_to_letter(r.index), r.label, how)
        }
    }
}

fn render(output: &InspectOutput) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{}: header row {}{}, {} data rows\n\n",
        output.file,
        output.header_row,
        if output.header_detected { "" } else { " (not detected)" },
        output.data_rows
    ));

    out.push_str("columns:\n");
    for (idx, label) in output.columns.iter().enumerate() {
        out.push_str(&format!("  {} {}\n", pad_right(&col_to_letter(idx), 3), label));
    }

    out.push('\n');
    out.push_str(&format!("key:        {}\n", describe(output.key.as_ref())));
    out.push_str(&format!("alternate:  {}\n", describe(output.alternate_key.as_ref())));
    out.push_str(&format!("anchor:     {}\n", describe(output.anchor.as_ref())));

    out.push_str("\nfields:\n");
    let width = output
        .fields
        .iter()
        .map(|f| display_width(&f.logical))
        .max()
        .unwrap_or(0);
    for field in &output.fields {
        out.push_str(&format!(
            "  {}  {}\n",
            pad_right(&field.logical, width),
            describe(field.actual.as_ref())
        ));
    }
    out
}
