//! `bommap map` - carry supplier data from an OLD BOM into a NEW one.

use std::path::{Path, PathBuf};

use bommap_io::xlsx::ExportOptions;
use bommap_io::{FileFormat, LoadedTable, ReadOptions};
use bommap_recon::model::{ColumnOrigin, MapReport, MergedTable};
use bommap_recon::{MapConfig, ReconError, Side};
use clap::Args;
use serde::Serialize;

use crate::exit_codes::{recon_exit_code, EXIT_ERROR, EXIT_IO, EXIT_USAGE, EXIT_WARNINGS};
use crate::profile::load_config;
use crate::util::render_table;
use crate::CliError;

/// Widest a preview column may get.
const PREVIEW_COL_WIDTH: usize = 24;

#[derive(Args)]
pub struct MapArgs {
    /// OLD (reference) BOM holding the supplier data
    pub old: PathBuf,

    /// NEW (target) BOM that receives the data
    pub new: PathBuf,

    /// Output file (.xlsx, .csv or .tsv) [default: <NEW>_MAPPED.xlsx]
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Mapping profile (TOML) overriding the built-in defaults
    #[arg(long, env = "BOMMAP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Print the run report as JSON to stdout
    #[arg(long)]
    pub json: bool,

    /// Write the run report as JSON to a file
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Print the first N mapped rows
    #[arg(long, value_name = "N")]
    pub preview: Option<usize>,

    /// Sheet to read from OLD (default: first sheet)
    #[arg(long)]
    pub sheet_old: Option<String>,

    /// Sheet to read from NEW (default: first sheet)
    #[arg(long)]
    pub sheet_new: Option<String>,

    /// Header row of OLD, 1-based (default: detected)
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pub old_header_row: Option<u32>,

    /// Header row of NEW, 1-based (default: detected)
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pub new_header_row: Option<u32>,

    /// Exit with code 6 when the run produced warnings
    #[arg(long)]
    pub strict: bool,
}

/// JSON shape of `--json` / `--report`.
#[derive(Serialize)]
struct MapOutput<'a> {
    old: String,
    new: String,
    output: String,
    #[serde(flatten)]
    report: &'a MapReport,
}

pub fn cmd_map(args: MapArgs) -> Result<(), CliError> {
    let output_path = args
        .output
        .clone()
        .unwrap_or_else(|| bommap_io::default_output_path(&args.new));
    check_paths(&args, &output_path)?;

    let config = load_config(args.config.as_deref())?;

    let reference = load_input(
        &args.old,
        ReadOptions {
            sheet: args.sheet_old.clone(),
            formulas: false,
            header_row: args.old_header_row.map(|n| n as usize - 1),
        },
        &config,
    )?;
    let target = load_input(
        &args.new,
        ReadOptions {
            sheet: args.sheet_new.clone(),
            formulas: true,
            header_row: args.new_header_row.map(|n| n as usize - 1),
        },
        &config,
    )?;

    let mut result = bommap_recon::run(&config, &reference.table, &target.table).map_err(engine_err)?;

    let header_warnings = [
        reference.header.warning(Side::Reference),
        target.header.warning(Side::Target),
    ];
    for (idx, warning) in header_warnings.into_iter().flatten().enumerate() {
        log::warn!("{warning}");
        result.report.warnings.insert(idx, warning);
    }

    let export = ExportOptions {
        sheet_name: output_sheet_name(&args.new, args.sheet_new.as_deref()),
        ..ExportOptions::default()
    };
    bommap_io::save(&result.table, &output_path, &export)
        .map_err(|e| CliError::new(EXIT_IO, format!("cannot write output: {e}")))?;

    let report = &result.report;
    let output = MapOutput {
        old: args.old.display().to_string(),
        new: args.new.display().to_string(),
        output: output_path.display().to_string(),
        report,
    };

    if args.json || args.report.is_some() {
        let json_str = serde_json::to_string_pretty(&output)
            .map_err(|e| CliError::new(EXIT_ERROR, format!("JSON serialization error: {e}")))?;
        if let Some(ref path) = args.report {
            std::fs::write(path, &json_str)
                .map_err(|e| CliError::new(EXIT_IO, format!("cannot write report: {e}")))?;
            eprintln!("wrote {}", path.display());
        }
        if args.json {
            println!("{json_str}");
        }
    }

    if let Some(n) = args.preview {
        let preview = render_preview(&result.table, report.columns.target_key.index, n);
        if args.json {
            eprint!("{preview}");
        } else {
            print!("{preview}");
        }
    }

    // Human summary to stderr
    let s = &report.summary;
    eprintln!(
        "mapped {} of {} rows ({} new parts) from {} reference rows -> {}",
        s.matched,
        s.target_rows,
        s.unmatched,
        s.reference_rows,
        output_path.display()
    );
    if !report.warnings.is_empty() {
        eprintln!("{} warning(s)", report.warnings.len());
    }

    if args.strict && !report.warnings.is_empty() {
        let first = report.warnings.first().map(|w| w.to_string()).unwrap_or_default();
        return Err(CliError::new(
            EXIT_WARNINGS,
            format!("{} warning(s) with --strict: {first}", report.warnings.len()),
        ));
    }

    Ok(())
}

/// Reject unsupported extensions and an output that would clobber an input.
fn check_paths(args: &MapArgs, output: &Path) -> Result<(), CliError> {
    for path in [&args.old, &args.new] {
        FileFormat::from_path(path).map_err(|e| CliError::new(EXIT_USAGE, e))?;
        if !path.exists() {
            return Err(CliError::new(EXIT_IO, format!("{}: file not found", path.display())));
        }
    }
    FileFormat::from_path(output).map_err(|e| CliError::new(EXIT_USAGE, e))?;

    if output == args.old.as_path() || output == args.new.as_path() {
        return Err(CliError::new(
            EXIT_USAGE,
            format!("output {} would overwrite an input file", output.display()),
        )
        .with_hint("pass a different path with -o"));
    }
    Ok(())
}

fn load_input(path: &Path, options: ReadOptions, config: &MapConfig) -> Result<LoadedTable, CliError> {
    bommap_io::load_table(path, &options, &config.header)
        .map_err(|e| CliError::new(EXIT_IO, format!("cannot read {}: {e}", path.display())))
}

fn engine_err(err: ReconError) -> CliError {
    let code = recon_exit_code(&err);
    let error = CliError::new(code, err.to_string());
    match err {
        ReconError::MissingKeyColumn { side, .. } => error.with_hint(format!(
            "pin the header row with --{}-header-row, or add the key label to [key] candidates in a profile",
            match side {
                Side::Reference => "old",
                Side::Target => "new",
            }
        )),
        _ => error,
    }
}

/// Keep the NEW workbook's sheet name when there is one.
fn output_sheet_name(new: &Path, sheet: Option<&str>) -> String {
    if let Some(sheet) = sheet {
        return sheet.to_string();
    }
    if FileFormat::from_path(new).ok() == Some(FileFormat::Excel) {
        if let Ok(names) = bommap_io::xlsx::sheet_names(new) {
            if let Some(first) = names.into_iter().next() {
                return first;
            }
        }
    }
    ExportOptions::default().sheet_name
}

/// First `limit` rows: key column, the transfer block and the match flag.
fn render_preview(table: &MergedTable, key: usize, limit: usize) -> String {
    let cols: Vec<usize> = table
        .columns
        .iter()
        .enumerate()
        .filter(|(_, c)| match c.origin {
            ColumnOrigin::Target(idx) => idx == key,
            ColumnOrigin::Transfer(_) => true,
        })
        .map(|(idx, _)| idx)
        .collect();

    let mut header: Vec<String> = cols.iter().map(|&c| table.columns[c].label.clone()).collect();
    header.push("matched".to_string());

    let rows: Vec<Vec<String>> = table
        .rows
        .iter()
        .take(limit)
        .map(|row| {
            let mut cells: Vec<String> = cols
                .iter()
                .map(|&c| row.cells.get(c).map(|v| v.display_text()).unwrap_or_default())
                .collect();
            cells.push(if row.matched { "yes" } else { "no" }.to_string());
            cells
        })
        .collect();

    render_table(&header, &rows, PREVIEW_COL_WIDTH)
}
