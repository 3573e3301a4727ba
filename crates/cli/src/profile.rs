//! `bommap config` - show and validate mapping profiles.

use std::path::{Path, PathBuf};

use bommap_recon::MapConfig;
use clap::Subcommand;

use crate::exit_codes::{recon_exit_code, EXIT_IO};
use crate::CliError;

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective mapping profile as TOML
    #[command(after_help = "\
Examples:
  bommap config show
  bommap config show --config vendor.toml
  bommap config show > my-profile.toml")]
    Show {
        /// Profile to load on top of the built-in defaults
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Validate a mapping profile without running
    #[command(after_help = "\
Examples:
  bommap config validate vendor.toml")]
    Validate {
        /// Path to the .toml profile
        file: PathBuf,
    },
}

pub fn cmd_config(cmd: ConfigCommands) -> Result<(), CliError> {
    match cmd {
        ConfigCommands::Show { config } => {
            let config = load_config(config.as_deref())?;
            let text = config
                .to_toml()
                .map_err(|e| CliError::new(recon_exit_code(&e), e.to_string()))?;
            print!("{text}");
            Ok(())
        }
        ConfigCommands::Validate { file } => {
            let config = load_config(Some(&file))?;
            eprintln!(
                "{}: ok ('{}', {} fields)",
                file.display(),
                config.name,
                config.fields.len()
            );
            Ok(())
        }
    }
}

/// The built-in profile, or the given file parsed and validated.
pub fn load_config(path: Option<&Path>) -> Result<MapConfig, CliError> {
    let Some(path) = path else {
        return Ok(MapConfig::default());
    };

    let text = std::fs::read_to_string(path)
        .map_err(|e| CliError::new(EXIT_IO, format!("cannot read config {}: {e}", path.display())))?;
    let config = MapConfig::from_toml(&text).map_err(|e| {
        CliError::new(recon_exit_code(&e), format!("{}: {e}", path.display()))
            .with_hint("run `bommap config show` for a complete example profile")
    })?;
    log::info!("loaded profile '{}' from {}", config.name, path.display());
    Ok(config)
}
