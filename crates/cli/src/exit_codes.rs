//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! | Code | Description                                         |
//! |------|-----------------------------------------------------|
//! | 0    | Success                                             |
//! | 1    | General error (unspecified)                         |
//! | 2    | CLI usage error (bad args, unsupported file type)   |
//! | 3    | I/O error reading inputs or writing output          |
//! | 4    | Invalid mapping profile (parse or validation)       |
//! | 5    | Key column not found in one of the inputs           |
//! | 6    | Run finished with warnings and `--strict` was given |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

use bommap_recon::ReconError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// Input could not be read or output could not be written.
pub const EXIT_IO: u8 = 3;

/// Mapping profile failed to parse or validate.
pub const EXIT_INVALID_CONFIG: u8 = 4;

/// Key column (MPN) could not be resolved in OLD or NEW.
pub const EXIT_MISSING_KEY: u8 = 5;

/// Output was written but the run produced warnings (`--strict` only).
pub const EXIT_WARNINGS: u8 = 6;

/// Map an engine error to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => EXIT_INVALID_CONFIG,
        ReconError::MissingKeyColumn { .. } => EXIT_MISSING_KEY,
        ReconError::EmptyTable { .. } => EXIT_IO,
    }
}
