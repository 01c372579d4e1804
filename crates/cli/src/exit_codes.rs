//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! | Code | Meaning                                                    |
//! |------|------------------------------------------------------------|
//! | 0    | Success (every location summarized or skipped)             |
//! | 2    | CLI usage error (bad args)                                 |
//! | 3    | Invalid pipeline config                                    |
//! | 4    | Malformed catalog line; run aborted before any table read  |
//! | 5    | Runtime / IO error (unreadable file, export failure)       |
//! | 6    | Run completed but at least one location FAILED             |

use dualsent_recon::ReconError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// Usage error - bad arguments, missing required options.
/// clap exits with this code itself on parse failures.
pub const EXIT_USAGE: u8 = 2;

/// Config could not be parsed or failed validation.
pub const EXIT_INVALID_CONFIG: u8 = 3;

/// Catalog line lacks name/address/size or has a non-integer size.
pub const EXIT_MALFORMED_CATALOG: u8 = 4;

/// IO failure outside any single location (config/catalog read, export write).
pub const EXIT_RUNTIME: u8 = 5;

/// One or more locations ended FAILED. The report is still produced.
pub const EXIT_LOCATIONS_FAILED: u8 = 6;

/// Map a run-level engine error to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => EXIT_INVALID_CONFIG,
        ReconError::MalformedManifestLine { .. } => EXIT_MALFORMED_CATALOG,
        _ => EXIT_RUNTIME,
    }
}
