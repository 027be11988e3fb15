//! CLI Exit Code Registry
//!
//! Single source of truth for `frev` exit codes. Scripts rely on them.
//!
//! | Code | Meaning                                                  |
//! |------|----------------------------------------------------------|
//! | 0    | Success                                                  |
//! | 1    | General error (unspecified)                              |
//! | 2    | Usage error (bad args, conflicting options)              |
//! | 3    | Config failed to parse or validate                       |
//! | 4    | Input unreadable or invalid (snapshot, script, output)   |
//! | 5    | A review script step was rejected                        |
//! | 6    | Catalog unreadable, malformed, or required but missing   |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Update the table above
//! 3. Wire it into the relevant command's error handling

use fieldrev_recon::ReconError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// Config TOML failed to parse or validate.
pub const EXIT_CONFIG_INVALID: u8 = 3;

/// Snapshot, script or output path could not be read, parsed or written.
pub const EXIT_INPUT: u8 = 4;

/// A review script step was refused (validation failure, invalid
/// transition, unknown row).
pub const EXIT_STEP_REJECTED: u8 = 5;

/// Catalog CSV unreadable or malformed, or a lookup was requested without
/// one.
pub const EXIT_CATALOG: u8 = 6;

/// Map an engine error to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => EXIT_CONFIG_INVALID,
        ReconError::Io(_) | ReconError::Source(_) => EXIT_INPUT,
        ReconError::DuplicateCatalogCode(_) | ReconError::CatalogParse { .. } => EXIT_CATALOG,
        ReconError::UnknownRow(_)
        | ReconError::UnknownOriginal { .. }
        | ReconError::InvalidTransition { .. }
        | ReconError::NotEditing(_)
        | ReconError::FieldReadOnly { .. }
        | ReconError::NoSuchSuggestion { .. } => EXIT_STEP_REJECTED,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldrev_recon::RowId;

    #[test]
    fn engine_errors_map_to_registry() {
        assert_eq!(recon_exit_code(&ReconError::ConfigParse("x".into())), EXIT_CONFIG_INVALID);
        assert_eq!(recon_exit_code(&ReconError::Source("x".into())), EXIT_INPUT);
        assert_eq!(
            recon_exit_code(&ReconError::CatalogParse { line: 3, message: "x".into() }),
            EXIT_CATALOG
        );
        assert_eq!(
            recon_exit_code(&ReconError::NotEditing(RowId::from_raw(1))),
            EXIT_STEP_REJECTED
        );
    }
}
