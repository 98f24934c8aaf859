//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract: pipelines that rebuild the
//! canonical catalog nightly branch on them.
//!
//! # Exit Codes
//!
//! | Code | Meaning                                                        |
//! |------|----------------------------------------------------------------|
//! | 0    | Success                                                        |
//! | 1    | General error (unspecified)                                    |
//! | 2    | CLI usage error (bad args, missing required option)            |
//! | 3    | An input could not be read or parsed (message names it)        |
//! | 4    | Config file invalid                                            |
//! | 5    | Pair-count or wall-clock budget exceeded                       |
//! | 6    | Output could not be written                                    |
//! | 7    | Conflicts detected with `fail_on_conflicts` (output written)   |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into `linkage_exit_code` or the relevant command

use labcanon_linkage::LinkageError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Pipeline (3-7)
// =============================================================================

/// A catalog or the specimen table is missing, unreadable or malformed.
/// Nothing is written.
pub const EXIT_INPUT: u8 = 3;

/// Config failed to parse or validate.
pub const EXIT_INVALID_CONFIG: u8 = 4;

/// `max_pairs` or `max_seconds` exceeded. Nothing is written.
pub const EXIT_BUDGET: u8 = 5;

/// Output file could not be written or renamed into place.
pub const EXIT_OUTPUT: u8 = 6;

/// Near-tie conflicts were detected and the run asked to fail on them.
/// The catalog is still written.
pub const EXIT_CONFLICTS: u8 = 7;

/// Map an engine error to its exit code.
pub fn linkage_exit_code(err: &LinkageError) -> u8 {
    match err {
        LinkageError::ConfigParse(_) | LinkageError::ConfigValidation(_) => EXIT_INVALID_CONFIG,
        LinkageError::InputParse { .. } | LinkageError::InvalidRecord { .. } => EXIT_INPUT,
        LinkageError::BudgetExceeded { .. } => EXIT_BUDGET,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_distinct() {
        let codes = [
            EXIT_SUCCESS,
            EXIT_ERROR,
            EXIT_USAGE,
            EXIT_INPUT,
            EXIT_INVALID_CONFIG,
            EXIT_BUDGET,
            EXIT_OUTPUT,
            EXIT_CONFLICTS,
        ];
        let mut sorted = codes.to_vec();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), codes.len());
    }

    #[test]
    fn engine_errors_map() {
        let input = LinkageError::InputParse { input: "cdl catalog".into(), message: "eof".into() };
        assert_eq!(linkage_exit_code(&input), EXIT_INPUT);
        assert_eq!(linkage_exit_code(&LinkageError::ConfigValidation("x".into())), EXIT_INVALID_CONFIG);
        assert_eq!(linkage_exit_code(&LinkageError::BudgetExceeded { reason: "x".into() }), EXIT_BUDGET);
    }
}
