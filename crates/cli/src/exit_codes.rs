//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract: pipelines branch on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain           | Description                                |
//! |---------|------------------|--------------------------------------------|
//! | 0       | Universal        | Success                                    |
//! | 1       | Universal        | General error (unspecified)                |
//! | 2       | Universal        | CLI usage error (bad args, path conflicts) |
//! | 3-9     | merge / combine  | Config, input, output and cancellation     |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Map it in [`merge_exit_code`] if an engine error produces it

use ftymerge_dedup::MergeError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, conflicting paths.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Merge (3-9)
// =============================================================================

/// Config file unreadable, malformed, or failed validation.
pub const EXIT_MERGE_CONFIG: u8 = 3;

/// Input missing, unreadable, or not an array of records. Nothing was merged.
pub const EXIT_MERGE_INPUT: u8 = 4;

/// Merge succeeded in memory but the output or report could not be written.
pub const EXIT_MERGE_OUTPUT: u8 = 5;

/// Run stopped by cancellation before all groups were merged.
pub const EXIT_MERGE_CANCELLED: u8 = 6;

/// Map an engine error to its exit code.
pub fn merge_exit_code(err: &MergeError) -> u8 {
    match err {
        MergeError::ConfigParse(_) | MergeError::ConfigValidation(_) => EXIT_MERGE_CONFIG,
        MergeError::InputUnreadable { .. } | MergeError::InputShape(_) => EXIT_MERGE_INPUT,
        MergeError::OutputWrite { .. } => EXIT_MERGE_OUTPUT,
        MergeError::Cancelled { .. } => EXIT_MERGE_CANCELLED,
        MergeError::Io(_) => EXIT_ERROR,
    }
}

/// Actionable follow-up for an engine error, when there is one.
pub fn merge_hint(err: &MergeError) -> Option<&'static str> {
    match err {
        MergeError::ConfigParse(_) | MergeError::ConfigValidation(_) => {
            Some("run `ftymerge validate <config>` to check the file")
        }
        MergeError::InputShape(_) => {
            Some("the input must be one JSON array; use `ftymerge combine` to build it")
        }
        MergeError::OutputWrite { .. } => {
            Some("the merged batch was not saved; fix the output path and rerun")
        }
        _ => None,
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
            EXIT_MERGE_CONFIG,
            EXIT_MERGE_INPUT,
            EXIT_MERGE_OUTPUT,
            EXIT_MERGE_CANCELLED,
        ];
        let unique: std::collections::HashSet<u8> = codes.iter().copied().collect();
        assert_eq!(unique.len(), codes.len());
    }

    #[test]
    fn engine_errors_map_to_registry() {
        assert_eq!(
            merge_exit_code(&MergeError::ConfigValidation("x".into())),
            EXIT_MERGE_CONFIG
        );
        assert_eq!(
            merge_exit_code(&MergeError::InputUnreadable {
                path: "a.json".into(),
                message: "missing".into()
            }),
            EXIT_MERGE_INPUT
        );
        assert_eq!(
            merge_exit_code(&MergeError::OutputWrite {
                path: "b.json".into(),
                message: "denied".into()
            }),
            EXIT_MERGE_OUTPUT
        );
        assert_eq!(
            merge_exit_code(&MergeError::Cancelled { completed_groups: 2 }),
            EXIT_MERGE_CANCELLED
        );
    }
}
