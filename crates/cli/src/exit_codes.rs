//! Exit codes of `mgrid`.
//!
//! The monthly run script stops at the first non-zero code and reports
//! which stage failed, so each failure class has its own code.
//!
//! | Code | Stage        | Meaning                                       |
//! |------|--------------|-----------------------------------------------|
//! | 0    | any          | Command finished                              |
//! | 1    | any          | Failure outside the classes below             |
//! | 2    | any          | Bad flags, unreadable input or output path    |
//! | 3    | Workbook     | Sheet or header row missing                   |
//! | 4    | Database     | SQLite open, write or query failed            |
//! | 5    | Config       | Run config, period or layout invalid          |
//! | 6    | Check        | Required input files missing                  |
//!
//! New codes go at the end; existing numbers are never reused.

// =============================================================================
// Any stage (0-2)
// =============================================================================

pub const EXIT_SUCCESS: u8 = 0;

/// Report serialization and other failures with no stage of their own.
pub const EXIT_ERROR: u8 = 1;

/// Bad flag values, a workbook that cannot be opened, an output path that
/// cannot be written.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Workbook (3)
// =============================================================================

/// A required sheet is absent, has no rows, or no header row was found.
/// The file's import is aborted; nothing after the last commit is kept.
pub const EXIT_STRUCTURAL: u8 = 3;

// =============================================================================
// Database (4)
// =============================================================================

/// The SQLite database could not be opened, written or queried.
pub const EXIT_SINK: u8 = 4;

// =============================================================================
// Config (5)
// =============================================================================

/// Run config, period or sheet layout failed to parse or validate.
pub const EXIT_CONFIG: u8 = 5;

// =============================================================================
// Check (6)
// =============================================================================

/// `mgrid check`: at least one required input file does not exist.
pub const EXIT_MISSING_INPUTS: u8 = 6;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_distinct() {
        let mut codes = vec![
            EXIT_SUCCESS,
            EXIT_ERROR,
            EXIT_USAGE,
            EXIT_STRUCTURAL,
            EXIT_SINK,
            EXIT_CONFIG,
            EXIT_MISSING_INPUTS,
        ];
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), 7);
    }
}
