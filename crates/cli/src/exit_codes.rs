//! CLI Exit Code Registry
//!
//! Single source of truth for all `gradesync` exit codes. Scripts that run
//! nightly imports rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain           | Description                              |
//! |---------|------------------|------------------------------------------|
//! | 0       | Universal        | Success                                  |
//! | 2       | Universal        | CLI usage error (bad args)               |
//! | 3       | Universal        | File could not be read or written        |
//! | 60-69   | import           | Config / input / subject errors          |
//!
//! Data-quality problems (unknown emails, unmatched questions, ambiguous
//! columns) are reported in the output and still exit 0.

use gradesync_recon::ReconError;

// =============================================================================
// Universal (0-3)
// =============================================================================

/// Success - command completed, possibly with nothing imported.
pub const EXIT_SUCCESS: u8 = 0;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// I/O error - an input file is missing/unreadable or output can't be written.
pub const EXIT_IO: u8 = 3;

// =============================================================================
// Import (60-69)
// =============================================================================

/// Sync config failed to parse or validate.
pub const EXIT_INVALID_CONFIG: u8 = 60;

/// Grid, snapshot or answer-key file is malformed.
pub const EXIT_INVALID_INPUT: u8 = 61;

/// `--subject` names no subject in the snapshot.
pub const EXIT_UNKNOWN_SUBJECT: u8 = 62;

/// Map an engine error to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => EXIT_INVALID_CONFIG,
        ReconError::GridShape(_)
        | ReconError::AnswerKeyParse { .. }
        | ReconError::SnapshotParse(_) => EXIT_INVALID_INPUT,
        ReconError::UnknownSubject(_) => EXIT_UNKNOWN_SUBJECT,
    }
}
