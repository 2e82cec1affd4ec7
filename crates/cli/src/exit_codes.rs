//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Scripts gate on them, so treat changes as breaking.
//!
//! | Code | Meaning                                                        |
//! |------|----------------------------------------------------------------|
//! | 0    | Success, no difference outside tolerance                       |
//! | 1    | Run completed and at least one difference is out of tolerance  |
//! | 2    | Usage error (bad arguments, refusing to overwrite)             |
//! | 3    | Nothing compared (no files, no matches, missing columns, or    |
//! |      | every pair had an empty intersection)                          |
//! | 4    | Invalid or unreadable configuration                            |
//! | 5    | IO error writing output                                        |
//!
//! clap itself exits with 2 on argument errors, which lines up with
//! `EXIT_USAGE`.

/// Success - command completed, nothing flagged.
pub const EXIT_SUCCESS: u8 = 0;

/// At least one detail or summary difference fell outside its band.
/// Like `diff(1)`, exit 1 means "sources differ."
pub const EXIT_FLAGGED: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// The run finished but produced no comparison with data.
pub const EXIT_NOTHING_COMPARED: u8 = 3;

/// Config file missing, unparseable, or failing validation.
pub const EXIT_INVALID_CONFIG: u8 = 4;

/// Workbook, JSON report or config file could not be written.
pub const EXIT_IO: u8 = 5;
