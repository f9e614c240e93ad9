//! Running the tool under test: argument splitting and subprocesses.

pub mod shell_words;
pub mod subprocess;

/// Exit status of a successful command line.
pub const OK: i32 = 0;
/// Exit status of a failed command line.
pub const ERR: i32 = 1;
