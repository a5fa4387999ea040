//! Shared utilities for CLI commands

use adb_migrate::MigrateError;
use std::fmt;
use std::path::Path;

/// Migration history has zero or several heads
pub(crate) const EXIT_FATAL_HISTORY: i32 = 2;
/// Database schema does not exist yet
pub(crate) const EXIT_NEEDS_BOOTSTRAP: i32 = 3;
/// Database schema is behind the migration head
pub(crate) const EXIT_NEEDS_UPGRADE: i32 = 4;
/// Database has application tables but no recorded revision
pub(crate) const EXIT_NEEDS_STAMP: i32 = 5;

/// Error type representing a non-zero process exit code.
///
/// Use `return Err(ExitCode(N).into())` instead of `std::process::exit(N)`
/// so that advisory locks and connections are released before the process
/// exits.
#[derive(Debug)]
pub(crate) struct ExitCode(pub(crate) i32);

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Diagnostics are printed before the code is returned; nothing to add.
        write!(f, "")
    }
}

impl std::error::Error for ExitCode {}

/// One-line remediation hint naming the exact command to run.
pub(crate) fn try_this(config_path: &Path, command: &str) -> String {
    format!(
        "Try this: \"assembl-db-manage -c {} {}\"",
        config_path.display(),
        command
    )
}

/// Report an ambiguous migration history and turn it into exit code 2.
///
/// Other errors pass through unchanged.
pub(crate) fn exit_on_fatal_history(err: MigrateError) -> anyhow::Error {
    if err.is_fatal_history() {
        eprintln!("Error: {err}");
        eprintln!("Please resolve the migration history before starting the application.");
        ExitCode(EXIT_FATAL_HISTORY).into()
    } else {
        err.into()
    }
}

#[cfg(test)]
#[path = "common_test.rs"]
mod tests;
