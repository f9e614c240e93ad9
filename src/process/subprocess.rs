//! Run a command line through the platform shell and collect its output.
//!
//! The child inherits the environment and working directory. There is no
//! timeout: a child that never exits hangs the calling test.
//!
//! Spawning reads the environment, so it happens under the serial lock.

use std::process::{Command, Stdio};

use crate::core::errors::{HarnessError, Result};
use crate::isolation::serial;
use crate::logger::jsonl::{self, EventType, LogEntry, Severity};

/// Status reported for a child that died without an exit code (signal).
pub const KILLED_STATUS: i32 = -1;

/// Run `cmd` through the shell with stderr merged into stdout.
///
/// Returns the exit status and the combined output. A non-zero status is
/// not an error; the caller decides what it means.
pub fn run_command(cmd: &str) -> Result<(i32, String)> {
    let _serial = serial::lock();
    let output = shell(cmd)
        .stdin(Stdio::null())
        .stderr(Stdio::inherit())
        .output()
        .map_err(|source| HarnessError::Spawn {
            command: cmd.to_string(),
            source,
        })?;

    let status = output.status.code().unwrap_or(KILLED_STATUS);
    let text = String::from_utf8_lossy(&output.stdout).into_owned();

    jsonl::record(
        &LogEntry::new(
            EventType::Subprocess,
            if status == 0 {
                Severity::Info
            } else {
                Severity::Warning
            },
        )
        .command(cmd)
        .status(status),
    );
    Ok((status, text))
}

#[cfg(unix)]
fn shell(cmd: &str) -> Command {
    let mut command = Command::new("sh");
    command.arg("-c").arg(format!("exec 2>&1\n{cmd}"));
    command
}

#[cfg(not(unix))]
fn shell(cmd: &str) -> Command {
    let mut command = Command::new("cmd");
    command.arg("/C").arg(format!("({cmd}) 2>&1"));
    command
}
