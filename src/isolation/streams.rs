//! Capture of the standard streams.
//!
//! Stdout is teed: output stays visible wherever it went before and is
//! also buffered for inspection. Stderr is only buffered, so anything the
//! code under test complains about does not end up interleaved with the
//! test runner's own progress output.

#![allow(missing_docs)]

use crate::isolation::serial::{self, SerialGuard};
use crate::runtime::streams::{self, CaptureBuffer, SharedWriter, Tee};

/// Captures stdout and stderr until dropped, then restores both bindings.
pub struct StdStreamCapture {
    old_stdout: Option<SharedWriter>,
    old_stderr: Option<SharedWriter>,
    captured_stdout: CaptureBuffer,
    captured_stderr: CaptureBuffer,
    _serial: SerialGuard,
}

impl StdStreamCapture {
    pub fn new() -> Self {
        let serial = serial::lock();
        let captured_stdout = CaptureBuffer::new();
        let captured_stderr = CaptureBuffer::new();

        let original_stdout = streams::current_stdout();
        let tee = Tee::new(vec![original_stdout, streams::shared(captured_stdout.clone())]);
        let old_stdout = streams::bind_stdout(streams::shared(tee));
        let old_stderr = streams::bind_stderr(streams::shared(captured_stderr.clone()));

        Self {
            old_stdout: Some(old_stdout),
            old_stderr: Some(old_stderr),
            captured_stdout,
            captured_stderr,
            _serial: serial,
        }
    }

    /// The data written to stdout so far.
    pub fn stdout(&self) -> String {
        self.captured_stdout.contents()
    }

    /// The data written to stderr so far.
    pub fn stderr(&self) -> String {
        self.captured_stderr.contents()
    }
}

impl Default for StdStreamCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for StdStreamCapture {
    fn drop(&mut self) {
        if let Some(old) = self.old_stdout.take() {
            streams::bind_stdout(old);
        }
        if let Some(old) = self.old_stderr.take() {
            streams::bind_stderr(old);
        }
    }
}
