//! Rebindable process-wide standard streams.
//!
//! Code under test writes through [`stdout()`] and [`stderr()`] instead of
//! `println!`/`eprintln!`. The handles look up the current binding on every
//! write, so a capture installed with [`bind_stdout`] sees output from code
//! that grabbed its handle earlier.

#![allow(missing_docs)]

use std::io::{self, Write};
use std::sync::{Arc, LazyLock};

use parking_lot::{Mutex, RwLock};

/// A writer that can be shared between a binding and whoever restores it.
pub type SharedWriter = Arc<Mutex<Box<dyn Write + Send>>>;

/// Wrap `writer` so it can be bound as a stream.
pub fn shared(writer: impl Write + Send + 'static) -> SharedWriter {
    Arc::new(Mutex::new(Box::new(writer)))
}

static STDOUT: LazyLock<RwLock<SharedWriter>> = LazyLock::new(|| RwLock::new(shared(io::stdout())));
static STDERR: LazyLock<RwLock<SharedWriter>> = LazyLock::new(|| RwLock::new(shared(io::stderr())));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stream {
    Stdout,
    Stderr,
}

impl Stream {
    fn slot(self) -> &'static RwLock<SharedWriter> {
        match self {
            Self::Stdout => &STDOUT,
            Self::Stderr => &STDERR,
        }
    }
}

/// Handle writing to whatever is currently bound as a standard stream.
#[derive(Debug, Clone, Copy)]
pub struct StreamHandle(Stream);

impl Write for StreamHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let target = Arc::clone(&self.0.slot().read());
        let mut guard = target.lock();
        guard.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        let target = Arc::clone(&self.0.slot().read());
        let mut guard = target.lock();
        guard.flush()
    }
}

/// The current standard output.
pub fn stdout() -> StreamHandle {
    StreamHandle(Stream::Stdout)
}

/// The current standard error.
pub fn stderr() -> StreamHandle {
    StreamHandle(Stream::Stderr)
}

/// Bind `writer` as standard output, returning the previous binding.
pub fn bind_stdout(writer: SharedWriter) -> SharedWriter {
    std::mem::replace(&mut *STDOUT.write(), writer)
}

/// Bind `writer` as standard error, returning the previous binding.
pub fn bind_stderr(writer: SharedWriter) -> SharedWriter {
    std::mem::replace(&mut *STDERR.write(), writer)
}

/// The current standard output binding itself.
pub fn current_stdout() -> SharedWriter {
    Arc::clone(&STDOUT.read())
}

/// The current standard error binding itself.
pub fn current_stderr() -> SharedWriter {
    Arc::clone(&STDERR.read())
}

// ──────────────────── sinks ────────────────────

/// A writer that forwards every write to all of its sinks.
pub struct Tee {
    sinks: Vec<SharedWriter>,
}

impl Tee {
    pub fn new(sinks: Vec<SharedWriter>) -> Self {
        Self { sinks }
    }
}

impl Write for Tee {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for sink in &self.sinks {
            sink.lock().write_all(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        for sink in &self.sinks {
            sink.lock().flush()?;
        }
        Ok(())
    }
}

/// Shared in-memory sink; clones append to the same buffer.
#[derive(Debug, Clone, Default)]
pub struct CaptureBuffer(Arc<Mutex<Vec<u8>>>);

impl CaptureBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, decoded lossily.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl Write for CaptureBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
