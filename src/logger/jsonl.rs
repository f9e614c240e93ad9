//! JSONL activity log: append-only line-delimited JSON of harness events.
//!
//! Each line is a self-contained JSON object written with a single
//! `write_all`, so a log tailed by another process never shows half lines.
//!
//! Fallback chain:
//! 1. Primary file path
//! 2. Fallback path
//! 3. stderr with `[CTK-JSONL]` prefix
//! 4. Silent discard (a logging failure never fails a test)

#![allow(missing_docs)]

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::core::config::{self, HarnessConfig};
use crate::core::errors::{HarnessError, Result};
use crate::isolation::serial;

/// Severity level for log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
}

/// Harness event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    WorkspaceCreate,
    WorkspaceRemove,
    FileMade,
    ModuleImport,
    CoverageCheck,
    CommandLine,
    Subprocess,
    ClassBehavior,
}

/// A single JSONL log entry; all fields optional except `ts`, `event`, `severity`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// ISO 8601 UTC timestamp.
    pub ts: String,
    pub event: EventType,
    pub severity: Severity,
    /// Test class the event belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    /// Test name the event belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test: Option<String>,
    /// Affected filesystem path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Module name involved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    /// Command line run, in-process or as a subprocess.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// Exit status of a command.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<i32>,
    /// Whether the step succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ok: Option<bool>,
    /// CTK error code if the step failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    /// Freeform details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl LogEntry {
    /// Create a new entry stamped with the current UTC time.
    pub fn new(event: EventType, severity: Severity) -> Self {
        Self {
            ts: format_utc_now(),
            event,
            severity,
            class: None,
            test: None,
            path: None,
            module: None,
            command: None,
            status: None,
            ok: None,
            error_code: None,
            details: None,
        }
    }

    #[must_use]
    pub fn class(mut self, class: &str) -> Self {
        self.class = Some(class.to_string());
        self
    }

    #[must_use]
    pub fn test(mut self, test: &str) -> Self {
        self.test = Some(test.to_string());
        self
    }

    #[must_use]
    pub fn path(mut self, path: &Path) -> Self {
        self.path = Some(path.display().to_string());
        self
    }

    #[must_use]
    pub fn module(mut self, module: &str) -> Self {
        self.module = Some(module.to_string());
        self
    }

    #[must_use]
    pub fn command(mut self, command: &str) -> Self {
        self.command = Some(command.to_string());
        self
    }

    #[must_use]
    pub fn status(mut self, status: i32) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Record the outcome of a step.
    #[must_use]
    pub fn outcome<T>(mut self, result: &Result<T>) -> Self {
        match result {
            Ok(_) => self.ok = Some(true),
            Err(err) => {
                self.ok = Some(false);
                self.error_code = Some(err.code().to_string());
                self.details = Some(err.to_string());
            }
        }
        self
    }
}

/// Degradation state of the JSONL writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterState {
    Normal,
    Fallback,
    Stderr,
    Discard,
}

/// Configuration for the JSONL writer.
#[derive(Debug, Clone)]
pub struct JsonlConfig {
    /// Primary log file path.
    pub path: PathBuf,
    /// Optional fallback path (e.g. on a different filesystem).
    pub fallback_path: Option<PathBuf>,
}

/// Append-only JSONL log writer with multi-level fallback.
pub struct JsonlWriter {
    config: Option<JsonlConfig>,
    writer: Option<BufWriter<File>>,
    state: WriterState,
}

impl JsonlWriter {
    /// Open the JSONL log file. Falls through the degradation chain on failure.
    pub fn open(config: JsonlConfig) -> Self {
        let mut w = Self {
            config: Some(config),
            writer: None,
            state: WriterState::Discard,
        };
        w.try_open_primary();
        w
    }

    /// A writer that drops everything; used when no log is configured.
    pub fn disabled() -> Self {
        Self {
            config: None,
            writer: None,
            state: WriterState::Discard,
        }
    }

    /// Write a single log entry as one JSONL line.
    pub fn write_entry(&mut self, entry: &LogEntry) {
        if self.state == WriterState::Discard {
            return;
        }
        let line = match serde_json::to_string(entry) {
            Ok(json) => format!("{json}\n"),
            Err(e) => {
                let _ = writeln!(io::stderr(), "[CTK-JSONL] serialize error: {e}");
                return;
            }
        };

        self.write_line(&line);
    }

    pub fn flush(&mut self) {
        if let Some(w) = self.writer.as_mut() {
            let _ = w.flush();
        }
    }

    /// Current degradation state.
    pub fn state(&self) -> &str {
        match self.state {
            WriterState::Normal => "normal",
            WriterState::Fallback => "fallback",
            WriterState::Stderr => "stderr",
            WriterState::Discard => "discard",
        }
    }

    // ──────────────────────── internals ────────────────────────

    fn write_line(&mut self, line: &str) {
        match self.state {
            WriterState::Normal | WriterState::Fallback => {
                if let Some(w) = self.writer.as_mut() {
                    if w.write_all(line.as_bytes()).and_then(|()| w.flush()).is_err() {
                        self.degrade();
                        self.write_line(line);
                    }
                } else {
                    self.degrade();
                    self.write_line(line);
                }
            }
            WriterState::Stderr => {
                let _ = write!(io::stderr(), "[CTK-JSONL] {line}");
            }
            WriterState::Discard => {}
        }
    }

    fn try_open_primary(&mut self) {
        let Some(config) = self.config.as_ref() else {
            return;
        };
        match open_append(&config.path) {
            Ok(file) => {
                self.writer = Some(BufWriter::new(file));
                self.state = WriterState::Normal;
            }
            Err(_) => self.try_open_fallback(),
        }
    }

    fn try_open_fallback(&mut self) {
        let fallback = self
            .config
            .as_ref()
            .and_then(|config| config.fallback_path.clone());
        if let Some(fb) = fallback {
            match open_append(&fb) {
                Ok(file) => {
                    let _ = writeln!(
                        io::stderr(),
                        "[CTK-JSONL] primary path failed, using fallback: {}",
                        fb.display()
                    );
                    self.writer = Some(BufWriter::new(file));
                    self.state = WriterState::Fallback;
                }
                Err(_) => {
                    self.state = WriterState::Stderr;
                    let _ = writeln!(
                        io::stderr(),
                        "[CTK-JSONL] both primary and fallback paths failed, using stderr"
                    );
                }
            }
        } else {
            self.state = WriterState::Stderr;
            let _ = writeln!(
                io::stderr(),
                "[CTK-JSONL] primary path failed and no fallback configured, using stderr"
            );
        }
    }

    fn degrade(&mut self) {
        self.writer = None;
        match self.state {
            WriterState::Normal => self.try_open_fallback(),
            WriterState::Fallback => {
                self.state = WriterState::Stderr;
                let _ = writeln!(
                    io::stderr(),
                    "[CTK-JSONL] fallback write failed, using stderr"
                );
            }
            WriterState::Stderr => self.state = WriterState::Discard,
            WriterState::Discard => {}
        }
    }
}

// ──────────────────────── process-wide log ────────────────────────

static ACTIVITY: OnceLock<Mutex<JsonlWriter>> = OnceLock::new();

fn activity() -> &'static Mutex<JsonlWriter> {
    if let Some(writer) = ACTIVITY.get() {
        return writer;
    }
    let _serial = serial::lock();
    ACTIVITY.get_or_init(|| Mutex::new(activity_writer(config::global())))
}

fn activity_writer(settings: &HarnessConfig) -> JsonlWriter {
    settings
        .activity_log
        .clone()
        .map_or_else(JsonlWriter::disabled, |path| {
            JsonlWriter::open(JsonlConfig {
                path,
                fallback_path: settings.activity_log_fallback.clone(),
            })
        })
}

/// Append an entry to the process-wide activity log.
pub fn record(entry: &LogEntry) {
    activity().lock().write_entry(entry);
}

// ──────────────────────── helpers ────────────────────────

fn open_append(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| HarnessError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| HarnessError::io(path, source))
}

fn format_utc_now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

// ──────────────────────── tests ────────────────────────
