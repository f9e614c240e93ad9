//! Per-test temp directory: created at set-up, entered, put on the import
//! path, and deleted with everything in it when the guard drops.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::core::config;
use crate::core::errors::{HarnessError, Result};
use crate::isolation::serial::{self, SerialGuard};
use crate::logger::jsonl::{self, EventType, LogEntry, Severity};
use crate::runtime::import_path;
use crate::workspace::behavior::{self, TestClass};
use crate::workspace::text;

/// Attempts at finding an unused random directory name.
const CREATE_ATTEMPTS: usize = 8;

/// A live temp workspace for one test (or the record that the class runs
/// without one).
pub struct TempDirGuard {
    class: TestClass,
    temp_root: PathBuf,
    temp_dir: Option<PathBuf>,
    old_dir: Option<PathBuf>,
    _serial: SerialGuard,
}

impl TempDirGuard {
    /// Set up the workspace for one test of `class`.
    ///
    /// With the temp-dir policy on, this creates
    /// `<temp>/<temp_root_name>/<random digits>`, changes into it, and puts
    /// it first on the import path. Either way the test is counted against
    /// the class record.
    pub fn set_up(class: TestClass) -> Result<Self> {
        let serial = serial::lock();
        behavior::install_exit_report();

        // Counted before anything can fail: a failed set-up still drops the
        // guard, and its teardown must not see the previous test's flag.
        behavior::with_class_behavior(class.name(), |record| {
            record.tests += 1;
            record.test_method_made_any_files = false;
            record.temp_dir = class.run_in_temp_dir();
        });

        let temp_root = env::temp_dir().join(&config::global().temp_root_name);
        let mut guard = Self {
            class,
            temp_root,
            temp_dir: None,
            old_dir: None,
            _serial: serial,
        };

        if class.run_in_temp_dir() {
            let dir = create_unique_dir(&guard.temp_root)?;
            let old_dir = env::current_dir().map_err(|source| HarnessError::io(".", source))?;
            // From here on `Drop` cleans up, even if a later step fails.
            guard.temp_dir = Some(dir.clone());
            env::set_current_dir(&dir).map_err(|source| HarnessError::io(&dir, source))?;
            guard.old_dir = Some(old_dir);
            import_path::insert_front(dir.clone());

            jsonl::record(
                &LogEntry::new(EventType::WorkspaceCreate, Severity::Info)
                    .class(class.name())
                    .path(&dir),
            );
        }

        Ok(guard)
    }

    pub fn class(&self) -> TestClass {
        self.class
    }

    /// Absolute path of the workspace, if the class runs in one.
    pub fn temp_dir(&self) -> Option<&Path> {
        self.temp_dir.as_deref()
    }

    /// Create a file for the test.
    ///
    /// `filename` is relative to the workspace and may include directories,
    /// which are created as needed. `text` is dedented first. If `newline`
    /// is given, every `\n` is written as `newline`; otherwise line endings
    /// are kept as written. Returns `filename` unchanged.
    ///
    /// Fails without touching the file system when the class runs without a
    /// temp dir; the attempt still counts in the class record, so the exit
    /// report flags the class as unsafe.
    pub fn make_file(
        &self,
        filename: impl AsRef<Path>,
        text: &str,
        newline: Option<&str>,
    ) -> Result<PathBuf> {
        let filename = filename.as_ref();
        behavior::with_class_behavior(self.class.name(), |record| {
            record.test_method_made_any_files = true;
        });
        if self.temp_dir.is_none() {
            return Err(HarnessError::WorkspaceDisabled {
                class: self.class.name().to_string(),
                path: filename.to_path_buf(),
            });
        }

        let mut text = text::dedent(text);
        if let Some(newline) = newline {
            text = text::with_newlines(&text, newline);
        }

        if let Some(dirs) = filename.parent()
            && !dirs.as_os_str().is_empty()
            && !dirs.exists()
        {
            fs::create_dir_all(dirs).map_err(|source| HarnessError::io(dirs, source))?;
        }
        fs::write(filename, text.as_bytes()).map_err(|source| HarnessError::io(filename, source))?;

        jsonl::record(
            &LogEntry::new(EventType::FileMade, Severity::Info)
                .class(self.class.name())
                .path(filename),
        );
        Ok(filename.to_path_buf())
    }

    fn tear_down(&mut self) -> Result<()> {
        let mut outcome = Ok(());

        if let Some(dir) = self.temp_dir.take() {
            if let Some(old_dir) = self.old_dir.take() {
                outcome = env::set_current_dir(&old_dir)
                    .map_err(|source| HarnessError::io(&old_dir, source));
            }
            import_path::replace(
                import_path::snapshot()
                    .into_iter()
                    .filter(|entry| entry != &dir)
                    .collect(),
            );
            let removed = fs::remove_dir_all(&dir).map_err(|source| HarnessError::io(&dir, source));
            // Other workspaces may still live under the root.
            let _ = fs::remove_dir(&self.temp_root);

            jsonl::record(
                &LogEntry::new(EventType::WorkspaceRemove, Severity::Info)
                    .class(self.class.name())
                    .path(&dir)
                    .outcome(&removed),
            );
            outcome = outcome.and(removed);
        }

        behavior::with_class_behavior(self.class.name(), |record| {
            if record.test_method_made_any_files {
                record.tests_making_files += 1;
            }
        });
        outcome
    }
}

impl Drop for TempDirGuard {
    fn drop(&mut self) {
        if let Err(err) = self.tear_down() {
            if std::thread::panicking() {
                eprintln!("[CTK-WORKSPACE] teardown failed during a failing test: {err}");
            } else {
                panic!("workspace teardown failed: {err}");
            }
        }
    }
}

fn create_unique_dir(root: &Path) -> Result<PathBuf> {
    fs::create_dir_all(root).map_err(|source| HarnessError::io(root, source))?;
    let mut last_err = None;
    for _ in 0..CREATE_ATTEMPTS {
        let noise = rand::random::<u64>().to_string();
        let dir = root.join(noise);
        match fs::create_dir(&dir) {
            Ok(()) => return Ok(crate::core::paths::resolve_absolute_path(&dir)),
            Err(err) if err.kind() == ErrorKind::AlreadyExists => last_err = Some(err),
            Err(err) => return Err(HarnessError::io(&dir, err)),
        }
    }
    Err(HarnessError::io(
        root,
        last_err.unwrap_or_else(|| std::io::Error::other("no unused workspace name")),
    ))
}
