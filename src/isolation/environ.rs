//! Isolation of environment variables.

#![allow(missing_docs)]

use std::collections::BTreeMap;
use std::env;
use std::ffi::{OsStr, OsString};

use crate::isolation::serial::{self, SerialGuard};

/// Records the original value of every variable set through it and puts
/// them back when dropped.
pub struct EnvironGuard {
    /// Pre-test value of each touched variable; `None` if it did not exist.
    environ_undos: BTreeMap<String, Option<OsString>>,
    _serial: SerialGuard,
}

impl EnvironGuard {
    pub fn new() -> Self {
        Self {
            environ_undos: BTreeMap::new(),
            _serial: serial::lock(),
        }
    }

    /// Set `name` to `value`, remembering the value from before the test the
    /// first time `name` is touched.
    pub fn set_environ(&mut self, name: &str, value: impl AsRef<OsStr>) {
        self.environ_undos
            .entry(name.to_string())
            .or_insert_with(|| env::var_os(name));
        write_var(name, value.as_ref());
    }

    /// The value `name` had when the test started, or `if_missing` if it did
    /// not exist then.
    pub fn original_environ(&self, name: &str, if_missing: Option<&str>) -> Option<String> {
        let original = match self.environ_undos.get(name) {
            Some(recorded) => recorded.clone(),
            None => env::var_os(name),
        };
        original
            .map(|value| value.to_string_lossy().into_owned())
            .or_else(|| if_missing.map(str::to_string))
    }

    /// Undo every change made through [`Self::set_environ`] so far.
    pub fn cleanup_environ(&mut self) {
        for (name, value) in std::mem::take(&mut self.environ_undos) {
            match value {
                Some(value) => write_var(&name, &value),
                None => remove_var(&name),
            }
        }
    }
}

impl Default for EnvironGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for EnvironGuard {
    fn drop(&mut self) {
        self.cleanup_environ();
    }
}

#[allow(unsafe_code)]
fn write_var(name: &str, value: &OsStr) {
    // SAFETY: only `EnvironGuard` writes the environment, and it holds the
    // serial lock. Every read in this crate takes that lock first: config
    // loading, the import-path seed, temp-dir lookup in workspace set-up,
    // and `subprocess::run_command` spawning a child. Code outside the
    // crate that reads the environment concurrently must hold it too.
    unsafe { env::set_var(name, value) }
}

#[allow(unsafe_code)]
fn remove_var(name: &str) {
    // SAFETY: as in `write_var`.
    unsafe { env::remove_var(name) }
}
