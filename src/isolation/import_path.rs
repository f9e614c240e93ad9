//! Isolation of the module search path.

#![allow(missing_docs)]

use std::path::PathBuf;

use crate::isolation::serial::{self, SerialGuard};
use crate::runtime::import_path;

/// Restores the search path verbatim when dropped.
pub struct ImportPathGuard {
    old_path: Vec<PathBuf>,
    _serial: SerialGuard,
}

impl ImportPathGuard {
    pub fn new() -> Self {
        let serial = serial::lock();
        Self {
            old_path: import_path::snapshot(),
            _serial: serial,
        }
    }
}

impl Default for ImportPathGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ImportPathGuard {
    fn drop(&mut self) {
        import_path::replace(std::mem::take(&mut self.old_path));
    }
}
