//! Isolation of the module registry.

#![allow(missing_docs)]

use std::collections::BTreeSet;

use crate::isolation::serial::{self, SerialGuard};
use crate::runtime::modules;

/// Removes every module registered after construction when dropped.
///
/// This lets one test import a generated file under a name that an earlier
/// test also used, and get the new file.
pub struct ModulesGuard {
    old_modules: BTreeSet<String>,
    _serial: SerialGuard,
}

impl ModulesGuard {
    pub fn new() -> Self {
        let serial = serial::lock();
        Self {
            old_modules: modules::names(),
            _serial: serial,
        }
    }

    /// Remove any modules imported since construction; returns how many.
    pub fn cleanup_modules(&self) -> usize {
        modules::retain(|name| self.old_modules.contains(name))
    }

    /// Names registered when the guard was created.
    pub fn old_modules(&self) -> &BTreeSet<String> {
        &self.old_modules
    }
}

impl Default for ModulesGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ModulesGuard {
    fn drop(&mut self) {
        self.cleanup_modules();
    }
}
