//! Process-wide module registry: every module loaded for measurement,
//! keyed by import name.
//!
//! A name stays bound to the first module registered under it until it is
//! removed, the same way a runtime caches imports. Tests that generate a new
//! file with a reused name depend on [`crate::isolation::modules::ModulesGuard`]
//! or an explicit [`remove`] to see the new file.

#![allow(missing_docs)]

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use parking_lot::Mutex;

use crate::core::errors::{HarnessError, Result};

/// A loaded source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    name: String,
    path: PathBuf,
    source: String,
}

impl Module {
    /// Read `path` as the source of module `name`.
    pub fn load(name: &str, path: &Path) -> Result<Self> {
        let source = fs::read_to_string(path).map_err(|source| HarnessError::io(path, source))?;
        Ok(Self {
            name: name.to_string(),
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

static REGISTRY: LazyLock<Mutex<BTreeMap<String, Arc<Module>>>> =
    LazyLock::new(|| Mutex::new(BTreeMap::new()));

/// The module registered under `name`, if any.
pub fn lookup(name: &str) -> Option<Arc<Module>> {
    REGISTRY.lock().get(name).cloned()
}

/// Register `module` under its name, replacing any previous binding.
pub fn insert(module: Module) -> Arc<Module> {
    let module = Arc::new(module);
    REGISTRY
        .lock()
        .insert(module.name().to_string(), Arc::clone(&module));
    module
}

/// Unregister `name`, returning the module that was bound to it.
pub fn remove(name: &str) -> Option<Arc<Module>> {
    REGISTRY.lock().remove(name)
}

/// Number of registered modules.
pub fn len() -> usize {
    REGISTRY.lock().len()
}

pub fn contains(name: &str) -> bool {
    REGISTRY.lock().contains_key(name)
}

/// Names of all registered modules.
pub fn names() -> BTreeSet<String> {
    REGISTRY.lock().keys().cloned().collect()
}

/// Keep only the modules whose names satisfy `keep`; returns how many were removed.
pub fn retain(mut keep: impl FnMut(&str) -> bool) -> usize {
    let mut registry = REGISTRY.lock();
    let before = registry.len();
    registry.retain(|name, _| keep(name));
    before - registry.len()
}
