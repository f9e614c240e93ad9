//! Process-wide module search path.
//!
//! Seeded from the configured module-search env var the first time it is
//! touched, under the serial lock. Directories are searched front to back;
//! the first hit wins.

use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;

use parking_lot::RwLock;

use crate::core::config;
use crate::isolation::serial;

static IMPORT_PATH: OnceLock<RwLock<Vec<PathBuf>>> = OnceLock::new();

fn import_path() -> &'static RwLock<Vec<PathBuf>> {
    if let Some(path) = IMPORT_PATH.get() {
        return path;
    }
    let _serial = serial::lock();
    IMPORT_PATH.get_or_init(|| {
        let seed = env::var_os(&config::global().module_path_var)
            .map(|raw| env::split_paths(&raw).collect())
            .unwrap_or_default();
        RwLock::new(seed)
    })
}

/// A copy of the current search path.
pub fn snapshot() -> Vec<PathBuf> {
    import_path().read().clone()
}

/// Replace the search path wholesale.
pub fn replace(path: Vec<PathBuf>) {
    *import_path().write() = path;
}

/// Put `dir` in front of every other entry.
pub fn insert_front(dir: PathBuf) {
    import_path().write().insert(0, dir);
}

/// Locate the file for module `name` with extension `extension`.
///
/// Dotted names map to sub-directories: `pkg.mod` → `pkg/mod.<ext>`.
pub fn resolve(name: &str, extension: &str) -> Option<PathBuf> {
    let relative = relative_file(name, extension);
    import_path()
        .read()
        .iter()
        .map(|dir| dir.join(&relative))
        .find(|candidate| candidate.is_file())
}

fn relative_file(name: &str, extension: &str) -> PathBuf {
    let mut relative: PathBuf = name.split('.').collect();
    relative.set_extension(extension);
    relative
}
