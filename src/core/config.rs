//! Configuration system: TOML file + env var overrides + smart defaults.

#![allow(missing_docs)]

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::core::errors::{HarnessError, Result};
use crate::core::paths::resolve_absolute_path;
use crate::isolation::serial;

/// Env var naming an explicit config file.
pub const CONFIG_ENV: &str = "CTK_CONFIG";

/// Config file picked up from the current dir when `CTK_CONFIG` is unset.
pub const DEFAULT_CONFIG_FILE: &str = "coverage_testkit.toml";

/// Full harness configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HarnessConfig {
    /// Directory under the system temp dir that holds per-test workspaces.
    pub temp_root_name: String,
    /// Prefix of generated module names.
    pub module_prefix: String,
    /// File extension of importable modules, without the dot.
    pub module_extension: String,
    /// Env var the measured runtime reads its module search path from.
    pub module_path_var: String,
    /// Base for the relative fixture paths below.
    pub fixtures_root: PathBuf,
    /// Directory of importable fixture modules for subprocesses.
    pub fixture_modules: PathBuf,
    /// Packed archive of fixture modules for subprocesses.
    pub fixture_archive: PathBuf,
    /// Extension of compiled-cache files dropped next to imported modules.
    pub bytecode_extension: String,
    /// Directory the measured runtime caches compiled modules in.
    pub bytecode_cache_dir: String,
    /// When set, each test writes `{class}_{test}` to this file at set-up.
    pub test_name_file: Option<PathBuf>,
    /// When set, harness activity is appended here as JSONL.
    pub activity_log: Option<PathBuf>,
    /// Where the activity log goes when `activity_log` cannot be opened.
    pub activity_log_fallback: Option<PathBuf>,
    /// Print the class behavior report at process exit.
    pub report_on_exit: bool,
    /// First-word rewrites applied by `run_command` (e.g. `python` → `python3.12`).
    pub command_aliases: BTreeMap<String, String>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            temp_root_name: "test_cover".to_string(),
            module_prefix: "coverage_test_".to_string(),
            module_extension: "py".to_string(),
            module_path_var: "PYTHONPATH".to_string(),
            fixtures_root: PathBuf::from("."),
            fixture_modules: PathBuf::from("tests/modules"),
            fixture_archive: PathBuf::from("tests/zipmods.zip"),
            bytecode_extension: "pyc".to_string(),
            bytecode_cache_dir: "__pycache__".to_string(),
            test_name_file: None,
            activity_log: None,
            activity_log_fallback: None,
            report_on_exit: true,
            command_aliases: BTreeMap::new(),
        }
    }
}

static GLOBAL: OnceLock<HarnessConfig> = OnceLock::new();

/// The process-wide configuration, loaded on first use.
///
/// The first call loads under the serial lock, so the thread initializing
/// always owns it and a thread already holding it never waits on another.
pub fn global() -> &'static HarnessConfig {
    if let Some(cfg) = GLOBAL.get() {
        return cfg;
    }
    let _serial = serial::lock();
    GLOBAL.get_or_init(|| {
        HarnessConfig::load(None).unwrap_or_else(|err| {
            eprintln!("[CTK-CONFIG] WARNING: {err}; falling back to defaults");
            let mut cfg = HarnessConfig::default();
            cfg.normalize_paths();
            cfg
        })
    })
}

impl HarnessConfig {
    /// Load config from an explicit path, `CTK_CONFIG`, or
    /// `./coverage_testkit.toml`, then apply env overrides.
    ///
    /// A missing file is only an error when the path was given explicitly.
    /// Takes the serial lock while it reads the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let _serial = serial::lock();
        let explicit = path
            .map(Path::to_path_buf)
            .or_else(|| env_var(CONFIG_ENV).map(PathBuf::from));
        let is_explicit_path = explicit.is_some();
        let path_buf = explicit.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|source| HarnessError::Io {
                path: path_buf.clone(),
                source,
            })?;
            toml::from_str::<Self>(&raw)?
        } else if is_explicit_path {
            return Err(HarnessError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.apply_env_overrides_from(env_var)?;
        cfg.normalize_paths();
        cfg.validate()?;
        Ok(cfg)
    }

    /// Absolute path of the fixture modules directory.
    #[must_use]
    pub fn fixture_modules_path(&self) -> PathBuf {
        self.fixtures_root.join(&self.fixture_modules)
    }

    /// Absolute path of the fixture module archive.
    #[must_use]
    pub fn fixture_archive_path(&self) -> PathBuf {
        self.fixtures_root.join(&self.fixture_archive)
    }

    fn apply_env_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("CTK_TEMP_ROOT_NAME") {
            self.temp_root_name = raw;
        }
        if let Some(raw) = lookup("CTK_MODULE_PREFIX") {
            self.module_prefix = raw;
        }
        if let Some(raw) = lookup("CTK_MODULE_EXTENSION") {
            self.module_extension = raw.trim_start_matches('.').to_string();
        }
        if let Some(raw) = lookup("CTK_MODULE_PATH_VAR") {
            self.module_path_var = raw;
        }
        if let Some(raw) = lookup("CTK_FIXTURES_ROOT") {
            self.fixtures_root = PathBuf::from(raw);
        }
        if let Some(raw) = lookup("CTK_TEST_NAME_FILE") {
            self.test_name_file = Some(PathBuf::from(raw));
        }
        if let Some(raw) = lookup("CTK_ACTIVITY_LOG") {
            self.activity_log = Some(PathBuf::from(raw));
        }
        if let Some(raw) = lookup("CTK_ACTIVITY_LOG_FALLBACK") {
            self.activity_log_fallback = Some(PathBuf::from(raw));
        }
        if let Some(raw) = lookup("CTK_REPORT_ON_EXIT") {
            self.report_on_exit = parse_env_bool("CTK_REPORT_ON_EXIT", &raw)?;
        }
        Ok(())
    }

    /// Anchor relative paths at the directory the process started in, since
    /// tests move the working directory around later.
    fn normalize_paths(&mut self) {
        self.fixtures_root = resolve_absolute_path(&self.fixtures_root);
        if let Some(file) = self.test_name_file.as_mut() {
            *file = resolve_absolute_path(file);
        }
        for file in [&mut self.activity_log, &mut self.activity_log_fallback]
            .into_iter()
            .flatten()
        {
            *file = resolve_absolute_path(file);
        }
    }

    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("temp_root_name", &self.temp_root_name),
            ("module_prefix", &self.module_prefix),
            ("module_extension", &self.module_extension),
            ("module_path_var", &self.module_path_var),
        ] {
            if value.trim().is_empty() {
                return Err(HarnessError::InvalidConfig {
                    details: format!("{name} must not be empty"),
                });
            }
        }

        if self.temp_root_name.contains(['/', '\\']) || self.temp_root_name == ".." {
            return Err(HarnessError::InvalidConfig {
                details: format!(
                    "temp_root_name must be a single path component, got {:?}",
                    self.temp_root_name
                ),
            });
        }

        if !self
            .module_prefix
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(HarnessError::InvalidConfig {
                details: format!(
                    "module_prefix must be an identifier prefix, got {:?}",
                    self.module_prefix
                ),
            });
        }

        if self.module_path_var.contains('=') {
            return Err(HarnessError::InvalidConfig {
                details: "module_path_var must not contain '='".to_string(),
            });
        }

        for (alias, target) in &self.command_aliases {
            if alias.contains(char::is_whitespace) || target.trim().is_empty() {
                return Err(HarnessError::InvalidConfig {
                    details: format!("command alias {alias:?} -> {target:?} is not usable"),
                });
            }
        }

        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|raw| !raw.trim().is_empty())
}

fn parse_env_bool(name: &str, raw: &str) -> Result<bool> {
    raw.parse::<bool>().map_err(|error| HarnessError::ConfigParse {
        context: "env",
        details: format!("{name}={raw:?}: {error}"),
    })
}
