//! The per-test fixture: every isolation guard plus the temp workspace, and
//! the operations tests run against a measurement engine or the tool.

#![allow(missing_docs)]

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::env;
use std::ffi::OsStr;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::check::assertions::assert_equal_arcs;
use crate::check::expectation::Expected;
use crate::check::report;
use crate::core::config;
use crate::core::errors::{HarnessError, Result};
use crate::core::paths::nice_file;
use crate::engine::{Analysis, CoverageEngine, CoverageScript, Exclusion};
use crate::isolation::environ::EnvironGuard;
use crate::isolation::import_path::ImportPathGuard;
use crate::isolation::modules::ModulesGuard;
use crate::isolation::serial::{self, SerialGuard};
use crate::isolation::streams::StdStreamCapture;
use crate::logger::jsonl::{self, EventType, LogEntry, Severity};
use crate::notation::arcz;
use crate::process::subprocess;
use crate::runtime::modules::Module;
use crate::runtime::{import_path, modules, streams};
use crate::workspace::behavior::TestClass;
use crate::workspace::temp_dir::TempDirGuard;

type Cleanup = Box<dyn FnOnce()>;

/// One running test.
///
/// Construction snapshots the module registry, the import path, the
/// environment and the standard streams, then sets up the workspace.
/// Dropping it runs the registered cleanups newest first and then unwinds
/// the guards in reverse: workspace, streams, environment, import path,
/// modules.
pub struct CoverageTest {
    class: TestClass,
    test_name: String,
    cleanups: Vec<Cleanup>,
    workspace: TempDirGuard,
    streams: StdStreamCapture,
    environ: EnvironGuard,
    // Held only for their `Drop`.
    _import_path: ImportPathGuard,
    modules: ModulesGuard,
    _serial: SerialGuard,
}

impl CoverageTest {
    /// Set up test `test_name` of `class`.
    pub fn new(class: TestClass, test_name: &str) -> Result<Self> {
        let serial = serial::lock();
        let modules = ModulesGuard::new();
        let import_path = ImportPathGuard::new();
        let environ = EnvironGuard::new();
        let streams = StdStreamCapture::new();
        let workspace = TempDirGuard::set_up(class)?;

        if let Some(name_file) = &config::global().test_name_file {
            fs::write(name_file, format!("{}_{test_name}", class.name()))
                .map_err(|source| HarnessError::io(name_file, source))?;
        }

        Ok(Self {
            class,
            test_name: test_name.to_string(),
            cleanups: Vec::new(),
            workspace,
            streams,
            environ,
            _import_path: import_path,
            modules,
            _serial: serial,
        })
    }

    pub fn class(&self) -> TestClass {
        self.class
    }

    pub fn test_name(&self) -> &str {
        &self.test_name
    }

    /// The workspace directory, if the class runs in one.
    pub fn temp_dir(&self) -> Option<&Path> {
        self.workspace.temp_dir()
    }

    // ──────────────────── fixture state ────────────────────

    /// Create `filename` in the workspace with dedented `text`.
    pub fn make_file(&self, filename: impl AsRef<Path>, text: &str) -> Result<PathBuf> {
        self.workspace.make_file(filename, text, None)
    }

    /// Like [`Self::make_file`], writing every line ending as `newline`.
    pub fn make_file_with_newline(
        &self,
        filename: impl AsRef<Path>,
        text: &str,
        newline: &str,
    ) -> Result<PathBuf> {
        self.workspace.make_file(filename, text, Some(newline))
    }

    /// Set an environment variable for the rest of the test.
    pub fn set_environ(&mut self, name: &str, value: impl AsRef<OsStr>) {
        self.environ.set_environ(name, value);
    }

    /// The value `name` had before the test touched it.
    pub fn original_environ(&self, name: &str, if_missing: Option<&str>) -> Option<String> {
        self.environ.original_environ(name, if_missing)
    }

    /// Everything written to stdout so far.
    pub fn stdout(&self) -> String {
        self.streams.stdout()
    }

    /// Everything written to stderr so far.
    pub fn stderr(&self) -> String {
        self.streams.stderr()
    }

    /// Drop modules imported during the test; returns how many.
    pub fn cleanup_modules(&self) -> usize {
        self.modules.cleanup_modules()
    }

    /// Run `cleanup` when the test ends, before any guard unwinds.
    /// Cleanups run newest first.
    pub fn add_cleanup(&mut self, cleanup: impl FnOnce() + 'static) {
        self.cleanups.push(Box::new(cleanup));
    }

    // ──────────────────── modules ────────────────────

    /// A module name no earlier test has used.
    pub fn get_module_name(&self) -> String {
        format!(
            "{}{}",
            config::global().module_prefix,
            rand::random::<u64>()
        )
    }

    /// Load `<modname>.<ext>` from the current directory and register it as
    /// `modname`.
    ///
    /// Loading does not execute anything; engines execute modules.
    pub fn import_local_file(&self, modname: &str) -> Result<Arc<Module>> {
        let cwd = env::current_dir().map_err(|source| HarnessError::io(".", source))?;
        let path = cwd.join(format!("{modname}.{}", config::global().module_extension));
        let module = modules::insert(Module::load(modname, &path)?);
        log_import(&module);
        Ok(module)
    }

    /// The module registered as `name`, or else the first match on the
    /// import path, loaded and registered.
    pub fn import_module(&self, name: &str) -> Result<Arc<Module>> {
        if let Some(module) = modules::lookup(name) {
            return Ok(module);
        }
        let path = import_path::resolve(name, &config::global().module_extension).ok_or_else(
            || HarnessError::ModuleNotFound {
                name: name.to_string(),
                searched: import_path::snapshot(),
            },
        )?;
        let module = modules::insert(Module::load(name, &path)?);
        log_import(&module);
        Ok(module)
    }

    /// Make a later [`Self::import_local_file`] of the same name read the
    /// file again: forget imported modules and delete compiled caches in the
    /// current directory.
    pub fn clean_local_file_imports(&self) -> Result<()> {
        self.cleanup_modules();

        let settings = config::global();
        let cwd = env::current_dir().map_err(|source| HarnessError::io(".", source))?;
        let entries = fs::read_dir(&cwd).map_err(|source| HarnessError::io(&cwd, source))?;
        for entry in entries {
            let path = entry.map_err(|source| HarnessError::io(&cwd, source))?.path();
            let compiled = path.is_file()
                && path.extension() == Some(OsStr::new(&settings.bytecode_extension));
            if compiled {
                fs::remove_file(&path).map_err(|source| HarnessError::io(&path, source))?;
            }
        }

        let cache = cwd.join(&settings.bytecode_cache_dir);
        if cache.exists() {
            fs::remove_dir_all(&cache).map_err(|source| HarnessError::io(&cache, source))?;
        }
        Ok(())
    }

    /// Start `engine`, import and execute `modname`, stop `engine`.
    ///
    /// The engine is stopped even when the import or execution fails.
    pub fn start_import_stop<E: CoverageEngine>(
        &self,
        engine: &mut E,
        modname: &str,
    ) -> Result<Arc<Module>> {
        engine.start()?;
        let mut measuring = Measuring {
            engine,
            stopped: false,
        };
        let module = self.import_local_file(modname)?;
        measuring.engine.execute(&module)?;
        measuring.finish()?;
        Ok(module)
    }

    // ──────────────────── coverage checks ────────────────────

    /// Write `text` to a fresh module, measure it with engine `E`, and
    /// compare the results with `expected`.
    pub fn check_coverage<E: CoverageEngine>(&self, text: &str, expected: &Expected) -> Result<()> {
        let modname = self.get_module_name();
        let outcome = self.measure_and_compare::<E>(&modname, text, expected);
        jsonl::record(
            &LogEntry::new(
                EventType::CoverageCheck,
                if outcome.is_ok() {
                    Severity::Info
                } else {
                    Severity::Warning
                },
            )
            .class(self.class.name())
            .test(&self.test_name)
            .module(&modname)
            .outcome(&outcome),
        );
        outcome
    }

    fn measure_and_compare<E: CoverageEngine>(
        &self,
        modname: &str,
        text: &str,
        expected: &Expected,
    ) -> Result<()> {
        let settings = config::global();
        self.make_file(format!("{modname}.{}", settings.module_extension), text)?;

        let arcs = match &expected.arcz {
            Some(arcz) => Some((
                arcz::decode(arcz)?,
                arcz::decode(&expected.arcz_missing)?,
                arcz::decode(&expected.arcz_unpredicted)?,
            )),
            None => None,
        };

        let mut engine = E::create(expected.branch());
        engine.erase()?;
        for pattern in &expected.excludes {
            engine.exclude(pattern, Exclusion::Line)?;
        }
        for pattern in &expected.partials {
            engine.exclude(pattern, Exclusion::Partial)?;
        }

        let module = self.start_import_stop(&mut engine, modname)?;
        modules::remove(modname);

        let analysis = engine.analyze(&module)?;
        if let Some(lines) = &expected.lines {
            let statements: Vec<u32> = analysis.statements().into_iter().collect();
            lines.check("lines", &statements)?;
            expected
                .missing
                .check("missing", &analysis.missing_formatted())?;
        }

        if let Some((possible, missing, unpredicted)) = arcs {
            assert_equal_arcs(&analysis.arc_possibilities(), &possible, "Possible arcs differ")?;
            assert_equal_arcs(&analysis.arcs_missing(), &missing, "Missing arcs differ")?;
            assert_equal_arcs(
                &analysis.arcs_unpredicted(),
                &unpredicted,
                "Unpredicted arcs differ",
            )?;
        }

        if let Some(expected_row) = &expected.report {
            let mut table = Vec::new();
            engine.report(&[module.as_ref()], &mut table)?;
            let table = String::from_utf8_lossy(&table);
            let row = report::module_row(&table, modname).ok_or_else(|| {
                HarnessError::UnexpectedOutput {
                    details: format!("no row for {modname} in report:\n{table}"),
                }
            })?;
            if row != *expected_row {
                return Err(HarnessError::mismatch("report", expected_row, row));
            }
        }
        Ok(())
    }

    // ──────────────────── the tool under test ────────────────────

    /// Run the tool's command line in-process with `args` split like a
    /// shell would, and require exit status `ret`.
    pub fn command_line<S: CoverageScript>(
        &self,
        args: &str,
        ret: i32,
        covpkg: Option<S::Package>,
    ) -> Result<()> {
        let argv = crate::process::shell_words::split(args)?;
        let mut script = S::new(covpkg);
        let actual = script.command_line(&argv);

        jsonl::record(
            &LogEntry::new(
                EventType::CommandLine,
                if actual == ret {
                    Severity::Info
                } else {
                    Severity::Warning
                },
            )
            .class(self.class.name())
            .test(&self.test_name)
            .command(args)
            .status(actual),
        );

        if actual == ret {
            Ok(())
        } else {
            Err(HarnessError::StatusMismatch {
                expected: ret,
                actual,
            })
        }
    }

    /// Run `cmd` in a subprocess and return its output.
    ///
    /// A configured alias for the first word of `cmd` replaces that word.
    pub fn run_command(&mut self, cmd: &str) -> Result<String> {
        let cmd = apply_alias(cmd, &config::global().command_aliases);
        self.run_command_status(&cmd).map(|(_, output)| output)
    }

    /// Run `cmd` in a subprocess with the fixture modules importable, echo
    /// its output to stdout, and return the exit status and output.
    pub fn run_command_status(&mut self, cmd: &str) -> Result<(i32, String)> {
        let settings = config::global();
        let var = settings.module_path_var.as_str();

        let mut search: Vec<PathBuf> = env::var_os(var)
            .filter(|value| !value.is_empty())
            .map(|value| env::split_paths(&value).collect())
            .unwrap_or_default();
        search.push(nice_file(&settings.fixture_modules_path()));
        search.push(nice_file(&settings.fixture_archive_path()));
        let joined = env::join_paths(&search).map_err(|err| HarnessError::InvalidConfig {
            details: format!("fixture path cannot go in {var}: {err}"),
        })?;
        self.set_environ(var, joined);

        let (status, output) = subprocess::run_command(cmd)?;
        writeln!(streams::stdout(), "{output}")
            .map_err(|source| HarnessError::io("<stdout>", source))?;
        Ok((status, output))
    }

    /// Output of `cmd` with path separators normalized to `/`; output that
    /// mentions an error fails.
    pub fn report_from_command(&mut self, cmd: &str) -> Result<String> {
        let report = self.run_command(cmd)?.replace('\\', "/");
        if report.to_lowercase().contains("error") {
            return Err(HarnessError::UnexpectedOutput {
                details: format!("report mentions an error:\n{report}"),
            });
        }
        Ok(report)
    }
}

impl Drop for CoverageTest {
    fn drop(&mut self) {
        while let Some(cleanup) = self.cleanups.pop() {
            cleanup();
        }
    }
}

/// Keeps an engine measuring; stops it when dropped unless
/// [`Measuring::finish`] already did.
struct Measuring<'a, E: CoverageEngine> {
    engine: &'a mut E,
    stopped: bool,
}

impl<E: CoverageEngine> Measuring<'_, E> {
    fn finish(mut self) -> Result<()> {
        self.stopped = true;
        self.engine.stop()
    }
}

impl<E: CoverageEngine> Drop for Measuring<'_, E> {
    fn drop(&mut self) {
        if !self.stopped
            && let Err(err) = self.engine.stop()
        {
            eprintln!("[CTK-ENGINE] stop failed after an aborted measurement: {err}");
        }
    }
}

fn apply_alias<'a>(cmd: &'a str, aliases: &BTreeMap<String, String>) -> Cow<'a, str> {
    let (first, rest) = cmd.split_once(' ').unwrap_or((cmd, ""));
    match aliases.get(first) {
        Some(alias) if rest.is_empty() => Cow::Owned(alias.clone()),
        Some(alias) => Cow::Owned(format!("{alias} {rest}")),
        None => Cow::Borrowed(cmd),
    }
}

fn log_import(module: &Module) {
    jsonl::record(
        &LogEntry::new(EventType::ModuleImport, Severity::Info)
            .module(module.name())
            .path(module.path()),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLASS: TestClass = TestClass::new("CoverageTestUnit");

    #[test]
    fn module_names_are_fresh() {
        let test = CoverageTest::new(CLASS, "module_names_are_fresh").unwrap();
        let a = test.get_module_name();
        let b = test.get_module_name();
        assert!(a.starts_with(&config::global().module_prefix));
        assert_ne!(a, b);
    }

    #[test]
    fn cleanups_run_newest_first_before_the_workspace_goes() {
        let order = std::sync::Arc::new(parking_lot::Mutex::new(Vec::new()));
        let workspace;
        {
            let mut test = CoverageTest::new(CLASS, "cleanups").unwrap();
            workspace = test.temp_dir().unwrap().to_path_buf();
            for label in ["first", "second"] {
                let order = std::sync::Arc::clone(&order);
                let dir = workspace.clone();
                test.add_cleanup(move || order.lock().push((label, dir.exists())));
            }
        }
        assert_eq!(*order.lock(), [("second", true), ("first", true)]);
        assert!(!workspace.exists());
    }

    #[test]
    fn import_local_file_registers_until_cleanup() {
        let test = CoverageTest::new(CLASS, "import_local_file").unwrap();
        test.make_file("unit_mod.py", "x = 1\n").unwrap();
        let module = test.import_local_file("unit_mod").unwrap();
        assert_eq!(module.source(), "x = 1\n");
        assert!(modules::contains("unit_mod"));

        // A cached import wins over the file on disk.
        test.make_file("unit_mod.py", "x = 2\n").unwrap();
        assert_eq!(test.import_module("unit_mod").unwrap().source(), "x = 1\n");

        test.make_file("unit_mod.pyc", "").unwrap();
        test.make_file("__pycache__/unit_mod.cpython.pyc", "").unwrap();
        test.clean_local_file_imports().unwrap();
        assert!(!modules::contains("unit_mod"));
        assert!(!Path::new("unit_mod.pyc").exists());
        assert!(!Path::new("__pycache__").exists());
        assert_eq!(test.import_module("unit_mod").unwrap().source(), "x = 2\n");
    }

    #[test]
    fn missing_module_lists_search_path() {
        let test = CoverageTest::new(CLASS, "missing_module").unwrap();
        let err = test.import_module("no_such_module_anywhere").unwrap_err();
        assert_eq!(err.code(), "CTK-3002");
        match err {
            HarnessError::ModuleNotFound { searched, .. } => {
                assert_eq!(searched.first().map(PathBuf::as_path), test.temp_dir());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn aliases_replace_the_first_word() {
        let aliases = BTreeMap::from([("python".to_string(), "python3.12".to_string())]);
        assert_eq!(apply_alias("python run.py", &aliases), "python3.12 run.py");
        assert_eq!(apply_alias("python", &aliases), "python3.12");
        assert_eq!(apply_alias("pythonic x", &aliases), "pythonic x");
        assert_eq!(apply_alias("echo python", &aliases), "echo python");
    }
}
