//! Per-class accounting of temp-dir usage, reported once at process exit.
//!
//! Running in a temp dir costs a directory per test, so a class can opt out.
//! Opting in or out is easy to get wrong, so every test records what it
//! did, and the exit report names classes that made a temp dir but never
//! wrote a file ("Inefficient") and classes without one that tried to
//! write files into the real working dir ("Unsafe").

#![allow(missing_docs)]

use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Write};
use std::sync::{LazyLock, Once};

use parking_lot::Mutex;
use serde::Serialize;

use crate::core::config;
use crate::logger::jsonl::{self, EventType, LogEntry, Severity};

/// Identity and temp-dir policy of a test class.
///
/// ```
/// use coverage_testkit::workspace::behavior::TestClass;
///
/// const SIMPLE: TestClass = TestClass::new("SimpleStatementTest");
/// const PURE: TestClass = TestClass::new("ArcNotationTest").without_temp_dir();
/// assert!(SIMPLE.run_in_temp_dir());
/// assert!(!PURE.run_in_temp_dir());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TestClass {
    name: &'static str,
    run_in_temp_dir: bool,
}

impl TestClass {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            run_in_temp_dir: true,
        }
    }

    /// Run this class's tests in the real working dir.
    #[must_use]
    pub const fn without_temp_dir(self) -> Self {
        Self {
            run_in_temp_dir: false,
            ..self
        }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }

    pub const fn run_in_temp_dir(&self) -> bool {
        self.run_in_temp_dir
    }
}

/// Counters accumulated over every test of one class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassBehavior {
    pub tests: u32,
    pub temp_dir: bool,
    pub tests_making_files: u32,
    pub test_method_made_any_files: bool,
}

impl Default for ClassBehavior {
    fn default() -> Self {
        Self {
            tests: 0,
            temp_dir: true,
            tests_making_files: 0,
            test_method_made_any_files: false,
        }
    }
}

static CLASS_BEHAVIORS: LazyLock<Mutex<BTreeMap<String, ClassBehavior>>> =
    LazyLock::new(|| Mutex::new(BTreeMap::new()));

/// Run `f` on the record for `class`, creating it on first use.
pub fn with_class_behavior<R>(class: &str, f: impl FnOnce(&mut ClassBehavior) -> R) -> R {
    let mut behaviors = CLASS_BEHAVIORS.lock();
    f(behaviors.entry(class.to_string()).or_default())
}

/// A copy of the record for `class`, if any test of it has run.
pub fn class_behavior(class: &str) -> Option<ClassBehavior> {
    CLASS_BEHAVIORS.lock().get(class).cloned()
}

// ──────────────────── report ────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Verdict {
    Inefficient,
    Unsafe,
}

impl Verdict {
    fn judge(behavior: &ClassBehavior) -> Option<Self> {
        if behavior.temp_dir && behavior.tests_making_files == 0 {
            Some(Self::Inefficient)
        } else if !behavior.temp_dir && behavior.tests_making_files > 0 {
            Some(Self::Unsafe)
        } else {
            None
        }
    }
}

/// One misconfigured class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub verdict: Verdict,
    pub class: String,
    pub behavior: ClassBehavior,
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let where_ = if self.behavior.temp_dir {
            "in a temp directory"
        } else {
            "without a temp directory"
        };
        write!(
            f,
            "{:?}: {} ran {} tests, {} made files {}",
            self.verdict,
            self.class,
            self.behavior.tests,
            self.behavior.tests_making_files,
            where_
        )
    }
}

/// Every class whose temp-dir setting does not match what its tests did.
pub fn findings() -> Vec<Finding> {
    findings_in(&CLASS_BEHAVIORS.lock())
}

fn findings_in(behaviors: &BTreeMap<String, ClassBehavior>) -> Vec<Finding> {
    behaviors
        .iter()
        .filter_map(|(class, behavior)| {
            Verdict::judge(behavior).map(|verdict| Finding {
                verdict,
                class: class.clone(),
                behavior: behavior.clone(),
            })
        })
        .collect()
}

/// Write one line per finding to `out`.
pub fn report_on_class_behavior(out: &mut dyn Write) -> io::Result<()> {
    for finding in findings() {
        writeln!(out, "{finding}")?;
        jsonl::record(
            &LogEntry::new(EventType::ClassBehavior, Severity::Warning)
                .class(&finding.class)
                .details(finding.to_string()),
        );
    }
    out.flush()
}

static EXIT_REPORT: Once = Once::new();

/// Arrange for the report to be printed when the process exits.
///
/// Idempotent. A no-op when `report_on_exit` is off, or on platforms
/// without `atexit`, where callers can invoke
/// [`report_on_class_behavior`] themselves.
pub fn install_exit_report() {
    if !config::global().report_on_exit {
        return;
    }
    EXIT_REPORT.call_once(register_at_exit);
}

#[cfg(unix)]
#[allow(unsafe_code)]
fn register_at_exit() {
    extern "C" fn report_at_exit() {
        let _ = std::panic::catch_unwind(|| {
            let mut out = io::stdout();
            let _ = report_on_class_behavior(&mut out);
        });
    }

    // SAFETY: `report_at_exit` takes no arguments and cannot unwind across
    // the FFI boundary because its body is wrapped in `catch_unwind`.
    let status = unsafe { libc::atexit(report_at_exit) };
    if status != 0 {
        eprintln!("[CTK-BEHAVIOR] WARNING: could not register the exit report");
    }
}

#[cfg(not(unix))]
fn register_at_exit() {}
