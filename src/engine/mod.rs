//! Seams to the systems under test: the measurement engine and the tool's
//! command-line entry point.
//!
//! The harness never measures anything itself. It drives an implementation
//! of [`CoverageEngine`] and compares what it reports with what a test
//! expected.

#![allow(missing_docs)]

use std::collections::BTreeSet;
use std::io::Write;

use crate::core::errors::Result;
use crate::notation::arcz::Arc;
use crate::runtime::modules::Module;

/// Which kind of line an exclusion pattern removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Exclusion {
    /// Lines left out of measurement entirely.
    #[default]
    Line,
    /// Branch lines whose untaken branches are not reported as partial.
    Partial,
}

/// A measurement engine.
///
/// The harness uses one engine per check: `create`, `erase`, `exclude`,
/// then `start` → `execute` → `stop`, and finally `analyze` and `report`.
pub trait CoverageEngine: Sized {
    type Analysis: Analysis;

    /// A fresh engine; `branch` turns on arc measurement.
    fn create(branch: bool) -> Self;

    /// Forget everything measured so far.
    fn erase(&mut self) -> Result<()>;

    /// Exclude lines matching the regex `pattern`.
    fn exclude(&mut self, pattern: &str, which: Exclusion) -> Result<()>;

    fn start(&mut self) -> Result<()>;

    fn stop(&mut self) -> Result<()>;

    /// Run the module's code. Only called between `start` and `stop`.
    fn execute(&mut self, module: &Module) -> Result<()>;

    fn analyze(&mut self, module: &Module) -> Result<Self::Analysis>;

    /// Write the textual summary table for `modules` to `out`.
    fn report(&mut self, modules: &[&Module], out: &mut dyn Write) -> Result<()>;
}

/// What an engine learned about one module.
pub trait Analysis {
    /// Line numbers of the executable statements.
    fn statements(&self) -> BTreeSet<u32>;

    /// Missing lines formatted as ranges, e.g. `"2-4, 7"`.
    fn missing_formatted(&self) -> String;

    /// Every arc the code could take.
    fn arc_possibilities(&self) -> Vec<Arc>;

    /// Possible arcs that never ran.
    fn arcs_missing(&self) -> Vec<Arc>;

    /// Arcs that ran but were not predicted from the code.
    fn arcs_unpredicted(&self) -> Vec<Arc>;
}

/// The tool's command-line entry point, run in-process.
pub trait CoverageScript: Sized {
    /// Handle to the package the script should drive, injected by tests
    /// that need a stand-in.
    type Package;

    fn new(covpkg: Option<Self::Package>) -> Self;

    /// Run with `argv` (without the program name); returns the exit status.
    fn command_line(&mut self, argv: &[String]) -> i32;
}
