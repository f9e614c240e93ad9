//! Stand-ins for the systems under test.
//!
//! `LineEngine` treats every non-blank line that is not a `#` comment as a
//! statement and runs them top to bottom. A line starting with `exit` ends
//! the run early; a line starting with `raise` fails it.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};

use coverage_testkit::core::errors::{HarnessError, Result};
use coverage_testkit::engine::{Analysis, CoverageEngine, CoverageScript, Exclusion};
use coverage_testkit::notation::arcz::Arc;
use coverage_testkit::process::{ERR, OK};
use coverage_testkit::runtime::modules::Module;
use coverage_testkit::runtime::streams;
use parking_lot::Mutex;
use regex::Regex;

/// Number of `LineEngine::stop` calls in this process.
pub static STOPS: AtomicUsize = AtomicUsize::new(0);

pub fn stops() -> usize {
    STOPS.load(Ordering::SeqCst)
}

#[derive(Default)]
pub struct LineEngine {
    branch: bool,
    running: bool,
    excludes: Vec<Regex>,
    partials: Vec<Regex>,
    /// Executed arcs per module name.
    executed: BTreeMap<String, Vec<Arc>>,
}

impl LineEngine {
    fn statements(&self, source: &str) -> Vec<(u32, String)> {
        source
            .lines()
            .zip(1..)
            .map(|(line, number)| (number, line.trim().to_string()))
            .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
            .filter(|(_, line)| !self.excludes.iter().any(|re| re.is_match(line)))
            .collect()
    }
}

impl CoverageEngine for LineEngine {
    type Analysis = LineAnalysis;

    fn create(branch: bool) -> Self {
        Self {
            branch,
            ..Self::default()
        }
    }

    fn erase(&mut self) -> Result<()> {
        self.executed.clear();
        Ok(())
    }

    fn exclude(&mut self, pattern: &str, which: Exclusion) -> Result<()> {
        let re = Regex::new(pattern).map_err(|err| HarnessError::Engine {
            context: "exclude",
            details: err.to_string(),
        })?;
        match which {
            Exclusion::Line => self.excludes.push(re),
            Exclusion::Partial => self.partials.push(re),
        }
        Ok(())
    }

    fn start(&mut self) -> Result<()> {
        self.running = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.running = false;
        STOPS.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn execute(&mut self, module: &Module) -> Result<()> {
        if !self.running {
            return Err(HarnessError::Engine {
                context: "execute",
                details: "engine is not started".to_string(),
            });
        }
        let mut arcs = Vec::new();
        let mut previous = -1;
        let mut outcome = Ok(());
        for (number, line) in self.statements(module.source()) {
            let number = i32::try_from(number).unwrap_or(i32::MAX);
            arcs.push((previous, number));
            previous = number;
            if line.starts_with("raise") {
                outcome = Err(HarnessError::Engine {
                    context: "execute",
                    details: format!("{} raised on line {number}", module.name()),
                });
                break;
            }
            if line.starts_with("exit") {
                break;
            }
        }
        if outcome.is_ok() {
            arcs.push((previous, -1));
        }
        self.executed.insert(module.name().to_string(), arcs);
        outcome
    }

    fn analyze(&mut self, module: &Module) -> Result<LineAnalysis> {
        let statements = self.statements(module.source());
        let mut possible = Vec::new();
        let mut previous = -1;
        for (number, line) in &statements {
            let number = i32::try_from(*number).unwrap_or(i32::MAX);
            if previous != 0 {
                possible.push((previous, number));
            }
            if line.starts_with("exit") {
                possible.push((number, -1));
                previous = 0;
            } else {
                previous = number;
            }
        }
        if previous != 0 {
            possible.push((previous, -1));
        }
        possible.sort_unstable();
        possible.dedup();

        let executed = self.executed.get(module.name()).cloned().unwrap_or_default();
        let ran: BTreeSet<u32> = executed
            .iter()
            .filter_map(|&(_, to)| u32::try_from(to).ok())
            .collect();
        let partial_lines: BTreeSet<u32> = statements
            .iter()
            .filter(|(_, line)| self.partials.iter().any(|re| re.is_match(line)))
            .map(|(number, _)| *number)
            .collect();

        Ok(LineAnalysis {
            branch: self.branch,
            statements: statements.iter().map(|(number, _)| *number).collect(),
            ran,
            possible,
            executed,
            partial_lines,
        })
    }

    fn report(&mut self, modules: &[&Module], out: &mut dyn Write) -> Result<()> {
        let io = |source| HarnessError::io("<report>", source);
        writeln!(out, "{:<30} {:>5} {:>5} {:>6}", "Name", "Stmts", "Miss", "Cover").map_err(io)?;
        writeln!(out, "{}", "-".repeat(49)).map_err(io)?;
        for module in modules {
            let analysis = self.analyze(module)?;
            let stmts = analysis.statements.len();
            let miss = analysis.missing().len();
            let cover = if stmts == 0 {
                100
            } else {
                (stmts - miss) * 100 / stmts
            };
            writeln!(
                out,
                "{:<30} {:>5} {:>5} {:>5}%",
                module.name(),
                stmts,
                miss,
                cover
            )
            .map_err(io)?;
        }
        Ok(())
    }
}

/// Measures like `LineEngine` but takes every exclusion pattern as opaque
/// text, the way an engine with a richer regex dialect would. Patterns it
/// was given are kept in [`EXCLUDED`].
pub struct OpaqueEngine(LineEngine);

pub static EXCLUDED: Mutex<Vec<(String, Exclusion)>> = Mutex::new(Vec::new());

impl CoverageEngine for OpaqueEngine {
    type Analysis = LineAnalysis;

    fn create(branch: bool) -> Self {
        Self(LineEngine::create(branch))
    }

    fn erase(&mut self) -> Result<()> {
        self.0.erase()
    }

    fn exclude(&mut self, pattern: &str, which: Exclusion) -> Result<()> {
        EXCLUDED.lock().push((pattern.to_string(), which));
        Ok(())
    }

    fn start(&mut self) -> Result<()> {
        self.0.start()
    }

    fn stop(&mut self) -> Result<()> {
        self.0.stop()
    }

    fn execute(&mut self, module: &Module) -> Result<()> {
        self.0.execute(module)
    }

    fn analyze(&mut self, module: &Module) -> Result<LineAnalysis> {
        self.0.analyze(module)
    }

    fn report(&mut self, modules: &[&Module], out: &mut dyn Write) -> Result<()> {
        self.0.report(modules, out)
    }
}

pub struct LineAnalysis {
    branch: bool,
    statements: Vec<u32>,
    ran: BTreeSet<u32>,
    possible: Vec<Arc>,
    executed: Vec<Arc>,
    partial_lines: BTreeSet<u32>,
}

impl LineAnalysis {
    fn missing(&self) -> Vec<u32> {
        self.statements
            .iter()
            .copied()
            .filter(|number| !self.ran.contains(number))
            .collect()
    }
}

impl Analysis for LineAnalysis {
    fn statements(&self) -> BTreeSet<u32> {
        self.statements.iter().copied().collect()
    }

    /// Runs of missing statements that are adjacent in statement order
    /// collapse into `first-last`.
    fn missing_formatted(&self) -> String {
        let mut ranges: Vec<(u32, u32)> = Vec::new();
        let mut extending = false;
        for number in &self.statements {
            if self.ran.contains(number) {
                extending = false;
                continue;
            }
            match ranges.last_mut() {
                Some((_, end)) if extending => *end = *number,
                _ => ranges.push((*number, *number)),
            }
            extending = true;
        }
        ranges
            .iter()
            .map(|&(start, end)| {
                if start == end {
                    start.to_string()
                } else {
                    format!("{start}-{end}")
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn arc_possibilities(&self) -> Vec<Arc> {
        if self.branch {
            self.possible.clone()
        } else {
            Vec::new()
        }
    }

    fn arcs_missing(&self) -> Vec<Arc> {
        self.arc_possibilities()
            .into_iter()
            .filter(|arc| !self.executed.contains(arc))
            .filter(|&(from, _)| {
                !u32::try_from(from).is_ok_and(|from| self.partial_lines.contains(&from))
            })
            .collect()
    }

    fn arcs_unpredicted(&self) -> Vec<Arc> {
        if !self.branch {
            return Vec::new();
        }
        let mut unpredicted: Vec<Arc> = self
            .executed
            .iter()
            .copied()
            .filter(|arc| !self.possible.contains(arc))
            .collect();
        unpredicted.sort_unstable();
        unpredicted
    }
}

/// A command-line tool that echoes its arguments to the bound stdout.
///
/// `fail` as the first argument exits with [`ERR`]; anything else with [`OK`].
pub struct EchoScript {
    package: Option<String>,
}

impl CoverageScript for EchoScript {
    type Package = String;

    fn new(covpkg: Option<String>) -> Self {
        Self { package: covpkg }
    }

    fn command_line(&mut self, argv: &[String]) -> i32 {
        let package = self.package.as_deref().unwrap_or("echo");
        let _ = writeln!(streams::stdout(), "{package}: {}", argv.join("|"));
        if argv.first().map(String::as_str) == Some("fail") {
            ERR
        } else {
            OK
        }
    }
}
