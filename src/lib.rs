#![deny(unsafe_code)]

//! coverage_testkit: test-support framework for exercising a code coverage
//! measurement engine and the command-line tool built on it.
//!
//! Three layers:
//! 1. **Isolation guards**: snapshot process-wide state (module registry,
//!    import path, environment, standard streams) and restore it when the
//!    test ends, even if it panics
//! 2. **Temp workspaces**: a fresh directory per test, with a per-class
//!    audit of whether the class actually needed one
//! 3. **Coverage assertions**: write source to a fresh module, measure it
//!    with a [`engine::CoverageEngine`], and compare statements, missing
//!    lines, arcs and the report row with the expectation
//!
//! # Library usage
//!
//! Use the [`prelude`] for convenient access to the most common types:
//!
//! ```rust,no_run
//! use coverage_testkit::prelude::*;
//! ```
//!
//! Individual modules can also be imported directly:
//!
//! ```rust,no_run
//! use coverage_testkit::notation::arcz::arcz_to_arcs;
//! use coverage_testkit::workspace::behavior::TestClass;
//! ```

pub mod prelude;

pub mod check;
pub mod core;
pub mod engine;
pub mod isolation;
pub mod logger;
pub mod notation;
pub mod process;
pub mod runtime;
pub mod workspace;
