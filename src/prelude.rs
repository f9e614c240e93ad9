//! Convenience re-exports for test suites.
//!
//! ```rust,no_run
//! use coverage_testkit::prelude::*;
//! ```

// Core
pub use crate::core::config::HarnessConfig;
pub use crate::core::errors::{HarnessError, Result};
pub use crate::core::paths::nice_file;

// Checks
pub use crate::check::assertions::{
    assert_doesnt_exist, assert_equal_arcs, assert_exists, assert_same_files, assert_starts_with,
};
pub use crate::check::report::{last_line_squeezed, line_count, report_lines, squeezed_lines};
pub use crate::check::{Choice, CoverageTest, Expected};

// Seams
pub use crate::engine::{Analysis, CoverageEngine, CoverageScript, Exclusion};
pub use crate::notation::arcz::arcz_to_arcs;
pub use crate::process::{ERR, OK};
pub use crate::runtime::modules::Module;
pub use crate::runtime::streams;

// Workspace
pub use crate::workspace::behavior::{TestClass, report_on_class_behavior};
