//! Coverage assertions: measure generated source with an engine and compare
//! the results with what the test expected.

pub mod assertions;
pub mod coverage_test;
pub mod expectation;
pub mod report;

pub use coverage_test::CoverageTest;
pub use expectation::{Choice, Expected};
