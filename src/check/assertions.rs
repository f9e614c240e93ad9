//! Assertions that return errors instead of panicking, so they compose with
//! `?` inside harness operations.

#![allow(missing_docs)]

use std::path::Path;

use crate::core::errors::{HarnessError, Result};
use crate::core::paths::nice_file;
use crate::notation::arcz::{Arc, format_arcs};

/// Compare two arc lists, ignoring order. On failure the error carries both
/// lists one arc per line, so they diff cleanly.
pub fn assert_equal_arcs(actual: &[Arc], expected: &[Arc], what: &str) -> Result<()> {
    let mut actual = actual.to_vec();
    let mut expected = expected.to_vec();
    actual.sort_unstable();
    expected.sort_unstable();
    if actual == expected {
        return Ok(());
    }
    Err(HarnessError::ArcsDiffer {
        what: what.to_string(),
        expected: format_arcs(&expected),
        actual: format_arcs(&actual),
    })
}

/// The two lists name the same files the same number of times, after
/// canonicalizing each name.
pub fn assert_same_files<A, B>(actual: &[A], expected: &[B]) -> Result<()>
where
    A: AsRef<Path>,
    B: AsRef<Path>,
{
    let mut actual: Vec<_> = actual.iter().map(|f| nice_file(f.as_ref())).collect();
    let mut expected: Vec<_> = expected.iter().map(|f| nice_file(f.as_ref())).collect();
    actual.sort();
    expected.sort();
    if actual == expected {
        Ok(())
    } else {
        Err(HarnessError::mismatch("files", expected, actual))
    }
}

pub fn assert_exists(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if path.exists() {
        Ok(())
    } else {
        Err(HarnessError::FileMissing {
            path: path.to_path_buf(),
        })
    }
}

pub fn assert_doesnt_exist(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if path.exists() {
        Err(HarnessError::FileExists {
            path: path.to_path_buf(),
        })
    } else {
        Ok(())
    }
}

/// `text` starts with `prefix`; `msg` replaces the default failure message.
pub fn assert_starts_with(text: &str, prefix: &str, msg: Option<&str>) -> Result<()> {
    if text.starts_with(prefix) {
        return Ok(());
    }
    Err(HarnessError::UnexpectedOutput {
        details: msg.map_or_else(
            || format!("{text:?} doesn't start with {prefix:?}"),
            str::to_string,
        ),
    })
}
