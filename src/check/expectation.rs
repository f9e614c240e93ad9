//! What a coverage check expects to see.

#![allow(missing_docs)]

use std::fmt::Debug;

use crate::core::errors::{HarnessError, Result};

/// One acceptable value, or a list of alternatives where any match passes.
///
/// Alternatives exist for results that legitimately differ between runtime
/// versions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Choice<T> {
    Exactly(T),
    AnyOf(Vec<T>),
}

impl<T: PartialEq + Debug> Choice<T> {
    /// Compare `actual` against the expectation; `what` names the quantity
    /// in the failure message.
    pub fn check(&self, what: &'static str, actual: &T) -> Result<()> {
        match self {
            Self::Exactly(expected) if expected == actual => Ok(()),
            Self::Exactly(expected) => Err(HarnessError::mismatch(what, expected, actual)),
            Self::AnyOf(choices) if choices.contains(actual) => Ok(()),
            Self::AnyOf(_) => Err(HarnessError::NoChoiceMatched {
                what,
                actual: format!("{actual:?}"),
            }),
        }
    }
}

impl<T: Default> Default for Choice<T> {
    fn default() -> Self {
        Self::Exactly(T::default())
    }
}

impl<T> From<T> for Choice<T> {
    fn from(value: T) -> Self {
        Self::Exactly(value)
    }
}

/// Expectations for [`crate::check::CoverageTest::check_coverage`].
///
/// Everything is optional. Statement and missing-line checks only run when
/// `lines` is given; arc checks only run (and branch measurement is only
/// turned on) when `arcz` is given.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Expected {
    pub lines: Option<Choice<Vec<u32>>>,
    pub missing: Choice<String>,
    pub report: Option<String>,
    pub excludes: Vec<String>,
    pub partials: Vec<String>,
    pub arcz: Option<String>,
    pub arcz_missing: String,
    pub arcz_unpredicted: String,
}

impl Expected {
    pub fn new() -> Self {
        Self::default()
    }

    /// The executable statements in ascending order, compared as written.
    #[must_use]
    pub fn lines(mut self, lines: impl IntoIterator<Item = u32>) -> Self {
        self.lines = Some(Choice::Exactly(lines.into_iter().collect()));
        self
    }

    /// Several acceptable statement sets.
    #[must_use]
    pub fn lines_any_of<L>(mut self, choices: impl IntoIterator<Item = L>) -> Self
    where
        L: IntoIterator<Item = u32>,
    {
        self.lines = Some(Choice::AnyOf(
            choices
                .into_iter()
                .map(|lines| lines.into_iter().collect())
                .collect(),
        ));
        self
    }

    /// The formatted missing lines, e.g. `"3-5, 8"`.
    #[must_use]
    pub fn missing(mut self, missing: &str) -> Self {
        self.missing = Choice::Exactly(missing.to_string());
        self
    }

    #[must_use]
    pub fn missing_any_of<'a>(mut self, choices: impl IntoIterator<Item = &'a str>) -> Self {
        self.missing = Choice::AnyOf(choices.into_iter().map(str::to_string).collect());
        self
    }

    /// The module's report row, columns after the name, single-spaced.
    #[must_use]
    pub fn report(mut self, row: &str) -> Self {
        self.report = Some(row.to_string());
        self
    }

    /// A regex for lines the engine must leave out of measurement.
    #[must_use]
    pub fn exclude(mut self, pattern: &str) -> Self {
        self.excludes.push(pattern.to_string());
        self
    }

    /// A regex for branch lines whose untaken branches are fine.
    #[must_use]
    pub fn partial(mut self, pattern: &str) -> Self {
        self.partials.push(pattern.to_string());
        self
    }

    /// All possible arcs, in arc notation. Turns on branch measurement.
    #[must_use]
    pub fn arcz(mut self, arcz: &str) -> Self {
        self.arcz = Some(arcz.to_string());
        self
    }

    #[must_use]
    pub fn arcz_missing(mut self, arcz: &str) -> Self {
        self.arcz_missing = arcz.to_string();
        self
    }

    #[must_use]
    pub fn arcz_unpredicted(mut self, arcz: &str) -> Self {
        self.arcz_unpredicted = arcz.to_string();
        self
    }

    /// Whether the check measures arcs.
    pub fn branch(&self) -> bool {
        self.arcz.is_some()
    }
}
