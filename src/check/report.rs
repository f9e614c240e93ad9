//! Picking apart textual coverage reports.

use std::sync::LazyLock;

use regex::Regex;

use crate::core::errors::{HarnessError, Result};

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace regex is valid"));

/// Collapse runs of whitespace to one space and trim the ends.
pub fn squeeze(line: &str) -> String {
    WHITESPACE_RUN.replace_all(line.trim(), " ").into_owned()
}

/// The lines of `report`, which must end with a newline.
pub fn report_lines(report: &str) -> Result<Vec<&str>> {
    let Some(body) = report.strip_suffix('\n') else {
        return Err(HarnessError::UnexpectedOutput {
            details: format!("report does not end with a newline: {report:?}"),
        });
    };
    Ok(body.split('\n').collect())
}

/// How many lines `report` has.
pub fn line_count(report: &str) -> Result<usize> {
    report_lines(report).map(|lines| lines.len())
}

/// The lines of `report` with whitespace squeezed.
pub fn squeezed_lines(report: &str) -> Result<Vec<String>> {
    Ok(report_lines(report)?.into_iter().map(squeeze).collect())
}

/// The last line of `report`, squeezed.
pub fn last_line_squeezed(report: &str) -> Result<String> {
    squeezed_lines(report)?
        .pop()
        .ok_or_else(|| HarnessError::UnexpectedOutput {
            details: "report is empty".to_string(),
        })
}

/// The row for module `name` in a report table: every column after the
/// name, single-spaced.
///
/// Rows are matched on their first column, so header and separator lines
/// never match.
pub fn module_row(report: &str, name: &str) -> Option<String> {
    report.lines().find_map(|line| {
        let mut columns = line.split_whitespace();
        (columns.next() == Some(name)).then(|| columns.collect::<Vec<_>>().join(" "))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = "\
Name      Stmts   Miss  Cover
-----------------------------
mod_a         4      1    75%
mod_b        10      0   100%
-----------------------------
TOTAL        14      1    93%
";

    #[test]
    fn lines_require_trailing_newline() {
        assert_eq!(line_count(REPORT).unwrap(), 6);
        assert_eq!(report_lines("a\nb\n").unwrap(), ["a", "b"]);
        let err = report_lines("a\nb").unwrap_err();
        assert_eq!(err.code(), "CTK-2104");
    }

    #[test]
    fn squeezing() {
        assert_eq!(squeeze("  a \t b   c "), "a b c");
        assert_eq!(last_line_squeezed(REPORT).unwrap(), "TOTAL 14 1 93%");
        assert_eq!(squeezed_lines("x  y\n").unwrap(), ["x y"]);
    }

    #[test]
    fn rows_are_found_by_name() {
        assert_eq!(module_row(REPORT, "mod_b").as_deref(), Some("10 0 100%"));
        assert_eq!(module_row(REPORT, "mod").as_deref(), None);
        assert_eq!(module_row(REPORT, "Name").as_deref(), Some("Stmts Miss Cover"));
    }
}
