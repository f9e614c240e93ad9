//! Compact arc notation.
//!
//! Arcs are written as whitespace-separated pairs of characters. `.` is -1
//! (entry to or exit from the code unit), `1`-`9` are 1-9, and `A`-`Z` are
//! 10-35:
//!
//! ```
//! use coverage_testkit::notation::arcz::decode;
//!
//! assert_eq!(decode(".1 12 2.").unwrap(), vec![(-1, 1), (1, 2), (2, -1)]);
//! ```
//!
//! A minus sign negates one side: in front of the pair it negates the
//! first, between the two characters it negates the second.
//!
//! ```
//! use coverage_testkit::notation::arcz::decode;
//!
//! assert_eq!(decode("-11 2-5").unwrap(), vec![(-1, 1), (2, -5)]);
//! ```

use std::fmt::Write as _;

use crate::core::errors::{HarnessError, Result};

/// A control-flow edge `(from, to)`; negative ends are entries and exits.
pub type Arc = (i32, i32);

/// Decode `arcz` into arcs, sorted by `(from, to)` regardless of input order.
pub fn decode(arcz: &str) -> Result<Vec<Arc>> {
    let mut arcs = arcz
        .split_whitespace()
        .map(decode_pair)
        .collect::<Result<Vec<_>>>()?;
    arcs.sort_unstable();
    Ok(arcs)
}

/// Like [`decode`], but panics on malformed notation, which is always a bug
/// in the test that wrote it.
pub fn arcz_to_arcs(arcz: &str) -> Vec<Arc> {
    match decode(arcz) {
        Ok(arcs) => arcs,
        Err(err) => panic!("{err}"),
    }
}

/// One arc per line, each line terminated, so two dumps diff line by line.
pub fn format_arcs(arcs: &[Arc]) -> String {
    arcs.iter().fold(String::new(), |mut out, arc| {
        let _ = writeln!(out, "{arc:?}");
        out
    })
}

fn decode_pair(pair: &str) -> Result<Arc> {
    let chars: Vec<char> = pair.chars().collect();
    let (a, b, a_sign, b_sign) = match chars.as_slice() {
        [a, b] => (*a, *b, 1, 1),
        ['-', a, b] => (*a, *b, -1, 1),
        [a, '-', b] => (*a, *b, 1, -1),
        [_, _, _] => {
            return Err(malformed(pair, "a three-character pair needs a '-' first or second"));
        }
        _ => return Err(malformed(pair, "pairs are two characters, plus an optional '-'")),
    };
    Ok((a_sign * value(pair, a)?, b_sign * value(pair, b)?))
}

fn value(pair: &str, c: char) -> Result<i32> {
    match c {
        '.' => Ok(-1),
        '1'..='9' => Ok(c as i32 - '0' as i32),
        'A'..='Z' => Ok(10 + c as i32 - 'A' as i32),
        _ => Err(malformed(pair, &format!("{c:?} is not an arc character"))),
    }
}

fn malformed(pair: &str, details: &str) -> HarnessError {
    HarnessError::ArcNotation {
        token: pair.to_string(),
        details: details.to_string(),
    }
}
