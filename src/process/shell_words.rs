//! POSIX-shell-style splitting of a command line into arguments.

use crate::core::errors::{HarnessError, Result};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Quote {
    None,
    Single,
    Double,
}

/// Split `line` the way a POSIX shell splits words, without expansions.
///
/// Single quotes are literal, double quotes honor backslash escapes of
/// `"`, `\`, `$` and `` ` ``, and an unquoted backslash escapes the next
/// character.
pub fn split(line: &str) -> Result<Vec<String>> {
    let mut words = Vec::new();
    let mut word = String::new();
    let mut in_word = false;
    let mut quote = Quote::None;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Quote::None, c) if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut word));
                    in_word = false;
                }
            }
            (Quote::None, '\'') => {
                quote = Quote::Single;
                in_word = true;
            }
            (Quote::None, '"') => {
                quote = Quote::Double;
                in_word = true;
            }
            (Quote::None, '\\') => {
                let escaped = chars.next().ok_or_else(|| unbalanced(line))?;
                // An escaped newline is a line continuation.
                if escaped != '\n' {
                    word.push(escaped);
                    in_word = true;
                }
            }
            (Quote::Single, '\'') | (Quote::Double, '"') => quote = Quote::None,
            (Quote::Double, '\\') => {
                let escaped = chars.next().ok_or_else(|| unbalanced(line))?;
                if !matches!(escaped, '"' | '\\' | '$' | '`' | '\n') {
                    word.push('\\');
                }
                if escaped != '\n' {
                    word.push(escaped);
                }
            }
            (_, c) => {
                word.push(c);
                in_word = true;
            }
        }
    }

    if quote != Quote::None {
        return Err(unbalanced(line));
    }
    if in_word {
        words.push(word);
    }
    Ok(words)
}

fn unbalanced(line: &str) -> HarnessError {
    HarnessError::ShellSyntax {
        line: line.to_string(),
    }
}
