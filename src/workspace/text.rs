//! Text shaping for fixture files written from inline string literals.

/// Remove the whitespace margin common to every non-blank line.
///
/// Lines made only of spaces and tabs do not count toward the margin and
/// come out empty. Tabs and spaces are not interchangeable: a line indented
/// with a tab and one indented with spaces have no common margin.
pub fn dedent(text: &str) -> String {
    let margin = text
        .split('\n')
        .filter(|line| !is_blank(line))
        .map(leading_whitespace)
        .reduce(common_prefix)
        .unwrap_or("");

    text.split('\n')
        .map(|line| {
            if is_blank(line) {
                ""
            } else {
                &line[margin.len()..]
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Rewrite every `\n` as `newline`.
pub fn with_newlines(text: &str, newline: &str) -> String {
    text.replace('\n', newline)
}

fn is_blank(line: &str) -> bool {
    line.chars().all(|c| c == ' ' || c == '\t')
}

fn leading_whitespace(line: &str) -> &str {
    let end = line
        .find(|c: char| c != ' ' && c != '\t')
        .unwrap_or(line.len());
    &line[..end]
}

fn common_prefix<'a>(a: &'a str, b: &str) -> &'a str {
    let len = a
        .bytes()
        .zip(b.bytes())
        .take_while(|(x, y)| x == y)
        .count();
    &a[..len]
}
