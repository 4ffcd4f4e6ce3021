//! Whitespace-insensitive output comparison.
//!
//! Two outputs are equal when they have the same number of lines and each pair
//! of lines is byte-identical once ASCII whitespace is removed, which is what
//! `diff -w` accepts. A missing final newline is not a difference. Comparison
//! works on raw bytes; invalid UTF-8 is only replaced for display.

use difference::{Changeset, Difference};

// =============================================================================
// MATCHING
// =============================================================================

/// One line of a rendered diff between expected and actual output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffLine {
    Same(String),
    Expected(String),
    Actual(String),
}

/// Space, tab, newline, vertical tab, form feed and carriage return.
fn is_blank(byte: u8) -> bool {
    byte.is_ascii_whitespace() || byte == b'\x0b'
}

fn normalize(text: &[u8]) -> Vec<Vec<u8>> {
    let mut lines: Vec<&[u8]> = text.split(|&byte| byte == b'\n').collect();
    // The piece after a final newline (or the whole of an empty text) is not a line.
    if text.is_empty() || text.ends_with(b"\n") {
        lines.pop();
    }
    lines
        .into_iter()
        .map(|line| line.iter().copied().filter(|&byte| !is_blank(byte)).collect())
        .collect()
}

/// True when the two outputs are equal under `diff -w` rules.
pub fn outputs_match(actual: &[u8], expected: &[u8]) -> bool {
    normalize(actual) == normalize(expected)
}

// =============================================================================
// DISPLAY
// =============================================================================

/// Line diff of the raw texts, for display after a mismatch.
pub fn line_diff(expected: &[u8], actual: &[u8]) -> Vec<DiffLine> {
    let expected_text = String::from_utf8_lossy(expected);
    let actual_text = String::from_utf8_lossy(actual);
    let expected = expected_text.strip_suffix('\n').unwrap_or(&*expected_text);
    let actual = actual_text.strip_suffix('\n').unwrap_or(&*actual_text);
    let changeset = Changeset::new(expected, actual, "\n");

    let mut lines = Vec::new();
    for diff in changeset.diffs {
        let (chunk, wrap): (String, fn(String) -> DiffLine) = match diff {
            Difference::Same(chunk) => (chunk, DiffLine::Same),
            Difference::Rem(chunk) => (chunk, DiffLine::Expected),
            Difference::Add(chunk) => (chunk, DiffLine::Actual),
        };
        lines.extend(chunk.split('\n').map(|line| wrap(line.to_string())));
    }
    lines
}
