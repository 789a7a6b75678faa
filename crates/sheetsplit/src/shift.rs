//! A1 reference arithmetic on raw formula text.
//!
//! Shared formulas store their text once, on the anchor cell; every other
//! cell in the group inherits it with relative references moved by the
//! cell's offset from the anchor. `shift_formula` performs that move
//! without a full formula parser: string literals, quoted sheet names and
//! structured-reference brackets are copied verbatim, and every A1 cell,
//! column or row reference outside them is offset unless `$`-anchored.

use crate::validate::{MAX_COLS, MAX_ROWS};

/// Column number (1-based) to letters: `1 -> A`, `28 -> AB`.
pub fn column_letters(mut col: u32) -> String {
    let mut letters = Vec::new();
    while col > 0 {
        let rem = (col - 1) % 26;
        letters.push(char::from(b'A' + rem as u8));
        col = (col - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Parse an A1 cell reference (with or without `$`) into 1-based `(row, col)`.
pub fn parse_a1(reference: &str) -> Option<(u32, u32)> {
    let chars: Vec<char> = reference.chars().collect();
    let mut i = 0;
    let col = scan_col(&chars, &mut i)?;
    let row = scan_row(&chars, &mut i)?;
    (i == chars.len()).then_some((row.value, col.value))
}

/// Move every relative reference in `formula` by `d_row` rows and `d_col`
/// columns. A reference pushed off the grid becomes `#REF!`.
pub fn shift_formula(formula: &str, d_row: i64, d_col: i64) -> String {
    if d_row == 0 && d_col == 0 {
        return formula.to_string();
    }
    let chars: Vec<char> = formula.chars().collect();
    let mut out = String::with_capacity(formula.len() + 8);
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            '"' | '\'' => {
                let end = quoted_end(&chars, i, c);
                out.extend(&chars[i..end]);
                i = end;
            }
            '[' => {
                let end = bracket_end(&chars, i);
                out.extend(&chars[i..end]);
                i = end;
            }
            _ if c == '$' || c.is_ascii_alphanumeric() => {
                if let Some((end, text)) = shift_reference_at(&chars, i, d_row, d_col) {
                    out.push_str(&text);
                    i = end;
                } else {
                    let end = word_end(&chars, i);
                    out.extend(&chars[i..end]);
                    i = end;
                }
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }
    out
}

#[derive(Debug, Clone, Copy)]
struct Part {
    absolute: bool,
    value: u32,
}

impl Part {
    fn shifted(self, delta: i64, max: u32) -> Option<u32> {
        if self.absolute {
            return Some(self.value);
        }
        let moved = i64::from(self.value) + delta;
        (1..=i64::from(max)).contains(&moved).then_some(moved as u32)
    }
}

fn scan_col(chars: &[char], i: &mut usize) -> Option<Part> {
    let mut j = *i;
    let absolute = chars.get(j) == Some(&'$');
    if absolute {
        j += 1;
    }
    let start = j;
    let mut value: u32 = 0;
    while let Some(c) = chars.get(j).filter(|c| c.is_ascii_alphabetic()) {
        if j - start == 3 {
            return None;
        }
        value = value * 26 + u32::from(c.to_ascii_uppercase() as u8 - b'A' + 1);
        j += 1;
    }
    if j == start || value > MAX_COLS {
        return None;
    }
    *i = j;
    Some(Part { absolute, value })
}

fn scan_row(chars: &[char], i: &mut usize) -> Option<Part> {
    let mut j = *i;
    let absolute = chars.get(j) == Some(&'$');
    if absolute {
        j += 1;
    }
    let start = j;
    let mut value: u32 = 0;
    while let Some(d) = chars.get(j).and_then(|c| c.to_digit(10)) {
        if j - start == 7 {
            return None;
        }
        value = value * 10 + d;
        j += 1;
    }
    if j == start || value == 0 || value > MAX_ROWS {
        return None;
    }
    *i = j;
    Some(Part { absolute, value })
}

/// A reference must not run into a longer name, a function call or a sheet
/// qualifier.
fn ends_reference(chars: &[char], i: usize) -> bool {
    match chars.get(i) {
        None => true,
        Some(c) => !(c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '(' | '!' | '[' | '$')),
    }
}

fn shift_reference_at(chars: &[char], start: usize, d_row: i64, d_col: i64) -> Option<(usize, String)> {
    // Cell: A1, $A$1
    let mut i = start;
    if let Some(col) = scan_col(chars, &mut i) {
        if let Some(row) = scan_row(chars, &mut i) {
            if !ends_reference(chars, i) {
                return None;
            }
            let text = match (col.shifted(d_col, MAX_COLS), row.shifted(d_row, MAX_ROWS)) {
                (Some(c), Some(r)) => format!(
                    "{}{}{}{}",
                    if col.absolute { "$" } else { "" },
                    column_letters(c),
                    if row.absolute { "$" } else { "" },
                    r
                ),
                _ => "#REF!".to_string(),
            };
            return Some((i, text));
        }
    }

    // Whole columns: A:C
    let mut i = start;
    if let Some(first) = scan_col(chars, &mut i) {
        if chars.get(i) == Some(&':') {
            i += 1;
            if let Some(last) = scan_col(chars, &mut i) {
                if !ends_reference(chars, i) {
                    return None;
                }
                let text = match (first.shifted(d_col, MAX_COLS), last.shifted(d_col, MAX_COLS)) {
                    (Some(a), Some(b)) => format!(
                        "{}{}:{}{}",
                        if first.absolute { "$" } else { "" },
                        column_letters(a),
                        if last.absolute { "$" } else { "" },
                        column_letters(b)
                    ),
                    _ => "#REF!".to_string(),
                };
                return Some((i, text));
            }
        }
    }

    // Whole rows: 1:3
    let mut i = start;
    if let Some(first) = scan_row(chars, &mut i) {
        if chars.get(i) == Some(&':') {
            i += 1;
            if let Some(last) = scan_row(chars, &mut i) {
                if !ends_reference(chars, i) {
                    return None;
                }
                let text = match (first.shifted(d_row, MAX_ROWS), last.shifted(d_row, MAX_ROWS)) {
                    (Some(a), Some(b)) => format!(
                        "{}{a}:{}{b}",
                        if first.absolute { "$" } else { "" },
                        if last.absolute { "$" } else { "" },
                    ),
                    _ => "#REF!".to_string(),
                };
                return Some((i, text));
            }
        }
    }
    None
}

fn word_end(chars: &[char], start: usize) -> usize {
    let mut i = start + 1;
    while chars
        .get(i)
        .is_some_and(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '$'))
    {
        i += 1;
    }
    i
}

/// End (exclusive) of a literal opened by `quote`; a doubled quote escapes.
fn quoted_end(chars: &[char], start: usize, quote: char) -> usize {
    let mut i = start + 1;
    while i < chars.len() {
        if chars[i] == quote {
            if chars.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    chars.len()
}

fn bracket_end(chars: &[char], start: usize) -> usize {
    let mut depth = 0usize;
    for (i, c) in chars.iter().enumerate().skip(start) {
        match c {
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return i + 1;
                }
            }
            _ => {}
        }
    }
    chars.len()
}
