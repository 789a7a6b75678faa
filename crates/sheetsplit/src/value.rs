use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

/// A scalar as stored in a worksheet cell.
///
/// Dates and times are not a separate variant: XLSX stores them as serial
/// numbers and the cell's number format decides how they render, so they
/// travel through the splitter as `Number` with their style intact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellScalar {
    Number(f64),
    Text(String),
    Boolean(bool),
    /// Excel error literal exactly as Excel shows it (`#DIV/0!`, `#N/A`, ...).
    Error(String),
    Empty,
}

impl CellScalar {
    /// `true` for `Empty` and for zero-length text. A formula whose cached
    /// result is blank has no usable cached value.
    pub fn is_blank(&self) -> bool {
        match self {
            CellScalar::Empty => true,
            CellScalar::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Interpret an untyped `<v>` payload the way a reader would: number,
    /// then boolean, then plain text.
    pub fn from_untyped(txt: &str) -> Self {
        if txt.is_empty() {
            CellScalar::Empty
        } else if let Ok(n) = txt.parse::<f64>() {
            CellScalar::Number(n)
        } else if txt.eq_ignore_ascii_case("TRUE") {
            CellScalar::Boolean(true)
        } else if txt.eq_ignore_ascii_case("FALSE") {
            CellScalar::Boolean(false)
        } else {
            CellScalar::Text(txt.to_string())
        }
    }
}

impl Display for CellScalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellScalar::Number(n) => write!(f, "{n}"),
            CellScalar::Text(s) => write!(f, "{s}"),
            CellScalar::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            CellScalar::Error(e) => write!(f, "{e}"),
            CellScalar::Empty => Ok(()),
        }
    }
}

/// Canonical Excel error literals, used to normalise error payloads coming
/// from either backend.
pub(crate) fn normalize_error_literal(raw: &str) -> String {
    let upper = raw.trim().to_ascii_uppercase();
    match upper.as_str() {
        "#NULL!" | "#DIV/0!" | "#VALUE!" | "#REF!" | "#NAME?" | "#NUM!" | "#N/A"
        | "#GETTING_DATA" | "#SPILL!" | "#CALC!" => upper,
        _ => "#VALUE!".to_string(),
    }
}
