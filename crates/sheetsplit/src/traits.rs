use crate::value::CellScalar;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Everything the splitter needs to know about one cell: the literal value,
/// the formula text (with a leading `=`) and whether the cell counts as a
/// formula cell.
#[derive(Clone, Debug, PartialEq)]
pub struct CellData {
    pub value: Option<CellScalar>,
    pub formula: Option<String>,
}

impl CellData {
    pub fn from_value(value: CellScalar) -> Self {
        Self {
            value: Some(value),
            formula: None,
        }
    }

    pub fn from_formula(formula: impl Into<String>) -> Self {
        Self {
            value: None,
            formula: Some(formula.into()),
        }
    }

    /// A cell is a formula cell when it carries formula text, or when its
    /// textual value starts with `=`.
    pub fn is_formula(&self) -> bool {
        if self.formula.is_some() {
            return true;
        }
        matches!(&self.value, Some(CellScalar::Text(s)) if s.starts_with('='))
    }
}

/// Sheet visibility as recorded in `xl/workbook.xml`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SheetState {
    Visible,
    Hidden,
    VeryHidden,
}

impl SheetState {
    /// Parse the `state` attribute of a `<sheet>` element. A missing or
    /// unrecognised attribute means visible.
    pub fn from_xlsx_attr(attr: &str) -> Self {
        match attr {
            "hidden" => SheetState::Hidden,
            "veryHidden" => SheetState::VeryHidden,
            _ => SheetState::Visible,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SheetState::Visible => "visible",
            SheetState::Hidden => "hidden",
            SheetState::VeryHidden => "veryHidden",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SheetEntry {
    /// 0-based position in the source workbook.
    pub index: usize,
    pub name: String,
    pub state: SheetState,
}

/// Cached values of one sheet, keyed by 1-based `(row, col)`.
#[derive(Clone, Debug, Default)]
pub struct SheetValues {
    pub cells: BTreeMap<(u32, u32), CellScalar>,
    /// `(max_row, max_col)` of the used area, when the backend reports one.
    pub dimensions: Option<(u32, u32)>,
}

impl SheetValues {
    /// The cached result at `(row, col)`, if one was persisted and it is not blank.
    pub fn cached(&self, row: u32, col: u32) -> Option<&CellScalar> {
        self.cells.get(&(row, col)).filter(|v| !v.is_blank())
    }
}

/// Value view: cached values for every sheet, keyed by sheet title.
pub type ValueView = BTreeMap<String, SheetValues>;

/// A source of cached cell values. Implemented once per parsing backend so
/// the loader can build the value view from the same parse as the formula
/// view, or from an independent one.
pub trait ValueSource {
    type Error: std::error::Error + Send + Sync + 'static;

    fn backend_name(&self) -> &'static str;
    fn sheet_entries(&self) -> Result<Vec<SheetEntry>, Self::Error>;
    fn read_values(&mut self, sheet: &str) -> Result<SheetValues, Self::Error>;
}
