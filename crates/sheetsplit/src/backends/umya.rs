use crate::traits::{CellData, SheetEntry, SheetState, SheetValues, ValueSource};
use crate::value::{CellScalar, normalize_error_literal};
use std::collections::BTreeMap;
use std::io::Cursor;
use umya_spreadsheet::{Cell, CellRawValue, CellValue, Spreadsheet, Worksheet, XlsxError};

/// Parse an XLSX payload into a fully deserialized umya workbook.
pub fn parse_bytes(bytes: &[u8]) -> Result<Spreadsheet, XlsxError> {
    // Deserialize every worksheet up front: the workbook is cloned per
    // extracted sheet and lazily-read sheets would be cloned raw.
    umya_spreadsheet::reader::xlsx::read_reader(Cursor::new(bytes), true)
}

/// Serialize a workbook back to XLSX bytes.
pub fn write_bytes(book: &Spreadsheet) -> Result<Vec<u8>, XlsxError> {
    let mut buf = Cursor::new(Vec::new());
    umya_spreadsheet::writer::xlsx::write_writer(book, &mut buf)?;
    Ok(buf.into_inner())
}

pub(crate) fn convert_cell_value(cv: &CellValue) -> Option<CellScalar> {
    let raw = cv.get_raw_value();
    if raw.is_empty() {
        return None;
    }
    match raw {
        CellRawValue::Numeric(n) => Some(CellScalar::Number(*n)),
        CellRawValue::Bool(b) => Some(CellScalar::Boolean(*b)),
        CellRawValue::String(s) => Some(CellScalar::Text(s.to_string())),
        CellRawValue::RichText(rt) => Some(CellScalar::Text(rt.get_text().to_string())),
        CellRawValue::Lazy(s) => Some(CellScalar::from_untyped(s.as_ref())),
        CellRawValue::Error(_) => {
            let txt = cv.get_value();
            Some(CellScalar::Error(normalize_error_literal(txt.as_ref())))
        }
        CellRawValue::Empty => None,
    }
}

/// Both facets of a cell from a single parse.
pub fn cell_data(cell: &Cell) -> CellData {
    let cv = cell.get_cell_value();
    let formula = if cv.is_formula() {
        let f = cv.get_formula();
        // Shared-formula children carry the flag but no text of their own.
        Some(if f.is_empty() || f.starts_with('=') {
            f.to_string()
        } else {
            format!("={f}")
        })
    } else {
        None
    };
    CellData {
        value: convert_cell_value(cv),
        formula,
    }
}

/// Overwrite a cell's content with a literal, dropping any formula. The
/// cell's style is left untouched.
pub(crate) fn write_scalar(cell: &mut Cell, value: &CellScalar) {
    cell.get_cell_value_mut().remove_formula();
    match value {
        CellScalar::Number(n) => {
            cell.set_value_number(*n);
        }
        CellScalar::Boolean(b) => {
            cell.set_value_bool(*b);
        }
        CellScalar::Text(s) => {
            // String-typed: text beginning with '=' stays text on reopen.
            cell.set_value_string(s.clone());
        }
        CellScalar::Error(e) => {
            cell.set_value(e.clone());
        }
        CellScalar::Empty => {
            cell.set_blank();
        }
    }
}

pub fn sheet_state(ws: &Worksheet) -> SheetState {
    SheetState::from_xlsx_attr(ws.get_sheet_state())
}

/// Reads cached values out of an already-parsed workbook, so the value view
/// and the formula view come from one parse.
pub struct UmyaAdapter<'a> {
    book: &'a Spreadsheet,
}

impl<'a> UmyaAdapter<'a> {
    pub fn new(book: &'a Spreadsheet) -> Self {
        Self { book }
    }
}

impl ValueSource for UmyaAdapter<'_> {
    type Error = XlsxError;

    fn backend_name(&self) -> &'static str {
        "umya"
    }

    fn sheet_entries(&self) -> Result<Vec<SheetEntry>, Self::Error> {
        Ok(self
            .book
            .get_sheet_collection_no_check()
            .iter()
            .enumerate()
            .map(|(index, ws)| SheetEntry {
                index,
                name: ws.get_name().to_string(),
                state: sheet_state(ws),
            })
            .collect())
    }

    fn read_values(&mut self, sheet: &str) -> Result<SheetValues, Self::Error> {
        let ws = self
            .book
            .get_sheet_by_name(sheet)
            .ok_or_else(|| XlsxError::CellError("sheet not found".into()))?;
        let mut cells: BTreeMap<(u32, u32), CellScalar> = BTreeMap::new();
        for cell in ws.get_cell_collection() {
            let coord = cell.get_coordinate();
            let col = *coord.get_col_num();
            let row = *coord.get_row_num();
            if let Some(value) = convert_cell_value(cell.get_cell_value()) {
                cells.insert((row, col), value);
            }
        }
        let dims = cells.keys().fold((0u32, 0u32), |mut acc, (r, c)| {
            if *r > acc.0 {
                acc.0 = *r;
            }
            if *c > acc.1 {
                acc.1 = *c;
            }
            acc
        });
        Ok(SheetValues {
            cells,
            dimensions: Some(dims),
        })
    }
}
