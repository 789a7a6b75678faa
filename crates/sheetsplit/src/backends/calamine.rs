#![cfg(feature = "calamine")]

use crate::traits::{SheetEntry, SheetState, SheetValues, ValueSource};
use crate::value::{CellScalar, normalize_error_literal};
use std::collections::BTreeMap;
use std::io::Cursor;

use calamine::{Data, Range, Reader, SheetVisible, Xlsx, XlsxError};

/// Independent parse of the source bytes, used when the value view must not
/// share a parse with the formula view.
pub struct CalamineAdapter<'a> {
    workbook: Xlsx<Cursor<&'a [u8]>>,
}

impl<'a> CalamineAdapter<'a> {
    pub fn open_bytes(bytes: &'a [u8]) -> Result<Self, XlsxError> {
        let workbook = Xlsx::new(Cursor::new(bytes))?;
        Ok(Self { workbook })
    }

    fn convert_value(data: &Data) -> CellScalar {
        match data {
            Data::Empty => CellScalar::Empty,
            Data::String(s) => CellScalar::Text(s.clone()),
            Data::Float(f) => CellScalar::Number(*f),
            Data::Int(i) => CellScalar::Number(*i as f64),
            Data::Bool(b) => CellScalar::Boolean(*b),
            Data::Error(e) => CellScalar::Error(normalize_error_literal(&e.to_string())),
            // Serial number; the style on the formula view carries the date format.
            Data::DateTime(dt) => CellScalar::Number(dt.as_f64()),
            Data::DateTimeIso(s) => CellScalar::Text(s.clone()),
            Data::DurationIso(s) => CellScalar::Text(s.clone()),
        }
    }

    fn range_to_values(range: &Range<Data>) -> BTreeMap<(u32, u32), CellScalar> {
        let mut cells = BTreeMap::new();
        let start_row = range.start().unwrap_or_default().0 as usize;
        let start_col = range.start().unwrap_or_default().1 as usize;

        for (row, col, val) in range.used_cells() {
            // Calamine uses 0-based indexing, convert to 1-based for Excel
            let excel_row = (row + start_row + 1) as u32;
            let excel_col = (col + start_col + 1) as u32;
            let value = Self::convert_value(val);
            if !value.is_blank() {
                cells.insert((excel_row, excel_col), value);
            }
        }
        cells
    }
}

impl ValueSource for CalamineAdapter<'_> {
    type Error = XlsxError;

    fn backend_name(&self) -> &'static str {
        "calamine"
    }

    fn sheet_entries(&self) -> Result<Vec<SheetEntry>, Self::Error> {
        Ok(self
            .workbook
            .sheets_metadata()
            .iter()
            .enumerate()
            .map(|(index, meta)| SheetEntry {
                index,
                name: meta.name.clone(),
                state: match meta.visible {
                    SheetVisible::Visible => SheetState::Visible,
                    SheetVisible::Hidden => SheetState::Hidden,
                    SheetVisible::VeryHidden => SheetState::VeryHidden,
                },
            })
            .collect())
    }

    fn read_values(&mut self, sheet: &str) -> Result<SheetValues, Self::Error> {
        let range = self.workbook.worksheet_range(sheet)?;
        let dimensions = range
            .end()
            .map(|(r, c)| (r.saturating_add(1), c.saturating_add(1)));
        Ok(SheetValues {
            cells: Self::range_to_values(&range),
            dimensions,
        })
    }
}
