//! Building a standalone single-sheet workbook.
//!
//! `CloneAndPrune` clones the whole source workbook and deletes every other
//! sheet, which keeps the theme, the shared stylesheet and workbook
//! properties. Its cost is one full clone per extracted sheet, so splitting
//! `n` sheets costs `O(n * source size)` in time and peak memory of one
//! extra clone. `Fresh` starts from an empty workbook and copies the sheet
//! cell by cell; it is cheaper but loses workbook-level theme data.

use crate::backends::umya::{convert_cell_value, write_bytes, write_scalar};
use crate::error::SplitError;
use crate::package::normalize_package;
use crate::value::CellScalar;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use umya_spreadsheet::{Spreadsheet, Worksheet};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractStrategy {
    #[default]
    CloneAndPrune,
    Fresh,
}

/// Build a workbook holding exactly `resolved` and no other sheet.
pub fn extract_sheet(
    resolved: Worksheet,
    source: &Spreadsheet,
    strategy: ExtractStrategy,
) -> Result<Spreadsheet, SplitError> {
    match strategy {
        ExtractStrategy::CloneAndPrune => clone_and_prune(resolved, source),
        ExtractStrategy::Fresh => fresh(&resolved),
    }
}

/// Write `book` as XLSX bytes. The package is re-zipped with fixed
/// timestamps, and error cells get their own literal back since umya writes
/// every error as `#VALUE!`.
pub fn serialize(book: &Spreadsheet, sheet: &str) -> Result<Vec<u8>, SplitError> {
    let bytes = write_bytes(book).map_err(|e| SplitError::sheet(sheet, e))?;
    normalize_package(&bytes, &error_literals(book)).map_err(|e| SplitError::sheet(sheet, e))
}

/// A1 reference to literal for every error cell umya would misreport.
fn error_literals(book: &Spreadsheet) -> BTreeMap<String, String> {
    book.get_sheet_collection_no_check()
        .iter()
        .flat_map(|ws| ws.get_cell_collection())
        .filter_map(|cell| match convert_cell_value(cell.get_cell_value()) {
            Some(CellScalar::Error(literal)) if literal != "#VALUE!" => {
                Some((cell.get_coordinate().get_coordinate(), literal))
            }
            _ => None,
        })
        .collect()
}

fn clone_and_prune(resolved: Worksheet, source: &Spreadsheet) -> Result<Spreadsheet, SplitError> {
    let title = resolved.get_name().to_string();
    let mut book = source.clone();

    let others: Vec<String> = book
        .get_sheet_collection_no_check()
        .iter()
        .map(|ws| ws.get_name().to_string())
        .filter(|name| *name != title)
        .collect();
    for name in &others {
        book.remove_sheet_by_name(name)
            .map_err(|e| SplitError::sheet(&title, format!("removing sheet '{name}': {e}")))?;
    }

    let slot = book
        .get_sheet_by_name_mut(&title)
        .ok_or_else(|| SplitError::sheet(&title, "sheet not found in source workbook"))?;
    *slot = resolved;
    // The source's active tab may point past the only remaining sheet.
    book.get_workbook_view_mut().set_active_tab(0);
    Ok(book)
}

fn fresh(resolved: &Worksheet) -> Result<Spreadsheet, SplitError> {
    let title = resolved.get_name();
    let mut book = umya_spreadsheet::new_file_empty_worksheet();
    let ws = book
        .new_sheet(title)
        .map_err(|e| SplitError::sheet(title, e))?;
    copy_cells(resolved, ws);
    copy_dimensions(resolved, ws);
    copy_merged_regions(resolved, ws);
    Ok(book)
}

fn copy_cells(src: &Worksheet, dest: &mut Worksheet) {
    for cell in src.get_cell_collection() {
        let coord = cell.get_coordinate();
        let col = *coord.get_col_num();
        let row = *coord.get_row_num();
        let value = convert_cell_value(cell.get_cell_value()).unwrap_or(CellScalar::Empty);

        let target = dest.get_cell_mut((col, row));
        target.set_style(cell.get_style().clone());
        write_scalar(target, &value);
    }
}

fn copy_dimensions(src: &Worksheet, dest: &mut Worksheet) {
    for col in src.get_column_dimensions() {
        let dim = dest.get_column_dimension_by_number_mut(col.get_col_num());
        dim.set_width(*col.get_width());
        dim.set_hidden(*col.get_hidden());
    }
    for row in src.get_row_dimensions() {
        let dim = dest.get_row_dimension_mut(row.get_row_num());
        if *row.get_height() > 0.0 {
            dim.set_height(*row.get_height());
            dim.set_custom_height(*row.get_custom_height());
        }
        dim.set_hidden(*row.get_hidden());
    }
}

fn copy_merged_regions(src: &Worksheet, dest: &mut Worksheet) {
    for range in src.get_merge_cells() {
        dest.add_merge_cells(range.get_range());
    }
}
