use crate::backends::umya::{cell_data, write_scalar};
use crate::package::SharedFormulas;
use crate::traits::{CellData, SheetValues};
use crate::value::CellScalar;
use serde::{Deserialize, Serialize};
use umya_spreadsheet::Worksheet;

/// How many formula cells were frozen to a cached result, and how many fell
/// back to their formula text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveStats {
    pub cached: usize,
    pub fallback: usize,
}

#[derive(Debug, Clone)]
pub struct ResolvedSheet {
    pub sheet: Worksheet,
    pub stats: ResolveStats,
}

enum Resolution {
    Cached(CellScalar),
    Fallback(CellScalar),
}

/// Literal kept when a formula cell has no cached result: the formula text
/// itself, as plain text.
fn fallback_literal(data: &CellData) -> CellScalar {
    match data.formula.as_deref() {
        Some(f) if !f.is_empty() => CellScalar::Text(f.to_string()),
        _ => match &data.value {
            Some(CellScalar::Text(s)) if s.starts_with('=') => CellScalar::Text(s.clone()),
            _ => CellScalar::Empty,
        },
    }
}

/// Produce a copy of `sheet` in which every formula cell holds a literal.
///
/// A cached, non-blank result from `values` wins; otherwise the formula text
/// is stored as a string cell so it is never evaluated again. Cells that
/// follow a shared formula take their text from `shared`. Other cells, and
/// every cell's style, are carried over unchanged. Formula text is never
/// parsed, so malformed formulas cannot make this fail.
pub fn resolve_sheet(
    sheet: &Worksheet,
    values: &SheetValues,
    shared: Option<&SharedFormulas>,
) -> ResolvedSheet {
    let mut resolved = sheet.clone();
    let stats = resolve_in_place(&mut resolved, values, shared);
    ResolvedSheet {
        sheet: resolved,
        stats,
    }
}

pub fn resolve_in_place(
    ws: &mut Worksheet,
    values: &SheetValues,
    shared: Option<&SharedFormulas>,
) -> ResolveStats {
    let plan: Vec<((u32, u32), Resolution)> = ws
        .get_cell_collection()
        .into_iter()
        .filter_map(|cell| {
            let coord = cell.get_coordinate();
            let col = *coord.get_col_num();
            let row = *coord.get_row_num();
            let own_text = shared.and_then(|s| s.get(row, col));
            let data = cell_data(cell);
            if !data.is_formula() && own_text.is_none() {
                return None;
            }
            let resolution = match (values.cached(row, col), own_text) {
                (Some(v), _) => Resolution::Cached(v.clone()),
                (None, Some(text)) => Resolution::Fallback(CellScalar::Text(text.to_string())),
                (None, None) => Resolution::Fallback(fallback_literal(&data)),
            };
            Some(((col, row), resolution))
        })
        .collect();

    let mut stats = ResolveStats::default();
    for ((col, row), resolution) in plan {
        let cell = ws.get_cell_mut((col, row));
        match resolution {
            Resolution::Cached(v) => {
                write_scalar(cell, &v);
                stats.cached += 1;
            }
            Resolution::Fallback(v) => {
                write_scalar(cell, &v);
                stats.fallback += 1;
            }
        }
    }
    stats
}
