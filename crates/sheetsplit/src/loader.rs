use crate::backends::umya::{self, UmyaAdapter};
use crate::error::SplitError;
use crate::package::{SharedFormulas, scan_shared_formulas};
use crate::traits::{SheetEntry, SheetState, SheetValues, ValueSource, ValueView};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;
use umya_spreadsheet::{Spreadsheet, Worksheet};

/// How the value view is obtained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadMode {
    /// One umya parse yields formula text and cached value for every cell.
    #[default]
    SinglePass,
    /// The value view comes from an independent calamine parse of the same
    /// bytes. Requires the `calamine` feature.
    TwoPass,
}

#[derive(Debug, Default, Clone)]
pub struct LoaderStats {
    pub sheets_loaded: usize,
    pub cells_loaded: usize,
    pub formulas_loaded: usize,
    pub cached_values: usize,
    pub load_time_ms: u64,
}

/// The parsed source workbook: the formula view (an umya `Spreadsheet`
/// with formulas kept as text) plus the value view (cached results per
/// sheet). Built once per request, read-only afterwards.
pub struct SourceWorkbook {
    book: Spreadsheet,
    sheets: Vec<SheetEntry>,
    values: ValueView,
    value_errors: BTreeMap<String, String>,
    value_backend: &'static str,
    shared: BTreeMap<String, SharedFormulas>,
    stats: LoaderStats,
}

impl SourceWorkbook {
    pub fn load(bytes: &[u8], mode: LoadMode) -> Result<Self, SplitError> {
        let _span =
            tracing::info_span!("load_workbook", bytes = bytes.len(), mode = ?mode).entered();
        let start = Instant::now();

        let book = umya::parse_bytes(bytes).map_err(|e| SplitError::load("umya", e))?;
        let mut wb = match mode {
            LoadMode::SinglePass => Self::from_spreadsheet(book)?,
            LoadMode::TwoPass => Self::two_pass(book, bytes)?,
        };
        // umya hands shared-formula followers the anchor's text unshifted.
        wb.shared = match scan_shared_formulas(bytes) {
            Ok(shared) => shared,
            Err(e) => {
                tracing::warn!(error = %e, "shared formula scan failed; followers keep the anchor text");
                BTreeMap::new()
            }
        };

        let elapsed_ms = start.elapsed().as_millis() as u64;
        wb.stats.load_time_ms = if elapsed_ms == 0 { 1 } else { elapsed_ms };
        tracing::debug!(
            sheets = wb.stats.sheets_loaded,
            cells = wb.stats.cells_loaded,
            formulas = wb.stats.formulas_loaded,
            cached = wb.stats.cached_values,
            ms = wb.stats.load_time_ms,
            value_backend = wb.value_backend,
            "workbook loaded"
        );
        Ok(wb)
    }

    /// Wrap an already-parsed workbook; the value view is read from the same
    /// in-memory model.
    pub fn from_spreadsheet(book: Spreadsheet) -> Result<Self, SplitError> {
        let parts = {
            let adapter = UmyaAdapter::new(&book);
            ViewParts::collect(adapter)?
        };
        Ok(Self::assemble(book, parts))
    }

    #[cfg(feature = "calamine")]
    fn two_pass(book: Spreadsheet, bytes: &[u8]) -> Result<Self, SplitError> {
        let adapter = crate::backends::CalamineAdapter::open_bytes(bytes)
            .map_err(|e| SplitError::load("calamine", e))?;
        let parts = ViewParts::collect(adapter)?;
        Ok(Self::assemble(book, parts))
    }

    #[cfg(not(feature = "calamine"))]
    fn two_pass(_book: Spreadsheet, _bytes: &[u8]) -> Result<Self, SplitError> {
        Err(SplitError::Load {
            backend: "calamine",
            message: "two-pass loading requires the `calamine` feature".to_string(),
        })
    }

    fn assemble(book: Spreadsheet, parts: ViewParts) -> Self {
        let sheets: Vec<SheetEntry> = book
            .get_sheet_collection_no_check()
            .iter()
            .enumerate()
            .map(|(index, ws)| SheetEntry {
                index,
                name: ws.get_name().to_string(),
                state: umya::sheet_state(ws),
            })
            .collect();

        for entry in &sheets {
            if let Some(other) = parts.states.get(&entry.name) {
                if *other != entry.state {
                    tracing::warn!(
                        sheet = %entry.name,
                        formula_view = entry.state.as_str(),
                        value_view = other.as_str(),
                        "views disagree on sheet visibility; using the formula view"
                    );
                }
            }
        }

        let mut stats = LoaderStats {
            sheets_loaded: sheets.len(),
            cached_values: parts.values.values().map(|v| v.cells.len()).sum(),
            ..Default::default()
        };
        for ws in book.get_sheet_collection_no_check() {
            for cell in ws.get_cell_collection() {
                stats.cells_loaded += 1;
                if umya::cell_data(cell).is_formula() {
                    stats.formulas_loaded += 1;
                }
            }
        }

        Self {
            book,
            sheets,
            values: parts.values,
            value_errors: parts.errors,
            value_backend: parts.backend,
            shared: BTreeMap::new(),
            stats,
        }
    }

    /// The formula view.
    pub fn book(&self) -> &Spreadsheet {
        &self.book
    }

    /// Sheets in source order.
    pub fn sheets(&self) -> &[SheetEntry] {
        &self.sheets
    }

    pub fn worksheet(&self, index: usize) -> Option<&Worksheet> {
        self.book.get_sheet(&index)
    }

    /// Value view of one sheet, if the value backend could read it.
    pub fn values(&self, sheet: &str) -> Option<&SheetValues> {
        self.values.get(sheet)
    }

    /// Why the value backend could not read a sheet, if it failed.
    pub fn value_error(&self, sheet: &str) -> Option<&str> {
        self.value_errors.get(sheet).map(String::as_str)
    }

    /// Own formula text of the cells following a shared formula. Only
    /// known when the workbook was loaded from bytes.
    pub fn shared_formulas(&self, sheet: &str) -> Option<&SharedFormulas> {
        self.shared.get(sheet)
    }

    pub fn value_backend(&self) -> &'static str {
        self.value_backend
    }

    pub fn stats(&self) -> &LoaderStats {
        &self.stats
    }
}

/// Value view as produced by one `ValueSource`.
struct ViewParts {
    backend: &'static str,
    values: ValueView,
    states: BTreeMap<String, SheetState>,
    errors: BTreeMap<String, String>,
}

impl ViewParts {
    fn collect<S: ValueSource>(mut source: S) -> Result<Self, SplitError> {
        let backend = source.backend_name();
        let entries = source
            .sheet_entries()
            .map_err(|e| SplitError::load(backend, e))?;

        let mut values = ValueView::new();
        let mut states = BTreeMap::new();
        let mut errors = BTreeMap::new();
        for entry in entries {
            states.insert(entry.name.clone(), entry.state);
            // A sheet the value backend cannot read is reported by the
            // validator rather than failing the whole load.
            match source.read_values(&entry.name) {
                Ok(v) => {
                    values.insert(entry.name, v);
                }
                Err(e) => {
                    tracing::warn!(sheet = %entry.name, backend, error = %e, "value view unavailable");
                    errors.insert(entry.name, e.to_string());
                }
            }
        }
        Ok(Self {
            backend,
            values,
            states,
            errors,
        })
    }
}
