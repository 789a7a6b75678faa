//! Sheet eligibility.
//!
//! Rules are applied in order and the first failing rule decides the
//! exclusion reason:
//!
//! 1. the sheet has a non-blank title,
//! 2. the sheet is visible (`hidden` and `veryHidden` are both excluded),
//! 3. the sheet is structurally sound: it is present in the value view and
//!    its used area fits inside the XLSX grid.

use crate::error::SplitError;
use crate::loader::SourceWorkbook;
use crate::traits::{SheetEntry, SheetState};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Largest row index an XLSX worksheet can address.
pub const MAX_ROWS: u32 = 1_048_576;
/// Largest column index an XLSX worksheet can address (`XFD`).
pub const MAX_COLS: u32 = 16_384;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ExclusionReason {
    Untitled,
    Hidden,
    VeryHidden,
    MissingFromValueView,
    Malformed(String),
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExclusionReason::Untitled => write!(f, "sheet has no title"),
            ExclusionReason::Hidden => write!(f, "sheet is hidden"),
            ExclusionReason::VeryHidden => write!(f, "sheet is very hidden"),
            ExclusionReason::MissingFromValueView => {
                write!(f, "sheet is missing from the value view")
            }
            ExclusionReason::Malformed(detail) => write!(f, "sheet is malformed: {detail}"),
        }
    }
}

/// A sheet that was left out of the archive, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exclusion {
    /// The sheet title, or `<untitled #N>` (1-based position) when it has none.
    pub title: String,
    pub reason: ExclusionReason,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EligibleSheet {
    pub index: usize,
    pub title: String,
}

#[derive(Debug, Clone, Default)]
pub struct Validation {
    pub eligible: Vec<EligibleSheet>,
    pub excluded: Vec<Exclusion>,
}

/// Structural facts about a sheet gathered from both views.
#[derive(Debug, Clone, Default)]
pub struct StructuralFacts {
    pub in_value_view: bool,
    pub value_error: Option<String>,
    /// `(max_col, max_row)` of the used area in the formula view.
    pub extent: Option<(u32, u32)>,
}

pub fn placeholder_title(index: usize) -> String {
    format!("<untitled #{}>", index + 1)
}

/// Apply the eligibility rules to one sheet.
pub fn check_sheet(entry: &SheetEntry, facts: &StructuralFacts) -> Result<(), ExclusionReason> {
    if entry.name.trim().is_empty() {
        return Err(ExclusionReason::Untitled);
    }
    match entry.state {
        SheetState::Visible => {}
        SheetState::Hidden => return Err(ExclusionReason::Hidden),
        SheetState::VeryHidden => return Err(ExclusionReason::VeryHidden),
    }
    if let Some(err) = &facts.value_error {
        return Err(ExclusionReason::Malformed(err.clone()));
    }
    if !facts.in_value_view {
        return Err(ExclusionReason::MissingFromValueView);
    }
    match facts.extent {
        None => Err(ExclusionReason::Malformed(
            "worksheet has no addressable cell grid".to_string(),
        )),
        Some((cols, rows)) if cols > MAX_COLS || rows > MAX_ROWS => {
            Err(ExclusionReason::Malformed(format!(
                "used area {cols} columns x {rows} rows exceeds the XLSX grid"
            )))
        }
        Some(_) => Ok(()),
    }
}

fn gather_facts(source: &SourceWorkbook, entry: &SheetEntry) -> StructuralFacts {
    let extent = source
        .worksheet(entry.index)
        .map(|ws| ws.get_highest_column_and_row());
    StructuralFacts {
        in_value_view: source.values(&entry.name).is_some(),
        value_error: source.value_error(&entry.name).map(str::to_string),
        extent,
    }
}

/// Partition the source sheets into eligible and excluded, preserving
/// source order in both lists.
pub fn validate(source: &SourceWorkbook) -> Result<Validation, SplitError> {
    let mut validation = Validation::default();
    for entry in source.sheets() {
        match check_sheet(entry, &gather_facts(source, entry)) {
            Ok(()) => validation.eligible.push(EligibleSheet {
                index: entry.index,
                title: entry.name.clone(),
            }),
            Err(reason) => {
                let title = if entry.name.trim().is_empty() {
                    placeholder_title(entry.index)
                } else {
                    entry.name.clone()
                };
                tracing::info!(sheet = %title, reason = %reason, "sheet excluded");
                validation.excluded.push(Exclusion { title, reason });
            }
        }
    }
    if validation.eligible.is_empty() {
        return Err(SplitError::NoEligibleSheets {
            excluded: validation.excluded,
        });
    }
    Ok(validation)
}
