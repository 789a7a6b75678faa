//! Split a multi-sheet XLSX workbook into one standalone workbook per
//! visible sheet, packaged as a single ZIP archive.
//!
//! Formula cells are frozen: each one carries its cached result from the
//! source file, or its literal `=...` text when no result was cached.
//! Cell styles, column widths, row heights and merged regions are kept.

pub mod archive;
pub mod backends;
pub mod config;
pub mod error;
pub mod extract;
pub mod loader;
pub mod naming;
pub mod package;
pub mod resolve;
pub mod shift;
pub mod split;
pub mod traits;
pub mod validate;
pub mod value;

pub use archive::{ArchiveBuilder, ArchiveEntry, build_archive};
#[cfg(feature = "calamine")]
pub use backends::CalamineAdapter;
pub use backends::UmyaAdapter;
pub use config::{FailurePolicy, SplitConfig};
pub use error::SplitError;
pub use extract::{ExtractStrategy, extract_sheet};
pub use loader::{LoadMode, LoaderStats, SourceWorkbook};
pub use naming::{EntryNamer, sanitize_sheet_name};
pub use package::{PackageError, SharedFormulas};
pub use resolve::{ResolveStats, ResolvedSheet, resolve_sheet};
pub use split::{EntryReport, SheetFailure, SheetSplitter, SplitOutput, split_workbook};
pub use traits::{CellData, SheetEntry, SheetState, SheetValues, ValueSource};
pub use validate::{EligibleSheet, Exclusion, ExclusionReason, Validation, validate};
pub use value::CellScalar;
