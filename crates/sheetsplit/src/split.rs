use crate::archive::{ArchiveBuilder, ArchiveEntry};
use crate::config::{FailurePolicy, SplitConfig};
use crate::error::SplitError;
use crate::extract::{extract_sheet, serialize};
use crate::loader::SourceWorkbook;
use crate::naming::EntryNamer;
use crate::resolve::{ResolveStats, resolve_sheet};
use crate::validate::{EligibleSheet, Exclusion, validate};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::io::Read;

/// One sheet that made it into the archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryReport {
    pub sheet: String,
    pub file_name: String,
    pub size_bytes: usize,
    pub formulas: ResolveStats,
}

/// An eligible sheet skipped under `FailurePolicy::SkipAndReport`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetFailure {
    pub sheet: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SplitOutput {
    #[serde(skip)]
    pub archive: Vec<u8>,
    pub entries: Vec<EntryReport>,
    pub excluded: Vec<Exclusion>,
    pub failures: Vec<SheetFailure>,
}

struct Extracted {
    entry: ArchiveEntry,
    stats: ResolveStats,
}

/// Splits one workbook into a ZIP of single-sheet workbooks.
///
/// ```no_run
/// use sheetsplit::{SheetSplitter, SplitConfig};
///
/// let bytes = std::fs::read("book.xlsx")?;
/// let out = SheetSplitter::new(SplitConfig::default()).split(&bytes)?;
/// std::fs::write("split_sheets.zip", &out.archive)?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct SheetSplitter {
    config: SplitConfig,
}

impl SheetSplitter {
    pub fn new(config: SplitConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SplitConfig {
        &self.config
    }

    pub fn split(&self, bytes: &[u8]) -> Result<SplitOutput, SplitError> {
        let _span = tracing::info_span!("split_workbook", bytes = bytes.len()).entered();
        let source = SourceWorkbook::load(bytes, self.config.load_mode)?;
        self.split_source(&source)
    }

    pub fn split_reader<R: Read>(&self, mut reader: R) -> Result<SplitOutput, SplitError> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        self.split(&bytes)
    }

    /// Split an already loaded workbook. Entries follow source sheet order.
    pub fn split_source(&self, source: &SourceWorkbook) -> Result<SplitOutput, SplitError> {
        let validation = validate(source)?;

        // Names are assigned up front so they do not depend on which sheets fail.
        let mut namer = EntryNamer::new();
        let jobs: Vec<(EligibleSheet, String)> = validation
            .eligible
            .into_iter()
            .map(|sheet| {
                let stem = namer.assign(&sheet.title);
                (sheet, stem)
            })
            .collect();

        let mut builder = ArchiveBuilder::new(self.config.extension.as_str());
        let mut entries = Vec::with_capacity(jobs.len());
        let mut failures = Vec::new();

        if self.config.parallel {
            let results: Vec<Result<Extracted, SplitError>> = jobs
                .par_iter()
                .map(|(sheet, stem)| self.extract_one(source, sheet, stem))
                .collect();
            for ((sheet, _), result) in jobs.iter().zip(results) {
                self.record(&sheet.title, result, &mut builder, &mut entries, &mut failures)?;
            }
        } else {
            // One extracted workbook resident at a time.
            for (sheet, stem) in &jobs {
                let result = self.extract_one(source, sheet, stem);
                self.record(&sheet.title, result, &mut builder, &mut entries, &mut failures)?;
            }
        }

        if builder.is_empty() {
            // Only reachable under SkipAndReport when every sheet failed.
            let first = failures.into_iter().next().unwrap_or_else(|| SheetFailure {
                sheet: String::new(),
                message: "no sheet could be extracted".to_string(),
            });
            return Err(SplitError::SheetProcessing {
                sheet: first.sheet,
                message: first.message,
            });
        }

        let archive = builder.finish()?;
        tracing::info!(
            entries = entries.len(),
            excluded = validation.excluded.len(),
            failures = failures.len(),
            bytes = archive.len(),
            "archive built"
        );
        Ok(SplitOutput {
            archive,
            entries,
            excluded: validation.excluded,
            failures,
        })
    }

    fn extract_one(
        &self,
        source: &SourceWorkbook,
        sheet: &EligibleSheet,
        stem: &str,
    ) -> Result<Extracted, SplitError> {
        let _span = tracing::info_span!("extract_sheet", sheet = %sheet.title).entered();
        let ws = source
            .worksheet(sheet.index)
            .ok_or_else(|| SplitError::sheet(&sheet.title, "worksheet missing from formula view"))?;
        let values = source
            .values(&sheet.title)
            .ok_or_else(|| SplitError::sheet(&sheet.title, "worksheet missing from value view"))?;

        let resolved = resolve_sheet(ws, values, source.shared_formulas(&sheet.title));
        let stats = resolved.stats;
        let book = extract_sheet(resolved.sheet, source.book(), self.config.strategy)?;
        let bytes = serialize(&book, &sheet.title)?;
        tracing::debug!(
            cached = stats.cached,
            fallback = stats.fallback,
            bytes = bytes.len(),
            "sheet extracted"
        );
        Ok(Extracted {
            entry: ArchiveEntry {
                name: stem.to_string(),
                bytes,
            },
            stats,
        })
    }

    fn record(
        &self,
        title: &str,
        result: Result<Extracted, SplitError>,
        builder: &mut ArchiveBuilder,
        entries: &mut Vec<EntryReport>,
        failures: &mut Vec<SheetFailure>,
    ) -> Result<(), SplitError> {
        match result {
            Ok(extracted) => {
                let file_name = builder.add_entry(&extracted.entry)?;
                entries.push(EntryReport {
                    sheet: title.to_string(),
                    file_name,
                    size_bytes: extracted.entry.bytes.len(),
                    formulas: extracted.stats,
                });
                Ok(())
            }
            Err(err) => match self.config.failure_policy {
                FailurePolicy::FailFast => Err(err),
                FailurePolicy::SkipAndReport => {
                    tracing::warn!(sheet = %title, error = %err, "skipping sheet");
                    failures.push(SheetFailure {
                        sheet: title.to_string(),
                        message: err.to_string(),
                    });
                    Ok(())
                }
            },
        }
    }
}

/// Split with the default configuration and return only the archive bytes.
pub fn split_workbook(bytes: &[u8]) -> Result<Vec<u8>, SplitError> {
    SheetSplitter::default().split(bytes).map(|out| out.archive)
}
