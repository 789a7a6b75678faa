use crate::error::SplitError;
use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

/// One extracted workbook waiting to be archived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// File stem, already sanitized and unique within the archive.
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Accumulates entries into an in-memory ZIP. Nothing is handed out until
/// `finish` has written the central directory; dropping the builder
/// discards the partial archive.
pub struct ArchiveBuilder {
    writer: ZipWriter<Cursor<Vec<u8>>>,
    extension: String,
    entries: usize,
}

impl ArchiveBuilder {
    pub fn new(extension: impl Into<String>) -> Self {
        Self {
            writer: ZipWriter::new(Cursor::new(Vec::new())),
            extension: extension.into(),
            entries: 0,
        }
    }

    fn options() -> FileOptions {
        // Fixed timestamp keeps archives byte-identical across runs.
        FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(DateTime::default())
            .unix_permissions(0o644)
    }

    pub fn file_name(&self, stem: &str) -> String {
        if self.extension.is_empty() {
            stem.to_string()
        } else {
            format!("{stem}.{}", self.extension)
        }
    }

    pub fn add_entry(&mut self, entry: &ArchiveEntry) -> Result<String, SplitError> {
        let file_name = self.file_name(&entry.name);
        self.writer
            .start_file(file_name.as_str(), Self::options())
            .map_err(SplitError::archive)?;
        self.writer
            .write_all(&entry.bytes)
            .map_err(SplitError::archive)?;
        self.entries += 1;
        Ok(file_name)
    }

    pub fn len(&self) -> usize {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    pub fn finish(mut self) -> Result<Vec<u8>, SplitError> {
        let cursor = self.writer.finish().map_err(SplitError::archive)?;
        Ok(cursor.into_inner())
    }
}

/// Package `entries` in order into one ZIP.
pub fn build_archive(entries: &[ArchiveEntry], extension: &str) -> Result<Vec<u8>, SplitError> {
    let mut builder = ArchiveBuilder::new(extension);
    for entry in entries {
        builder.add_entry(entry)?;
    }
    builder.finish()
}
