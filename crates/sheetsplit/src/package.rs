//! Direct access to the OPC package behind a workbook.
//!
//! umya's model loses two things this crate needs. Cached error results are
//! always written back as `#VALUE!`, and cells that follow a shared formula
//! inherit the anchor's text without its references moved. `normalize_package`
//! rewrites serialized worksheet parts to put the real error literals back;
//! `scan_shared_formulas` reads the source package to give every follower
//! its own formula text.

use crate::shift::{parse_a1, shift_formula};
use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::encoding::Decoder;
use std::collections::BTreeMap;
use std::io::{Cursor, Read, Seek, Write};
use zip::result::ZipError;
use zip::write::FileOptions;
use zip::{DateTime, ZipArchive, ZipWriter};

#[derive(Debug, thiserror::Error)]
pub enum PackageError {
    #[error("zip: {0}")]
    Zip(#[from] ZipError),

    #[error("xml: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("xml attribute: {0}")]
    Attr(#[from] quick_xml::events::attributes::AttrError),

    #[error("xml text: {0}")]
    Encoding(#[from] quick_xml::encoding::EncodingError),

    #[error("xml escape: {0}")]
    Escape(#[from] quick_xml::escape::EscapeError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("package has no part '{0}'")]
    MissingPart(String),
}

/// Formula text for the cells of one sheet that follow a shared formula,
/// keyed by 1-based `(row, col)`. Each entry starts with `=`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SharedFormulas {
    cells: BTreeMap<(u32, u32), String>,
}

impl SharedFormulas {
    pub fn from_cells(cells: BTreeMap<(u32, u32), String>) -> Self {
        Self { cells }
    }

    pub fn get(&self, row: u32, col: u32) -> Option<&str> {
        self.cells.get(&(row, col)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

fn local_name(name: &[u8]) -> &[u8] {
    match name.iter().rposition(|b| *b == b':') {
        Some(idx) => &name[idx + 1..],
        None => name,
    }
}

fn is_worksheet_part(name: &str) -> bool {
    name.starts_with("xl/worksheets/") && name.ends_with(".xml")
}

/// Re-zip a serialized workbook with fixed timestamps and permissions, and
/// replace the `<v>` of every error cell listed in `errors` (A1 reference to
/// literal) with that literal. Part order and compression are kept.
pub fn normalize_package(
    bytes: &[u8],
    errors: &BTreeMap<String, String>,
) -> Result<Vec<u8>, PackageError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut writer = ZipWriter::new(Cursor::new(Vec::with_capacity(bytes.len())));

    for index in 0..archive.len() {
        let mut file = archive.by_index(index)?;
        let name = file.name().to_string();
        let options = FileOptions::default()
            .compression_method(file.compression())
            .last_modified_time(DateTime::default())
            .unix_permissions(0o644);
        if file.is_dir() {
            writer.add_directory(name, options)?;
            continue;
        }

        let mut data = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut data)?;
        if !errors.is_empty() && is_worksheet_part(&name) {
            data = restore_error_literals(&data, errors)?;
        }
        writer.start_file(name, options)?;
        writer.write_all(&data)?;
    }

    Ok(writer.finish()?.into_inner())
}

/// UTF-8 decoder, matching `Attribute::unescape_value` (unavailable when
/// quick-xml's `encoding` feature is enabled).
fn utf8() -> Decoder {
    Reader::from_reader(&b""[..]).decoder()
}

fn error_literal_for<'m>(
    cell: &BytesStart,
    errors: &'m BTreeMap<String, String>,
) -> Result<Option<&'m str>, PackageError> {
    let mut reference = None;
    let mut is_error = false;
    for attr in cell.attributes() {
        let attr = attr?;
        match local_name(attr.key.as_ref()) {
            b"r" => reference = Some(attr.decode_and_unescape_value(utf8())?.into_owned()),
            b"t" => is_error = attr.value.as_ref() == b"e",
            _ => {}
        }
    }
    Ok(match reference {
        Some(r) if is_error => errors.get(&r).map(String::as_str),
        _ => None,
    })
}

fn restore_error_literals(
    xml: &[u8],
    errors: &BTreeMap<String, String>,
) -> Result<Vec<u8>, PackageError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);
    let mut writer = Writer::new(Vec::with_capacity(xml.len()));
    let mut buf = Vec::new();

    let mut literal: Option<&str> = None;
    let mut in_value = false;
    let mut written = false;
    loop {
        let event = reader.read_event_into(&mut buf)?;
        match event {
            Event::Eof => break,
            Event::Start(ref e) => {
                match local_name(e.name().as_ref()) {
                    b"c" => literal = error_literal_for(e, errors)?,
                    b"v" if literal.is_some() => {
                        in_value = true;
                        written = false;
                    }
                    _ => {}
                }
                writer.write_event(event)?;
            }
            Event::Text(_) | Event::GeneralRef(_) if in_value => {
                if let (Some(lit), false) = (literal, written) {
                    writer.write_event(Event::Text(BytesText::new(lit)))?;
                    written = true;
                }
            }
            Event::End(ref e) => {
                match local_name(e.name().as_ref()) {
                    b"v" => in_value = false,
                    b"c" => literal = None,
                    _ => {}
                }
                writer.write_event(event)?;
            }
            other => writer.write_event(other)?,
        }
        buf.clear();
    }
    Ok(writer.into_inner())
}

fn read_part<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Option<Vec<u8>>, PackageError> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut data = Vec::with_capacity(file.size() as usize);
    file.read_to_end(&mut data)?;
    Ok(Some(data))
}

/// `(sheet name, relationship id)` in workbook order.
fn workbook_sheets(xml: &[u8]) -> Result<Vec<(String, String)>, PackageError> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut sheets = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Eof => break,
            Event::Start(ref e) | Event::Empty(ref e) if local_name(e.name().as_ref()) == b"sheet" => {
                let mut name = None;
                let mut rel_id = None;
                for attr in e.attributes() {
                    let attr = attr?;
                    let key = attr.key.as_ref();
                    let prefixed = key.contains(&b':');
                    match local_name(key) {
                        b"name" if !prefixed => name = Some(attr.decode_and_unescape_value(utf8())?.into_owned()),
                        b"id" if prefixed => rel_id = Some(attr.decode_and_unescape_value(utf8())?.into_owned()),
                        _ => {}
                    }
                }
                if let (Some(name), Some(rel_id)) = (name, rel_id) {
                    sheets.push((name, rel_id));
                }
            }
            _ => {}
        }
        buf.clear();
    }
    Ok(sheets)
}

/// Relationship id to part name, resolved against `xl/`.
fn workbook_targets(xml: &[u8]) -> Result<BTreeMap<String, String>, PackageError> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut targets = BTreeMap::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Eof => break,
            Event::Start(ref e) | Event::Empty(ref e)
                if local_name(e.name().as_ref()) == b"Relationship" =>
            {
                let mut id = None;
                let mut target = None;
                for attr in e.attributes() {
                    let attr = attr?;
                    match local_name(attr.key.as_ref()) {
                        b"Id" => id = Some(attr.decode_and_unescape_value(utf8())?.into_owned()),
                        b"Target" => target = Some(attr.decode_and_unescape_value(utf8())?.into_owned()),
                        _ => {}
                    }
                }
                if let (Some(id), Some(target)) = (id, target) {
                    let part = match target.strip_prefix('/') {
                        Some(absolute) => absolute.to_string(),
                        None => format!("xl/{}", target.trim_start_matches("./")),
                    };
                    targets.insert(id, part);
                }
            }
            _ => {}
        }
        buf.clear();
    }
    Ok(targets)
}

struct SharedAnchor {
    row: u32,
    col: u32,
    text: String,
}

/// Group id of a shared `<f>`; `None` for any other formula.
fn shared_group(f: &BytesStart) -> Result<Option<String>, PackageError> {
    let mut shared = false;
    let mut group = None;
    for attr in f.attributes() {
        let attr = attr?;
        match local_name(attr.key.as_ref()) {
            b"t" => shared = attr.value.as_ref() == b"shared",
            b"si" => group = Some(attr.decode_and_unescape_value(utf8())?.into_owned()),
            _ => {}
        }
    }
    Ok(group.filter(|_| shared))
}

fn cell_position(c: &BytesStart) -> Result<Option<(u32, u32)>, PackageError> {
    for attr in c.attributes() {
        let attr = attr?;
        if local_name(attr.key.as_ref()) == b"r" {
            return Ok(parse_a1(&attr.decode_and_unescape_value(utf8())?));
        }
    }
    Ok(None)
}

fn sheet_shared_formulas(xml: &[u8]) -> Result<SharedFormulas, PackageError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);
    let mut buf = Vec::new();

    let mut anchors: BTreeMap<String, SharedAnchor> = BTreeMap::new();
    let mut followers: Vec<((u32, u32), String)> = Vec::new();
    let mut cell: Option<(u32, u32)> = None;
    // Group id and raw text of the shared `<f>` being read.
    let mut open: Option<(String, String)> = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Eof => break,
            Event::Start(ref e) => match local_name(e.name().as_ref()) {
                b"c" => cell = cell_position(e)?,
                b"f" => open = shared_group(e)?.map(|group| (group, String::new())),
                _ => {}
            },
            Event::Empty(ref e) => match local_name(e.name().as_ref()) {
                b"c" => cell = None,
                b"f" => {
                    if let (Some(pos), Some(group)) = (cell, shared_group(e)?) {
                        followers.push((pos, group));
                    }
                }
                _ => {}
            },
            Event::Text(ref t) => {
                if let Some((_, raw)) = open.as_mut() {
                    raw.push_str(&t.decode()?);
                }
            }
            Event::GeneralRef(ref r) => {
                if let Some((_, raw)) = open.as_mut() {
                    raw.push('&');
                    raw.push_str(&r.decode()?);
                    raw.push(';');
                }
            }
            Event::End(ref e) => match local_name(e.name().as_ref()) {
                b"f" => {
                    if let (Some(pos), Some((group, raw))) = (cell, open.take()) {
                        let text = quick_xml::escape::unescape(&raw)?;
                        let text = text.trim();
                        if text.is_empty() {
                            followers.push((pos, group));
                        } else {
                            anchors.entry(group).or_insert_with(|| SharedAnchor {
                                row: pos.0,
                                col: pos.1,
                                text: text.trim_start_matches('=').to_string(),
                            });
                        }
                    }
                }
                b"c" => cell = None,
                _ => {}
            },
            _ => {}
        }
        buf.clear();
    }

    let mut cells = BTreeMap::new();
    for ((row, col), group) in followers {
        if let Some(anchor) = anchors.get(&group) {
            let d_row = i64::from(row) - i64::from(anchor.row);
            let d_col = i64::from(col) - i64::from(anchor.col);
            cells.insert((row, col), format!("={}", shift_formula(&anchor.text, d_row, d_col)));
        }
    }
    Ok(SharedFormulas { cells })
}

/// Per-sheet follower formulas of every shared formula in the package.
/// Sheets without shared formulas are left out of the map.
pub fn scan_shared_formulas(bytes: &[u8]) -> Result<BTreeMap<String, SharedFormulas>, PackageError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let workbook = read_part(&mut archive, "xl/workbook.xml")?
        .ok_or_else(|| PackageError::MissingPart("xl/workbook.xml".into()))?;
    let rels = read_part(&mut archive, "xl/_rels/workbook.xml.rels")?
        .ok_or_else(|| PackageError::MissingPart("xl/_rels/workbook.xml.rels".into()))?;
    let targets = workbook_targets(&rels)?;

    let mut out = BTreeMap::new();
    for (name, rel_id) in workbook_sheets(&workbook)? {
        let Some(part) = targets.get(&rel_id) else {
            continue;
        };
        let Some(xml) = read_part(&mut archive, part)? else {
            continue;
        };
        let shared = sheet_shared_formulas(&xml)?;
        if !shared.is_empty() {
            tracing::debug!(sheet = %name, followers = shared.len(), "shared formulas expanded");
            out.insert(name, shared);
        }
    }
    Ok(out)
}
