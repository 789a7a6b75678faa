#![allow(dead_code)]

use std::io::{Cursor, Read, Write};
use umya_spreadsheet::{Cell, Spreadsheet, Worksheet};
use zip::write::FileOptions;
use zip::{ZipArchive, ZipWriter};

/// Build an XLSX on disk. The file is removed when the handle drops.
pub fn build_workbook<F: FnOnce(&mut Spreadsheet)>(f: F) -> tempfile::NamedTempFile {
    let mut book = umya_spreadsheet::new_file();
    f(&mut book);
    let file = tempfile::Builder::new()
        .suffix(".xlsx")
        .tempfile()
        .expect("temp file");
    umya_spreadsheet::writer::xlsx::write(&book, file.path()).expect("write xlsx");
    file
}

/// Same as `build_workbook`, but returns the serialized bytes.
pub fn workbook_bytes<F: FnOnce(&mut Spreadsheet)>(f: F) -> Vec<u8> {
    let file = build_workbook(f);
    std::fs::read(file.path()).expect("read xlsx")
}

/// Swap the `<sheetData>` of one worksheet part for hand-written rows. Used
/// for cell markup umya cannot write itself, such as typed error results or
/// shared formulas.
pub fn with_sheet_data(xlsx: &[u8], part: &str, rows: &str) -> Vec<u8> {
    let mut source = ZipArchive::new(Cursor::new(xlsx)).expect("open xlsx");
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for i in 0..source.len() {
        let mut file = source.by_index(i).expect("part");
        let name = file.name().to_string();
        let mut data = Vec::new();
        file.read_to_end(&mut data).expect("read part");
        if name == part {
            let xml = String::from_utf8(data).expect("utf-8 part");
            let start = xml.find("<sheetData").expect("sheetData");
            let open_end = start + xml[start..].find('>').expect("tag end") + 1;
            let end = if xml[..open_end].ends_with("/>") {
                open_end
            } else {
                let close = "</sheetData>";
                open_end + xml[open_end..].find(close).expect("sheetData end") + close.len()
            };
            data = format!("{}<sheetData>{rows}</sheetData>{}", &xml[..start], &xml[end..])
                .into_bytes();
        }
        writer.start_file(name, FileOptions::default()).expect("start part");
        writer.write_all(&data).expect("write part");
    }
    writer.finish().expect("finish xlsx").into_inner()
}

pub fn sheet<'a>(book: &'a mut Spreadsheet, name: &str) -> &'a mut Worksheet {
    if book.get_sheet_by_name(name).is_none() {
        book.new_sheet(name).expect("new sheet");
    }
    book.get_sheet_by_name_mut(name).expect("sheet")
}

/// Entry names in central-directory order.
pub fn ordered_entry_names(archive: &[u8]) -> Vec<String> {
    let mut zip = ZipArchive::new(Cursor::new(archive)).expect("open archive");
    (0..zip.len())
        .map(|i| zip.by_index(i).expect("entry").name().to_string())
        .collect()
}

pub fn open_entry(archive: &[u8], name: &str) -> Spreadsheet {
    let mut zip = ZipArchive::new(Cursor::new(archive)).expect("open archive");
    let mut entry = zip.by_name(name).expect("entry present");
    let mut buf = Vec::new();
    entry.read_to_end(&mut buf).expect("read entry");
    umya_spreadsheet::reader::xlsx::read_reader(Cursor::new(buf), true).expect("entry is xlsx")
}

/// Cached numeric results may come back typed as numbers or as numeric text.
pub fn assert_number_or_text_number(cell: &Cell, expected: f64) {
    let raw = cell.get_value();
    let parsed: f64 = raw
        .parse()
        .unwrap_or_else(|_| panic!("expected {expected}, got {raw:?}"));
    assert!((parsed - expected).abs() < 1e-9, "expected {expected}, got {parsed}");
}

/// Every cell of the only sheet in `book`, as `(coordinate, value)` pairs.
pub fn sheet_snapshot(book: &Spreadsheet) -> Vec<(String, String)> {
    let ws = book.get_sheet(&0).expect("one sheet");
    let mut cells: Vec<(String, String)> = ws
        .get_cell_collection()
        .into_iter()
        .map(|c| (c.get_coordinate().get_coordinate(), c.get_value().to_string()))
        .collect();
    cells.sort();
    cells
}
