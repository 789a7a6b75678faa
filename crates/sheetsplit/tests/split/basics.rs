use crate::common::{build_workbook, open_entry, ordered_entry_names, sheet, sheet_snapshot, workbook_bytes};
use sheetsplit::{SheetSplitter, SplitConfig, SplitError, split_workbook};

fn three_sheets() -> Vec<u8> {
    workbook_bytes(|book| {
        sheet(book, "Sheet1").get_cell_mut((1, 1)).set_value_string("alpha");
        sheet(book, "Summary").get_cell_mut((1, 1)).set_value_string("beta");
        sheet(book, "Data").get_cell_mut((2, 3)).set_value_number(12.5);
    })
}

#[test]
fn one_entry_per_sheet_in_source_order() {
    let out = SheetSplitter::default().split(&three_sheets()).expect("split");

    assert_eq!(
        ordered_entry_names(&out.archive),
        vec!["Sheet1.xlsx", "Summary.xlsx", "Data.xlsx"]
    );
    assert_eq!(out.entries.len(), 3);
    assert!(out.excluded.is_empty());
    assert!(out.failures.is_empty());

    for (entry, title) in out.entries.iter().zip(["Sheet1", "Summary", "Data"]) {
        assert_eq!(entry.sheet, title);
        let book = open_entry(&out.archive, &entry.file_name);
        assert_eq!(book.get_sheet_count(), 1, "{title} should stand alone");
        assert_eq!(book.get_sheet(&0).unwrap().get_name(), title);
        assert!(entry.size_bytes > 0);
    }

    let data = open_entry(&out.archive, "Data.xlsx");
    let c2 = data.get_sheet(&0).unwrap().get_cell((3, 2)).expect("C2");
    assert_eq!(c2.get_value(), "12.5");
}

#[test]
fn split_workbook_returns_the_same_archive_layout() {
    let bytes = three_sheets();
    let archive = split_workbook(&bytes).expect("split");
    assert_eq!(
        ordered_entry_names(&archive),
        vec!["Sheet1.xlsx", "Summary.xlsx", "Data.xlsx"]
    );
}

#[test]
fn split_reader_accepts_a_file() {
    let file = build_workbook(|book| {
        sheet(book, "Sheet1").get_cell_mut((1, 1)).set_value_number(1);
    });
    let handle = std::fs::File::open(file.path()).expect("open");
    let out = SheetSplitter::default().split_reader(handle).expect("split");
    assert_eq!(ordered_entry_names(&out.archive), vec!["Sheet1.xlsx"]);
}

#[test]
fn repeated_splits_agree() {
    let bytes = three_sheets();
    let splitter = SheetSplitter::default();
    let a = splitter.split(&bytes).expect("first");
    let b = splitter.split(&bytes).expect("second");

    assert_eq!(a.archive, b.archive, "archives differ byte for byte");
    assert_eq!(ordered_entry_names(&a.archive), ordered_entry_names(&b.archive));
    assert_eq!(a.entries, b.entries);
    for entry in &a.entries {
        assert_eq!(
            sheet_snapshot(&open_entry(&a.archive, &entry.file_name)),
            sheet_snapshot(&open_entry(&b.archive, &entry.file_name)),
        );
    }
}

#[test]
fn garbage_input_is_a_load_error() {
    let err = SheetSplitter::default()
        .split(b"PK\x03\x04 definitely not a workbook")
        .unwrap_err();
    assert!(matches!(err, SplitError::Load { .. }), "got {err:?}");

    let err = split_workbook(&[]).unwrap_err();
    assert!(matches!(err, SplitError::Load { .. }), "got {err:?}");
}

#[test]
fn report_serializes_without_archive_bytes() {
    let out = SheetSplitter::new(SplitConfig::default())
        .split(&three_sheets())
        .expect("split");
    let json = serde_json::to_value(&out).expect("json");
    assert!(json.get("archive").is_none());
    assert_eq!(json["entries"][1]["file_name"], "Summary.xlsx");
    assert_eq!(json["entries"][1]["formulas"]["cached"], 0);
    assert_eq!(json["excluded"], serde_json::json!([]));
}
