use crate::common::{
    assert_number_or_text_number, open_entry, sheet, with_sheet_data, workbook_bytes,
};
use sheetsplit::{SheetSplitter, SplitConfig};
use umya_spreadsheet::CellRawValue;

fn formula_book() -> Vec<u8> {
    workbook_bytes(|book| {
        let sh = sheet(book, "Sheet1");
        sh.get_cell_mut((1, 1)).set_value_number(40); // A1
        sh.get_cell_mut((2, 1)).set_value_number(2); // B1
        // C1: cached result persisted alongside the formula.
        sh.get_cell_mut((3, 1))
            .set_value_number(42)
            .set_formula("A1+B1");
        // C2: never calculated, no cached result.
        sh.get_cell_mut((3, 2)).set_formula("A1+B1");
        // C3: unparseable formula without a cache.
        sh.get_cell_mut((3, 3)).set_formula("SUM(");
        sh.get_cell_mut((4, 4)).set_value_string("plain");
    })
}

fn split_sheet1(config: SplitConfig) -> umya_spreadsheet::Spreadsheet {
    let out = SheetSplitter::new(config).split(&formula_book()).expect("split");
    open_entry(&out.archive, "Sheet1.xlsx")
}

fn assert_frozen(book: &umya_spreadsheet::Spreadsheet) {
    let ws = book.get_sheet(&0).unwrap();

    let c1 = ws.get_cell((3, 1)).expect("C1");
    assert!(!c1.is_formula(), "C1 must not carry a formula");
    assert_number_or_text_number(c1, 42.0);

    let c2 = ws.get_cell((3, 2)).expect("C2");
    assert!(!c2.is_formula());
    assert_eq!(c2.get_value(), "=A1+B1");

    let c3 = ws.get_cell((3, 3)).expect("C3");
    assert!(!c3.is_formula());
    assert_eq!(c3.get_value(), "=SUM(");

    assert_eq!(ws.get_cell((1, 1)).unwrap().get_value(), "40");
    assert_eq!(ws.get_cell((4, 4)).unwrap().get_value(), "plain");

    let formulas = ws
        .get_cell_collection()
        .into_iter()
        .filter(|c| c.is_formula())
        .count();
    assert_eq!(formulas, 0);
}

#[test]
fn cached_results_and_fallback_text_replace_formulas() {
    assert_frozen(&split_sheet1(SplitConfig::fidelity()));
}

#[test]
fn fresh_strategy_freezes_formulas_too() {
    assert_frozen(&split_sheet1(SplitConfig::lightweight()));
}

#[test]
fn report_counts_cached_and_fallback_cells() {
    let out = SheetSplitter::default().split(&formula_book()).expect("split");
    let stats = out.entries[0].formulas;
    assert_eq!(stats.cached, 1);
    assert_eq!(stats.fallback, 2);
}

#[test]
fn fallback_text_is_not_recalculated_on_a_second_pass() {
    // Splitting an already-split entry must keep `=A1+B1` as text.
    let first = SheetSplitter::default().split(&formula_book()).expect("split");
    let mut entry = Vec::new();
    {
        use std::io::Read;
        let mut zip = zip::ZipArchive::new(std::io::Cursor::new(&first.archive)).unwrap();
        zip.by_name("Sheet1.xlsx").unwrap().read_to_end(&mut entry).unwrap();
    }
    let second = SheetSplitter::default().split(&entry).expect("resplit");
    let book = open_entry(&second.archive, "Sheet1.xlsx");
    let c2 = book.get_sheet(&0).unwrap().get_cell((3, 2)).unwrap();
    assert_eq!(c2.get_value(), "=A1+B1");
}

/// Configurations every frozen-value check runs under.
fn all_configs() -> Vec<SplitConfig> {
    #[allow(unused_mut)]
    let mut configs = vec![SplitConfig::fidelity(), SplitConfig::lightweight()];
    #[cfg(feature = "calamine")]
    configs.push(SplitConfig::default().with_load_mode(sheetsplit::LoadMode::TwoPass));
    configs
}

/// Sheet1 of a umya-built workbook with its cells replaced by `rows`.
fn hand_written_sheet(rows: &str) -> Vec<u8> {
    let bytes = workbook_bytes(|book| {
        sheet(book, "Sheet1");
    });
    with_sheet_data(&bytes, "xl/worksheets/sheet1.xml", rows)
}

#[test]
fn cached_error_results_keep_their_literal() {
    let bytes = hand_written_sheet(concat!(
        r#"<row r="1">"#,
        r#"<c r="A1"><v>0</v></c>"#,
        r#"<c r="B1" t="e"><f>1/A1</f><v>#DIV/0!</v></c>"#,
        r#"<c r="C1" t="e"><f>NA()</f><v>#N/A</v></c>"#,
        r#"</row>"#,
    ));

    for config in all_configs() {
        let out = SheetSplitter::new(config.clone()).split(&bytes).expect("split");
        assert_eq!(out.entries[0].formulas.cached, 2, "{config:?}");
        let book = open_entry(&out.archive, "Sheet1.xlsx");
        let ws = book.get_sheet(&0).unwrap();
        for (col, literal) in [(2, "#DIV/0!"), (3, "#N/A")] {
            let cell = ws.get_cell((col, 1)).expect("error cell");
            assert!(!cell.is_formula(), "{config:?}");
            assert_eq!(cell.get_value(), literal, "{config:?}");
            assert!(
                matches!(cell.get_cell_value().get_raw_value(), CellRawValue::Error(_)),
                "{literal} must stay an error value under {config:?}"
            );
        }
    }
}

#[test]
fn shared_formula_followers_fall_back_to_shifted_text() {
    let bytes = hand_written_sheet(concat!(
        r#"<row r="1"><c r="A1"><v>1</v></c><c r="B1"><v>2</v></c></row>"#,
        r#"<row r="2"><c r="A2"><v>3</v></c><c r="B2"><v>4</v></c>"#,
        r#"<c r="C2"><f t="shared" ref="C2:C4" si="0">A1+B1</f></c></row>"#,
        r#"<row r="3"><c r="A3"><v>5</v></c><c r="B3"><v>6</v></c>"#,
        r#"<c r="C3"><f t="shared" si="0"/></c></row>"#,
        r#"<row r="4"><c r="C4"><f t="shared" si="0"/><v>11</v></c></row>"#,
    ));

    for config in all_configs() {
        let out = SheetSplitter::new(config.clone()).split(&bytes).expect("split");
        let stats = out.entries[0].formulas;
        assert_eq!((stats.cached, stats.fallback), (1, 2), "{config:?}");

        let book = open_entry(&out.archive, "Sheet1.xlsx");
        let ws = book.get_sheet(&0).unwrap();
        assert_eq!(ws.get_cell((3, 2)).unwrap().get_value(), "=A1+B1", "{config:?}");
        assert_eq!(ws.get_cell((3, 3)).unwrap().get_value(), "=A2+B2", "{config:?}");
        assert_number_or_text_number(ws.get_cell((3, 4)).unwrap(), 11.0);
        assert!(
            ws.get_cell_collection().into_iter().all(|c| !c.is_formula()),
            "{config:?}"
        );
    }
}
