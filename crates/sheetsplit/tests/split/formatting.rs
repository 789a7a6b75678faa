use crate::common::{open_entry, sheet, workbook_bytes};
use sheetsplit::{SheetSplitter, SplitConfig};
use umya_spreadsheet::Spreadsheet;

fn styled_book() -> Vec<u8> {
    workbook_bytes(|book| {
        sheet(book, "Sheet1").get_cell_mut((1, 1)).set_value_string("cover");
        let sh = sheet(book, "Styled");
        sh.get_cell_mut((2, 2)).set_value_string("merged");
        sh.get_style_mut("B2").get_font_mut().set_bold(true);
        sh.get_cell_mut((3, 5)).set_value_number(3).set_formula("1+2");
        sh.get_style_mut("C5").get_font_mut().set_italic(true);
        sh.add_merge_cells("B2:B4");
        sh.get_column_dimension_mut("B").set_width(28.0);
        sh.get_row_dimension_mut(&3).set_height(36.0);
    })
}

fn assert_formatting_kept(book: &Spreadsheet) {
    let ws = book.get_sheet(&0).unwrap();
    assert_eq!(ws.get_name(), "Styled");

    let b2 = ws.get_cell((2, 2)).expect("B2");
    assert_eq!(b2.get_value(), "merged");
    assert_eq!(b2.get_style().get_font().map(|f| *f.get_bold()), Some(true));

    // Style survives the formula being replaced by its result.
    let c5 = ws.get_cell((3, 5)).expect("C5");
    assert!(!c5.is_formula());
    assert_eq!(c5.get_style().get_font().map(|f| *f.get_italic()), Some(true));

    let merges: Vec<String> = ws.get_merge_cells().iter().map(|r| r.get_range()).collect();
    assert_eq!(merges, vec!["B2:B4".to_string()]);

    let width = ws
        .get_column_dimensions()
        .iter()
        .find(|c| *c.get_col_num() == 2)
        .map(|c| *c.get_width());
    assert_eq!(width, Some(28.0));

    let height = ws
        .get_row_dimensions()
        .into_iter()
        .find(|r| *r.get_row_num() == 3)
        .map(|r| *r.get_height());
    assert_eq!(height, Some(36.0));
}

#[test]
fn clone_and_prune_keeps_styles_dimensions_and_merges() {
    let out = SheetSplitter::new(SplitConfig::fidelity())
        .split(&styled_book())
        .expect("split");
    assert_formatting_kept(&open_entry(&out.archive, "Styled.xlsx"));
}

#[test]
fn fresh_keeps_styles_dimensions_and_merges() {
    let out = SheetSplitter::new(SplitConfig::lightweight())
        .split(&styled_book())
        .expect("split");
    assert_formatting_kept(&open_entry(&out.archive, "Styled.xlsx"));
}
