use crate::common::{open_entry, ordered_entry_names, sheet, sheet_snapshot, workbook_bytes};
use sheetsplit::{FailurePolicy, SheetSplitter, SplitConfig, SplitOutput};

fn wide_book() -> Vec<u8> {
    workbook_bytes(|book| {
        for i in 1..=6u32 {
            let name = if i == 1 { "Sheet1".to_string() } else { format!("S{i}") };
            let sh = sheet(book, &name);
            for r in 1..=20u32 {
                sh.get_cell_mut((1, r)).set_value_number(f64::from(r * i));
            }
            sh.get_cell_mut((2, 1))
                .set_value_number(f64::from(i * 210))
                .set_formula("SUM(A1:A20)");
        }
        sheet(book, "S4").set_sheet_state("hidden".to_string());
    })
}

fn snapshots(out: &SplitOutput) -> Vec<Vec<(String, String)>> {
    out.entries
        .iter()
        .map(|e| sheet_snapshot(&open_entry(&out.archive, &e.file_name)))
        .collect()
}

#[test]
fn parallel_extraction_matches_sequential() {
    let bytes = wide_book();
    let sequential = SheetSplitter::default().split(&bytes).expect("sequential");
    let parallel = SheetSplitter::new(SplitConfig::default().with_parallel(true))
        .split(&bytes)
        .expect("parallel");

    assert_eq!(
        ordered_entry_names(&parallel.archive),
        vec!["Sheet1.xlsx", "S2.xlsx", "S3.xlsx", "S5.xlsx", "S6.xlsx"]
    );
    assert_eq!(
        ordered_entry_names(&sequential.archive),
        ordered_entry_names(&parallel.archive)
    );
    assert_eq!(snapshots(&sequential), snapshots(&parallel));
    assert_eq!(parallel.excluded.len(), 1);
}

#[cfg(feature = "calamine")]
#[test]
fn two_pass_loading_matches_single_pass() {
    let bytes = wide_book();
    let single = SheetSplitter::default().split(&bytes).expect("single pass");
    let two = SheetSplitter::new(SplitConfig::default().with_load_mode(sheetsplit::LoadMode::TwoPass))
        .split(&bytes)
        .expect("two pass");

    assert_eq!(
        ordered_entry_names(&single.archive),
        ordered_entry_names(&two.archive)
    );
    for entry in &two.entries {
        assert_eq!(entry.formulas.cached, 1, "{}", entry.sheet);
        let book = open_entry(&two.archive, &entry.file_name);
        let b1 = book.get_sheet(&0).unwrap().get_cell((2, 1)).unwrap();
        assert!(!b1.is_formula());
    }
}

#[test]
fn skip_policy_is_a_no_op_when_nothing_fails() {
    let bytes = wide_book();
    let out = SheetSplitter::new(
        SplitConfig::default().with_failure_policy(FailurePolicy::SkipAndReport),
    )
    .split(&bytes)
    .expect("split");
    assert!(out.failures.is_empty());
    assert_eq!(out.entries.len(), 5);
}
