//! Reads a real `.xlsx` workbook through calamine.
//!
//! `fixtures/age_distribution.xlsx` holds the root sheet plus a `fire` sheet
//! starting at A1 and a `harvest` sheet whose used range starts at C3.

use std::path::{Path, PathBuf};

use w2w_ingest::{
    AgeDistributionBuilder, CellValue, ExcelWorkbook, IngestError, WorkbookSource,
    write_distribution_json,
};
use w2w_model::ClassifierSet;

fn fixture() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/age_distribution.xlsx")
}

#[test]
fn reads_root_sheet_headers_and_cells() {
    let mut workbook = ExcelWorkbook::open(&fixture()).expect("open");
    let root = workbook.sheet("age_distribution").expect("root sheet");

    assert_eq!(root.headers, vec!["fire", "harvest"]);
    assert_eq!(root.cell(0, 0), &CellValue::Text("Wildfire".into()));
    assert_eq!(root.cell(1, 0), &CellValue::Empty);
    assert_eq!(root.cell(1, 1), &CellValue::Text("Partial cut".into()));
}

#[test]
fn offset_sheet_starts_at_used_range() {
    let mut workbook = ExcelWorkbook::open(&fixture()).expect("open");
    let harvest = workbook.sheet("harvest").expect("harvest sheet");

    assert_eq!(harvest.headers, vec!["proportion", "min_age", "AU", "LdSpp"]);
    assert_eq!(harvest.rows.len(), 1);
    assert_eq!(harvest.cell(0, 1).as_i64(), Some(60));
    assert_eq!(harvest.cell(0, 3).as_text().as_deref(), Some("BF"));
}

#[test]
fn numeric_classifier_cells_render_as_text() {
    let mut workbook = ExcelWorkbook::open(&fixture()).expect("open");
    let fire = workbook.sheet("fire").expect("fire sheet");

    assert_eq!(fire.cell(0, 1).as_text().as_deref(), Some("1"));
    assert!(fire.cell(2, 1).is_blank());
}

#[test]
fn builds_distributions_from_workbook_file() {
    let records = AgeDistributionBuilder::new(["LdSpp", "AU"])
        .build_from_path(&fixture())
        .expect("build");

    assert_eq!(records.len(), 3);
    assert_eq!(records[0].disturbance_types, vec!["Wildfire"]);
    assert_eq!(
        records[0].classifiers,
        ClassifierSet::new([("LdSpp", "BF"), ("AU", "1")])
    );
    assert_eq!(records[0].distribution, vec![(0, 0.4), (20, 0.6)]);
    assert_eq!(records[1].classifiers, ClassifierSet::new([("LdSpp", "SW")]));
    assert_eq!(records[1].distribution, vec![(0, 1.0)]);
    assert_eq!(records[2].disturbance_types, vec!["Clearcut", "Partial cut"]);
    assert_eq!(records[2].classifiers, records[0].classifiers);
    assert_eq!(records[2].distribution, vec![(60, 1.0)]);
}

#[test]
fn workbook_file_converts_to_json() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("age_distribution.json");
    let records = AgeDistributionBuilder::new(["LdSpp"])
        .build_from_path(&fixture())
        .expect("build");

    write_distribution_json(&records, &path).expect("write");

    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).expect("read")).expect("parse");
    assert_eq!(value[1]["LdSpp"], serde_json::json!(["SW"]));
    assert_eq!(value[2]["disturbance_type"], serde_json::json!(["Clearcut", "Partial cut"]));
}

#[test]
fn unknown_sheet_is_reported() {
    let mut workbook = ExcelWorkbook::open(&fixture()).expect("open");
    assert!(matches!(
        workbook.sheet("insects"),
        Err(IngestError::SheetNotFound { sheet }) if sheet == "insects"
    ));
}

#[test]
fn non_workbook_file_fails_to_open() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("ages.xlsx");
    std::fs::write(&path, "min_age,proportion\n0,1.0\n").expect("write");

    assert!(matches!(
        ExcelWorkbook::open(&path),
        Err(IngestError::Workbook { .. })
    ));
}
