use proptest::prelude::*;
use serde_json::{Value, json};

use w2w_ingest::{
    AgeDistributionBuilder, CellValue, IngestError, MemoryWorkbook, SheetTable,
    write_distribution_json,
};
use w2w_model::ClassifierSet;

fn headers(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| (*name).to_string()).collect()
}

fn text(value: &str) -> CellValue {
    CellValue::from(value)
}

fn root_sheet() -> SheetTable {
    SheetTable::new(
        headers(&["fire", "harvest"]),
        vec![
            vec![text("Wildfire"), text("Clearcut")],
            vec![text(""), text("Partial cut")],
        ],
    )
}

fn workbook() -> MemoryWorkbook {
    let fire = SheetTable::new(
        headers(&["LdSpp", "AU", "min_age", "proportion"]),
        vec![
            vec![text("BF"), text("1"), CellValue::Int(20), CellValue::Float(0.6)],
            vec![text("BF"), text("1"), CellValue::Int(0), CellValue::Float(0.4)],
            vec![text("SW"), CellValue::Empty, CellValue::Int(0), CellValue::Float(1.0)],
        ],
    );
    // Same classifier columns in the opposite order.
    let harvest = SheetTable::new(
        headers(&["proportion", "min_age", "AU", "LdSpp"]),
        vec![vec![CellValue::Float(1.0), CellValue::Int(60), text("1"), text("BF")]],
    );
    MemoryWorkbook::new()
        .with_sheet("age_distribution", root_sheet())
        .with_sheet("fire", fire)
        .with_sheet("harvest", harvest)
}

#[test]
fn builds_records_in_sheet_then_first_seen_order() {
    let builder = AgeDistributionBuilder::new(["LdSpp", "AU"]);
    let records = builder.build(&mut workbook()).expect("build");

    assert_eq!(records.len(), 3);
    assert_eq!(records[0].disturbance_types, vec!["Wildfire"]);
    assert_eq!(
        records[0].classifiers,
        ClassifierSet::new([("LdSpp", "BF"), ("AU", "1")])
    );
    assert_eq!(records[0].distribution, vec![(0, 0.4), (20, 0.6)]);
    assert_eq!(records[1].classifiers, ClassifierSet::new([("LdSpp", "SW")]));
    assert_eq!(records[2].disturbance_types, vec!["Clearcut", "Partial cut"]);
    // Column order in the sheet does not change the key.
    assert_eq!(records[2].classifiers, records[0].classifiers);
}

#[test]
fn missing_column_in_any_sheet_fails_whole_build() {
    let broken = SheetTable::new(
        headers(&["LdSpp", "min_age"]),
        vec![vec![text("BF"), CellValue::Int(0)]],
    );
    let mut workbook = workbook().with_sheet("harvest", broken);
    let builder = AgeDistributionBuilder::new(["LdSpp"]);

    let error = builder.build(&mut workbook).expect_err("must fail");
    assert!(matches!(error, IngestError::MissingColumn { .. }));
}

#[test]
fn missing_distribution_sheet_fails() {
    let mut workbook = MemoryWorkbook::new().with_sheet("age_distribution", root_sheet());
    let builder = AgeDistributionBuilder::new(["LdSpp"]);
    assert!(matches!(
        builder.build(&mut workbook),
        Err(IngestError::SheetNotFound { .. })
    ));
}

#[test]
fn root_sheet_without_disturbance_types_omits_field() {
    let root = SheetTable::new(headers(&["fire"]), Vec::new());
    let fire = SheetTable::new(
        headers(&["min_age", "proportion"]),
        vec![vec![CellValue::Int(0), CellValue::Float(1.0)]],
    );
    let mut workbook = MemoryWorkbook::new()
        .with_sheet("age_distribution", root)
        .with_sheet("fire", fire);
    let records = AgeDistributionBuilder::default()
        .build(&mut workbook)
        .expect("build");

    let value = serde_json::to_value(&records).expect("serialize");
    assert_eq!(value, json!([{"distribution": [[0, 1.0]]}]));
}

#[test]
fn writes_json_document() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("rollback").join("age_distribution.json");
    let builder = AgeDistributionBuilder::new(["LdSpp", "AU"]);
    let records = builder.build(&mut workbook()).expect("build");

    write_distribution_json(&records, &path).expect("write");

    let text = std::fs::read_to_string(&path).expect("read");
    assert!(text.contains("\n    {"), "four-space indent expected");
    let value: Value = serde_json::from_str(&text).expect("parse");
    assert_eq!(value[0]["LdSpp"], json!(["BF"]));
    assert_eq!(value[0]["AU"], json!(["1"]));
    assert_eq!(value[0]["disturbance_type"], json!(["Wildfire"]));
    assert_eq!(value[0]["distribution"], json!([[0, 0.4], [20, 0.6]]));
    assert!(!path.with_extension("json.tmp").exists());
}

proptest! {
    #[test]
    fn distributions_are_strictly_ascending(
        rows in prop::collection::vec((0u8..3, 0i64..200, 0.0f64..1.0), 1..60),
    ) {
        let species = ["BF", "SW", ""];
        let table = SheetTable::new(
            headers(&["LdSpp", "min_age", "proportion"]),
            rows.iter()
                .map(|&(spp, age, proportion)| {
                    vec![text(species[spp as usize]), CellValue::Int(age), CellValue::Float(proportion)]
                })
                .collect(),
        );
        let records = AgeDistributionBuilder::new(["LdSpp"])
            .build_sheet("fire", &[], &table)
            .expect("build");

        for record in &records {
            prop_assert!(record.is_strictly_ascending());
        }
        let distinct_keys: std::collections::BTreeSet<u8> = rows.iter().map(|row| row.0).collect();
        prop_assert_eq!(records.len(), distinct_keys.len());
    }

    #[test]
    fn column_order_does_not_split_groups(
        values in prop::collection::vec((0u8..2, 0u8..2, 0i64..50), 1..30),
    ) {
        let spp = ["BF", "SW"];
        let region = ["North", "South"];
        let forward = SheetTable::new(
            headers(&["LdSpp", "Region", "min_age", "proportion"]),
            values.iter()
                .map(|&(s, r, age)| vec![
                    text(spp[s as usize]), text(region[r as usize]),
                    CellValue::Int(age), CellValue::Float(0.5),
                ])
                .collect(),
        );
        let reversed = SheetTable::new(
            headers(&["proportion", "min_age", "Region", "LdSpp"]),
            values.iter()
                .map(|&(s, r, age)| vec![
                    CellValue::Float(0.5), CellValue::Int(age),
                    text(region[r as usize]), text(spp[s as usize]),
                ])
                .collect(),
        );

        let left = AgeDistributionBuilder::new(["LdSpp", "Region"])
            .build_sheet("a", &[], &forward)
            .expect("build");
        let right = AgeDistributionBuilder::new(["Region", "LdSpp"])
            .build_sheet("a", &[], &reversed)
            .expect("build");
        prop_assert_eq!(left, right);
    }
}
