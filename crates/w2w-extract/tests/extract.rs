use std::fs;
use std::path::Path;

use polars::prelude::DataFrame;
use rusqlite::Connection;

use w2w_extract::{
    ExtractError, GrowthCurveExtractor, TRANSITIONS_FILE, TransitionExtractor, YIELDS_FILE,
    extract_tables, with_input_db,
};

const SCHEMA: &str = "
    CREATE TABLE classifier (id INTEGER PRIMARY KEY, name TEXT);
    CREATE TABLE classifier_value (id INTEGER PRIMARY KEY, classifier_id INTEGER, value TEXT);
    CREATE TABLE species (id INTEGER PRIMARY KEY, name TEXT);
    CREATE TABLE growth_curve (id INTEGER PRIMARY KEY);
    CREATE TABLE growth_curve_classifier_value (growth_curve_id INTEGER, classifier_value_id INTEGER);
    CREATE TABLE growth_curve_component (id INTEGER PRIMARY KEY, growth_curve_id INTEGER, species_id INTEGER);
    CREATE TABLE growth_curve_component_value (
        growth_curve_component_id INTEGER, age INTEGER, merchantable_volume REAL);
    CREATE TABLE \"transition\" (id INTEGER PRIMARY KEY, regen_delay INTEGER, age INTEGER);
    CREATE TABLE transition_classifier_value (transition_id INTEGER, classifier_value_id INTEGER);

    INSERT INTO classifier VALUES (1, 'LdSpp'), (2, 'AU');
    INSERT INTO classifier_value VALUES (1, 1, 'BF'), (2, 1, 'SW'), (3, 2, '10'), (4, 2, '20');
    INSERT INTO species VALUES (1, 'Balsam fir');

    INSERT INTO growth_curve VALUES (1), (2), (3);
    INSERT INTO growth_curve_classifier_value VALUES (1, 1), (1, 3), (2, 2), (2, 4);
    -- Component 2 has no species row, component 3 has no classifiers or volumes.
    INSERT INTO growth_curve_component VALUES (1, 1, 1), (2, 2, 99), (3, 3, 1);
    INSERT INTO growth_curve_component_value VALUES
        (1, 0, 0.0), (1, 10, 12.5), (1, 20, 40.0),
        (2, 30, 55.0), (2, 0, 0.0);

    INSERT INTO \"transition\" VALUES (1, 0, 5), (2, 3, 0);
    INSERT INTO transition_classifier_value VALUES (1, 2);
";

fn create_db(path: &Path) {
    let connection = Connection::open(path).expect("create db");
    connection.execute_batch(SCHEMA).expect("create schema");
}

fn cell<'a>(frame: &'a DataFrame, column: &str, row: usize) -> Option<&'a str> {
    frame
        .column(column)
        .expect("column")
        .str()
        .expect("text column")
        .get(row)
}

fn column_names(frame: &DataFrame) -> Vec<String> {
    frame
        .get_column_names()
        .into_iter()
        .map(ToString::to_string)
        .collect()
}

#[test]
fn growth_curves_left_join_every_component() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = dir.path().join("gcbm_input.db");
    create_db(&db);

    let table = with_input_db(&db, GrowthCurveExtractor::extract).expect("extract");
    assert_eq!(column_names(&table), vec!["LdSpp", "AU", "species", "0", "10", "20", "30"]);
    assert_eq!(table.height(), 3);

    assert_eq!(cell(&table, "LdSpp", 0), Some("BF"));
    assert_eq!(cell(&table, "species", 0), Some("Balsam fir"));
    assert_eq!(cell(&table, "10", 0), Some("12.5"));
    assert_eq!(cell(&table, "30", 0), None);

    // No matching species row: the row survives with an empty species cell.
    assert_eq!(cell(&table, "LdSpp", 1), Some("SW"));
    assert_eq!(cell(&table, "species", 1), None);
    assert_eq!(cell(&table, "30", 1), Some("55"));

    assert_eq!(cell(&table, "LdSpp", 2), None);
    assert_eq!(cell(&table, "species", 2), Some("Balsam fir"));
    assert_eq!(cell(&table, "0", 2), None);
}

#[test]
fn transitions_keep_identity_columns() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = dir.path().join("gcbm_input.db");
    create_db(&db);

    let table = with_input_db(&db, TransitionExtractor::extract).expect("extract");
    assert_eq!(column_names(&table), vec!["id", "regen_delay", "age_after", "LdSpp"]);
    assert_eq!(table.height(), 2);
    assert_eq!(cell(&table, "age_after", 0), Some("5"));
    assert_eq!(cell(&table, "LdSpp", 0), Some("SW"));
    assert_eq!(cell(&table, "id", 1), Some("2"));
    assert_eq!(cell(&table, "LdSpp", 1), None);
}

#[test]
fn writes_both_tables_and_overwrites_previous_run() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = dir.path().join("gcbm_input.db");
    create_db(&db);
    let output = dir.path().join("out");
    fs::create_dir_all(&output).expect("output dir");
    fs::write(output.join(YIELDS_FILE), "old,content\n1,2\n").expect("stale yields");

    let summary = extract_tables(&db, &output).expect("extract tables");
    assert_eq!(summary.yield_rows, 3);
    assert_eq!(summary.transition_rows, 2);

    let yields = fs::read_to_string(output.join(YIELDS_FILE)).expect("read yields");
    let mut lines = yields.lines();
    assert_eq!(lines.next(), Some("LdSpp,AU,species,0,10,20,30"));
    assert_eq!(lines.next(), Some("BF,10,Balsam fir,0,12.5,40,"));
    assert_eq!(lines.next(), Some("SW,20,,0,,,55"));
    assert_eq!(lines.next(), Some(",,Balsam fir,,,,"));
    assert_eq!(lines.next(), None);

    let transitions = fs::read_to_string(output.join(TRANSITIONS_FILE)).expect("read transitions");
    assert_eq!(transitions, "id,regen_delay,age_after,LdSpp\n1,0,5,SW\n2,3,0,\n");
}

#[test]
fn malformed_schema_writes_nothing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = dir.path().join("empty.db");
    Connection::open(&db)
        .expect("create db")
        .execute_batch("CREATE TABLE unrelated (id INTEGER);")
        .expect("schema");
    let output = dir.path().join("out");

    let error = extract_tables(&db, &output).expect_err("must fail");
    assert!(matches!(error, ExtractError::Schema { .. }));
    assert!(!output.join(YIELDS_FILE).exists());
}

#[test]
fn missing_transition_table_leaves_previous_outputs() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = dir.path().join("gcbm_input.db");
    let growth_only = SCHEMA
        .split("CREATE TABLE \"transition\"")
        .next()
        .expect("schema prefix");
    let connection = Connection::open(&db).expect("create db");
    connection
        .execute_batch(&format!(
            "{growth_only}
            INSERT INTO classifier VALUES (1, 'LdSpp');
            INSERT INTO growth_curve_component VALUES (1, 1, 1);"
        ))
        .expect("growth curve schema");
    drop(connection);

    let output = dir.path().join("out");
    fs::create_dir_all(&output).expect("output dir");
    let previous = "LdSpp,species\nBF,Balsam fir\n";
    fs::write(output.join(YIELDS_FILE), previous).expect("previous yields");

    let error = extract_tables(&db, &output).expect_err("must fail");
    assert!(matches!(error, ExtractError::Schema { query: "transitions", .. }));
    assert_eq!(
        fs::read_to_string(output.join(YIELDS_FILE)).expect("read yields"),
        previous
    );
    assert!(!output.join(TRANSITIONS_FILE).exists());
    let leftovers: Vec<_> = fs::read_dir(&output)
        .expect("list output")
        .filter_map(Result::ok)
        .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "tmp"))
        .collect();
    assert!(leftovers.is_empty());
}
