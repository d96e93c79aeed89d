use std::fs;
use std::path::Path;

use w2w_model::{ModelError, PreparedProject, ProjectLayout};

fn write_project(root: &Path, start: &str, end: &str) {
    let config_dir = ProjectLayout::gcbm_project(root);
    fs::create_dir_all(&config_dir).expect("create config dir");
    fs::write(
        config_dir.join("localdomain.json"),
        format!(r#"{{"LocalDomain": {{"start_date": "{start}", "end_date": "{end}"}}}}"#),
    )
    .expect("write localdomain");
    fs::create_dir_all(ProjectLayout::tiled_layers(root)).expect("create tiled layers");
    fs::create_dir_all(ProjectLayout::input_database_dir(root)).expect("create db dir");
    fs::write(ProjectLayout::input_db(root), b"db").expect("write db");
}

#[test]
fn reads_simulation_window_with_exclusive_end() {
    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path().join("north");
    write_project(&root, "2010/01/01", "2021/01/01");

    let project = PreparedProject::open(&root).expect("open project");
    assert_eq!(project.name(), "north");
    assert_eq!(project.start_year(), 2010);
    assert_eq!(project.end_year(), 2020);
    assert!(!project.has_rollback());
    assert_eq!(project.authoritative_db_path(), ProjectLayout::input_db(&root));
    assert_eq!(project.rollback_layer_path(), None);
}

#[test]
fn skips_json_without_local_domain() {
    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path().join("south");
    write_project(&root, "1995/01/01", "2016/01/01");
    fs::write(
        ProjectLayout::gcbm_project(&root).join("a_modules.json"),
        r#"{"Modules": {}}"#,
    )
    .expect("write modules");

    let project = PreparedProject::open(&root).expect("open project");
    assert_eq!(project.start_year(), 1995);
    assert_eq!(project.end_year(), 2015);
}

#[test]
fn prefers_rollback_outputs_when_present() {
    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path().join("east");
    write_project(&root, "2000/01/01", "2011/01/01");
    fs::create_dir_all(ProjectLayout::rollback_layers(&root)).expect("rollback layers");
    fs::write(ProjectLayout::rollback_db(&root), b"rollback").expect("rollback db");

    let project = PreparedProject::open(&root).expect("open project");
    assert!(project.has_rollback());
    assert_eq!(project.authoritative_db_path(), ProjectLayout::rollback_db(&root));

    let working = dir.path().join("work");
    let inventory = project.prepare_merge(&working, 3).expect("prepare merge");
    assert_eq!(inventory.index, 3);
    assert_eq!(inventory.layer_path, ProjectLayout::rollback_layers(&root));
    assert_eq!(inventory.db_path, ProjectLayout::rollback_db(&root));
    assert!(inventory.working_path.is_dir());
    assert_eq!(inventory.start_year, 2000);
    assert_eq!(inventory.end_year, 2010);
}

#[test]
fn missing_window_is_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path().join("west");
    fs::create_dir_all(ProjectLayout::gcbm_project(&root)).expect("create config dir");

    let error = PreparedProject::open(&root).expect_err("no window");
    assert!(matches!(error, ModelError::MissingSimulationWindow { .. }));
}

#[test]
fn missing_project_is_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let error = PreparedProject::open(dir.path().join("nowhere")).expect_err("missing");
    assert!(matches!(error, ModelError::ProjectNotFound { .. }));
}
