use crate::config::{ParamMap, ParamValue, Scalar};
use crate::meta::RunMeta;
use crate::workspace::{
    create_workspace, parse_model_params, write_model_params, WorkspaceError,
};
use std::fs;

fn fixed_meta() -> RunMeta {
    RunMeta {
        time_string: "2026_08_23_12_00_00".to_owned(),
        command_line: "dispatcher --platform Local --mock".to_owned(),
        commit_line: "git commit ID = deadbeef".to_owned(),
        status_line: "All changes have been committed".to_owned(),
        tag: String::new(),
    }
}

fn sample_params() -> ParamMap {
    let mut params = ParamMap::new();
    params.insert("nbCh".to_owned(), Scalar::Int(1).into());
    params.insert("GMSN".to_owned(), Scalar::Float(4.37).into());
    params.insert("nbMSN".to_owned(), Scalar::Float(2644.).into());
    params.insert("whichTest".to_owned(), Scalar::Text("testPlausibility".to_owned()).into());
    params.insert("splitGPe".to_owned(), Scalar::Bool(false).into());
    params.insert("customSeed".to_owned(), Scalar::Null.into());
    params
}

#[test]
fn workspace_creation_is_idempotent() {
    let root = tempfile::tempdir().unwrap();
    let dir = root.path().join("2026_08_23_12_00_00_xp000000");

    create_workspace(&dir, root.path(), &[]).unwrap();
    create_workspace(&dir, root.path(), &[]).unwrap();

    assert!(dir.join("log").is_dir());
}

#[test]
fn existing_non_directory_path_is_fatal() {
    let root = tempfile::tempdir().unwrap();
    let dir = root.path().join("occupied");
    fs::write(&dir, "not a directory").unwrap();

    let result = create_workspace(&dir, root.path(), &[]);
    assert!(matches!(result, Err(WorkspaceError::CreateDir { .. })));
}

#[test]
fn static_files_are_copied_and_missing_ones_tolerated() {
    let root = tempfile::tempdir().unwrap();
    fs::write(root.path().join("LGneurons.py"), "# neurons\n").unwrap();

    let dir = root.path().join("run");
    let files = vec!["LGneurons.py".to_owned(), "not_there.py".to_owned()];
    create_workspace(&dir, root.path(), &files).unwrap();

    assert!(dir.join("LGneurons.py").is_file());
    assert!(!dir.join("not_there.py").exists());
}

#[test]
fn parameter_file_round_trips_every_scalar_kind() {
    let root = tempfile::tempdir().unwrap();
    let path = root.path().join("modelParams.py");
    let params = sample_params();

    write_model_params(
        &path,
        "2026_08_23_12_00_00_xp000000",
        "Local",
        &params,
        &fixed_meta(),
        false,
        true,
    )
    .unwrap();

    let contents = fs::read_to_string(&path).unwrap();
    let recovered = parse_model_params(&contents).unwrap();
    assert_eq!(recovered, params);
}

#[test]
fn parameter_file_carries_header_and_flags() {
    let root = tempfile::tempdir().unwrap();
    let path = root.path().join("modelParams.py");

    write_model_params(
        &path,
        "2026_08_23_12_00_00_xp000003",
        "Sango",
        &sample_params(),
        &fixed_meta(),
        true,
        false,
    )
    .unwrap();

    let contents = fs::read_to_string(&path).unwrap();
    assert!(contents.starts_with("#!/apps/free/python/2.7.10/bin/python\n"));
    assert!(contents.contains("# dispatcher --platform Local --mock\n"));
    assert!(contents.contains("# 2026_08_23_12_00_00_xp000003\n"));
    assert!(contents.contains("#  platform = Sango\n"));
    assert!(contents.contains("#  git commit ID = deadbeef\n"));
    assert!(contents.contains("#  All changes have been committed\n"));
    assert!(contents.contains("\n\ninteractive = True\n"));
    assert!(contents.contains("storeGDF = False\n"));
    // Python literals in the mapping block
    assert!(contents.contains("\"splitGPe\": False"));
    assert!(contents.contains("\"customSeed\": None"));
}

#[test]
fn files_without_a_parameter_block_are_rejected() {
    let result = parse_model_params("# just a comment\n");
    assert!(matches!(result, Err(WorkspaceError::MissingBlock)));
}
