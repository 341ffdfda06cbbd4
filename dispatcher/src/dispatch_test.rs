use crate::config::{self, Overrides};
use crate::dispatch::{DispatchError, DispatchRequest, JobDispatcher};
use crate::meta::RunMeta;
use crate::platforms::PlatformKind;
use crate::workspace::parse_model_params;
use std::fs;
use std::path::Path;

fn fixed_meta() -> RunMeta {
    RunMeta {
        time_string: "2026_08_23_12_00_00".to_owned(),
        command_line: "dispatcher --platform Local --mock".to_owned(),
        commit_line: "git commit ID = deadbeef".to_owned(),
        status_line: "All changes have been committed".to_owned(),
        tag: String::new(),
    }
}

fn request(platform: PlatformKind, root: &Path, mock: bool) -> DispatchRequest {
    DispatchRequest {
        platform,
        custom: None,
        overrides: Overrides::default(),
        interactive: false,
        store_gdf: false,
        mock,
        root: root.to_path_buf(),
        source_dir: root.to_path_buf(),
    }
}

#[test]
fn local_grid_scenario_produces_four_ordered_runs() {
    let root = tempfile::tempdir().unwrap();
    let custom = root.path().join("custom.yaml");
    fs::write(&custom, "params:\n  a: [1, 2]\n  b: [10, 20]\n  c: fixed\n").unwrap();

    let mut req = request(PlatformKind::Local, root.path(), true);
    req.custom = Some(custom);
    JobDispatcher::new(req, fixed_meta()).dispatch().unwrap();

    let expected = [(1, 10), (1, 20), (2, 10), (2, 20)];
    for (counter, (a, b)) in expected.iter().enumerate() {
        let dir = root
            .path()
            .join(format!("2026_08_23_12_00_00_xp{counter:06}"));
        assert!(dir.is_dir(), "missing run directory {counter}");
        assert!(dir.join("log").is_dir());

        let contents = fs::read_to_string(dir.join("modelParams.py")).unwrap();
        let params = parse_model_params(&contents).unwrap();
        assert_eq!(config::int(&params, "a").unwrap(), *a);
        assert_eq!(config::int(&params, "b").unwrap(), *b);
        assert_eq!(config::text(&params, "c").unwrap(), "fixed");
        // base layer is still present and the CPU sentinel was resolved
        assert!(params.contains_key("GMSN"));
        assert!(config::int(&params, "nbcpu").unwrap() > 0);
    }

    // exactly four runs: no fifth directory
    assert!(!root
        .path()
        .join("2026_08_23_12_00_00_xp000004")
        .exists());
}

#[test]
fn mock_mode_never_executes_the_submission_command() {
    let root = tempfile::tempdir().unwrap();
    let custom = root.path().join("custom.yaml");
    // a test name crafted so the submission command would touch a marker
    fs::write(
        &custom,
        "params:\n  whichTest: \"x; touch ../marker; echo \"\n",
    )
    .unwrap();

    let mut req = request(PlatformKind::Local, root.path(), true);
    req.custom = Some(custom);
    JobDispatcher::new(req, fixed_meta()).dispatch().unwrap();

    assert!(root.path().join("2026_08_23_12_00_00_xp000000").is_dir());
    assert!(!root.path().join("marker").exists());
}

#[test]
fn submission_runs_and_its_failure_is_not_fatal() {
    let root = tempfile::tempdir().unwrap();
    let custom = root.path().join("custom.yaml");
    fs::write(
        &custom,
        "params:\n  whichTest: \"x; touch ../marker; echo \"\n",
    )
    .unwrap();

    let mut req = request(PlatformKind::Local, root.path(), false);
    req.custom = Some(custom);
    // `python x` fails inside the command; dispatch must still succeed
    JobDispatcher::new(req, fixed_meta()).dispatch().unwrap();

    assert!(root.path().join("marker").exists());
}

#[test]
fn array_dispatch_of_a_scalar_only_mapping_creates_one_leaf() {
    let root = tempfile::tempdir().unwrap();

    // the built-in defaults have no swept parameter
    let req = request(PlatformKind::SangoArray, root.path(), true);
    JobDispatcher::new(req, fixed_meta()).dispatch().unwrap();

    let master = root.path().join("array_2026_08_23_12_00_00");
    assert!(master.join("array_log").is_dir());
    assert!(master.join("baseModelParams.py").is_file());
    assert!(master.join("firestarter.sh").is_file());
    assert!(master
        .join("array_2026_08_23_12_00_00.slurm")
        .is_file());
    assert!(master.join("000/000/000").is_dir());
    assert!(!master.join("000/000/001").exists());

    // no per-leaf parameter file: parameters are recovered from position
    assert!(!master.join("000/000/000/modelParams.py").exists());
}

#[test]
fn missing_custom_file_aborts_before_any_directory_is_created() {
    let root = tempfile::tempdir().unwrap();

    let mut req = request(PlatformKind::Local, root.path(), true);
    req.custom = Some(root.path().join("nope.yaml"));
    let result = JobDispatcher::new(req, fixed_meta()).dispatch();

    assert!(matches!(result, Err(DispatchError::Config(_))));
    assert_eq!(fs::read_dir(root.path()).unwrap().count(), 0);
}

#[test]
fn tagged_dispatch_appends_the_tag_to_run_directories() {
    let root = tempfile::tempdir().unwrap();
    let mut meta = fixed_meta();
    meta.tag = "pilot".to_owned();

    let req = request(PlatformKind::Local, root.path(), true);
    JobDispatcher::new(req, meta).dispatch().unwrap();

    assert!(root
        .path()
        .join("2026_08_23_12_00_00_xp000000_pilot")
        .is_dir());
}
