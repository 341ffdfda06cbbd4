use crate::meta::RunMeta;

fn fixed_meta(tag: &str) -> RunMeta {
    RunMeta {
        time_string: "2026_08_23_12_00_00".to_owned(),
        command_line: "dispatcher --platform Local".to_owned(),
        commit_line: "git commit ID = deadbeef".to_owned(),
        status_line: "All changes have been committed".to_owned(),
        tag: tag.to_owned(),
    }
}

#[test]
fn run_ids_are_unique_per_counter() {
    let meta = fixed_meta("");
    assert_eq!(meta.run_id(0), "2026_08_23_12_00_00_xp000000");
    assert_eq!(meta.run_id(7), "2026_08_23_12_00_00_xp000007");
    assert_ne!(meta.run_id(1), meta.run_id(2));
}

#[test]
fn tag_is_appended_to_identifiers() {
    let meta = fixed_meta("sweepA");
    assert_eq!(meta.run_id(0), "2026_08_23_12_00_00_xp000000_sweepA");
    assert_eq!(meta.array_id(), "array_2026_08_23_12_00_00_sweepA");

    let untagged = fixed_meta("");
    assert_eq!(untagged.array_id(), "array_2026_08_23_12_00_00");
}

#[test]
fn collect_always_produces_usable_metadata() {
    let meta = RunMeta::collect("t".to_owned());
    // YYYY_MM_DD_HH_MM_SS
    assert_eq!(meta.time_string.len(), 19);
    assert!(!meta.command_line.is_empty());
    // git may be unavailable here; both lines degrade to placeholders
    assert!(!meta.commit_line.is_empty());
    assert!(!meta.status_line.is_empty());
}
