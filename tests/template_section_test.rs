//! Section-splice persistence: generated blocks inside shared files must
//! replace only their own prior output.

use capstan::capture::InputMode;
use capstan::model::Definition;
use std::path::Path;

fn build_definition(name: &str, dir: &Path, host: &str) -> Definition {
    let mut def = Definition::new(name);
    def.output_dir = dir.join(".capstan");
    def.input_mode = InputMode::Defaults;
    def.group("conn", |g| {
        g.prop("host", move |p| p.value(host));
    })
    .unwrap();
    def
}

#[test]
fn test_section_save_into_shared_file() {
    let dir = tempfile::tempdir().unwrap();
    let template = dir.path().join("db.tpl");
    let target = dir.path().join("build.properties");
    std::fs::write(&template, "dbHost={{ config.host }}").unwrap();
    std::fs::write(
        &target,
        "# hand-written settings\ncache.enabled=true\n",
    )
    .unwrap();

    let mut def = build_definition("db", dir.path(), "db1.internal");
    def.value_save_section(&template, &target);
    def.capture().unwrap();

    let text = std::fs::read_to_string(&target).unwrap();
    assert!(text.contains("cache.enabled=true"));
    assert!(text.contains("#name=db"));
    assert!(text.contains("dbHost=db1.internal"));
}

#[test]
fn test_section_save_is_idempotent_across_runs() {
    let dir = tempfile::tempdir().unwrap();
    let template = dir.path().join("db.tpl");
    let target = dir.path().join("build.properties");
    std::fs::write(&template, "dbHost={{ config.host }}").unwrap();
    std::fs::write(&target, "keep=me\n").unwrap();

    for _ in 0..3 {
        let mut def = build_definition("db", dir.path(), "db1.internal");
        def.value_save_section(&template, &target);
        def.capture().unwrap();
    }

    let text = std::fs::read_to_string(&target).unwrap();
    assert_eq!(text.matches("#name=db").count(), 1);
    assert_eq!(text.matches("dbHost=db1.internal").count(), 1);
    assert!(text.contains("keep=me"));
}

#[test]
fn test_section_replacement_leaves_other_sections_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let template = dir.path().join("section.tpl");
    let target = dir.path().join("build.properties");
    std::fs::write(&template, "host={{ config.host }}").unwrap();
    std::fs::write(&target, "top=1\n").unwrap();

    // two definitions share the target file with distinct sections
    let mut db = build_definition("db", dir.path(), "db1.internal");
    db.value_save_section(&template, &target);
    db.capture().unwrap();

    let mut cache = build_definition("cache", dir.path(), "cache1.internal");
    cache.value_save_section(&template, &target);
    cache.capture().unwrap();

    // re-run "db" with a changed value: only its section changes
    let mut db = build_definition("db", dir.path(), "db2.internal");
    db.fresh = true;
    db.value_save_section(&template, &target);
    db.capture().unwrap();

    let text = std::fs::read_to_string(&target).unwrap();
    assert!(text.contains("top=1"));
    assert!(text.contains("host=cache1.internal"));
    assert!(text.contains("host=db2.internal"));
    assert!(!text.contains("host=db1.internal"));
    assert_eq!(text.matches("#name=db\n").count(), 1);
}
