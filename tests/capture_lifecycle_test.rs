//! Library-level tests of the capture lifecycle: seeding, round-trips,
//! filtering and persistence semantics.

use capstan::capture::{CaptureOutcome, InputMode};
use capstan::model::{Definition, Value};
use std::collections::BTreeMap;
use std::path::Path;

/// Build the reference definition used across runs; a fresh instance per
/// run, the way a build script would declare it on every invocation.
fn build_definition(output_dir: &Path) -> Definition {
    let mut def = Definition::new("app");
    def.output_dir = output_dir.to_path_buf();
    def.input_mode = InputMode::Defaults;
    def.group("general", |g| {
        g.describe("Infrastructure and environment type selection");
        g.prop("infra", |p| {
            p.value("aws");
            p.options(["local", "aws", "gcp", "az"]);
        });
        g.prop("envType", |p| {
            p.options(["afe_single", "aem_single", "aem_multi"]);
            p.visible_if(|d| {
                d.string_value_or_null("infra")
                    .ok()
                    .flatten()
                    .is_none_or(|v| v != "local")
            });
        });
        g.const_string_with("domain", |d| {
            let infra = d.string_value_or_null("infra").ok().flatten()?;
            Some(format!("app-{infra}.example.com"))
        });
    })
    .unwrap();
    def.group("credentials", |g| {
        g.prop("adminPassword", |p| p.value("admin"));
    })
    .unwrap();
    def
}

#[test]
fn test_defaults_capture_round_trip_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();

    let mut first = build_definition(dir.path());
    assert_eq!(first.capture().unwrap(), CaptureOutcome::Applied);
    let first_values = first.values();

    // a second run seeds from the captured snapshot and reproduces it
    let mut second = build_definition(dir.path());
    assert_eq!(second.capture().unwrap(), CaptureOutcome::Applied);
    assert_eq!(second.values(), first_values);
}

#[test]
fn test_snapshot_seeds_next_run_values() {
    let dir = tempfile::tempdir().unwrap();

    let mut first = build_definition(dir.path());
    first.finalize().unwrap();
    first.set_value("infra", Value::from("gcp")).unwrap();
    // defaults-only surface, so the mutated value is what gets captured
    first.input_mode = InputMode::Defaults;
    first.capture().unwrap();

    let mut second = build_definition(dir.path());
    second.capture().unwrap();
    assert_eq!(second.string_value("infra").unwrap(), "gcp");
    // the derived constant follows the seeded dependency
    assert_eq!(
        second.string_value("domain").unwrap(),
        "app-gcp.example.com"
    );
}

#[test]
fn test_fresh_run_ignores_snapshot() {
    let dir = tempfile::tempdir().unwrap();

    let mut first = build_definition(dir.path());
    first.finalize().unwrap();
    first.set_value("infra", Value::from("gcp")).unwrap();
    first.capture().unwrap();

    let mut second = build_definition(dir.path());
    second.fresh = true;
    second.capture().unwrap();
    assert_eq!(second.string_value("infra").unwrap(), "aws");
}

#[test]
fn test_filter_affects_saved_snapshot_only() {
    let dir = tempfile::tempdir().unwrap();

    let mut def = build_definition(dir.path());
    def.value_save_yml();
    def.value_save_visible();
    def.finalize().unwrap();
    def.set_value("infra", Value::from("local")).unwrap();
    def.capture().unwrap();

    // captured snapshot holds everything, including the now-hidden prop
    let captured: BTreeMap<String, Value> =
        serde_yaml::from_str(&std::fs::read_to_string(def.output_captured_file()).unwrap())
            .unwrap();
    assert!(captured.contains_key("envType"));

    // the saved snapshot only holds props passing the filter
    let saved: BTreeMap<String, Value> =
        serde_yaml::from_str(&std::fs::read_to_string(def.output_yml_file()).unwrap()).unwrap();
    assert!(!saved.contains_key("envType"));
    assert!(saved.contains_key("infra"));
}

#[test]
fn test_option_auto_correction_on_seed() {
    let dir = tempfile::tempdir().unwrap();

    // a previously captured value is no longer a valid option
    std::fs::create_dir_all(dir.path()).unwrap();
    std::fs::write(
        dir.path().join("app.captured.yml"),
        "infra: decommissioned\n",
    )
    .unwrap();

    let mut def = build_definition(dir.path());
    def.capture().unwrap();
    assert_eq!(def.string_value("infra").unwrap(), "local");
}

#[test]
fn test_validation_aborts_before_persistence() {
    let dir = tempfile::tempdir().unwrap();

    let mut def = build_definition(dir.path());
    def.finalize().unwrap();
    def.set_value("adminPassword", Value::Null).unwrap();

    let err = def.capture().unwrap_err();
    let message = err.to_string();
    assert!(message.contains("does not pass validation"));
    assert!(message.contains("adminPassword"));
    assert!(!def.output_captured_file().exists());
}

#[test]
fn test_saver_failure_does_not_abort_run() {
    let dir = tempfile::tempdir().unwrap();

    let mut def = build_definition(dir.path());
    def.value_save_yml();
    // a template saver pointing at a missing template must only warn
    def.value_save_template(dir.path().join("missing.tpl"), dir.path().join("out.txt"));

    assert_eq!(def.capture().unwrap(), CaptureOutcome::Applied);
    assert!(def.output_captured_file().exists());
    assert!(def.output_yml_file().exists());
    assert!(!dir.path().join("out.txt").exists());
}

#[test]
fn test_template_saver_renders_saved_values() {
    let dir = tempfile::tempdir().unwrap();
    let template = dir.path().join("conf.tpl");
    let target = dir.path().join("generated/conf.txt");
    std::fs::write(&template, "domain={{ config.domain }}\ninfra={{ config.infra }}\n").unwrap();

    let mut def = build_definition(dir.path());
    def.value_save_template(&template, &target);
    def.capture().unwrap();

    let rendered = std::fs::read_to_string(&target).unwrap();
    assert_eq!(rendered, "domain=app-aws.example.com\ninfra=aws\n");
}

#[test]
fn test_custom_saver_runs() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("marker.txt");

    let mut def = build_definition(dir.path());
    let marker_path = marker.clone();
    def.value_save_custom(move |d| {
        std::fs::write(&marker_path, d.name())?;
        Ok(())
    });
    def.capture().unwrap();

    assert_eq!(std::fs::read_to_string(&marker).unwrap(), "app");
}

#[test]
fn test_load_exposes_accessors_to_downstream_consumers() {
    let dir = tempfile::tempdir().unwrap();

    let mut first = build_definition(dir.path());
    first.capture().unwrap();

    // a downstream consumer only loads, never captures
    let mut consumer = build_definition(dir.path());
    consumer.require_captured().unwrap();
    consumer.load().unwrap();
    assert_eq!(consumer.string_value("infra").unwrap(), "aws");
    assert_eq!(consumer.string_value("adminPassword").unwrap(), "admin");

    // load is idempotent
    consumer.load().unwrap();
    assert_eq!(consumer.string_value("infra").unwrap(), "aws");
}

#[test]
fn test_require_captured_before_first_run() {
    let dir = tempfile::tempdir().unwrap();
    let def = build_definition(dir.path());
    assert!(def.require_captured().is_err());
}
