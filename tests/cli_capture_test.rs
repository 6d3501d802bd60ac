//! End-to-end tests for the `cap` binary.

mod common;

use common::TestEnv;
use predicates::prelude::*;

const DEFINITION: &str = r#"
config "app" {
    save "yml" "json" "xml" "properties"
    group "general" {
        prop "infra" {
            value "aws"
            options "local" "aws" "gcp" "az"
        }
        prop "envType" {
            options "afe_single" "aem_single"
            visible-when "infra" ne="local"
        }
        const "domain" "app.example.com"
    }
}
"#;

#[test]
fn test_capture_defaults_writes_all_outputs() {
    let env = TestEnv::with_definition(DEFINITION);

    env.cap()
        .args(["capture", "--defaults"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"status\": \"applied\""));

    assert!(env.exists(".capstan/app.captured.yml"));
    assert!(env.exists(".capstan/app.yml"));
    assert!(env.exists(".capstan/app.json"));
    assert!(env.exists(".capstan/app.xml"));
    assert!(env.exists(".capstan/app.properties"));

    let captured = env.read(".capstan/app.captured.yml");
    assert!(captured.contains("infra: aws"));
    assert!(captured.contains("domain: app.example.com"));
}

#[test]
fn test_show_before_capture_fails() {
    let env = TestEnv::with_definition(DEFINITION);

    env.cap()
        .arg("show")
        .assert()
        .failure()
        .stderr(predicate::str::contains("is not yet captured"));
}

#[test]
fn test_show_and_value_after_capture() {
    let env = TestEnv::with_definition(DEFINITION);
    env.cap().args(["capture", "--defaults"]).assert().success();

    env.cap()
        .arg("show")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"infra\": \"aws\""));

    env.cap()
        .args(["value", "domain"])
        .assert()
        .success()
        .stdout(predicate::str::contains("app.example.com"));
}

#[test]
fn test_value_of_unknown_prop_fails() {
    let env = TestEnv::with_definition(DEFINITION);
    env.cap().args(["capture", "--defaults"]).assert().success();

    env.cap()
        .args(["value", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Prop 'nope' is not defined"));
}

#[test]
fn test_validation_failure_is_fatal() {
    let env = TestEnv::with_definition(
        r#"
config "app" {
    group "general" {
        prop "apiUrl"
    }
}
"#,
    );

    env.cap()
        .args(["capture", "--defaults"])
        .assert()
        .failure()
        .stderr(
            predicate::str::contains("does not pass validation")
                .and(predicate::str::contains("apiUrl"))
                .and(predicate::str::contains("Should not be blank")),
        );

    // the integrity baseline must not be written with invalid data
    assert!(!env.exists(".capstan/app.captured.yml"));
}

#[test]
fn test_file_import_and_reseed() {
    let env = TestEnv::with_definition(DEFINITION);
    env.write("input.yml", "infra: gcp\nunknown: ignored\n");

    env.cap()
        .args(["capture", "--file", "input.yml"])
        .assert()
        .success();

    // next run seeds from the snapshot
    env.cap().args(["capture", "--defaults"]).assert().success();
    env.cap()
        .args(["value", "infra"])
        .assert()
        .success()
        .stdout(predicate::str::contains("gcp"));

    // --fresh ignores the snapshot and falls back to declared defaults
    env.cap()
        .args(["capture", "--defaults", "--fresh"])
        .assert()
        .success();
    env.cap()
        .args(["value", "infra"])
        .assert()
        .success()
        .stdout(predicate::str::contains("aws"));
}

#[test]
fn test_missing_import_file_fails() {
    let env = TestEnv::with_definition(DEFINITION);

    env.cap()
        .args(["capture", "--file", "absent.yml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_prompt_capture_scripted_through_stdin() {
    let env = TestEnv::with_definition(DEFINITION);

    // update-property -> infra -> gcp -> save
    env.cap()
        .args(["capture", "--prompt"])
        .write_stdin("2\n1\n3\n3\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"status\": \"applied\""));

    env.cap()
        .args(["value", "infra"])
        .assert()
        .success()
        .stdout(predicate::str::contains("gcp"));
}

#[test]
fn test_prompt_cancellation_is_soft_by_default() {
    let env = TestEnv::with_definition(DEFINITION);

    env.cap()
        .args(["capture", "--prompt"])
        .write_stdin("4\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"status\": \"cancelled\""));

    // nothing persisted on cancellation
    assert!(!env.exists(".capstan/app.captured.yml"));
}

#[test]
fn test_prompt_cancellation_strict_fails() {
    let env = TestEnv::with_definition(DEFINITION);

    env.cap()
        .args(["capture", "--prompt", "--strict"])
        .write_stdin("4\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("has been cancelled"));
}

#[test]
fn test_form_mode_unavailable_in_cli() {
    let env = TestEnv::with_definition(DEFINITION);

    env.cap()
        .args(["capture", "--form"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("form surface is not installed"));
}

#[test]
fn test_paths_command() {
    let env = TestEnv::with_definition(DEFINITION);

    env.cap()
        .arg("paths")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("app.captured.yml")
                .and(predicate::str::contains("app.properties")),
        );
}

#[test]
fn test_missing_definition_file_fails() {
    let env = TestEnv::new();

    env.cap()
        .args(["capture", "--defaults"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_duplicate_props_fail_finalization() {
    let env = TestEnv::with_definition(
        r#"
config "app" {
    group "a" {
        prop "env" { optional }
    }
    group "b" {
        prop "env" { optional }
    }
}
"#,
    );

    env.cap()
        .args(["capture", "--defaults"])
        .assert()
        .failure()
        .stderr(
            predicate::str::contains("has duplicated properties (2)")
                .and(predicate::str::contains("Property 'env' defined in group 'a'"))
                .and(predicate::str::contains("Property 'env' defined in group 'b'")),
        );
}

#[test]
fn test_human_output() {
    let env = TestEnv::with_definition(DEFINITION);
    env.cap().args(["capture", "--defaults"]).assert().success();

    env.cap()
        .args(["--human", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("infra: aws"));
}

#[test]
fn test_project_flag_targets_other_directory() {
    let env = TestEnv::with_definition(DEFINITION);
    let elsewhere = TestEnv::new();

    elsewhere
        .cap()
        .args(["--project", env.path().to_str().unwrap(), "capture", "--defaults"])
        .assert()
        .success();

    assert!(env.exists(".capstan/app.captured.yml"));
    assert!(!elsewhere.exists(".capstan/app.captured.yml"));
}
