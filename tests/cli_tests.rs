// CLI behavior: TAP on stdout, log on stderr, exit status from the results.
// Requires: assert_cmd, predicates crates in [dev-dependencies]

mod common;

use assert_cmd::Command;
use common::suite_path;
use predicates::{prelude::PredicateBooleanExt, str::contains};

fn tapsuite() -> Command {
    Command::cargo_bin("tapsuite").unwrap()
}

#[test]
fn passing_suite_exits_zero_with_tap() {
    tapsuite()
        .arg("run")
        .arg("--no-color")
        .arg(suite_path("arithmetic.yaml"))
        .assert()
        .success()
        .stdout(contains("TAP version 13").and(contains("1..3")).and(contains("ok 1 - testLimit")))
        .stderr(contains("Running arithmetic").and(contains("3 tests passed")));
}

#[test]
fn failing_suite_exits_non_zero() {
    tapsuite()
        .arg("run")
        .arg("--no-color")
        .arg(suite_path("arithmetic.yaml"))
        .arg(suite_path("mixed.yaml"))
        .assert()
        .code(1)
        .stdout(contains("# arithmetic").and(contains("# mixed")).and(contains("not ok 2 - testFails")))
        .stdout(contains("# SKIP"))
        .stderr(contains("[FAILED] testFails"));
}

#[test]
fn json_format_prints_results_document() {
    let output = tapsuite()
        .args(["run", "--format", "json", "--no-color"])
        .arg(suite_path("mixed.yaml"))
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let results: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(results["suite_name"], "mixed");
    assert_eq!(results["total"], 3);
    assert_eq!(results["passed"], 1);
    assert_eq!(results["failed"], 2);
    assert_eq!(results["skipped"], 1);
}

#[test]
fn config_file_sets_level_and_skip_codes() {
    let config = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/config/verbose.yaml");
    tapsuite()
        .arg("run")
        .arg("--config")
        .arg(config)
        .arg(suite_path("mixed.yaml"))
        .assert()
        .code(1)
        .stdout(contains("not ok 3 - testBusy"))
        .stderr(contains("testPasses: Init -> SetUpPending"));
}

#[test]
fn log_level_flag_overrides_config() {
    let config = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/config/verbose.yaml");
    tapsuite()
        .args(["run", "--log-level", "error"])
        .arg("--config")
        .arg(config)
        .arg(suite_path("arithmetic.yaml"))
        .assert()
        .success()
        .stderr(contains("Running").not());
}

#[test]
fn malformed_suite_is_reported_with_diagnostics() {
    tapsuite()
        .arg("run")
        .arg(suite_path("broken.yaml"))
        .assert()
        .code(2)
        .stderr(contains("tapsuite::script::shape").and(contains("unknown step")));
}

#[test]
fn assertions_subcommand_lists_catalog() {
    tapsuite()
        .arg("assertions")
        .assert()
        .success()
        .stdout(contains("20 assertions").and(contains("assertNotNaN")).and(contains("fail")));
}
