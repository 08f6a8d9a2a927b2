// Script suites loaded from tests/suites and run end to end.

mod common;

use common::{captured_runner, suite_path};
use tapsuite::config::SkipPolicy;
use tapsuite::script::{load_suite, parse_suite};
use tapsuite::{LogLevel, ScriptError};

#[test]
fn arithmetic_script_passes() {
    let suite = load_suite(&suite_path("arithmetic.yaml")).unwrap();
    assert_eq!(suite.name.as_deref(), Some("arithmetic"));
    assert_eq!(suite.test_names(), vec!["testLimit", "testItems", "testReady"]);

    let mut cap = captured_runner(LogLevel::Info);
    let results = cap.runner.run_suites(&[suite]);
    assert_eq!((results.total, results.passed, results.failed), (3, 3, 0), "{}", cap.tap.contents());
    assert!(cap.tap.lines().contains(&"ok 3 - testReady".to_string()));
}

#[test]
fn mixed_script_reports_pass_fail_and_skip() {
    let suite = load_suite(&suite_path("mixed.yaml")).unwrap();
    let mut cap = captured_runner(LogLevel::Info);
    let results = cap.runner.run_suites(&[suite]);

    assert_eq!((results.total, results.passed, results.failed, results.skipped), (3, 1, 2, 1));
    let tap = cap.tap.lines();
    assert_eq!(&tap[..5], &["TAP version 13", "# mixed", "1..3", "ok 1 - testPasses", "not ok 2 - testFails"]);
    assert_eq!(tap[5], "  ---");
    assert_eq!(tap[6], "  at assertion #2: assertEqual: (2) is not equal to (1)");
    assert_eq!(tap[7], "  at mixed.testFails[1] - test failed");
    assert!(tap.contains(&"ok 3 - testBusy # SKIP operation timed out (cluster did not answer)".to_string()));
}

#[test]
fn empty_skip_policy_turns_skips_into_failures() {
    let suite = load_suite(&suite_path("mixed.yaml")).unwrap();
    let cap = captured_runner(LogLevel::Info);
    let mut runner = cap.runner.with_skip_policy(SkipPolicy::none());
    let results = runner.run_suites(&[suite]);
    assert_eq!((results.passed, results.failed, results.skipped), (1, 2, 0));
    assert!(cap
        .tap
        .contents()
        .contains("  cluster did not answer - test failed"));
}

#[test]
fn json_script_with_suite_fixtures() {
    let suite = load_suite(&suite_path("lifecycle.json")).unwrap();
    let mut cap = captured_runner(LogLevel::Info);
    let results = cap.runner.run_suites(&[suite]);

    assert_eq!((results.total, results.passed, results.failed), (3, 2, 1));
    assert!(cap.tap.contents().contains("not ok 0 - lifecycle"));
    assert!(cap.tap.contents().contains("could not disconnect"));
    assert!(cap.tap.contents().contains("- tearDownAll failed"));
}

#[test]
fn unknown_step_is_a_shape_error() {
    let err = load_suite(&suite_path("broken.yaml")).unwrap_err();
    match err {
        ScriptError::Shape { context, message, help } => {
            assert_eq!(context, "broken.testA[0]");
            assert_eq!(message, "unknown step `assertEverything`");
            assert!(help.is_some());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn missing_file_is_an_io_error() {
    let err = load_suite(&suite_path("does-not-exist.yaml")).unwrap_err();
    assert!(matches!(err, ScriptError::Io { .. }));
}

#[test]
fn scripts_can_reuse_steps_across_tests() {
    let text = r#"
name: shared
scope:
  record: { id: 7, tags: [a, b] }
expectRecord:
  - assertEqual: [{ tags: [a, b], id: 7 }, { $scope: record }]
testOne:
  - call: expectRecord
testTwo:
  - call: expectRecord
  - assertNotIdentical: [{ id: 7, tags: [a, b] }, { $scope: record }]
"#;
    let suite = parse_suite("inline", text).unwrap();
    let mut cap = captured_runner(LogLevel::Info);
    let results = cap.runner.run_suites(&[suite]);
    assert_eq!((results.total, results.passed), (2, 2), "{}", cap.tap.contents());
}
