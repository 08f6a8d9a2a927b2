// Lifecycle and results semantics of the test runner, observed through the bus.

mod common;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use common::captured_runner;
use tapsuite::report::Event;
use tapsuite::{
    CompileError, Descriptor, ErrorCategory, LogLevel, RunConfig, SuiteBuilder, TestError, Value,
};

fn fail_messages(events: &[Event]) -> Vec<(usize, String, String)> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::Fail { index, name, message } => Some((*index, name.clone(), message.clone())),
            _ => None,
        })
        .collect()
}

#[test]
fn second_assertion_failure_is_reported_by_ordinal() {
    let mut cap = captured_runner(LogLevel::Info);
    let mut suite = SuiteBuilder::named("ordinals");
    suite.define("testCounts", |ctx| {
        ctx.assert_equal(1, 1)?;
        ctx.assert_equal(1, 2)
    });
    let results = cap.runner.run_suite(suite.build()).unwrap();

    assert_eq!((results.total, results.passed, results.failed), (1, 0, 1));
    let fails = fail_messages(&cap.events.events());
    assert_eq!(fails.len(), 1);
    let (index, name, message) = &fails[0];
    assert_eq!((*index, name.as_str()), (1, "testCounts"));
    assert!(message.starts_with("at assertion #2: assertEqual: (2) is not equal to (1)"), "{message}");
    assert!(message.contains("runner_tests.rs"), "{message}");
    assert!(message.ends_with(" - test failed"), "{message}");
}

#[test]
fn skip_worthy_set_up_skips_without_tear_down() {
    let mut cap = captured_runner(LogLevel::Info);
    let torn_down = Rc::new(Cell::new(false));
    let flag = torn_down.clone();
    let mut suite = SuiteBuilder::named("flaky");
    suite
        .set_up(|_| Err(TestError::transient(ErrorCategory::LockTimeout, "could not lock")))
        .tear_down(move |_| {
            flag.set(true);
            Ok(())
        })
        .define("testNeedsLock", |ctx| ctx.fail("body must not run"));
    let results = cap.runner.run_suite(suite.build()).unwrap();

    assert!(!torn_down.get());
    assert_eq!((results.total, results.passed, results.failed, results.skipped), (1, 0, 1, 1));
    assert!(fail_messages(&cap.events.events()).is_empty());
    assert!(cap
        .tap
        .lines()
        .contains(&"ok 1 - testNeedsLock # SKIP resource lock contention (could not lock)".to_string()));
    assert!(cap
        .log
        .lines()
        .contains(&"warn: [SKIPPED] testNeedsLock: resource lock contention (could not lock)".to_string()));
}

#[test]
fn skip_worthy_tear_down_after_failed_body_skips() {
    let mut cap = captured_runner(LogLevel::Info);
    let mut suite = SuiteBuilder::named("locked");
    suite
        .define("testBroken", |ctx| ctx.assert_equal(1, 2))
        .tear_down(|_| Err(TestError::transient(ErrorCategory::LockTimeout, "lock")));
    let results = cap.runner.run_suite(suite.build()).unwrap();

    assert_eq!((results.total, results.passed, results.failed, results.skipped), (1, 0, 1, 1));
    assert!(fail_messages(&cap.events.events()).is_empty());
    assert_eq!(
        cap.tap.lines()[3..],
        ["ok 1 - testBroken # SKIP resource lock contention (lock)".to_string()]
    );
}

#[test]
fn failing_set_up_skips_body_but_still_tears_down() {
    let mut cap = captured_runner(LogLevel::Info);
    let calls = Rc::new(RefCell::new(Vec::new()));
    let (body_calls, teardown_calls) = (calls.clone(), calls.clone());
    let mut suite = SuiteBuilder::new();
    suite
        .set_up(|ctx| ctx.fail("no fixture data"))
        .define("testBody", move |_| {
            body_calls.borrow_mut().push("body");
            Ok(())
        })
        .tear_down(move |_| {
            teardown_calls.borrow_mut().push("tearDown");
            Ok(())
        });
    let results = cap.runner.run_suite(suite.build()).unwrap();

    assert_eq!(*calls.borrow(), vec!["tearDown"]);
    assert_eq!(results.failed, 1);
    let fails = fail_messages(&cap.events.events());
    assert!(fails[0].2.starts_with("no fixture data"));
    assert!(fails[0].2.ends_with(" - setUp failed"));
}

#[test]
fn set_up_all_failure_runs_no_tests() {
    let mut cap = captured_runner(LogLevel::Info);
    let ran = Rc::new(Cell::new(0));
    let (a, b) = (ran.clone(), ran.clone());
    let mut suite = SuiteBuilder::named("database");
    suite
        .set_up_all(|_| Err("server unavailable".into()))
        .define("testOne", move |_| {
            a.set(a.get() + 1);
            Ok(())
        })
        .define("testTwo", move |_| {
            b.set(b.get() + 1);
            Ok(())
        });
    let results = cap.runner.run_suite(suite.build()).unwrap();

    assert_eq!(ran.get(), 0);
    assert_eq!((results.total, results.passed, results.failed), (2, 0, 2));
    assert_eq!(
        fail_messages(&cap.events.events()),
        vec![(0, "database".to_string(), "server unavailable - setUpAll failed".to_string())]
    );
    assert_eq!(
        cap.tap.lines(),
        vec![
            "TAP version 13",
            "# database",
            "1..2",
            "not ok 0 - database",
            "  ---",
            "  server unavailable - setUpAll failed",
            "  ...",
        ]
    );
    assert!(!cap
        .events
        .events()
        .iter()
        .any(|e| matches!(e, Event::BeginSetUp { .. } | Event::Pass { .. })));
}

#[test]
fn tear_down_all_failure_counts_as_an_extra_test() {
    let mut cap = captured_runner(LogLevel::Info);
    let mut suite = SuiteBuilder::named("cleanup");
    suite
        .define("testFine", |ctx| ctx.assert_true(true))
        .tear_down_all(|_| Err("could not drop collection".into()));
    let results = cap.runner.run_suite(suite.build()).unwrap();

    assert_eq!((results.total, results.passed, results.failed), (2, 1, 1));
    let fails = fail_messages(&cap.events.events());
    assert_eq!(fails[0].2, "could not drop collection - tearDownAll failed");
}

#[test]
fn invalid_descriptor_aborts_before_any_event() {
    let mut cap = captured_runner(LogLevel::Info);
    let mut good = SuiteBuilder::named("good");
    good.define("testA", |_| Ok(()));
    let err = cap
        .runner
        .run([Descriptor::from(good.build()), Descriptor::from(Value::from(7))])
        .unwrap_err();

    assert!(matches!(err, CompileError::UnsupportedDescriptor { found: "number" }));
    assert!(cap.events.is_empty());
    assert!(cap.tap.lines().is_empty());
    assert_eq!(
        cap.log.lines(),
        vec!["error: Invalid test suite: argument must be a function, array, object, string or suite, got number"]
    );
}

#[test]
fn suites_run_in_order_and_aggregate() {
    let mut cap = captured_runner(LogLevel::Info);
    let mut first = SuiteBuilder::named("first");
    first
        .define("testBad", |ctx| ctx.assert_null(1))
        .define("testGood", |_| Ok(()));
    let mut second = SuiteBuilder::named("second");
    second.define("testAlsoGood", |ctx| ctx.assert_undefined(Value::Undefined));

    let results = cap.runner.run([first.build(), second.build()]).unwrap();
    assert_eq!(results.suite_name, "first,second");
    assert_eq!((results.total, results.passed, results.failed), (3, 2, 1));
    assert_eq!(results.failed, results.total - results.passed);

    let begins: Vec<_> = cap
        .events
        .events()
        .into_iter()
        .filter_map(|e| match e {
            Event::Begin { total, suite_name } => Some((total, suite_name)),
            _ => None,
        })
        .collect();
    assert_eq!(begins, vec![(2, Some("first".to_string())), (1, Some("second".to_string()))]);
    assert!(matches!(cap.events.events().last(), Some(Event::End { passed: 2, failed: 1 })));
    let log = cap.log.lines();
    assert!(log.contains(&"info: 2 tests passed".to_string()));
    assert!(log.contains(&"info: 1 test failed".to_string()));
}

#[test]
fn scope_is_shared_and_counter_resets_per_test() {
    let mut cap = captured_runner(LogLevel::Info);
    let counts = Rc::new(RefCell::new(Vec::new()));
    let (c1, c2) = (counts.clone(), counts.clone());
    let mut suite = SuiteBuilder::new();
    suite
        .set_up(|ctx| {
            let seen = ctx.scope().get("runs").map_or(0.0, |v| v.to_number());
            ctx.scope().set("runs", Value::from(seen + 1.0));
            Ok(())
        })
        .define("testFirst", move |ctx| {
            let runs = ctx.scope().get("runs").unwrap_or_default();
            ctx.assert_equal(1, runs)?;
            ctx.assert_true(true)?;
            c1.borrow_mut().push(ctx.assertion_count());
            Ok(())
        })
        .define("testSecond", move |ctx| {
            let runs = ctx.scope().get("runs").unwrap_or_default();
            ctx.assert_equal(2, runs)?;
            c2.borrow_mut().push(ctx.assertion_count());
            Ok(())
        });
    let results = cap.runner.run_suite(suite.build()).unwrap();
    assert_eq!(results.passed, 2);
    assert_eq!(*counts.borrow(), vec![2, 1]);
}

#[test]
fn test_bodies_receive_their_name() {
    let mut cap = captured_runner(LogLevel::Info);
    let body = tapsuite::Callable::new("testNamed", |ctx, args| {
        ctx.assert_equal("testNamed", args.first().cloned().unwrap_or_default())?;
        Ok(Value::Undefined)
    });
    let results = cap.runner.run_suite(Descriptor::list([body])).unwrap();
    assert_eq!(results.passed, 1);
}

#[test]
fn debug_level_logs_state_transitions() {
    let mut cap = captured_runner(LogLevel::Info);
    let mut config = RunConfig::default();
    config.log_level = LogLevel::Debug;
    let mut runner = cap.runner.with_config(&config);
    let mut suite = SuiteBuilder::new();
    suite.define("testQuiet", |_| Ok(()));
    runner.run_suite(suite.build()).unwrap();

    let log = cap.log.contents();
    assert!(log.contains("debug: testQuiet: Init -> SetUpPending"), "{log}");
    assert!(log.contains("debug: testQuiet: TearDownDone -> Passed"), "{log}");
    cap.log.clear();
    assert!(cap.log.lines().is_empty());
}

#[test]
fn unnamed_suites_are_labelled() {
    let mut cap = captured_runner(LogLevel::Info);
    let mut suite = SuiteBuilder::new();
    suite.define("testA", |_| Ok(()));
    let results = cap.runner.run_suite(suite.build()).unwrap();
    assert_eq!(results.suite_name, "");
    assert_eq!(cap.tap.lines()[1], "# unnamed test suite");
    assert!(cap.log.lines()[0].ends_with("Running unnamed test suite"));
}
