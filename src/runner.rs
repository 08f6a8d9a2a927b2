//! # Test Runner
//!
//! Drives compiled suites through the fixture lifecycle:
//!
//! ```text
//! setUpAll
//!   for each test:  setUp -> body -> tearDown -> Passed | Failed | Skipped
//! tearDownAll
//! ```
//!
//! Every stage runs at most once and every stage error is caught at the stage boundary.
//! A failing stage records a diagnostic and the remaining stages still run, except that a
//! test whose `setUp` failed never reaches its body. Errors whose code the
//! [`SkipPolicy`] names end the test as Skipped without recording a failure.

use std::fmt;
use std::time::Instant;

use serde::Serialize;

use crate::assertions::stack::StackPolicy;
use crate::config::{RunConfig, SkipPolicy};
use crate::context::TestContext;
use crate::errors::{CompileError, TestError};
use crate::report::{ReportingBus, UNNAMED_SUITE};
use crate::suite::{Compiler, Descriptor, Environment, FixtureKind, Suite, TestCase};
use crate::value::{Callable, Value};

/// Aggregate outcome of one [`TestRunner::run`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TestResults {
    /// Names of the suites run, joined with `,`.
    pub suite_name: String,
    pub total: usize,
    pub passed: usize,
    /// Always `total - passed`, so skipped tests count here too.
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
}

impl TestResults {
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// Where a single test case stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestState {
    Init,
    SetUpPending,
    SetUpDone,
    TestPending,
    TestDone,
    TearDownPending,
    TearDownDone,
    Passed,
    Failed,
    Skipped,
}

impl TestState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TestState::Passed | TestState::Failed | TestState::Skipped)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    SetUp,
    Test,
    TearDown,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::SetUp => "setUp",
            Stage::Test => "test",
            Stage::TearDown => "tearDown",
        })
    }
}

/// Per-test bookkeeping: the accumulated diagnostics and the skip reason, if any.
#[derive(Debug, Default)]
struct TestRun {
    messages: Vec<String>,
    skip_reason: Option<String>,
}

pub struct TestRunner {
    bus: ReportingBus,
    environment: Environment,
    stack: StackPolicy,
    skip: SkipPolicy,
}

impl TestRunner {
    /// A runner reporting through a default [`ReportingBus`], whose streams discard output.
    pub fn new() -> Self {
        Self::with_bus(ReportingBus::new())
    }

    pub fn with_bus(bus: ReportingBus) -> Self {
        Self {
            bus,
            environment: Environment::new(),
            stack: StackPolicy::default(),
            skip: SkipPolicy::default(),
        }
    }

    /// Applies the stack, skip and log-level settings of `config`.
    pub fn with_config(mut self, config: &RunConfig) -> Self {
        self.stack = config.stack.clone();
        self.skip = config.skip.clone();
        self.bus.log_mut().set_level(config.log_level);
        self
    }

    /// Names in list descriptors resolve against `environment`.
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_skip_policy(mut self, skip: SkipPolicy) -> Self {
        self.skip = skip;
        self
    }

    pub fn bus(&self) -> &ReportingBus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut ReportingBus {
        &mut self.bus
    }

    /// Compiles every descriptor, then runs the suites in order.
    ///
    /// Compilation happens up front: if any descriptor is malformed the error is logged
    /// and returned before a single event reaches the bus.
    pub fn run<I, D>(&mut self, descriptors: I) -> Result<TestResults, CompileError>
    where
        I: IntoIterator<Item = D>,
        D: Into<Descriptor>,
    {
        let compiler = Compiler::with_environment(&self.environment);
        let mut suites = Vec::new();
        for descriptor in descriptors {
            match compiler.compile(descriptor) {
                Ok(suite) => suites.push(suite),
                Err(err) => {
                    self.bus.log_mut().error(&format!("Invalid test suite: {err}"));
                    return Err(err);
                }
            }
        }
        Ok(self.run_suites(&suites))
    }

    pub fn run_suite(&mut self, descriptor: impl Into<Descriptor>) -> Result<TestResults, CompileError> {
        self.run(std::iter::once(descriptor.into()))
    }

    /// Runs already compiled suites one after another.
    pub fn run_suites(&mut self, suites: &[Suite]) -> TestResults {
        let start = Instant::now();
        let mut results = TestResults::default();
        let mut names = Vec::with_capacity(suites.len());

        for suite in suites {
            names.push(suite.name.clone().unwrap_or_default());
            self.run_one(suite, &mut results);
        }

        results.suite_name = names.join(",");
        results.failed = results.total - results.passed;
        results.duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.bus.end(results.passed, results.failed, results.duration_ms);
        results
    }

    fn run_one(&mut self, suite: &Suite, results: &mut TestResults) {
        let suite_name = suite.name.as_deref();
        let label = suite_name.unwrap_or(UNNAMED_SUITE);
        self.bus.begin(suite.len(), suite_name);
        results.total += suite.len();

        self.bus.begin_set_up_all(suite_name);
        match self.invoke_fixture(suite, FixtureKind::SetUpAll) {
            Ok(()) => {
                self.bus.end_set_up_all(suite_name);
                for (i, test) in suite.tests.iter().enumerate() {
                    self.run_test(suite, i + 1, test, results);
                }
            }
            Err(err) => {
                self.bus.fail(0, label, &format!("{} - setUpAll failed", err.report()));
            }
        }

        self.bus.begin_teardown_all(suite_name);
        match self.invoke_fixture(suite, FixtureKind::TearDownAll) {
            Ok(()) => self.bus.end_teardown_all(suite_name),
            Err(err) => {
                results.total += 1;
                self.bus.fail(0, label, &format!("{} - tearDownAll failed", err.report()));
            }
        }
    }

    fn invoke_fixture(&self, suite: &Suite, kind: FixtureKind) -> Result<(), TestError> {
        let Some(fixture) = suite.fixture(kind) else {
            return Ok(());
        };
        let name = suite.name.clone().unwrap_or_default();
        let mut ctx = TestContext::new(suite.scope.clone(), name.clone(), self.stack.clone());
        fixture.call_guarded(&mut ctx, &[Value::from(name)]).map(|_| ())
    }

    fn run_test(&mut self, suite: &Suite, index: usize, test: &TestCase, results: &mut TestResults) {
        let mut ctx = TestContext::new(suite.scope.clone(), test.name.clone(), self.stack.clone());
        let mut run = TestRun::default();
        let mut state = TestState::Init;

        while !state.is_terminal() {
            let next = match state {
                TestState::Init => TestState::SetUpPending,
                TestState::SetUpPending => {
                    self.bus.begin_set_up(index, &test.name);
                    let outcome = invoke(suite.fixture(FixtureKind::SetUp), &mut ctx, &test.name);
                    self.bus.end_set_up(index, &test.name);
                    match outcome {
                        Ok(()) => TestState::SetUpDone,
                        // never set up, so the body is not attempted; tearDown still is
                        Err(err) => self.record(&mut run, Stage::SetUp, err, TestState::TestDone),
                    }
                }
                TestState::SetUpDone => TestState::TestPending,
                TestState::TestPending => match invoke(Some(&test.body), &mut ctx, &test.name) {
                    Ok(()) => TestState::TestDone,
                    Err(err) => self.record(&mut run, Stage::Test, err, TestState::TestDone),
                },
                TestState::TestDone => TestState::TearDownPending,
                TestState::TearDownPending => {
                    self.bus.begin_teardown(index, &test.name);
                    let outcome = invoke(suite.fixture(FixtureKind::TearDown), &mut ctx, &test.name);
                    self.bus.end_teardown(index, &test.name);
                    match outcome {
                        Ok(()) => TestState::TearDownDone,
                        Err(err) => self.record(&mut run, Stage::TearDown, err, TestState::TearDownDone),
                    }
                }
                TestState::TearDownDone if run.messages.is_empty() => TestState::Passed,
                TestState::TearDownDone => TestState::Failed,
                terminal => terminal,
            };
            self.bus
                .log_mut()
                .debug(&format!("{}: {:?} -> {:?}", test.name, state, next));
            state = next;
        }

        match state {
            TestState::Passed => {
                results.passed += 1;
                self.bus.pass(index, &test.name);
            }
            TestState::Skipped => {
                results.skipped += 1;
                let reason = run.skip_reason.unwrap_or_default();
                self.bus.skip(index, &test.name, &reason);
            }
            _ => self.bus.fail(index, &test.name, &run.messages.join("\n")),
        }
    }

    /// Files a stage error: a skip-worthy error ends the test as Skipped in any stage,
    /// overriding diagnostics recorded earlier. Anything else is recorded and the run
    /// moves on to `next`.
    fn record(&self, run: &mut TestRun, stage: Stage, err: TestError, next: TestState) -> TestState {
        if self.skip.is_skip_worthy(&err) {
            run.skip_reason = Some(self.skip.reason(&err));
            return TestState::Skipped;
        }
        run.messages.push(format!("{} - {stage} failed", err.report()));
        next
    }
}

impl Default for TestRunner {
    fn default() -> Self {
        Self::new()
    }
}

fn invoke(callable: Option<&Callable>, ctx: &mut TestContext, test_name: &str) -> Result<(), TestError> {
    match callable {
        Some(callable) => callable.call_guarded(ctx, &[Value::from(test_name)]).map(|_| ()),
        None => Ok(()),
    }
}
