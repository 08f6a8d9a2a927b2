//! # Reporting
//!
//! The runner announces every observable event on a [`ReportingBus`]. The bus owns two
//! output streams and a list of [`ResultsObserver`]s:
//!
//! - [`LogStream`]: human-oriented, leveled lines (`error < warn < info < debug`)
//! - [`TapStream`]: the TAP line protocol
//!
//! [`StandardResults`] is the built-in observer that renders both. [`EventRecorder`]
//! captures the raw event sequence for inspection.

use std::cell::RefCell;
use std::rc::Rc;

pub mod log;
pub mod sinks;
pub mod tap;

pub use log::{LogLevel, LogSink, LogStream};
pub use sinks::{BufferSink, NullSink};
pub use tap::{LineSink, TapStream};

/// Name reported for suites compiled without one.
pub const UNNAMED_SUITE: &str = "unnamed test suite";

/// Output streams handed to observers with each event.
#[derive(Debug, Default)]
pub struct Streams {
    pub log: LogStream,
    pub tap: TapStream,
}

/// Receives run events. Every method defaults to doing nothing.
#[allow(unused_variables)]
pub trait ResultsObserver {
    fn begin(&mut self, out: &mut Streams, total: usize, suite_name: Option<&str>) {}
    fn begin_set_up_all(&mut self, out: &mut Streams, suite_name: Option<&str>) {}
    fn end_set_up_all(&mut self, out: &mut Streams, suite_name: Option<&str>) {}
    fn begin_set_up(&mut self, out: &mut Streams, index: usize, name: &str) {}
    fn end_set_up(&mut self, out: &mut Streams, index: usize, name: &str) {}
    fn pass(&mut self, out: &mut Streams, index: usize, name: &str) {}
    fn fail(&mut self, out: &mut Streams, index: usize, name: &str, message: &str) {}
    fn skip(&mut self, out: &mut Streams, index: usize, name: &str, reason: &str) {}
    fn begin_teardown(&mut self, out: &mut Streams, index: usize, name: &str) {}
    fn end_teardown(&mut self, out: &mut Streams, index: usize, name: &str) {}
    fn begin_teardown_all(&mut self, out: &mut Streams, suite_name: Option<&str>) {}
    fn end_teardown_all(&mut self, out: &mut Streams, suite_name: Option<&str>) {}
    fn end(&mut self, out: &mut Streams, passed: usize, failed: usize, duration_ms: u64) {}
}

/// `1 test`, `2 tests`.
pub fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

// ============================================================================
// STANDARD RESULTS
// ============================================================================

/// Renders the TAP protocol and the human log lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardResults;

impl ResultsObserver for StandardResults {
    fn begin(&mut self, out: &mut Streams, total: usize, suite_name: Option<&str>) {
        let name = suite_name.unwrap_or(UNNAMED_SUITE);
        let timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
        out.log.info(&format!("{timestamp} Running {name}"));
        out.log.info(&format!("{} found", plural(total, "test")));
        out.tap.plan(total, name);
    }

    fn begin_set_up_all(&mut self, out: &mut Streams, suite_name: Option<&str>) {
        out.log.debug(&format!("setUpAll {}", suite_name.unwrap_or(UNNAMED_SUITE)));
    }

    fn begin_set_up(&mut self, out: &mut Streams, index: usize, name: &str) {
        out.log.debug(&format!("setUp #{index} {name}"));
    }

    fn pass(&mut self, out: &mut Streams, index: usize, name: &str) {
        out.tap.ok(index, name);
        out.log.info(&format!("[PASSED] {name}"));
    }

    fn fail(&mut self, out: &mut Streams, index: usize, name: &str, message: &str) {
        out.tap.not_ok(index, name, message);
        out.log.error(&format!("[FAILED] {name}: {message}"));
    }

    fn skip(&mut self, out: &mut Streams, index: usize, name: &str, reason: &str) {
        out.tap.skip(index, name, reason);
        out.log.warn(&format!("[SKIPPED] {name}: {reason}"));
    }

    fn begin_teardown(&mut self, out: &mut Streams, index: usize, name: &str) {
        out.log.debug(&format!("tearDown #{index} {name}"));
    }

    fn begin_teardown_all(&mut self, out: &mut Streams, suite_name: Option<&str>) {
        out.log.debug(&format!("tearDownAll {}", suite_name.unwrap_or(UNNAMED_SUITE)));
    }

    fn end(&mut self, out: &mut Streams, passed: usize, failed: usize, duration_ms: u64) {
        out.log.info(&format!("{} passed", plural(passed, "test")));
        out.log.info(&format!("{} failed", plural(failed, "test")));
        let elapsed = usize::try_from(duration_ms).unwrap_or(usize::MAX);
        out.log.info(&format!("{} elapsed", plural(elapsed, "millisecond")));
    }
}

// ============================================================================
// EVENT RECORDER
// ============================================================================

/// One bus event, as captured by [`EventRecorder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Begin { total: usize, suite_name: Option<String> },
    BeginSetUpAll { suite_name: Option<String> },
    EndSetUpAll { suite_name: Option<String> },
    BeginSetUp { index: usize, name: String },
    EndSetUp { index: usize, name: String },
    Pass { index: usize, name: String },
    Fail { index: usize, name: String, message: String },
    Skip { index: usize, name: String, reason: String },
    BeginTeardown { index: usize, name: String },
    EndTeardown { index: usize, name: String },
    BeginTeardownAll { suite_name: Option<String> },
    EndTeardownAll { suite_name: Option<String> },
    End { passed: usize, failed: usize },
}

/// Records every event it sees. Clones share the same event list.
#[derive(Debug, Clone, Default)]
pub struct EventRecorder {
    events: Rc<RefCell<Vec<Event>>>,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }

    fn push(&self, event: Event) {
        self.events.borrow_mut().push(event);
    }
}

impl ResultsObserver for EventRecorder {
    fn begin(&mut self, _out: &mut Streams, total: usize, suite_name: Option<&str>) {
        self.push(Event::Begin {
            total,
            suite_name: suite_name.map(str::to_string),
        });
    }

    fn begin_set_up_all(&mut self, _out: &mut Streams, suite_name: Option<&str>) {
        self.push(Event::BeginSetUpAll {
            suite_name: suite_name.map(str::to_string),
        });
    }

    fn end_set_up_all(&mut self, _out: &mut Streams, suite_name: Option<&str>) {
        self.push(Event::EndSetUpAll {
            suite_name: suite_name.map(str::to_string),
        });
    }

    fn begin_set_up(&mut self, _out: &mut Streams, index: usize, name: &str) {
        self.push(Event::BeginSetUp { index, name: name.to_string() });
    }

    fn end_set_up(&mut self, _out: &mut Streams, index: usize, name: &str) {
        self.push(Event::EndSetUp { index, name: name.to_string() });
    }

    fn pass(&mut self, _out: &mut Streams, index: usize, name: &str) {
        self.push(Event::Pass { index, name: name.to_string() });
    }

    fn fail(&mut self, _out: &mut Streams, index: usize, name: &str, message: &str) {
        self.push(Event::Fail {
            index,
            name: name.to_string(),
            message: message.to_string(),
        });
    }

    fn skip(&mut self, _out: &mut Streams, index: usize, name: &str, reason: &str) {
        self.push(Event::Skip {
            index,
            name: name.to_string(),
            reason: reason.to_string(),
        });
    }

    fn begin_teardown(&mut self, _out: &mut Streams, index: usize, name: &str) {
        self.push(Event::BeginTeardown { index, name: name.to_string() });
    }

    fn end_teardown(&mut self, _out: &mut Streams, index: usize, name: &str) {
        self.push(Event::EndTeardown { index, name: name.to_string() });
    }

    fn begin_teardown_all(&mut self, _out: &mut Streams, suite_name: Option<&str>) {
        self.push(Event::BeginTeardownAll {
            suite_name: suite_name.map(str::to_string),
        });
    }

    fn end_teardown_all(&mut self, _out: &mut Streams, suite_name: Option<&str>) {
        self.push(Event::EndTeardownAll {
            suite_name: suite_name.map(str::to_string),
        });
    }

    fn end(&mut self, _out: &mut Streams, passed: usize, failed: usize, _duration_ms: u64) {
        self.push(Event::End { passed, failed });
    }
}

// ============================================================================
// BUS
// ============================================================================

/// Fans run events out to every observer, in registration order.
pub struct ReportingBus {
    streams: Streams,
    observers: Vec<Box<dyn ResultsObserver>>,
}

impl ReportingBus {
    /// A bus with the [`StandardResults`] observer and discarding streams.
    pub fn new() -> Self {
        Self {
            streams: Streams::default(),
            observers: vec![Box::new(StandardResults)],
        }
    }

    /// A bus without observers.
    pub fn silent() -> Self {
        Self {
            streams: Streams::default(),
            observers: Vec::new(),
        }
    }

    pub fn with_log(mut self, level: LogLevel, sink: impl LogSink + 'static) -> Self {
        self.streams.log = LogStream::new(level, sink);
        self
    }

    pub fn with_tap(mut self, sink: impl LineSink + 'static) -> Self {
        self.streams.tap = TapStream::new(sink);
        self
    }

    pub fn add_observer(&mut self, observer: impl ResultsObserver + 'static) -> &mut Self {
        self.observers.push(Box::new(observer));
        self
    }

    pub fn log_mut(&mut self) -> &mut LogStream {
        &mut self.streams.log
    }

    pub fn tap_mut(&mut self) -> &mut TapStream {
        &mut self.streams.tap
    }

    fn dispatch(&mut self, mut event: impl FnMut(&mut dyn ResultsObserver, &mut Streams)) {
        let Self { streams, observers } = self;
        for observer in observers.iter_mut() {
            event(observer.as_mut(), &mut *streams);
        }
    }

    pub fn begin(&mut self, total: usize, suite_name: Option<&str>) {
        self.dispatch(|o, out| o.begin(out, total, suite_name));
    }

    pub fn begin_set_up_all(&mut self, suite_name: Option<&str>) {
        self.dispatch(|o, out| o.begin_set_up_all(out, suite_name));
    }

    pub fn end_set_up_all(&mut self, suite_name: Option<&str>) {
        self.dispatch(|o, out| o.end_set_up_all(out, suite_name));
    }

    pub fn begin_set_up(&mut self, index: usize, name: &str) {
        self.dispatch(|o, out| o.begin_set_up(out, index, name));
    }

    pub fn end_set_up(&mut self, index: usize, name: &str) {
        self.dispatch(|o, out| o.end_set_up(out, index, name));
    }

    pub fn pass(&mut self, index: usize, name: &str) {
        self.dispatch(|o, out| o.pass(out, index, name));
    }

    pub fn fail(&mut self, index: usize, name: &str, message: &str) {
        self.dispatch(|o, out| o.fail(out, index, name, message));
    }

    pub fn skip(&mut self, index: usize, name: &str, reason: &str) {
        self.dispatch(|o, out| o.skip(out, index, name, reason));
    }

    pub fn begin_teardown(&mut self, index: usize, name: &str) {
        self.dispatch(|o, out| o.begin_teardown(out, index, name));
    }

    pub fn end_teardown(&mut self, index: usize, name: &str) {
        self.dispatch(|o, out| o.end_teardown(out, index, name));
    }

    pub fn begin_teardown_all(&mut self, suite_name: Option<&str>) {
        self.dispatch(|o, out| o.begin_teardown_all(out, suite_name));
    }

    pub fn end_teardown_all(&mut self, suite_name: Option<&str>) {
        self.dispatch(|o, out| o.end_teardown_all(out, suite_name));
    }

    pub fn end(&mut self, passed: usize, failed: usize, duration_ms: u64) {
        self.dispatch(|o, out| o.end(out, passed, failed, duration_ms));
    }
}

impl Default for ReportingBus {
    fn default() -> Self {
        Self::new()
    }
}
