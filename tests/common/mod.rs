//! # Shared Test Fixtures
//!
//! A runner wired to capture everything it reports: the raw event sequence, the TAP
//! lines, and the log lines.

#![allow(dead_code)]

use std::path::PathBuf;

use tapsuite::report::{BufferSink, EventRecorder};
use tapsuite::{LogLevel, ReportingBus, TestRunner};

pub struct Captured {
    pub runner: TestRunner,
    pub events: EventRecorder,
    pub tap: BufferSink,
    pub log: BufferSink,
}

pub fn captured_runner(level: LogLevel) -> Captured {
    let events = EventRecorder::new();
    let tap = BufferSink::new();
    let log = BufferSink::new();
    let mut bus = ReportingBus::new()
        .with_tap(tap.clone())
        .with_log(level, log.clone());
    bus.add_observer(events.clone());
    Captured {
        runner: TestRunner::with_bus(bus),
        events,
        tap,
        log,
    }
}

pub fn suite_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("suites").join(name)
}
