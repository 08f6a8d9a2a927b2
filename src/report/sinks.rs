//! In-process sinks shared by the log and line streams.

use std::cell::RefCell;
use std::rc::Rc;

use crate::report::log::{LogLevel, LogSink};
use crate::report::tap::LineSink;

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl LogSink for NullSink {
    fn log(&mut self, _level: LogLevel, _message: &str) {}
}

impl LineSink for NullSink {
    fn line(&mut self, _text: &str) {}
}

/// Collects lines for later inspection. Clones share the same buffer, so a test can
/// keep one handle while the bus owns another.
#[derive(Debug, Clone, Default)]
pub struct BufferSink {
    lines: Rc<RefCell<Vec<String>>>,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }

    /// All captured lines joined with newlines.
    pub fn contents(&self) -> String {
        self.lines.borrow().join("\n")
    }

    pub fn clear(&self) {
        self.lines.borrow_mut().clear();
    }
}

impl LogSink for BufferSink {
    fn log(&mut self, level: LogLevel, message: &str) {
        self.lines.borrow_mut().push(format!("{level}: {message}"));
    }
}

impl LineSink for BufferSink {
    fn line(&mut self, text: &str) {
        self.lines.borrow_mut().push(text.to_string());
    }
}
