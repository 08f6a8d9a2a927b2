use std::fmt;

use crate::report::sinks::NullSink;

/// Destination of machine-readable protocol lines.
pub trait LineSink {
    fn line(&mut self, text: &str);
}

/// Writes the TAP line protocol.
///
/// Each suite opens with its own version header and plan. A failed test is followed by
/// a YAML-ish block holding the diagnostic, every line indented by two spaces.
pub struct TapStream {
    sink: Box<dyn LineSink>,
}

impl TapStream {
    pub fn new(sink: impl LineSink + 'static) -> Self {
        Self { sink: Box::new(sink) }
    }

    pub fn set_sink(&mut self, sink: impl LineSink + 'static) {
        self.sink = Box::new(sink);
    }

    pub fn line(&mut self, text: &str) {
        self.sink.line(text);
    }

    pub fn plan(&mut self, total: usize, suite_name: &str) {
        self.line("TAP version 13");
        self.line(&format!("# {suite_name}"));
        self.line(&format!("1..{total}"));
    }

    pub fn ok(&mut self, index: usize, name: &str) {
        self.line(&format!("ok {index} - {name}"));
    }

    pub fn not_ok(&mut self, index: usize, name: &str, message: &str) {
        self.line(&format!("not ok {index} - {name}"));
        self.line("  ---");
        for line in message.lines() {
            self.line(&format!("  {line}"));
        }
        self.line("  ...");
    }

    pub fn skip(&mut self, index: usize, name: &str, reason: &str) {
        self.line(&format!("ok {index} - {name} # SKIP {reason}"));
    }
}

impl Default for TapStream {
    fn default() -> Self {
        Self::new(NullSink)
    }
}

impl fmt::Debug for TapStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TapStream")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::sinks::BufferSink;

    #[test]
    fn failure_block_indents_every_message_line() {
        let buffer = BufferSink::new();
        let mut tap = TapStream::new(buffer.clone());
        tap.plan(2, "math");
        tap.ok(1, "testAdd");
        tap.not_ok(2, "testSub", "at assertion #1: assertEqual: (1) is not equal to (2)\nat tests/x.rs:3:9");
        assert_eq!(
            buffer.lines(),
            vec![
                "TAP version 13",
                "# math",
                "1..2",
                "ok 1 - testAdd",
                "not ok 2 - testSub",
                "  ---",
                "  at assertion #1: assertEqual: (1) is not equal to (2)",
                "  at tests/x.rs:3:9",
                "  ...",
            ]
        );
    }

    #[test]
    fn skip_directive() {
        let buffer = BufferSink::new();
        let mut tap = TapStream::new(buffer.clone());
        tap.skip(3, "testFlaky", "operation timed out");
        assert_eq!(buffer.contents(), "ok 3 - testFlaky # SKIP operation timed out");
    }
}
