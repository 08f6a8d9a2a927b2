use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::report::sinks::NullSink;

/// Verbosity of a log line; a stream prints lines at or below its threshold.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            other => Err(format!("unknown log level '{other}'")),
        }
    }
}

/// Destination of human-oriented log lines.
pub trait LogSink {
    fn log(&mut self, level: LogLevel, message: &str);
}

/// A leveled log stream. Discards everything until a sink is attached.
pub struct LogStream {
    level: LogLevel,
    sink: Box<dyn LogSink>,
}

impl LogStream {
    pub fn new(level: LogLevel, sink: impl LogSink + 'static) -> Self {
        Self {
            level,
            sink: Box::new(sink),
        }
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn set_level(&mut self, level: LogLevel) {
        self.level = level;
    }

    pub fn set_sink(&mut self, sink: impl LogSink + 'static) {
        self.sink = Box::new(sink);
    }

    pub fn enabled(&self, level: LogLevel) -> bool {
        level <= self.level
    }

    pub fn log(&mut self, level: LogLevel, message: &str) {
        if self.enabled(level) {
            self.sink.log(level, message);
        }
    }

    pub fn error(&mut self, message: &str) {
        self.log(LogLevel::Error, message);
    }

    pub fn warn(&mut self, message: &str) {
        self.log(LogLevel::Warn, message);
    }

    pub fn info(&mut self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    pub fn debug(&mut self, message: &str) {
        self.log(LogLevel::Debug, message);
    }
}

impl Default for LogStream {
    fn default() -> Self {
        Self::new(LogLevel::default(), NullSink)
    }
}

impl fmt::Debug for LogStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogStream").field("level", &self.level).finish()
    }
}
