//! Handles all user-facing output for the CLI.
//!
//! The TAP protocol goes to stdout, log lines go to stderr (colored by level when
//! enabled), and the JSON results document goes to stdout in place of TAP.

use std::io::Write;

use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::assertions::Catalog;
use crate::report::{LineSink, LogLevel, LogSink};
use crate::runner::TestResults;

// ============================================================================
// OUTPUT SINKS
// ============================================================================

/// StdoutLines: writes protocol lines to stdout.
pub struct StdoutLines;

impl LineSink for StdoutLines {
    fn line(&mut self, text: &str) {
        println!("{}", text);
    }
}

/// StderrLog: writes log lines to stderr, colored by level.
pub struct StderrLog {
    stream: StandardStream,
}

impl StderrLog {
    pub fn new(color: bool) -> Self {
        let choice = if color { ColorChoice::Auto } else { ColorChoice::Never };
        Self {
            stream: StandardStream::stderr(choice),
        }
    }
}

impl LogSink for StderrLog {
    fn log(&mut self, level: LogLevel, message: &str) {
        let mut spec = ColorSpec::new();
        match level {
            LogLevel::Error => spec.set_fg(Some(Color::Red)).set_bold(true),
            LogLevel::Warn => spec.set_fg(Some(Color::Yellow)),
            LogLevel::Info => &mut spec,
            LogLevel::Debug => spec.set_fg(Some(Color::Blue)).set_dimmed(true),
        };
        let _ = self.stream.set_color(&spec);
        let _ = writeln!(self.stream, "{}", message);
        let _ = self.stream.reset();
    }
}

// ============================================================================
// CORE OUTPUT FUNCTIONS
// ============================================================================

/// Prints the aggregate results as a JSON document.
pub fn print_results_json(results: &TestResults) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(results)?);
    Ok(())
}

/// Lists the catalog, one assertion per line.
pub fn print_assertions(catalog: &Catalog) {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)).set_bold(true));
    let _ = writeln!(stdout, "{} assertions", catalog.len());
    let _ = stdout.reset();
    for name in catalog.names() {
        let _ = writeln!(stdout, "  {}", name);
    }
}
