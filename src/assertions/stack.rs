use std::backtrace::Backtrace;
use std::fmt;
use std::panic::Location;
use std::rc::Rc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Frames belonging to the runtime, the standard library, or this crate.
static INTERNAL_FRAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(tapsuite::|std::|core::|alloc::|backtrace::|rust_begin_unwind|__rust|/rustc/|<unknown>|lang_start|catch_unwind)",
    )
    .expect("internal frame pattern is valid")
});

static FRAME_START: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\d+:\s+(.*)$").expect("frame pattern is valid"));

/// Where the assertion being evaluated was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallSite {
    /// A Rust call site, recorded through `#[track_caller]`.
    Source(&'static Location<'static>),
    /// A position inside a script suite, e.g. `mixed.testFails[1]`.
    Script(Rc<str>),
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallSite::Source(location) => {
                write!(f, "{}:{}:{}", location.file(), location.line(), location.column())
            }
            CallSite::Script(position) => f.write_str(position),
        }
    }
}

impl From<&'static Location<'static>> for CallSite {
    fn from(location: &'static Location<'static>) -> Self {
        CallSite::Source(location)
    }
}

impl From<&str> for CallSite {
    fn from(position: &str) -> Self {
        CallSite::Script(Rc::from(position))
    }
}

impl From<String> for CallSite {
    fn from(position: String) -> Self {
        CallSite::Script(Rc::from(position))
    }
}

/// How much call-stack context an assertion diagnostic carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct StackPolicy {
    /// Capture a full backtrace in addition to the assertion call site.
    pub backtrace: bool,
    /// Lines kept before the rest is elided. The last line is always kept.
    pub max_lines: usize,
}

impl Default for StackPolicy {
    fn default() -> Self {
        Self {
            backtrace: false,
            max_lines: 5,
        }
    }
}

/// Builds the stack snippet attached to a diagnostic.
pub fn capture(policy: &StackPolicy, call_site: Option<&CallSite>) -> String {
    let mut text = String::new();
    if let Some(site) = call_site {
        text.push_str(&format!("at {site}\n"));
    }
    if policy.backtrace {
        text.push_str(&flatten_backtrace(&Backtrace::force_capture().to_string()));
    }
    reduce_stack(&text, policy.max_lines)
}

/// Joins each backtrace frame with its `at file:line` line so a frame filters as a unit.
fn flatten_backtrace(raw: &str) -> String {
    let mut out = String::new();
    for line in raw.lines() {
        if let Some(caps) = FRAME_START.captures(line) {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(caps.get(1).map_or("", |m| m.as_str()).trim());
        } else if let Some(location) = line.trim().strip_prefix("at ") {
            out.push_str(" at ");
            out.push_str(location);
        }
    }
    out.push('\n');
    out
}

/// Filters a stack trace down to the frames worth showing.
///
/// Blank lines and internal frames are dropped. Once `max_lines` lines have been seen,
/// further lines are elided as `.` except the last one, and a line repeating its
/// predecessor collapses into `.` as well. Runs of markers are printed as one line.
pub fn reduce_stack(text: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter(|line| !INTERNAL_FRAME.is_match(line))
        .collect();

    let mut out = String::new();
    let mut markers = 0usize;
    let mut last: Option<&str> = None;
    for (index, line) in lines.iter().enumerate() {
        if index >= max_lines && index != lines.len() - 1 {
            markers += 1;
            continue;
        }
        if last == Some(*line) {
            markers += 1;
            continue;
        }
        flush_markers(&mut out, &mut markers);
        last = Some(line);
        out.push_str(line);
        out.push('\n');
    }
    flush_markers(&mut out, &mut markers);
    out
}

fn flush_markers(out: &mut String, markers: &mut usize) {
    if *markers > 0 {
        out.push_str(&".".repeat(*markers));
        out.push('\n');
        *markers = 0;
    }
}
