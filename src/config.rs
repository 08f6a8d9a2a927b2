//! Run configuration, loaded from YAML and overridden by command-line flags.
//!
//! ```yaml
//! log-level: debug
//! format: tap
//! color: false
//! stack:
//!   backtrace: true
//!   max-lines: 8
//! skip:
//!   codes: [1457, 18, 29]
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::assertions::stack::StackPolicy;
use crate::errors::{ConfigError, ErrorCategory, TestError};
use crate::report::LogLevel;

/// What the CLI prints on stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// The TAP line protocol.
    #[default]
    Tap,
    /// The aggregate results as one JSON document.
    Json,
}

/// Error codes that mark a test inconclusive instead of failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkipPolicy {
    pub codes: Vec<u32>,
}

impl Default for SkipPolicy {
    fn default() -> Self {
        Self {
            codes: vec![ErrorCategory::ClusterTimeout.code(), ErrorCategory::LockTimeout.code()],
        }
    }
}

impl SkipPolicy {
    /// A policy under which nothing is skip-worthy.
    pub fn none() -> Self {
        Self { codes: Vec::new() }
    }

    pub fn is_skip_worthy(&self, err: &TestError) -> bool {
        err.code().is_some_and(|code| self.codes.contains(&code))
    }

    /// Skip reason reported for `err`: the category description if known, else the message.
    pub fn reason(&self, err: &TestError) -> String {
        match err.category() {
            Some(category) => format!("{} ({})", category.description(), err.message()),
            None => err.message().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RunConfig {
    pub log_level: LogLevel,
    pub format: OutputFormat,
    pub stack: StackPolicy,
    pub skip: SkipPolicy,
    /// Colorize log output. Defaults to whether stderr is a terminal.
    pub color: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            format: OutputFormat::default(),
            stack: StackPolicy::default(),
            skip: SkipPolicy::default(),
            color: atty::is(atty::Stream::Stderr),
        }
    }
}

impl RunConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, serde_yaml::Error> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_default() {
        let config = RunConfig::from_yaml_str("").unwrap();
        assert_eq!(config.log_level, LogLevel::Info);
        assert_eq!(config.skip.codes, vec![1457, 18]);
        assert_eq!(config.stack.max_lines, 5);
    }

    #[test]
    fn partial_document_keeps_other_defaults() {
        let config = RunConfig::from_yaml_str("log-level: debug\nstack:\n  max-lines: 9\ncolor: false\n").unwrap();
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.stack.max_lines, 9);
        assert!(!config.stack.backtrace);
        assert_eq!(config.format, OutputFormat::Tap);
        assert!(!config.color);
    }

    #[test]
    fn unknown_level_is_rejected() {
        assert!(RunConfig::from_yaml_str("log-level: chatty").is_err());
    }

    #[test]
    fn skip_policy_matches_codes() {
        let policy = SkipPolicy::default();
        assert!(policy.is_skip_worthy(&TestError::with_code(1457, "slow")));
        assert!(!policy.is_skip_worthy(&TestError::with_code(1, "other")));
        assert!(!policy.is_skip_worthy(&TestError::raised("plain")));
        assert!(!SkipPolicy::none().is_skip_worthy(&TestError::with_code(18, "lock")));
        assert_eq!(
            policy.reason(&TestError::with_code(18, "lock held")),
            "resource lock contention (lock held)"
        );
    }
}
