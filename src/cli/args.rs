//! Defines the command-line arguments and subcommands for the tapsuite CLI.
//!
//! This module uses the `clap` crate with its "derive" feature to create a
//! declarative and type-safe argument parsing structure.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{OutputFormat, RunConfig};
use crate::report::LogLevel;

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "tapsuite",
    version,
    about = "Compile declarative test suites and run them with TAP output."
)]
pub struct TapsuiteArgs {
    #[command(subcommand)]
    pub command: Command,
}

/// An enumeration of all available CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run script suites and report results.
    Run(RunArgs),
    /// List the assertions available to suites.
    Assertions,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Script suite files (YAML or JSON), run in the order given.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// YAML run configuration. Flags below override its values.
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Most verbose log level written to stderr.
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Output written to stdout.
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Attach full backtraces to assertion diagnostics.
    #[arg(long)]
    pub backtrace: bool,

    /// Stack lines kept in a diagnostic before the rest is elided.
    #[arg(long)]
    pub max_stack_lines: Option<usize>,

    /// Disable colored log output.
    #[arg(long)]
    pub no_color: bool,
}

impl RunArgs {
    /// Overrides `config` with every flag that was given.
    pub fn apply(&self, config: &mut RunConfig) {
        if let Some(level) = self.log_level {
            config.log_level = level;
        }
        if let Some(format) = self.format {
            config.format = format;
        }
        if self.backtrace {
            config.stack.backtrace = true;
        }
        if let Some(max) = self.max_stack_lines {
            config.stack.max_lines = max;
        }
        if self.no_color {
            config.color = false;
        }
    }
}
