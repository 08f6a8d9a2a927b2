//! The tapsuite Command-Line Interface.
//!
//! This module is the main entry point for all CLI commands and orchestrates
//! the core library functions.

use std::process::ExitCode;

use clap::Parser;

use crate::assertions::Catalog;
use crate::cli::args::{Command, RunArgs, TapsuiteArgs};
use crate::cli::output::{StderrLog, StdoutLines};
use crate::config::{OutputFormat, RunConfig};
use crate::report::ReportingBus;
use crate::runner::TestRunner;
use crate::script;

pub mod args;
pub mod output;

/// Exit status when configuration or a suite file cannot be used.
const EXIT_USAGE: u8 = 2;

/// The main entry point for the CLI.
pub fn run() -> ExitCode {
    let args = TapsuiteArgs::parse();

    match args.command {
        Command::Run(run_args) => handle_run(&run_args),
        Command::Assertions => {
            output::print_assertions(Catalog::standard());
            ExitCode::SUCCESS
        }
    }
}

/// Handles the `run` subcommand. Exits non-zero if any test failed.
fn handle_run(args: &RunArgs) -> ExitCode {
    let mut config = match &args.config {
        Some(path) => match RunConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("{:?}", miette::Report::new(e));
                return ExitCode::from(EXIT_USAGE);
            }
        },
        None => RunConfig::default(),
    };
    args.apply(&mut config);

    let mut suites = Vec::with_capacity(args.files.len());
    for path in &args.files {
        match script::load_suite(path) {
            Ok(suite) => suites.push(suite),
            Err(e) => {
                eprintln!("{:?}", miette::Report::new(e));
                return ExitCode::from(EXIT_USAGE);
            }
        }
    }

    let mut bus = ReportingBus::new().with_log(config.log_level, StderrLog::new(config.color));
    if config.format == OutputFormat::Tap {
        bus = bus.with_tap(StdoutLines);
    }
    let mut runner = TestRunner::with_bus(bus).with_config(&config);
    let results = runner.run_suites(&suites);

    if config.format == OutputFormat::Json {
        if let Err(e) = output::print_results_json(&results) {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    }

    if results.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
