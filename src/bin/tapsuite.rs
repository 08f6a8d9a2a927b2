// tapsuite command-line entry point
// Usage: tapsuite run [--config FILE] <FILES>...

use std::process::ExitCode;

fn main() -> ExitCode {
    tapsuite::cli::run()
}
