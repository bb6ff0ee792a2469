//! Process-pool worker.
//!
//! Reads one JSON plugin task on stdin, runs it and writes the resulting
//! bundle as JSON on stdout. Logs go to stderr.

use std::io;
use std::process::ExitCode;
use term_judge::logging::setup::{init_logging, LoggingConfig};
use term_judge::plugins::BuilderRegistry;
use term_judge::runner::run_worker;

fn main() -> ExitCode {
    if let Err(e) = init_logging(LoggingConfig::worker()) {
        eprintln!("term-judge-worker: failed to initialize logging: {e}");
    }

    let registry = BuilderRegistry::with_defaults();
    match run_worker(&registry, io::stdin().lock(), io::stdout().lock()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("term-judge-worker: {e}");
            ExitCode::FAILURE
        }
    }
}
