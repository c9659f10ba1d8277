//! Provides the main entry point to the program.
use dcsim::cli::run_cli;
use dcsim::error::exit_code;
use dcsim::log::is_logger_initialised;
use human_panic::setup_panic;
use std::process;

fn main() {
    setup_panic!();

    if let Err(err) = run_cli() {
        // Log the error if the logger is running, so that it also ends up in the log file
        if is_logger_initialised() {
            log::error!("{err:?}");
        } else {
            eprintln!("Error: {err:?}");
        }

        process::exit(exit_code(&err));
    }
}
