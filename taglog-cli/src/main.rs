//! taglog: command-line front end for taglog CSV logs
//!
//! Appends stdin rows to a CSV file, reusing the file when its header
//! matches and moving to a suffixed file when it does not.

mod cli;
mod commands;

use clap::Parser;
use cli::Cli;
use taglog_utils::{init_logging_with_config, LogConfig};

fn main() {
    // Diagnostics filter from TAGLOG_LOG, default warn
    if let Err(e) = init_logging_with_config(LogConfig::cli()) {
        eprintln!("taglog: {}", e);
    }

    let cli = Cli::parse();

    let exit_code = match commands::execute(cli.command) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("{}", e);
            1
        }
    };

    std::process::exit(exit_code);
}
