//! # pg-backup-auditor
//! Lists, inspects and validates PostgreSQL backups.
//!

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use std::{io, process};

use backup_auditor::{
    Config,
    cli::{Cli, ExitCode, run},
    output::Style,
};
use clap::{Parser, error::ErrorKind};
use mimalloc::MiMalloc;
use shared::init_logger;

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(error) => {
            let code = match error.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::Success,
                _ => ExitCode::InvalidArguments,
            };
            // Printing usage can only fail on a closed stream.
            let _ = error.print();
            process::exit(code.code());
        }
    };

    let config = match Config::load_or_default(cli.config.clone()) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("Error: Could not load config: {error}");
            process::exit(ExitCode::GeneralError.code());
        }
    };

    let color = config.output.color && !cli.no_color;

    let logger_guards = match init_logger(&config.logger_config(cli.verbose, color)) {
        Ok(guards) => guards,
        Err(error) => {
            eprintln!("Error: Could not initialize logging: {error}");
            process::exit(ExitCode::GeneralError.code());
        }
    };

    let mut stdout = io::stdout().lock();
    let code = match run(&cli, &config, Style::new(color), &mut stdout) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("Error: {error}");
            error.exit_code()
        }
    };

    drop(stdout);
    // `exit` skips destructors, flush the log writers first.
    drop(logger_guards);
    process::exit(code.code());
}
