//! Server entry point for treeline.
//!
//! Parses command-line arguments with clap, initialises structured logging,
//! and runs the serving loop until the process is terminated. Startup
//! failures are logged with their stable code and mapped to a failing exit
//! status.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, field};

use treeline_server::{
    cli::{Cli, CliError, run_cli},
    logging::{self, LoggingError},
};

fn try_main() -> Result<()> {
    let cli = Cli::parse();
    run_cli(cli).context("failed to execute command")?;
    Ok(())
}

fn main() -> ExitCode {
    if let Err(err) = logging::init_logging() {
        report_logging_init_error(&err);
        return ExitCode::FAILURE;
    }

    if let Err(err) = try_main() {
        let code = err
            .downcast_ref::<CliError>()
            .map(|CliError::Server(server)| server.code());
        let code_field = code.map(|code| field::display(code.as_str()));
        error!(error = %err, code = code_field, "command execution failed");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

#[expect(
    clippy::print_stderr,
    reason = "Emit one-off diagnostic before tracing is initialized"
)]
fn report_logging_init_error(err: &LoggingError) {
    eprintln!("failed to initialize logging: {err}");
}
