//! Command implementations and argument parsing for the treeline server.

use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    num::NonZeroUsize,
};

use clap::{Args, Parser, Subcommand, ValueEnum};
use thiserror::Error;
use tracing::{Span, field, info, instrument};

use crate::server::{Server, ServerError};

const DEFAULT_BIND: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);
const DEFAULT_PORT: u16 = 8094;
const DEFAULT_POOL_SIZE: NonZeroUsize =
    NonZeroUsize::new(4).expect("default pool size must be non-zero");

/// Top-level CLI options parsed by [`clap`].
#[derive(Debug, Parser, Clone)]
#[command(name = "treeline", about = "Serve interactive graph analysis sessions over TCP.")]
pub struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported CLI commands.
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Accept client connections and serve graph workflows.
    Serve(ServeCommand),
}

/// Options accepted by the `serve` command.
#[derive(Debug, Args, Clone)]
pub struct ServeCommand {
    /// Address to bind the listener on.
    #[arg(long, default_value_t = DEFAULT_BIND)]
    pub bind: IpAddr,

    /// TCP port to listen on; port 0 picks a free one.
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Serving architecture.
    #[arg(long, value_enum, default_value_t = Architecture::LeaderFollower)]
    pub architecture: Architecture,

    /// Worker threads for the leader-follower pool; ignored by the
    /// pipeline architecture, which always runs three stage threads.
    #[arg(long = "pool-size", default_value_t = DEFAULT_POOL_SIZE)]
    pub pool_size: NonZeroUsize,
}

/// Serving architectures selectable at startup.
#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum Architecture {
    /// One worker pool; each worker owns a client's whole workflow.
    LeaderFollower,
    /// Three shared stage threads; each workflow hops between them.
    Pipeline,
}

impl Architecture {
    /// Returns the label used on logging surfaces.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LeaderFollower => "leader-follower",
            Self::Pipeline => "pipeline",
        }
    }
}

/// Errors surfaced while executing CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// Server setup or serving failed.
    #[error(transparent)]
    Server(#[from] ServerError),
}

/// Executes the CLI command represented by `cli`.
///
/// The `serve` command blocks until its listener shuts down, which for the
/// binary means until the process is terminated.
///
/// # Errors
/// Returns [`CliError`] when the server cannot start or serving fails.
#[instrument(
    name = "cli.run",
    err,
    skip(cli),
    fields(command = field::Empty),
)]
pub fn run_cli(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::Serve(serve) => {
            Span::current().record("command", field::display("serve"));
            serve_command(serve)
        }
    }
}

#[instrument(
    name = "cli.serve",
    err,
    skip(command),
    fields(
        addr = field::Empty,
        architecture = %command.architecture.as_str(),
        pool_size = command.pool_size.get(),
    ),
)]
pub(crate) fn serve_command(command: ServeCommand) -> Result<(), CliError> {
    let server = Server::bind(SocketAddr::new(command.bind, command.port))?;
    Span::current().record("addr", field::display(server.local_addr()));
    info!(
        addr = %server.local_addr(),
        architecture = command.architecture.as_str(),
        "listening"
    );

    match command.architecture {
        Architecture::LeaderFollower => server.run_leader_follower(command.pool_size)?,
        Architecture::Pipeline => server.run_pipeline()?,
    }
    Ok(())
}
