use crate::identity::{run_identity_derive, DeriveArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use docforge::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "docforge",
    about = "Populate licence templates through a remote editing service and export them as PDF",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Work with applicant identifiers offline
    Identity {
        #[command(subcommand)]
        command: IdentityCommand,
    },
}

#[derive(Subcommand, Debug)]
enum IdentityCommand {
    /// Print the document fields that would be placed into the template
    Derive(DeriveArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Identity {
            command: IdentityCommand::Derive(args),
        } => run_identity_derive(args),
    }
}
