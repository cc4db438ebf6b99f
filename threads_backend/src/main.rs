use anyhow::Result;
use clap::{Parser, Subcommand};
use threads_backend::bootstrap;
use threads_backend::cli::{self, CliCommand};
use threads_backend::config::ThreadsConfig;
use threads_backend::telemetry;
use threads_backend::utils;

#[derive(Parser)]
#[command(author, version, about = "Threads feed backend server and CLI")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (Axum) for REST/API access
    Serve,
    #[command(flatten)]
    Local(CliCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init_tracing();

    let args = Args::parse();

    let config = ThreadsConfig::from_env()?;
    let resources = bootstrap::initialize(&config)?;
    tracing::info!(
        app = utils::APP_NAME,
        started_at = %utils::now_utc_iso(),
        base = %config.paths.base.display(),
        "backend ready"
    );

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => cli::run_server(config, resources.database).await,
        Command::Local(command) => cli::run_command(&config, resources.database, command).await,
    }
}
