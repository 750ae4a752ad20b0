//! Desk CLI binary entrypoint.

use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use desk_cli::cli::{Cli, Commands, LogFormat};
use desk_cli::commands::{ListCommand, TailCommand};
use desk_cli::output::OutputFormat;
use desk_cli::{ApiClient, CliError, ConsoleConfig, WsLogStream};

/// Exit code for an expired or rejected session.
const EXIT_AUTH: u8 = 2;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("desk=info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);
    match cli.log_format {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Text => subscriber.init(),
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_auth() => {
            eprintln!("Error: {e}");
            ExitCode::from(EXIT_AUTH)
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = ConsoleConfig::resolve(&cli)?;
    let format = OutputFormat::new(cli.format);
    let mut stdout = io::stdout().lock();

    match cli.command {
        Commands::List(args) => {
            let client = ApiClient::new(config.server_url()?, config.token.clone(), config.request_timeout())?;
            let cmd = ListCommand::new(
                client.resource(args.resource.clone()),
                config.collection_config(),
                config.request_timeout(),
            );
            cmd.execute(&mut stdout, &format, &args).await?;
        }
        Commands::Tail { stream } => {
            let service = WsLogStream::new(config.websocket_url()?, config.token.clone());
            let cmd = TailCommand::new(service, config.tail_config());
            let shutdown = async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::warn!(error = %e, "failed to listen for ctrl-c");
                    std::future::pending::<()>().await;
                }
            };
            cmd.execute(&mut stdout, &format, &stream, shutdown).await?;
        }
    }

    Ok(())
}
