// ABOUTME: Entry point for op-agent: the host-side agent that runs the 1Password CLI for clients.
// ABOUTME: Parses CLI args, sets up tracing, and starts the server or pre-approves a command.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use op_agent::app::App;
use op_agent::approval::PolicyMode;
use op_agent::cli::{AgentCli, AgentCommand, strip_op};
use op_agent::version::VERSION;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = AgentCli::parse();

    if cli.version {
        println!("{VERSION}");
        return ExitCode::SUCCESS;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    let result = match cli.command {
        None => start(cli.mode.insecure, cli.mode.non_interactive).await,
        Some(AgentCommand::Start(mode)) => {
            start(
                cli.mode.insecure || mode.insecure,
                cli.mode.non_interactive || mode.non_interactive,
            )
            .await
        }
        Some(AgentCommand::Approve { command }) => {
            let Some(args) = strip_op(&command) else {
                eprintln!("Error: First argument must be 'op'");
                eprintln!("Usage: op-agent approve op [command...]");
                return ExitCode::FAILURE;
            };
            App::discover(PolicyMode::NonInteractive).and_then(|app| app.approve(args))
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn start(insecure: bool, non_interactive: bool) -> anyhow::Result<()> {
    let app = App::discover(PolicyMode::from_flags(insecure, non_interactive))?;
    app.run().await
}
