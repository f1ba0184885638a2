// ABOUTME: Entry point for op-agent-client: forwards `op` invocations to the host agent.
// ABOUTME: Reproduces the remote stdout, stderr, and exit code as this process's own.

use std::io::Write;
use std::process::ExitCode;

use clap::{CommandFactory, Parser};

use op_agent::cli::{ClientCli, strip_op};
use op_agent::client::{AgentClient, HandshakeOptions};
use op_agent::version::VERSION;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = ClientCli::parse();

    if cli.version {
        println!("op-agent-client version {VERSION}");
        return ExitCode::SUCCESS;
    }

    let Some(args) = strip_op(&cli.command) else {
        let _ = ClientCli::command().print_help();
        return ExitCode::SUCCESS;
    };

    let options = HandshakeOptions {
        quiet: cli.quiet,
        strict: cli.strict,
    };

    let result = match AgentClient::from_env() {
        Ok(client) => client.invoke(args, options).await,
        Err(err) => Err(err),
    };

    match result {
        Ok(result) => {
            let mut stdout = std::io::stdout();
            let _ = stdout.write_all(result.stdout.as_bytes());
            let _ = stdout.flush();
            let mut stderr = std::io::stderr();
            let _ = stderr.write_all(result.stderr.as_bytes());
            let _ = stderr.flush();
            ExitCode::from(u8::try_from(result.exit).unwrap_or(1))
        }
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}
