// ABOUTME: Command-line definitions for the agent and the client binaries.
// ABOUTME: Client flags are only recognised before the `op` token; the rest is forwarded.

use clap::{Args, Parser, Subcommand};

/// Token that separates client flags from the forwarded command.
pub const OP_TOKEN: &str = "op";

#[derive(Debug, Parser)]
#[command(
    name = "op-agent",
    about = "1Password CLI agent",
    long_about = "op-agent lets containers use the host 1Password CLI and its biometric \
                  authentication, asking the operator before running unknown commands.",
    disable_version_flag = true
)]
pub struct AgentCli {
    /// Print version information.
    #[arg(long)]
    pub version: bool,

    #[command(flatten)]
    pub mode: ModeArgs,

    #[command(subcommand)]
    pub command: Option<AgentCommand>,
}

#[derive(Debug, Clone, Copy, Default, Args)]
pub struct ModeArgs {
    /// Disable command approval checks (UNSAFE).
    #[arg(long)]
    pub insecure: bool,

    /// Only allow pre-approved commands.
    #[arg(long)]
    pub non_interactive: bool,
}

#[derive(Debug, Subcommand)]
pub enum AgentCommand {
    /// Start the agent server to accept client requests.
    Start(ModeArgs),

    /// Add a command to the approved list without executing it.
    #[command(override_usage = "op-agent approve op [command...]")]
    Approve {
        /// `op` followed by the command to approve.
        #[arg(
            trailing_var_arg = true,
            allow_hyphen_values = true,
            required = true,
            value_name = "op [command...]"
        )]
        command: Vec<String>,
    },
}

/// Split `op <args...>` into the forwarded args, or None if it does not start with `op`.
pub fn strip_op(command: &[String]) -> Option<&[String]> {
    match command.split_first() {
        Some((first, rest)) if first == OP_TOKEN => Some(rest),
        _ => None,
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "op-agent-client",
    about = "1Password CLI agent client",
    long_about = "op-agent-client connects to op-agent to execute 1Password CLI commands.",
    override_usage = "op-agent-client [flags] op [command...]",
    disable_version_flag = true
)]
pub struct ClientCli {
    /// Suppress the version mismatch warning.
    #[arg(short, long)]
    pub quiet: bool,

    /// Fail when the agent runs a different version.
    #[arg(long)]
    pub strict: bool,

    /// Print version information.
    #[arg(long)]
    pub version: bool,

    /// `op` followed by the command to run on the host.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "op [command...]")]
    pub command: Vec<String>,
}
