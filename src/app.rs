// ABOUTME: App orchestrator: wires the allow-list, prompt, runner, and audit log into an Agent.
// ABOUTME: Runs the HTTP server or the out-of-band approve command.

use std::sync::Arc;

use tracing::{info, warn};

use crate::agent::Agent;
use crate::approval::{AllowListStore, ApprovalEngine, PolicyMode, TerminalPrompter, signature};
use crate::audit::AuditLog;
use crate::config::{AGENT_PORT_ENV, AgentPaths, AgentSettings};
use crate::executor::CliRunner;
use crate::server;

/// Top-level application state for the agent binary.
pub struct App {
    paths: AgentPaths,
    settings: AgentSettings,
    mode: PolicyMode,
}

impl App {
    pub fn new(paths: AgentPaths, settings: AgentSettings, mode: PolicyMode) -> Self {
        Self {
            paths,
            settings,
            mode,
        }
    }

    /// Resolve directories and settings for this user.
    pub fn discover(mode: PolicyMode) -> anyhow::Result<Self> {
        let paths = AgentPaths::discover()?;
        let settings = AgentSettings::load(&paths.settings_path())?.with_env_overrides();
        Ok(Self::new(paths, settings, mode))
    }

    /// Build the pipeline backed by the real CLI and terminal.
    pub fn agent(&self) -> Agent {
        let binary = self.settings.binary.clone();
        let store = Arc::new(AllowListStore::new(self.paths.allowlist_path()));
        let prompter = Arc::new(TerminalPrompter::new(binary.clone()));
        let engine = ApprovalEngine::new(self.mode, store, prompter);
        let audit = AuditLog::new(self.paths.audit_log_path(), binary.clone());
        Agent::new(engine, Arc::new(CliRunner::new(binary)), audit)
    }

    /// Bind a port and serve until interrupted.
    pub async fn run(self) -> anyhow::Result<()> {
        let requested = self.settings.port;
        let (listener, port) =
            server::bind_available(&self.settings.bind, requested, self.settings.port_search)
                .await?;

        if port != requested {
            println!(
                "Port {} unavailable, using {}. Set {}={}",
                requested, port, AGENT_PORT_ENV, port
            );
        }

        if self.mode == PolicyMode::Insecure {
            println!("\u{1f7e1} WARNING: Running in INSECURE mode - all commands will be allowed!");
            warn!("approval checks disabled");
        }

        info!(
            port,
            bind = %self.settings.bind,
            allowlist = %self.paths.allowlist_path().display(),
            audit_log = %self.paths.audit_log_path().display(),
            mode = ?self.mode,
            "op-agent started"
        );
        println!("\u{1f7e3} op-agent listening on :{}\n", port);

        server::serve(listener, Arc::new(self.agent())).await
    }

    /// Pre-approve `args` and report what happened on stdout.
    pub fn approve(&self, args: &[String]) -> anyhow::Result<()> {
        let command = format!("{} {}", self.settings.binary, signature(args));
        if self.agent().pre_approve(args)? {
            println!("\u{1f7e2} Command approved: {}", command);
        } else {
            println!("Command already approved: {}", command);
        }
        Ok(())
    }
}
