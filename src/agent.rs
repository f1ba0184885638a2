// ABOUTME: The command pipeline: approval, execution, audit, and persistence of "always" approvals.
// ABOUTME: Transport-agnostic; the HTTP server and the approve subcommand both drive it.

use std::sync::Arc;

use crate::approval::{ApprovalEngine, PolicyMode, StoreError};
use crate::audit::AuditLog;
use crate::executor::CommandRunner;
use crate::protocol::{ExecutionResult, HandshakeResponse};

/// Everything needed to answer a request.
pub struct Agent {
    engine: ApprovalEngine,
    runner: Arc<dyn CommandRunner>,
    audit: AuditLog,
}

impl Agent {
    pub fn new(engine: ApprovalEngine, runner: Arc<dyn CommandRunner>, audit: AuditLog) -> Self {
        Self {
            engine,
            runner,
            audit,
        }
    }

    pub fn mode(&self) -> PolicyMode {
        self.engine.mode()
    }

    pub fn handshake(&self) -> HandshakeResponse {
        HandshakeResponse::current()
    }

    /// Decide on `args`, run them if approved, and report the result.
    ///
    /// Denials come back as an ordinary result with exit code 1. Only an
    /// unreadable allow-list is an error. Blocks until the CLI exits.
    pub fn run_command(&self, args: &[String]) -> Result<ExecutionResult, StoreError> {
        let decision = self.engine.decide(args).inspect_err(|err| {
            tracing::error!(%err, "failed to check command approval");
        })?;

        if let Err(err) = self
            .audit
            .record_request(args, decision.approved, decision.source)
        {
            tracing::warn!(error = %err, "failed to log command request");
        }

        if !decision.approved {
            return Ok(ExecutionResult::denied());
        }

        let result = self.runner.run(args);

        if let Err(err) = self.audit.record_execution(args, result.exit) {
            tracing::warn!(error = %err, "failed to log command execution");
        }

        // A failing command is never remembered.
        if decision.persist && result.exit == 0 && self.mode() != PolicyMode::Insecure {
            if let Err(err) = self.engine.remember(args) {
                tracing::warn!(%err, "failed to save approved command");
            }
        }

        Ok(result)
    }

    /// Add `args` to the allow-list without running anything.
    /// Returns false when the command was already approved.
    pub fn pre_approve(&self, args: &[String]) -> Result<bool, StoreError> {
        let added = self.engine.remember(args)?;
        tracing::debug!(added, "pre-approved command");
        Ok(added)
    }
}
