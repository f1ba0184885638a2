// ABOUTME: Wire types shared by the agent and the client.
// ABOUTME: Handshake identity, command results, and the HTTP routes that carry them.

use serde::{Deserialize, Serialize};

use crate::version::{IDENTITY, VERSION};

/// Route for the identity/version probe.
pub const HANDSHAKE_ROUTE: &str = "/handshake";

/// Route that runs a command. The body is a JSON array of arguments.
pub const OP_ROUTE: &str = "/op";

/// Message returned in place of output when a command is denied.
pub const DENIED_MESSAGE: &str = "The command wasn't approved by the host";

/// Captured outcome of one CLI invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    pub exit: i32,
}

impl ExecutionResult {
    /// The result sent back for a denied command.
    pub fn denied() -> Self {
        Self {
            stdout: String::new(),
            stderr: DENIED_MESSAGE.to_string(),
            exit: 1,
        }
    }

    /// A failure that happened before the CLI produced any output.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: message.into(),
            exit: 1,
        }
    }
}

/// Answer to the handshake probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandshakeResponse {
    pub version: String,
    #[serde(rename = "whoami")]
    pub identity: String,
}

impl HandshakeResponse {
    /// The handshake for this build.
    pub fn current() -> Self {
        Self {
            version: VERSION.to_string(),
            identity: IDENTITY.to_string(),
        }
    }
}
