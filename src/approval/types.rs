// ABOUTME: Core types for command approval.
// ABOUTME: PolicyMode, ApprovalSource, ApprovalDecision, and the prompt response mapping.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How the agent treats commands that are not on the allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PolicyMode {
    /// Ask the operator at the terminal.
    #[default]
    Interactive,
    /// Deny anything not already approved.
    NonInteractive,
    /// Approve everything without asking.
    Insecure,
}

impl PolicyMode {
    /// Build the mode from the CLI flags; `insecure` wins over `non_interactive`.
    pub fn from_flags(insecure: bool, non_interactive: bool) -> Self {
        if insecure {
            Self::Insecure
        } else if non_interactive {
            Self::NonInteractive
        } else {
            Self::Interactive
        }
    }
}

/// Why a command was approved or denied. Serialized into the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApprovalSource {
    /// The command was on the allow-list.
    Config,
    /// The operator approved this one invocation.
    InteractiveOnce,
    /// The operator approved and asked to remember it.
    InteractiveAlways,
    /// The operator refused.
    InteractiveDenied,
    /// Nobody could be asked.
    NonInteractive,
    /// The agent runs with approval checks disabled.
    Insecure,
}

impl ApprovalSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Config => "config",
            Self::InteractiveOnce => "interactive-once",
            Self::InteractiveAlways => "interactive-always",
            Self::InteractiveDenied => "interactive-denied",
            Self::NonInteractive => "non-interactive",
            Self::Insecure => "insecure",
        }
    }
}

impl fmt::Display for ApprovalSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The outcome of evaluating one command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApprovalDecision {
    pub approved: bool,
    pub source: ApprovalSource,
    /// Remember the command once it succeeds. Only set for `InteractiveAlways`.
    pub persist: bool,
}

impl ApprovalDecision {
    pub fn approve(source: ApprovalSource) -> Self {
        Self {
            approved: true,
            source,
            persist: source == ApprovalSource::InteractiveAlways,
        }
    }

    pub fn deny(source: ApprovalSource) -> Self {
        Self {
            approved: false,
            source,
            persist: false,
        }
    }

    /// Map the operator's keystroke to a decision.
    ///
    /// `y`/`o` approve once, `a` approves always, anything else denies.
    pub fn from_response(response: char) -> Self {
        match response.to_ascii_lowercase() {
            'y' | 'o' => Self::approve(ApprovalSource::InteractiveOnce),
            'a' => Self::approve(ApprovalSource::InteractiveAlways),
            _ => Self::deny(ApprovalSource::InteractiveDenied),
        }
    }
}
