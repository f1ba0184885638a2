// ABOUTME: JSONL audit log: appends one record per decision and per execution.
// ABOUTME: The file is opened in append mode for each record and mirrored to the console.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::approval::{ApprovalSource, signature};

/// Written when a decision is made, before anything runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestRecord {
    pub timestamp: String,
    pub args: Vec<String>,
    pub approved: bool,
    pub source: ApprovalSource,
}

/// Written after the CLI exits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub timestamp: String,
    pub args: Vec<String>,
    pub exit: i32,
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Append-only log of what the agent decided and ran.
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
    binary: String,
    console: bool,
}

impl AuditLog {
    pub fn new(path: PathBuf, binary: impl Into<String>) -> Self {
        Self {
            path,
            binary: binary.into(),
            console: true,
        }
    }

    /// Stop echoing records to stdout.
    pub fn quiet(mut self) -> Self {
        self.console = false;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record a decision.
    pub fn record_request(
        &self,
        args: &[String],
        approved: bool,
        source: ApprovalSource,
    ) -> anyhow::Result<()> {
        let record = RequestRecord {
            timestamp: timestamp(),
            args: args.to_vec(),
            approved,
            source,
        };
        if self.console {
            let verdict = if approved {
                format!("\u{1f7e2} Approved via {}:", record.source)
            } else {
                "\u{1f534} Denied:".to_string()
            };
            println!(
                "[{}] {} {} {}",
                record.timestamp,
                verdict,
                self.binary,
                signature(args)
            );
        }
        self.append(&record)
    }

    /// Record a finished execution.
    pub fn record_execution(&self, args: &[String], exit: i32) -> anyhow::Result<()> {
        let record = ExecutionRecord {
            timestamp: timestamp(),
            args: args.to_vec(),
            exit,
        };
        if self.console {
            println!(
                "[{}] EXECUTED (exit code {}) {} {}",
                record.timestamp,
                exit,
                self.binary,
                signature(args)
            );
        }
        self.append(&record)
    }

    fn append<T: Serialize>(&self, record: &T) -> anyhow::Result<()> {
        let mut line = serde_json::to_string(record).context("failed to serialize log entry")?;
        line.push('\n');

        let mut options = OpenOptions::new();
        options.create(true).append(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options
            .open(&self.path)
            .with_context(|| format!("failed to open log file {}", self.path.display()))?;
        // One write per line so concurrent appends stay whole.
        file.write_all(line.as_bytes())
            .with_context(|| format!("failed to write log entry to {}", self.path.display()))?;
        Ok(())
    }
}
