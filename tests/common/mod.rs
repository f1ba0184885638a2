// ABOUTME: Shared test doubles for integration tests.
// ABOUTME: A scripted operator prompt, a recording runner, and an agent builder over a temp dir.

#![allow(dead_code)]

use std::path::Path;
use std::sync::{Arc, Mutex};

use op_agent::agent::Agent;
use op_agent::approval::{AllowListStore, ApprovalEngine, PolicyMode, Prompter};
use op_agent::audit::AuditLog;
use op_agent::executor::CommandRunner;
use op_agent::protocol::ExecutionResult;

/// Answers every prompt with the same character and records the questions.
pub struct ScriptedPrompter {
    pub response: char,
    pub asked: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn answering(response: char) -> Arc<Self> {
        Arc::new(Self {
            response,
            asked: Mutex::new(Vec::new()),
        })
    }

    pub fn prompts(&self) -> usize {
        self.asked.lock().unwrap().len()
    }
}

impl Prompter for ScriptedPrompter {
    fn available(&self) -> bool {
        true
    }

    fn ask(&self, command: &str) -> char {
        self.asked.lock().unwrap().push(command.to_string());
        self.response
    }
}

/// Returns a fixed result and records every invocation.
pub struct RecordingRunner {
    pub result: ExecutionResult,
    pub calls: Mutex<Vec<Vec<String>>>,
}

impl RecordingRunner {
    pub fn exiting(exit: i32) -> Arc<Self> {
        Arc::new(Self {
            result: ExecutionResult {
                stdout: if exit == 0 { "secret\n".to_string() } else { String::new() },
                stderr: if exit == 0 { String::new() } else { "[ERROR] not found\n".to_string() },
                exit,
            },
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, args: &[String]) -> ExecutionResult {
        self.calls.lock().unwrap().push(args.to_vec());
        self.result.clone()
    }
}

pub fn args(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

pub fn store_in(dir: &Path) -> Arc<AllowListStore> {
    Arc::new(AllowListStore::new(dir.join("config.json")))
}

pub fn agent_in(
    dir: &Path,
    mode: PolicyMode,
    prompter: Arc<ScriptedPrompter>,
    runner: Arc<RecordingRunner>,
) -> Agent {
    let engine = ApprovalEngine::new(mode, store_in(dir), prompter);
    let audit = AuditLog::new(dir.join("commands.log"), "op").quiet();
    Agent::new(engine, runner, audit)
}

/// Parsed audit log lines.
pub fn audit_lines(dir: &Path) -> Vec<serde_json::Value> {
    match std::fs::read_to_string(dir.join("commands.log")) {
        Ok(content) => content
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect(),
        Err(_) => Vec::new(),
    }
}
