// ABOUTME: Approval engine: decides whether an incoming command may run.
// ABOUTME: Consults the allow-list, the policy mode, and the operator prompt, in that order.

use std::sync::Arc;

use super::{
    allowlist::{AllowListStore, StoreError, signature},
    prompt::Prompter,
    types::{ApprovalDecision, ApprovalSource, PolicyMode},
};

/// Decides on commands for one agent instance.
pub struct ApprovalEngine {
    mode: PolicyMode,
    store: Arc<AllowListStore>,
    prompter: Arc<dyn Prompter>,
}

impl ApprovalEngine {
    pub fn new(mode: PolicyMode, store: Arc<AllowListStore>, prompter: Arc<dyn Prompter>) -> Self {
        Self {
            mode,
            store,
            prompter,
        }
    }

    pub fn mode(&self) -> PolicyMode {
        self.mode
    }

    pub fn store(&self) -> &Arc<AllowListStore> {
        &self.store
    }

    /// Evaluate a command.
    ///
    /// The allow-list is re-read on every call. An unreadable allow-list is an
    /// error, except in insecure mode where it is only logged.
    pub fn decide(&self, args: &[String]) -> Result<ApprovalDecision, StoreError> {
        let list = match self.store.load() {
            Ok(list) => Some(list),
            Err(err) if self.mode == PolicyMode::Insecure => {
                tracing::warn!(%err, "allow-list unreadable, approving anyway in insecure mode");
                None
            }
            Err(err) => return Err(err),
        };

        if list.as_ref().is_some_and(|l| l.contains(args)) {
            return Ok(ApprovalDecision::approve(ApprovalSource::Config));
        }

        match self.mode {
            PolicyMode::Insecure => Ok(ApprovalDecision::approve(ApprovalSource::Insecure)),
            PolicyMode::NonInteractive => {
                Ok(ApprovalDecision::deny(ApprovalSource::NonInteractive))
            }
            PolicyMode::Interactive if !self.prompter.available() => {
                Ok(ApprovalDecision::deny(ApprovalSource::NonInteractive))
            }
            PolicyMode::Interactive => {
                let response = self.prompter.ask(&signature(args));
                Ok(ApprovalDecision::from_response(response))
            }
        }
    }

    /// Remember `args` after an "always" approval. Returns whether it was new.
    pub fn remember(&self, args: &[String]) -> Result<bool, StoreError> {
        self.store.approve(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Prompter that answers from a script and records what it was asked.
    struct ScriptedPrompter {
        available: bool,
        response: char,
        asked: Mutex<Vec<String>>,
    }

    impl ScriptedPrompter {
        fn answering(response: char) -> Arc<Self> {
            Arc::new(Self {
                available: true,
                response,
                asked: Mutex::new(Vec::new()),
            })
        }

        fn unavailable() -> Arc<Self> {
            Arc::new(Self {
                available: false,
                response: 'y',
                asked: Mutex::new(Vec::new()),
            })
        }

        fn asked(&self) -> Vec<String> {
            self.asked.lock().unwrap().clone()
        }
    }

    impl Prompter for ScriptedPrompter {
        fn available(&self) -> bool {
            self.available
        }

        fn ask(&self, command: &str) -> char {
            self.asked.lock().unwrap().push(command.to_string());
            self.response
        }
    }

    fn args(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    fn engine_in(
        dir: &tempfile::TempDir,
        mode: PolicyMode,
        prompter: Arc<ScriptedPrompter>,
    ) -> ApprovalEngine {
        let store = Arc::new(AllowListStore::new(dir.path().join("config.json")));
        ApprovalEngine::new(mode, store, prompter)
    }

    #[test]
    fn allowlisted_command_skips_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let prompter = ScriptedPrompter::answering('n');
        let engine = engine_in(&dir, PolicyMode::Interactive, prompter.clone());
        let cmd = args(&["read", "op://vault/item"]);
        engine.store().approve(&cmd).unwrap();

        let decision = engine.decide(&cmd).unwrap();
        assert_eq!(decision, ApprovalDecision::approve(ApprovalSource::Config));
        assert!(!decision.persist);
        assert!(prompter.asked().is_empty());
    }

    #[test]
    fn insecure_approves_everything() {
        let dir = tempfile::tempdir().unwrap();
        let prompter = ScriptedPrompter::answering('n');
        let engine = engine_in(&dir, PolicyMode::Insecure, prompter.clone());

        let decision = engine.decide(&args(&["item", "delete", "x"])).unwrap();
        assert!(decision.approved);
        assert!(!decision.persist);
        assert_eq!(decision.source, ApprovalSource::Insecure);
        assert!(prompter.asked().is_empty());
    }

    #[test]
    fn insecure_tolerates_broken_allowlist() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.json"), "garbage").unwrap();
        let engine = engine_in(&dir, PolicyMode::Insecure, ScriptedPrompter::answering('n'));

        let decision = engine.decide(&args(&["whoami"])).unwrap();
        assert_eq!(decision.source, ApprovalSource::Insecure);
    }

    #[test]
    fn non_interactive_denies_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let prompter = ScriptedPrompter::answering('y');
        let engine = engine_in(&dir, PolicyMode::NonInteractive, prompter.clone());

        let decision = engine.decide(&args(&["read", "op://vault/item"])).unwrap();
        assert_eq!(decision, ApprovalDecision::deny(ApprovalSource::NonInteractive));
        assert!(prompter.asked().is_empty());
    }

    #[test]
    fn missing_operator_denies_as_non_interactive() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_in(&dir, PolicyMode::Interactive, ScriptedPrompter::unavailable());

        let decision = engine.decide(&args(&["whoami"])).unwrap();
        assert_eq!(decision, ApprovalDecision::deny(ApprovalSource::NonInteractive));
    }

    #[test]
    fn interactive_prompt_shows_signature() {
        let dir = tempfile::tempdir().unwrap();
        let prompter = ScriptedPrompter::answering('a');
        let engine = engine_in(&dir, PolicyMode::Interactive, prompter.clone());

        let decision = engine.decide(&args(&["item", "get", "GitHub"])).unwrap();
        assert_eq!(decision.source, ApprovalSource::InteractiveAlways);
        assert!(decision.persist);
        assert_eq!(prompter.asked(), vec!["item get GitHub".to_string()]);
    }

    #[test]
    fn interactive_denial() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_in(&dir, PolicyMode::Interactive, ScriptedPrompter::answering('q'));

        let decision = engine.decide(&args(&["whoami"])).unwrap();
        assert_eq!(decision, ApprovalDecision::deny(ApprovalSource::InteractiveDenied));
    }

    #[test]
    fn unreadable_allowlist_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.json"), "[1, 2").unwrap();
        let prompter = ScriptedPrompter::answering('y');
        let engine = engine_in(&dir, PolicyMode::Interactive, prompter.clone());

        assert!(engine.decide(&args(&["whoami"])).is_err());
        assert!(prompter.asked().is_empty());
    }

    #[test]
    fn remember_adds_to_store() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_in(&dir, PolicyMode::NonInteractive, ScriptedPrompter::unavailable());
        let cmd = args(&["read", "op://vault/x"]);

        assert!(engine.remember(&cmd).unwrap());
        assert_eq!(
            engine.decide(&cmd).unwrap(),
            ApprovalDecision::approve(ApprovalSource::Config)
        );
    }
}
