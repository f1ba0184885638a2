// ABOUTME: Command approval: policy modes, persistent allow-list, and operator prompt.
// ABOUTME: The engine turns an argument vector into an approve/deny decision.

pub mod allowlist;
pub mod engine;
pub mod prompt;
pub mod types;

pub use allowlist::*;
pub use engine::*;
pub use prompt::*;
pub use types::*;
