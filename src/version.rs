// ABOUTME: Build identity shared by the agent and the client.
// ABOUTME: The handshake compares these values to detect mismatched installs.

/// Version baked in at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Identity the agent reports during the handshake.
pub const IDENTITY: &str = "op-agent";
