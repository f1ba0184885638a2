// ABOUTME: Library root for op-agent: exposes all modules to the binaries and integration tests.
// ABOUTME: The agent binary is main.rs; the client binary is bin/op-agent-client.rs.

pub mod agent;
pub mod app;
pub mod approval;
pub mod audit;
pub mod cli;
pub mod client;
pub mod config;
pub mod executor;
pub mod protocol;
pub mod server;
pub mod version;
