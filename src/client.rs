// ABOUTME: Client side of op-agent: locates the agent, checks the handshake, and forwards commands.
// ABOUTME: Transport failures are errors; a remote command's non-zero exit is a normal result.

use std::time::Duration;

use reqwest::Client;
use thiserror::Error;

use crate::config;
use crate::protocol::{ExecutionResult, HANDSHAKE_ROUTE, HandshakeResponse, OP_ROUTE};
use crate::version::{IDENTITY, VERSION};

/// Anything that stops a command from reaching the agent or coming back.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),
    #[error("error connecting to op-agent at {url}: {source}")]
    Connect { url: String, source: reqwest::Error },
    #[error("agent returned error {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid response from {url}: {source}")]
    Decode {
        url: String,
        source: serde_json::Error,
    },
    #[error("unexpected server identity: {0}")]
    Identity(String),
    #[error("version mismatch - client: {client}, server: {server}")]
    VersionMismatch { client: String, server: String },
}

/// How strictly to treat the handshake.
#[derive(Debug, Clone, Copy, Default)]
pub struct HandshakeOptions {
    /// Do not print the version mismatch warning.
    pub quiet: bool,
    /// Fail on a version mismatch instead of warning.
    pub strict: bool,
}

/// Check a handshake answer against this build.
///
/// A foreign identity is always an error. A different version is an error
/// under `strict`, otherwise a warning message.
pub fn verify_handshake(
    handshake: &HandshakeResponse,
    strict: bool,
) -> Result<Option<String>, ClientError> {
    if handshake.identity != IDENTITY {
        return Err(ClientError::Identity(handshake.identity.clone()));
    }
    if handshake.version == VERSION {
        return Ok(None);
    }
    if strict {
        return Err(ClientError::VersionMismatch {
            client: VERSION.to_string(),
            server: handshake.version.clone(),
        });
    }
    Ok(Some(format!(
        "Warning: version mismatch - client: {}, server: {}",
        VERSION, handshake.version
    )))
}

/// HTTP client for one agent endpoint.
#[derive(Debug, Clone)]
pub struct AgentClient {
    http: Client,
    base_url: String,
}

impl AgentClient {
    /// Connect to `base_url` (e.g. `http://localhost:48484`).
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        // No overall timeout: the operator may take a while to answer the prompt.
        // The agent is local, so proxies from the environment are ignored.
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .no_proxy()
            .build()
            .map_err(ClientError::Build)?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { http, base_url })
    }

    /// Resolve the agent from `OP_AGENT_HOST`, `OP_AGENT_PORT`, and container markers.
    pub fn from_env() -> Result<Self, ClientError> {
        let host = config::agent_host(config::in_container());
        let port = config::agent_port();
        Self::new(format!("http://{host}:{port}"))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, route: &str) -> String {
        format!("{}{}", self.base_url, route)
    }

    /// Ask the agent who it is.
    pub async fn handshake(&self) -> Result<HandshakeResponse, ClientError> {
        let url = self.url(HANDSHAKE_ROUTE);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|source| ClientError::Connect {
                url: url.clone(),
                source,
            })?;
        self.decode(url, resp).await
    }

    /// Send a command and return the remote result.
    pub async fn run(&self, args: &[String]) -> Result<ExecutionResult, ClientError> {
        let url = self.url(OP_ROUTE);
        let resp = self
            .http
            .post(&url)
            .json(args)
            .send()
            .await
            .map_err(|source| ClientError::Connect {
                url: url.clone(),
                source,
            })?;
        self.decode(url, resp).await
    }

    /// Handshake, then run. A version warning goes to stderr unless quiet.
    pub async fn invoke(
        &self,
        args: &[String],
        options: HandshakeOptions,
    ) -> Result<ExecutionResult, ClientError> {
        let handshake = self.handshake().await?;
        if let Some(warning) = verify_handshake(&handshake, options.strict)? {
            if !options.quiet {
                eprintln!("{warning}");
            }
        }
        self.run(args).await
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        &self,
        url: String,
        resp: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|source| ClientError::Connect {
                url: url.clone(),
                source,
            })?;
        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }
        serde_json::from_str(&body).map_err(|source| ClientError::Decode { url, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handshake(identity: &str, version: &str) -> HandshakeResponse {
        HandshakeResponse {
            version: version.to_string(),
            identity: identity.to_string(),
        }
    }

    #[test]
    fn matching_handshake_passes_silently() {
        let result = verify_handshake(&handshake(IDENTITY, VERSION), true).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn version_mismatch_warns() {
        let warning = verify_handshake(&handshake(IDENTITY, "0.0.0-old"), false)
            .unwrap()
            .expect("should warn");
        assert!(warning.contains("0.0.0-old"));
        assert!(warning.contains(VERSION));
    }

    #[test]
    fn version_mismatch_fails_when_strict() {
        let err = verify_handshake(&handshake(IDENTITY, "0.0.0-old"), true).unwrap_err();
        assert!(matches!(err, ClientError::VersionMismatch { .. }));
    }

    #[test]
    fn foreign_identity_is_rejected() {
        let err = verify_handshake(&handshake("nginx", VERSION), false).unwrap_err();
        assert!(matches!(err, ClientError::Identity(ref who) if who == "nginx"));
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = AgentClient::new("http://localhost:48484/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:48484");
        assert_eq!(client.url(OP_ROUTE), "http://localhost:48484/op");
    }
}
