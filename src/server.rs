// ABOUTME: HTTP surface of the agent: handshake and command routes on an axum router.
// ABOUTME: Also owns port selection: the first free port in a range starting at the configured one.

use std::sync::Arc;

use anyhow::bail;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tokio::net::TcpListener;
use tracing::{debug, info};

use crate::agent::Agent;
use crate::protocol::{ExecutionResult, HANDSHAKE_ROUTE, HandshakeResponse, OP_ROUTE};

#[derive(Clone)]
struct AppState {
    agent: Arc<Agent>,
}

/// Build the router serving `agent`.
pub fn router(agent: Arc<Agent>) -> Router {
    Router::new()
        .route(HANDSHAKE_ROUTE, get(handshake))
        .route(OP_ROUTE, post(run_op))
        .with_state(AppState { agent })
}

async fn handshake(State(state): State<AppState>) -> Json<HandshakeResponse> {
    Json(state.agent.handshake())
}

async fn run_op(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ExecutionResult>, ApiError> {
    let args: Vec<String> = serde_json::from_slice(&body)
        .map_err(|e| ApiError::invalid("invalid_request", format!("invalid JSON: {e}")))?;

    // The prompt and the CLI both block; keep them off the async workers.
    let agent = state.agent.clone();
    let outcome = tokio::task::spawn_blocking(move || agent.run_command(&args))
        .await
        .map_err(|e| ApiError::internal("internal", e))?;

    let result = outcome.map_err(|e| ApiError::internal("policy_unavailable", e))?;
    Ok(Json(result))
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    fn invalid(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ErrorBody {
                code,
                message: message.into(),
            },
        }
    }

    fn internal(code: &'static str, err: impl Into<anyhow::Error>) -> Self {
        let err = err.into();
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: ErrorBody {
                code,
                message: err.to_string(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Bind the first free port in `start..start + search`.
///
/// Returns the listener itself so the port cannot be taken between the probe
/// and the serve.
pub async fn bind_available(
    host: &str,
    start: u16,
    search: u16,
) -> anyhow::Result<(TcpListener, u16)> {
    for offset in 0..search.max(1) {
        let Some(port) = start.checked_add(offset) else {
            break;
        };
        match TcpListener::bind((host, port)).await {
            Ok(listener) => {
                let port = listener.local_addr()?.port();
                return Ok((listener, port));
            }
            Err(err) => debug!(port, %err, "port unavailable"),
        }
    }
    bail!(
        "no available port found in {}..{}",
        start,
        start.saturating_add(search.max(1))
    )
}

/// Serve until Ctrl-C.
pub async fn serve(listener: TcpListener, agent: Arc<Agent>) -> anyhow::Result<()> {
    axum::serve(listener, router(agent))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("op-agent stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(%err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bind_skips_taken_port() {
        let (taken, port) = bind_available("127.0.0.1", 0, 1).await.unwrap();
        assert_ne!(port, 0);

        // Start on the taken port; the next free one in range is chosen.
        let (_listener, chosen) = bind_available("127.0.0.1", port, 50).await.unwrap();
        assert_ne!(chosen, port);
        assert!(chosen > port && chosen < port.saturating_add(50));
        drop(taken);
    }

    #[tokio::test]
    async fn bind_fails_when_range_exhausted() {
        let (_taken, port) = bind_available("127.0.0.1", 0, 1).await.unwrap();
        let err = bind_available("127.0.0.1", port, 1).await.unwrap_err();
        assert!(err.to_string().contains("no available port"));
    }
}
