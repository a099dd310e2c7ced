//! Command sidecar: the endpoint the command channel talks to on the
//! instance. Runs each command through the local RCON client.

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use hibernate_common::ErrorResponse;
use tower_http::trace::TraceLayer;

use super::handlers::{CommandQuery, health};
use crate::infra::channel::API_KEY_HEADER;
use crate::infra::command_runner::RconRunner;

pub struct SidecarState {
    runner: RconRunner,
    api_key: String,
}

impl SidecarState {
    /// `None` when `api_key` is empty; the sidecar never runs unguarded.
    #[must_use]
    pub fn new(runner: RconRunner, api_key: impl Into<String>) -> Option<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return None;
        }
        Some(Self { runner, api_key })
    }

    fn accepts(&self, headers: &HeaderMap) -> bool {
        headers
            .get(API_KEY_HEADER)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|key| key == self.api_key)
    }
}

pub fn router(state: Arc<SidecarState>) -> Router {
    Router::new()
        .route("/rcon", post(run_command))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn run_command(
    State(state): State<Arc<SidecarState>>,
    headers: HeaderMap,
    Query(query): Query<CommandQuery>,
) -> Response {
    if !state.accepts(&headers) {
        tracing::warn!("rejected sidecar request: bad or missing API key");
        return (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::new("unauthorized", "unauthorized")),
        )
            .into_response();
    }
    match state.runner.run(&query.command).await {
        Ok(output) => {
            tracing::info!(command = %query.command, returncode = output.returncode, "command executed");
            Json(output).into_response()
        }
        Err(err) => {
            tracing::error!(command = %query.command, error = %format!("{err:#}"), "command failed to run");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new("rcon_failed", format!("{err:#}"))),
            )
                .into_response()
        }
    }
}
