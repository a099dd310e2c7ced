//! Route handlers for the lifecycle API.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use hibernate_common::{
    ChannelOutput, InstanceStatus, IpResponse, PlayerCountResponse, StartResponse, StatusResponse,
    StopResponse,
};
use serde::Deserialize;

use super::AppState;
use super::error::ApiError;

fn authorization(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
}

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn start(State(state): State<Arc<AppState>>) -> Result<Json<StartResponse>, ApiError> {
    let outcome = state.lifecycle.start().await?;
    Ok(Json(StartResponse {
        status: outcome.status_label().to_string(),
        external_ip: outcome.external_ip.to_string(),
        dns_update: outcome.dns.to_string(),
    }))
}

pub async fn stop(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<StopResponse>, ApiError> {
    state.relay.authorize(authorization(&headers))?;
    let outcome = state.lifecycle.stop().await?;
    Ok(Json(StopResponse {
        status: outcome.status_label().to_string(),
    }))
}

pub async fn status(State(state): State<Arc<AppState>>) -> Result<Json<StatusResponse>, ApiError> {
    let status = state.lifecycle.status().await?;
    Ok(Json(StatusResponse {
        running: status == InstanceStatus::Running,
        status,
    }))
}

pub async fn ip(State(state): State<Arc<AppState>>) -> Result<Json<IpResponse>, ApiError> {
    let external_ip = state.lifecycle.external_ip().await?;
    Ok(Json(IpResponse {
        external_ip: external_ip.map(|ip| ip.to_string()),
    }))
}

#[derive(Debug, Deserialize)]
pub struct CommandQuery {
    pub command: Option<String>,
}

pub async fn rcon(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<CommandQuery>,
) -> Result<Json<ChannelOutput>, ApiError> {
    let authorization = authorization(&headers);
    state.relay.authorize(authorization)?;
    let command = query.command.ok_or(ApiError::MissingParameter("command"))?;
    let output = state.relay.relay(&command, authorization).await?;
    Ok(Json(output))
}

pub async fn player_count(
    State(state): State<Arc<AppState>>,
) -> Result<Json<PlayerCountResponse>, ApiError> {
    let (occupancy, output) = state.relay.player_count().await?;
    Ok(Json(PlayerCountResponse {
        players: occupancy.count(),
        output: output.stdout,
    }))
}
